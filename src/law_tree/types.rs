use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Chapter,
    Section,
    Article,
    Paragraph,
    Point,
    Letter,
    TransitionalSection,
    TransitionalParagraph,
    Title,
    PublicationInfo,
    Note,
    Metadata,
    Unknown,
}

impl NodeType {
    pub const ALL: [NodeType; 13] = [
        NodeType::Chapter,
        NodeType::Section,
        NodeType::Article,
        NodeType::Paragraph,
        NodeType::Point,
        NodeType::Letter,
        NodeType::TransitionalSection,
        NodeType::TransitionalParagraph,
        NodeType::Title,
        NodeType::PublicationInfo,
        NodeType::Note,
        NodeType::Metadata,
        NodeType::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Chapter => "chapter",
            NodeType::Section => "section",
            NodeType::Article => "article",
            NodeType::Paragraph => "paragraph",
            NodeType::Point => "point",
            NodeType::Letter => "letter",
            NodeType::TransitionalSection => "transitional_section",
            NodeType::TransitionalParagraph => "transitional_paragraph",
            NodeType::Title => "title",
            NodeType::PublicationInfo => "publication_info",
            NodeType::Note => "note",
            NodeType::Metadata => "metadata",
            NodeType::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|node_type| node_type.as_str() == value)
    }

    /// Node types whose bodies carry inline алинея/точка/буква markers.
    pub fn is_splittable(self) -> bool {
        matches!(self, NodeType::Article | NodeType::TransitionalParagraph)
    }
}

/// A node of the addressable law hierarchy, in final form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LawNode {
    pub path: String,
    pub source_paragraph_id: Option<i64>,
    pub caption: Option<String>,
    pub text: Option<String>,
    pub node_type: NodeType,
    pub type_code: Option<i64>,
    pub field_type: Option<i64>,
    pub has_in_links: bool,
    pub sort_order: i64,
    pub level: i64,
    pub is_orphaned: bool,
}

/// A node before it receives its `sort_order` and final path.
#[derive(Debug, Clone)]
pub struct NodeDraft {
    pub path: String,
    pub source_paragraph_id: Option<i64>,
    pub caption: Option<String>,
    pub text: Option<String>,
    pub node_type: NodeType,
    pub type_code: Option<i64>,
    pub field_type: Option<i64>,
    pub has_in_links: bool,
    pub level: i64,
    pub is_orphaned: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub structural_nodes: usize,
    pub orphan_nodes: usize,
    pub split_nodes: usize,
    pub flattened_containers: usize,
    pub missing_identifier: usize,
    pub markdown_fallbacks: usize,
    pub path_collisions: usize,
}

/// Ordered node output of one `process` run.
///
/// Owns the law's `sort_order` counter and the set of issued paths, so two
/// laws never share either.
#[derive(Debug, Default)]
pub struct NodeSink {
    nodes: Vec<LawNode>,
    paths: HashSet<String>,
    next_sort_order: i64,
    pub stats: ProcessStats,
}

impl NodeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, draft: NodeDraft) -> usize {
        let path = self.claim_path(draft.path);
        let sort_order = self.next_sort_order;
        self.next_sort_order += 1;

        self.nodes.push(LawNode {
            path,
            source_paragraph_id: draft.source_paragraph_id,
            caption: draft.caption,
            text: draft.text,
            node_type: draft.node_type,
            type_code: draft.type_code,
            field_type: draft.field_type,
            has_in_links: draft.has_in_links,
            sort_order,
            level: draft.level,
            is_orphaned: draft.is_orphaned,
        });

        self.nodes.len() - 1
    }

    /// Emits a node extracted from the text of `parent`, one level below it.
    pub fn emit_child(
        &mut self,
        parent: usize,
        path: String,
        node_type: NodeType,
        text: Option<String>,
    ) -> usize {
        let parent = &self.nodes[parent];
        let draft = NodeDraft {
            path,
            source_paragraph_id: parent.source_paragraph_id,
            caption: None,
            text,
            node_type,
            type_code: parent.type_code,
            field_type: parent.field_type,
            has_in_links: parent.has_in_links,
            level: parent.level + 1,
            is_orphaned: false,
        };
        self.stats.split_nodes += 1;
        self.emit(draft)
    }

    pub fn node(&self, index: usize) -> &LawNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[LawNode] {
        &self.nodes
    }

    pub fn set_text(&mut self, index: usize, text: Option<String>) {
        self.nodes[index].text = text;
    }

    pub fn into_parts(self) -> (Vec<LawNode>, ProcessStats) {
        (self.nodes, self.stats)
    }

    fn claim_path(&mut self, path: String) -> String {
        if self.paths.insert(path.clone()) {
            return path;
        }

        let mut attempt = 2;
        loop {
            let candidate = format!("{path}~{attempt}");
            if self.paths.insert(candidate.clone()) {
                self.stats.path_collisions += 1;
                warn!(path = %path, assigned = %candidate, "duplicate node path");
                return candidate;
            }
            attempt += 1;
        }
    }
}

/// Trims `text`, mapping whitespace-only input to `None`.
pub fn non_empty_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
