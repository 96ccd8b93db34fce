use std::collections::HashSet;

use tracing::debug;

use super::path_builder::{PathBuilder, join_path};
use super::text_map::TextMap;
use super::types::{NodeDraft, NodeSink};
use crate::model::StructureNode;

/// What the traversal does with one structural node.
enum Visit<'a> {
    /// A chapter or section: no node, children stay at the current path and level.
    Flatten(&'a [StructureNode]),
    Emit(NodeDraft, &'a [StructureNode]),
}

pub struct TreeBuilder<'a> {
    paths: &'a PathBuilder,
    text_map: &'a TextMap,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(paths: &'a PathBuilder, text_map: &'a TextMap) -> Self {
        Self { paths, text_map }
    }

    /// Pre-order walk of the structure forest. Returns the paragraph ids the
    /// structure references, flattened containers included.
    pub fn build(&self, forest: &[StructureNode], sink: &mut NodeSink) -> HashSet<i64> {
        let mut used = HashSet::new();
        self.walk(forest, "", 0, sink, &mut used);
        used
    }

    fn walk(
        &self,
        nodes: &[StructureNode],
        parent_path: &str,
        level: i64,
        sink: &mut NodeSink,
        used: &mut HashSet<i64>,
    ) {
        for node in nodes {
            let Some(p_id) = node.p_id else {
                sink.stats.missing_identifier += 1;
                debug!(
                    caption = node.caption.as_deref().unwrap_or_default(),
                    "structure node without pId dropped with its subtree"
                );
                continue;
            };
            used.insert(p_id);

            match self.visit(node, p_id, parent_path, level) {
                Visit::Flatten(children) => {
                    sink.stats.flattened_containers += 1;
                    self.walk(children, parent_path, level, sink, used);
                }
                Visit::Emit(draft, children) => {
                    let index = sink.emit(draft);
                    sink.stats.structural_nodes += 1;
                    let path = sink.node(index).path.clone();
                    self.walk(children, &path, level + 1, sink, used);
                }
            }
        }
    }

    fn visit<'n>(
        &self,
        node: &'n StructureNode,
        p_id: i64,
        parent_path: &str,
        level: i64,
    ) -> Visit<'n> {
        let caption = node.caption.as_deref().filter(|value| !value.is_empty());
        let node_type = self.paths.classify(caption.unwrap_or_default());

        if self.paths.should_skip(node_type) {
            return Visit::Flatten(&node.children);
        }

        let segment = self.paths.segment(caption, p_id);
        let entry = self.text_map.get(p_id);

        Visit::Emit(
            NodeDraft {
                path: join_path(parent_path, &segment),
                source_paragraph_id: Some(p_id),
                caption: caption.map(str::to_string),
                text: entry.map(|entry| entry.markdown.clone()),
                node_type,
                type_code: entry.and_then(|entry| entry.type_code),
                field_type: entry.and_then(|entry| entry.field_type),
                has_in_links: entry.is_some_and(|entry| entry.has_in_links),
                level,
                is_orphaned: false,
            },
            &node.children,
        )
    }
}
