//! Law tree processing: structure forest + text map → path-addressed nodes.

mod markdown;
mod orphans;
mod path_builder;
mod splitter;
mod text_map;
mod tree_builder;
mod types;

use tracing::debug;

pub use types::{LawNode, NodeType, ProcessStats};

use markdown::{HtmlMarkdownConverter, MarkdownConverter};
use path_builder::PathBuilder;
use splitter::SubElementSplitter;
use text_map::TextMap;
use tree_builder::TreeBuilder;
use types::NodeSink;

use crate::error::CoreResult;
use crate::model::LawContent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedLaw {
    pub nodes: Vec<LawNode>,
    pub stats: ProcessStats,
}

pub struct LawTreeProcessor<C = HtmlMarkdownConverter> {
    converter: C,
    paths: PathBuilder,
    splitter: SubElementSplitter,
}

impl LawTreeProcessor<HtmlMarkdownConverter> {
    pub fn new() -> CoreResult<Self> {
        Self::with_converter(HtmlMarkdownConverter::new()?)
    }
}

impl<C: MarkdownConverter> LawTreeProcessor<C> {
    pub fn with_converter(converter: C) -> CoreResult<Self> {
        Ok(Self {
            converter,
            paths: PathBuilder::new()?,
            splitter: SubElementSplitter::new()?,
        })
    }

    /// Builds the complete node list for one law.
    ///
    /// Each call owns a fresh `sort_order` counter and path set, so the
    /// processor can be shared across laws.
    pub fn process(&self, content: &LawContent) -> ProcessedLaw {
        let mut sink = NodeSink::new();

        let text_map = TextMap::build(&content.text, &self.converter, &mut sink.stats);
        let used = TreeBuilder::new(&self.paths, &text_map).build(&content.structure, &mut sink);
        orphans::recover_orphans(&self.paths, &text_map, &used, &mut sink);
        self.splitter.split_all(&self.paths, &mut sink);

        let (nodes, stats) = sink.into_parts();
        debug!(
            text_entries = text_map.len(),
            nodes = nodes.len(),
            structural = stats.structural_nodes,
            orphans = stats.orphan_nodes,
            split = stats.split_nodes,
            flattened = stats.flattened_containers,
            missing_identifier = stats.missing_identifier,
            markdown_fallbacks = stats.markdown_fallbacks,
            path_collisions = stats.path_collisions,
            "law tree processed"
        );

        ProcessedLaw { nodes, stats }
    }
}

#[cfg(test)]
mod tests;
