use std::collections::HashSet;

use super::path_builder::PathBuilder;
use super::text_map::TextMap;
use super::types::{NodeDraft, NodeSink};

/// Emits one top-level node per text-map entry the structure never referenced.
pub fn recover_orphans(
    paths: &PathBuilder,
    text_map: &TextMap,
    used: &HashSet<i64>,
    sink: &mut NodeSink,
) {
    for entry in text_map.iter().filter(|entry| !used.contains(&entry.p_id)) {
        sink.emit(NodeDraft {
            path: paths.orphaned_path(entry.field_type, entry.type_code, entry.p_id),
            source_paragraph_id: Some(entry.p_id),
            caption: None,
            text: Some(entry.markdown.clone()),
            node_type: paths.classify_orphaned(entry.field_type),
            type_code: entry.type_code,
            field_type: entry.field_type,
            has_in_links: entry.has_in_links,
            level: 0,
            is_orphaned: true,
        });
        sink.stats.orphan_nodes += 1;
    }
}
