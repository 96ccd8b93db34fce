//! Extraction of алинеи, точки and букви embedded in article bodies.
//!
//! Markers are only recognised at the start of a block (after a blank line),
//! except алинеи, which also appear inline as " (N)" and are normalised to the
//! block form before splitting.

use regex::Regex;

use super::path_builder::PathBuilder;
use super::types::{NodeSink, NodeType, non_empty_text};
use crate::error::CoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Alinea,
    Point,
    Letter,
}

impl Layer {
    fn node_type(self) -> NodeType {
        match self {
            Layer::Alinea => NodeType::Paragraph,
            Layer::Point => NodeType::Point,
            Layer::Letter => NodeType::Letter,
        }
    }

    /// Layers that may appear inside a body of this layer, in detection order.
    fn nested(self) -> &'static [Layer] {
        match self {
            Layer::Alinea => &[Layer::Point, Layer::Letter],
            Layer::Point => &[Layer::Letter],
            Layer::Letter => &[],
        }
    }
}

const TOP_LEVEL: &[Layer] = &[Layer::Alinea, Layer::Point, Layer::Letter];

#[derive(Debug)]
pub struct SubElementSplitter {
    alinea_present: Regex,
    inline_alinea: Regex,
    alinea_marker: Regex,
    point_marker: Regex,
    letter_marker: Regex,
}

impl SubElementSplitter {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            alinea_present: Regex::new(r"(?:^|\s)\(\d+[а-я]?\)")?,
            inline_alinea: Regex::new(r"(?:^|\s+)\((\d+[а-я]?)\)")?,
            alinea_marker: Regex::new(r"\n\n\((\d+[а-я]?)\)")?,
            // Markdown output escapes "1." at block start as "1\.".
            point_marker: Regex::new(r"\n\n\s*(\d+)(?:\\\.|\.)")?,
            letter_marker: Regex::new(r"\n\n([а-я])\)")?,
        })
    }

    /// Splits every article and §-paragraph with a body, in `sort_order`.
    pub fn split_all(&self, paths: &PathBuilder, sink: &mut NodeSink) {
        let candidates: Vec<usize> = sink
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.node_type.is_splittable() && node.text.is_some())
            .map(|(index, _)| index)
            .collect();

        for index in candidates {
            self.split_node(paths, sink, index, TOP_LEVEL);
        }
    }

    fn split_node(&self, paths: &PathBuilder, sink: &mut NodeSink, index: usize, layers: &[Layer]) {
        let Some(text) = sink.node(index).text.clone() else {
            return;
        };

        let Some(layer) = layers.iter().copied().find(|layer| self.detect(*layer, &text)) else {
            return;
        };

        let normalized = match layer {
            Layer::Alinea => self.inline_alinea.replace_all(&text, "\n\n(${1})").into_owned(),
            _ => text,
        };
        let (intro, parts) = split_on_markers(self.marker(layer), &normalized);

        sink.set_text(index, non_empty_text(intro));

        for (label, body) in parts {
            let parent_path = sink.node(index).path.clone();
            let path = match layer {
                Layer::Alinea => paths.alinea_path(&parent_path, label),
                Layer::Point => paths.point_path(&parent_path, label),
                Layer::Letter => paths.letter_path(&parent_path, label),
            };
            let child = sink.emit_child(index, path, layer.node_type(), non_empty_text(body));
            self.split_node(paths, sink, child, layer.nested());
        }
    }

    fn detect(&self, layer: Layer, text: &str) -> bool {
        match layer {
            Layer::Alinea => {
                self.alinea_present.is_match(text) || self.alinea_marker.is_match(text)
            }
            Layer::Point => self.point_marker.is_match(text),
            Layer::Letter => self.letter_marker.is_match(text),
        }
    }

    fn marker(&self, layer: Layer) -> &Regex {
        match layer {
            Layer::Alinea => &self.alinea_marker,
            Layer::Point => &self.point_marker,
            Layer::Letter => &self.letter_marker,
        }
    }
}

/// Splits `text` at every match of `marker`, whose first group is the label.
/// Returns the text before the first marker and each (label, body) pair.
fn split_on_markers<'t>(marker: &Regex, text: &'t str) -> (&'t str, Vec<(&'t str, &'t str)>) {
    let mut intro_end = text.len();
    let mut heads: Vec<(usize, usize, &'t str)> = Vec::new();

    for captures in marker.captures_iter(text) {
        let (Some(whole), Some(label)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if heads.is_empty() {
            intro_end = whole.start();
        }
        heads.push((whole.start(), whole.end(), label.as_str()));
    }

    let parts = heads
        .iter()
        .enumerate()
        .map(|(position, &(_, body_start, label))| {
            let body_end = heads
                .get(position + 1)
                .map(|&(next_start, _, _)| next_start)
                .unwrap_or(text.len());
            (label, &text[body_start..body_end])
        })
        .collect();

    (&text[..intro_end], parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_markers_separates_intro_and_bodies() {
        let marker = Regex::new(r"\n\n([а-я])\)").unwrap();
        let (intro, parts) = split_on_markers(&marker, "Увод:\n\nа) първо;\n\nб) второ.");

        assert_eq!(intro, "Увод:");
        assert_eq!(parts, vec![("а", " първо;"), ("б", " второ.")]);
    }

    #[test]
    fn split_on_markers_without_match_keeps_text_as_intro() {
        let marker = Regex::new(r"\n\n([а-я])\)").unwrap();
        let (intro, parts) = split_on_markers(&marker, "Само текст.");

        assert_eq!(intro, "Само текст.");
        assert!(parts.is_empty());
    }

    #[test]
    fn point_marker_accepts_escaped_period() {
        let splitter = SubElementSplitter::new().unwrap();
        assert!(splitter.detect(Layer::Point, "Увод:\n\n1\\. първо"));
        assert!(splitter.detect(Layer::Point, "Увод:\n\n 2. второ"));
        assert!(!splitter.detect(Layer::Point, "Увод: 1. първо"));
    }

    #[test]
    fn alinea_detection_accepts_inline_and_block_forms() {
        let splitter = SubElementSplitter::new().unwrap();
        assert!(splitter.detect(Layer::Alinea, "Текст (1) първа"));
        assert!(splitter.detect(Layer::Alinea, "Текст\n\n(5а) първа"));
        assert!(splitter.detect(Layer::Alinea, "(1) в началото"));
        assert!(!splitter.detect(Layer::Alinea, "Текст(1) без интервал"));
    }
}
