//! Caption classification and path segments for law nodes.
//!
//! Regular provisions nest as чл. → ал. → т. → буква; transitional, final
//! and supplementary provisions use § in place of чл.

use regex::Regex;

use super::types::NodeType;
use crate::error::CoreResult;

#[derive(Debug)]
pub struct PathBuilder {
    section_paragraph: Regex,
    leading_point: Regex,
    non_alphanumeric: Regex,
}

impl PathBuilder {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            section_paragraph: Regex::new(r"^§\s*(\d+)([a-zа-я]?)")?,
            leading_point: Regex::new(r"^\d+\.")?,
            non_alphanumeric: Regex::new(r"[^\p{L}\p{N}]+")?,
        })
    }

    /// Classifies a structural caption. The first matching rule wins.
    pub fn classify(&self, caption: &str) -> NodeType {
        let upper = caption.to_uppercase();

        if upper.contains("ГЛАВА") || upper.starts_with("ГЛ.") {
            return NodeType::Chapter;
        }

        if upper.contains("РАЗДЕЛ") || upper.starts_with("РАЗД.") {
            return NodeType::Section;
        }

        if upper.contains("ПРЕХОДНИ")
            || upper.contains("ЗАКЛЮЧИТЕЛНИ")
            || upper.contains("ДОПЪЛНИТЕЛНИ")
        {
            return NodeType::TransitionalSection;
        }

        if upper.starts_with('§') {
            return NodeType::TransitionalParagraph;
        }

        // "ЧЛ." must precede "Т." since article captions can contain it.
        if upper.contains("ЧЛ.") {
            return NodeType::Article;
        }

        if upper.contains("АЛ.") {
            return NodeType::Paragraph;
        }

        if upper.contains("Т.") || self.leading_point.is_match(caption) {
            return NodeType::Point;
        }

        NodeType::Unknown
    }

    /// Chapters and sections stay out of the address space; their children
    /// attach to the enclosing path.
    pub fn should_skip(&self, node_type: NodeType) -> bool {
        matches!(node_type, NodeType::Chapter | NodeType::Section)
    }

    pub fn segment(&self, caption: Option<&str>, fallback_id: i64) -> String {
        let Some(caption) = caption.filter(|value| !value.is_empty()) else {
            return fallback_segment(fallback_id);
        };

        if let Some(captures) = self.section_paragraph.captures(caption) {
            let number = &captures[1];
            let letter = captures
                .get(2)
                .map(|value| value.as_str().to_uppercase())
                .unwrap_or_default();
            return format!("§{number}{letter}");
        }

        let upper = caption.to_uppercase();

        if upper.contains("ДОПЪЛНИТЕЛНИ") {
            return "ДОП".to_string();
        }

        match (upper.contains("ПРЕХОДНИ"), upper.contains("ЗАКЛЮЧИТЕЛНИ")) {
            (true, true) => return "ПЗР".to_string(),
            (true, false) => return "ПРЕХОДНИ".to_string(),
            (false, true) => return "ЗАКЛЮЧИТЕЛНИ".to_string(),
            (false, false) => {}
        }

        let compact = self.non_alphanumeric.replace_all(&upper, "");
        if compact.is_empty() {
            fallback_segment(fallback_id)
        } else {
            compact.into_owned()
        }
    }

    pub fn orphaned_path(
        &self,
        field_type: Option<i64>,
        type_code: Option<i64>,
        fallback_id: i64,
    ) -> String {
        match field_type.unwrap_or(0) {
            1 => "ЗАГЛАВИЕ".to_string(),
            2 => "ПУБЛ_ИНФО".to_string(),
            9 => format!("ЗАБЕЛЕЖКА_{fallback_id}"),
            _ => format!("ORPHAN_{}_{}", type_code.unwrap_or(0), fallback_id),
        }
    }

    pub fn classify_orphaned(&self, field_type: Option<i64>) -> NodeType {
        match field_type.unwrap_or(0) {
            1 => NodeType::Title,
            2 => NodeType::PublicationInfo,
            9 => NodeType::Note,
            _ => NodeType::Metadata,
        }
    }

    /// `number` may carry a Cyrillic suffix: "5а" becomes "АЛ5А".
    pub fn alinea_path(&self, parent_path: &str, number: &str) -> String {
        format!("{parent_path}/АЛ{}", number.to_uppercase())
    }

    pub fn point_path(&self, parent_path: &str, number: &str) -> String {
        let number = number
            .parse::<u64>()
            .map(|value| value.to_string())
            .unwrap_or_else(|_| number.to_string());
        format!("{parent_path}/Т{number}")
    }

    pub fn letter_path(&self, parent_path: &str, letter: &str) -> String {
        format!("{parent_path}/БУКВА_{}", letter.to_uppercase())
    }
}

fn fallback_segment(fallback_id: i64) -> String {
    format!("NODE_{fallback_id}")
}

pub fn join_path(parent_path: &str, segment: &str) -> String {
    if parent_path.is_empty() {
        segment.to_string()
    } else {
        format!("{parent_path}/{segment}")
    }
}
