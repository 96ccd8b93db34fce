use std::collections::HashMap;

use tracing::debug;

use super::markdown::MarkdownConverter;
use super::types::ProcessStats;
use crate::model::ContentText;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub p_id: i64,
    pub markdown: String,
    pub type_code: Option<i64>,
    pub field_type: Option<i64>,
    pub has_in_links: bool,
}

/// `content_text` paragraphs keyed by `pId`, in first-seen order.
#[derive(Debug, Default)]
pub struct TextMap {
    entries: Vec<TextEntry>,
    index: HashMap<i64, usize>,
}

impl TextMap {
    pub fn build<C: MarkdownConverter>(
        content: &ContentText,
        converter: &C,
        stats: &mut ProcessStats,
    ) -> Self {
        let mut map = Self::default();

        for paragraph in &content.paragraphs {
            let (Some(p_id), Some(html)) = (paragraph.p_id, paragraph.text.as_deref()) else {
                continue;
            };

            let markdown = match converter.try_convert(html) {
                Some(markdown) => markdown,
                None => {
                    stats.markdown_fallbacks += 1;
                    debug!(p_id, "html conversion failed, using stripped text");
                    converter.fallback(html)
                }
            };

            map.insert(TextEntry {
                p_id,
                markdown,
                type_code: paragraph.type_code,
                field_type: paragraph.field_type,
                has_in_links: paragraph.has_in_links.unwrap_or(false),
            });
        }

        map
    }

    /// A repeated `pId` replaces the earlier data but keeps its position.
    pub fn insert(&mut self, entry: TextEntry) {
        match self.index.get(&entry.p_id) {
            Some(&position) => self.entries[position] = entry,
            None => {
                self.index.insert(entry.p_id, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, p_id: i64) -> Option<&TextEntry> {
        self.index.get(&p_id).map(|&position| &self.entries[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
