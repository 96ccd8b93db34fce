//! Parser for amendment laws ("ЗАКОН за изменение и допълнение на ...").

mod references;
mod types;

use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;

pub use references::ReferenceMatcher;
pub use types::{Amendment, AmendmentDocument};

use crate::error::{CoreError, CoreResult};

const LAW_NAME_PREFIX: &str = "ЗАКОН за изменение и допълнение на";

#[derive(Debug)]
pub struct AmendmentParser {
    law_name: Regex,
    paragraph_marker: Regex,
    provisions_heading: Regex,
    motives_marker: Regex,
    blank_line: Regex,
    references: ReferenceMatcher,
}

impl AmendmentParser {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            law_name: Regex::new(
                r"(?is)ЗАКОН\s+за\s+изменение\s+и\s+допълнение\s+на\s+(.+?)(?:\n|\(обн\.|$)",
            )?,
            paragraph_marker: Regex::new(r"(?i)§\s*(\d+)\.")?,
            provisions_heading: Regex::new(r"(?i)Преходни\s+и\s+Заключителни")?,
            motives_marker: Regex::new(r"(?i)Мотиви:\s*")?,
            blank_line: Regex::new(r"\n[ \t\r]*\n")?,
            references: ReferenceMatcher::new()?,
        })
    }

    /// Reads and parses an amendment document. A missing file fails before
    /// anything is read.
    pub fn parse_file(&self, path: &Path) -> CoreResult<AmendmentDocument> {
        if !path.exists() {
            return Err(CoreError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let text = fs::read_to_string(path).map_err(|source| CoreError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.parse(&text))
    }

    pub fn parse(&self, text: &str) -> AmendmentDocument {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let target_law_name = self.target_law_name(text);

        let amendments: Vec<Amendment> = self
            .paragraphs(text)
            .into_iter()
            .map(|(paragraph_number, body)| self.amendment(paragraph_number, body))
            .collect();

        debug!(
            amendments = amendments.len(),
            targets = amendments.iter().map(|a| a.targets.len()).sum::<usize>(),
            "amendment document parsed"
        );

        AmendmentDocument {
            law_name: target_law_name
                .as_ref()
                .map(|name| format!("{LAW_NAME_PREFIX} {name}")),
            target_law_name,
            amendments,
        }
    }

    fn target_law_name(&self, text: &str) -> Option<String> {
        self.law_name
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|name| name.as_str().trim().to_string())
    }

    /// Splits the document into (§ number, body) pairs.
    ///
    /// A body runs to the next "§ N." marker, the "Преходни и Заключителни"
    /// heading or the end of the text. Scanning resumes at that boundary, so
    /// §s after the heading are picked up too.
    fn paragraphs<'t>(&self, text: &'t str) -> Vec<(u32, &'t str)> {
        let mut paragraphs = Vec::new();
        let mut position = 0;

        while let Some(captures) = self.paragraph_marker.captures_at(text, position) {
            let (Some(marker), Some(number)) = (captures.get(0), captures.get(1)) else {
                break;
            };

            let Some(first_char) = text[marker.end()..].chars().next() else {
                break;
            };

            // The body holds at least one character, which may be whitespace.
            let search_from = marker.end() + first_char.len_utf8();
            let boundary = [
                self.paragraph_marker.find_at(text, search_from),
                self.provisions_heading.find_at(text, search_from),
            ]
            .into_iter()
            .flatten()
            .map(|found| found.start())
            .min()
            .unwrap_or(text.len());

            match number.as_str().parse::<u32>() {
                Ok(paragraph_number) => {
                    paragraphs.push((paragraph_number, text[marker.end()..boundary].trim()));
                }
                Err(_) => debug!(marker = marker.as_str(), "paragraph number out of range"),
            }
            position = boundary;
        }

        paragraphs
    }

    fn amendment(&self, paragraph_number: u32, body: &str) -> Amendment {
        let (content, motives) = self.split_motives(body);
        let targets = self.references.extract_targets(&content);

        Amendment {
            paragraph_number,
            content,
            motives,
            targets,
        }
    }

    /// Removes the "Мотиви:" block, which runs to the next blank line or the
    /// end of the body.
    fn split_motives(&self, body: &str) -> (String, Option<String>) {
        let Some(marker) = self.motives_marker.find(body) else {
            return (body.to_string(), None);
        };

        let rest = &body[marker.end()..];
        let (motives, tail) = match self.blank_line.find(rest) {
            Some(blank) => (&rest[..blank.start()], &rest[blank.end()..]),
            None => (rest, ""),
        };

        let head = body[..marker.start()].trim();
        let tail = tail.trim();
        let content = match (head.is_empty(), tail.is_empty()) {
            (_, true) => head.to_string(),
            (true, false) => tail.to_string(),
            (false, false) => format!("{head}\n\n{tail}"),
        };

        let motives = motives.trim();
        (content, (!motives.is_empty()).then(|| motives.to_string()))
    }
}
