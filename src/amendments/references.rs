//! Stateful extraction of target references from amendment prose.
//!
//! An amendment often names its anchor once ("В чл. 151:") and then lists
//! changes that only mention the finer components ("2. в ал. 3 ..."). The
//! [`ReferenceContext`] carries the anchor across lines of one amendment.

use std::collections::HashSet;

use regex::{Captures, Regex};
use tracing::debug;

use super::types::Target;
use crate::error::CoreResult;

/// Reference slots accumulated while reading one amendment.
///
/// Article and section are exclusive; setting any slot clears the finer ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceContext {
    article: Option<String>,
    section: Option<String>,
    paragraph: Option<String>,
    point: Option<String>,
    letter: Option<String>,
}

impl ReferenceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_article(&mut self, number: &str) {
        *self = Self {
            article: Some(number.to_string()),
            ..Self::default()
        };
    }

    pub fn set_section(&mut self, number: &str) {
        *self = Self {
            section: Some(number.to_string()),
            ..Self::default()
        };
    }

    pub fn set_paragraph(&mut self, number: &str) {
        self.paragraph = Some(number.to_string());
        self.point = None;
        self.letter = None;
    }

    pub fn set_point(&mut self, number: &str) {
        self.point = Some(number.to_string());
        self.letter = None;
    }

    pub fn set_letter(&mut self, letter: &str) {
        self.letter = Some(letter.to_string());
    }

    /// Finer components only attach once an article or § is known.
    pub fn is_anchored(&self) -> bool {
        self.article.is_some() || self.section.is_some()
    }

    /// Renders the current context, or `None` when every slot is empty.
    pub fn snapshot(&self) -> Option<Target> {
        let mut target = Target {
            article: self.article.as_ref().map(|number| format!("чл. {number}")),
            section: None,
            paragraph: self.paragraph.as_ref().map(|number| format!("ал. {number}")),
            point: self.point.as_ref().map(|number| format!("т. {number}")),
            letter: self.letter.as_ref().map(|letter| format!("буква \"{letter}\"")),
            path: String::new(),
        };
        if target.article.is_none() {
            target.section = self.section.as_ref().map(|number| format!("§ {number}"));
        }

        let components: Vec<&str> = [
            target.article.as_deref().or(target.section.as_deref()),
            target.paragraph.as_deref(),
            target.point.as_deref(),
            target.letter.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if components.is_empty() {
            return None;
        }
        target.path = components.join(" > ");
        Some(target)
    }
}

/// Named reference matchers, tried in declaration order within each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceRule {
    /// "В чл. N[, ал. N][, т. N][, буква "x"]" in one line.
    CompoundArticle,
    /// "В § N[, т. N]".
    CompoundSection,
    Article,
    Section,
    Paragraph,
    Point,
    Letter,
}

impl ReferenceRule {
    pub const COMPOUND: [ReferenceRule; 2] =
        [ReferenceRule::CompoundArticle, ReferenceRule::CompoundSection];

    pub const INCREMENTAL: [ReferenceRule; 5] = [
        ReferenceRule::Article,
        ReferenceRule::Section,
        ReferenceRule::Paragraph,
        ReferenceRule::Point,
        ReferenceRule::Letter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReferenceRule::CompoundArticle => "compound_article",
            ReferenceRule::CompoundSection => "compound_section",
            ReferenceRule::Article => "article",
            ReferenceRule::Section => "section",
            ReferenceRule::Paragraph => "paragraph",
            ReferenceRule::Point => "point",
            ReferenceRule::Letter => "letter",
        }
    }
}

#[derive(Debug)]
pub struct ReferenceMatcher {
    compound_article: Regex,
    compound_section: Regex,
    article: Regex,
    section: Regex,
    paragraph: Regex,
    point: Regex,
    letter: Regex,
    modification: Regex,
}

impl ReferenceMatcher {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            compound_article: Regex::new(concat!(
                r"(?i)В\s+чл\.\s*(\d+[а-я]?)",
                r"(?:[^,]*?(?:,\s*)?(?:в\s+таблицата\s+към\s+)?ал\.\s*(\d+[а-я]?))?",
                r"(?:[^,]*?(?:,\s*)?т\.\s*(\d+[а-я]?))?",
                r#"(?:[^,]*?(?:,\s*)?буква\s*["'„“]([а-я])["'“”])?"#,
            ))?,
            compound_section: Regex::new(r"(?i)В\s+§\s*(\d+[а-я]?)(?:,\s*т\.\s*(\d+[а-я]?))?")?,
            article: Regex::new(r"(?i)В\s+чл\.\s*(\d+[а-я]?)")?,
            section: Regex::new(r"(?i)(?:В\s+)?§\s*(\d+[а-я]?)")?,
            paragraph: Regex::new(r"(?i)(?:В\s+)?ал\.\s*(\d+[а-я]?)")?,
            point: Regex::new(r"(?i)т\.\s*(\d+[а-я]?)")?,
            letter: Regex::new(r#"(?i)буква\s*["'„“]([а-я])["'“”]"#)?,
            modification: Regex::new(concat!(
                r"(?i)думите.*се\s+заменят",
                r"|се\s+заличава",
                r"|се\s+отменя",
                r"|се\s+изменя",
                r"|се\s+добавя",
                r"|се\s+поставя",
                r"|създават\s+се",
                r"|се\s+създава",
            ))?,
        })
    }

    /// Lines that describe the change itself and name no structure.
    pub fn is_modification_text(&self, line: &str) -> bool {
        self.modification.is_match(line)
    }

    /// Applies one rule to `line`. Returns whether the context changed and a
    /// target should be committed.
    pub fn apply(&self, rule: ReferenceRule, line: &str, context: &mut ReferenceContext) -> bool {
        match rule {
            ReferenceRule::CompoundArticle => {
                let Some(captures) = self.compound_article.captures(line) else {
                    return false;
                };
                context.set_article(&captures[1]);
                if let Some(paragraph) = group(&captures, 2) {
                    context.set_paragraph(paragraph);
                }
                if let Some(point) = group(&captures, 3) {
                    context.set_point(point);
                }
                if let Some(letter) = group(&captures, 4) {
                    context.set_letter(letter);
                }
                true
            }
            ReferenceRule::CompoundSection => {
                let Some(captures) = self.compound_section.captures(line) else {
                    return false;
                };
                context.set_section(&captures[1]);
                if let Some(point) = group(&captures, 2) {
                    context.set_point(point);
                }
                true
            }
            ReferenceRule::Article => match first_group(&self.article, line) {
                Some(number) => {
                    context.set_article(number);
                    true
                }
                None => false,
            },
            ReferenceRule::Section => match first_group(&self.section, line) {
                Some(number) => {
                    context.set_section(number);
                    true
                }
                None => false,
            },
            ReferenceRule::Paragraph => match first_group(&self.paragraph, line) {
                Some(number) if context.is_anchored() => {
                    context.set_paragraph(number);
                    true
                }
                _ => false,
            },
            ReferenceRule::Point => match first_group(&self.point, line) {
                Some(number) if context.is_anchored() => {
                    context.set_point(number);
                    true
                }
                _ => false,
            },
            ReferenceRule::Letter => match first_group(&self.letter, line) {
                Some(letter) if context.is_anchored() => {
                    context.set_letter(letter);
                    true
                }
                _ => false,
            },
        }
    }

    /// Processes one trimmed, non-empty line.
    ///
    /// A compound match handles the whole line. Otherwise change descriptions
    /// are skipped, and each incremental rule that matches commits its own
    /// target, so one line can yield progressively narrower targets.
    pub fn process_line(&self, line: &str, context: &mut ReferenceContext, targets: &mut Vec<Target>) {
        let mut handled = false;
        for rule in ReferenceRule::COMPOUND {
            if self.apply(rule, line, context) {
                debug!(rule = rule.name(), line, "reference matched");
                targets.extend(context.snapshot());
                handled = true;
            }
        }
        if handled || self.is_modification_text(line) {
            return;
        }

        for rule in ReferenceRule::INCREMENTAL {
            if self.apply(rule, line, context) {
                debug!(rule = rule.name(), line, "reference matched");
                targets.extend(context.snapshot());
            }
        }
    }

    /// Extracts the targets of one amendment body, with a fresh context.
    pub fn extract_targets(&self, content: &str) -> Vec<Target> {
        let mut context = ReferenceContext::new();
        let mut targets = Vec::new();

        for line in content.lines().map(str::trim).filter(|line| !line.is_empty()) {
            self.process_line(line, &mut context, &mut targets);
        }

        dedup_by_path(targets)
    }
}

fn group<'t>(captures: &Captures<'t>, index: usize) -> Option<&'t str> {
    captures
        .get(index)
        .map(|value| value.as_str())
        .filter(|value| !value.is_empty())
}

fn first_group<'t>(pattern: &Regex, line: &'t str) -> Option<&'t str> {
    pattern
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str())
}

/// Keeps the first target for each distinct path.
pub fn dedup_by_path(targets: Vec<Target>) -> Vec<Target> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|target| seen.insert(target.path.clone()))
        .collect()
}
