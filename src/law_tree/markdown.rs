//! HTML fragment → markdown conversion for `content_text` paragraphs.

use regex::Regex;
use tl::{Node, NodeHandle, Parser};

use crate::error::CoreResult;

pub trait MarkdownConverter {
    /// Converts a fragment, or `None` when the fragment cannot be parsed.
    fn try_convert(&self, html: &str) -> Option<String>;

    /// Tag-stripped plain text, used when `try_convert` gives up.
    fn fallback(&self, html: &str) -> String;

    fn convert(&self, html: &str) -> String {
        self.try_convert(html).unwrap_or_else(|| self.fallback(html))
    }
}

#[derive(Debug)]
pub struct HtmlMarkdownConverter {
    excess_newlines: Regex,
    residual_tag: Regex,
    script_or_style: Regex,
    whitespace: Regex,
    numeric_entity: Regex,
    leading_ordinal: Regex,
}

impl HtmlMarkdownConverter {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            excess_newlines: Regex::new(r"\n{3,}")?,
            residual_tag: Regex::new(r"(?s)<[^>]*>")?,
            script_or_style: Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>")?,
            whitespace: Regex::new(r"\s+")?,
            numeric_entity: Regex::new(r"&#(?:x([0-9a-fA-F]+)|([0-9]+));")?,
            leading_ordinal: Regex::new(r"^(\d+)\.")?,
        })
    }

    fn decode_entities(&self, text: &str) -> String {
        let named = text
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&apos;", "'");

        let numeric = self.numeric_entity.replace_all(&named, |captures: &regex::Captures| {
            let code = match (captures.get(1), captures.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, Some(decimal)) => decimal.as_str().parse::<u32>().ok(),
                _ => None,
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| captures[0].to_string())
        });

        // `&amp;` last so "&amp;lt;" stays literal.
        numeric.replace("&amp;", "&").replace('\u{00A0}', " ")
    }

    fn finish(&self, rendered: &str) -> String {
        let without_tags = self.residual_tag.replace_all(rendered, "");
        let collapsed = self.excess_newlines.replace_all(without_tags.trim(), "\n\n");
        collapsed.trim().to_string()
    }
}

impl MarkdownConverter for HtmlMarkdownConverter {
    fn try_convert(&self, html: &str) -> Option<String> {
        let dom = tl::parse(html, tl::ParserOptions::default()).ok()?;
        let parser = dom.parser();
        let mut writer = MarkdownWriter::new(self);

        for handle in dom.children() {
            writer.render(parser, *handle);
        }

        Some(self.finish(&writer.out))
    }

    fn fallback(&self, html: &str) -> String {
        let without_code = self.script_or_style.replace_all(html, "");
        let stripped = self.residual_tag.replace_all(&without_code, "");
        let decoded = self.decode_entities(&stripped);
        self.excess_newlines
            .replace_all(decoded.trim(), "\n\n")
            .into_owned()
    }
}

struct MarkdownWriter<'c> {
    converter: &'c HtmlMarkdownConverter,
    out: String,
    ordered: Vec<Option<usize>>,
}

impl<'c> MarkdownWriter<'c> {
    fn new(converter: &'c HtmlMarkdownConverter) -> Self {
        Self {
            converter,
            out: String::new(),
            ordered: Vec::new(),
        }
    }

    fn render(&mut self, parser: &Parser, handle: NodeHandle) {
        let Some(node) = handle.get(parser) else {
            return;
        };

        match node {
            Node::Raw(raw) => self.push_text(&raw.as_utf8_str()),
            Node::Comment(_) => {}
            Node::Tag(tag) => {
                let name = tag.name().as_utf8_str().to_ascii_lowercase();
                match name.as_str() {
                    "script" | "style" | "head" | "title" => {}
                    "br" => self.line_break(),
                    "strong" | "b" => self.wrap_inline(parser, tag, "**"),
                    "em" | "i" => self.wrap_inline(parser, tag, "*"),
                    "a" => {
                        let href = tag
                            .attributes()
                            .get("href")
                            .flatten()
                            .map(|value| value.as_utf8_str().to_string());
                        match href {
                            Some(href) if !href.is_empty() => {
                                let label = self.render_detached(parser, tag);
                                self.push_raw(&format!("[{}]({href})", label.trim()));
                            }
                            _ => self.render_children(parser, tag),
                        }
                    }
                    "ul" | "ol" => {
                        self.block_break();
                        self.ordered.push((name == "ol").then_some(0));
                        self.render_children(parser, tag);
                        self.ordered.pop();
                        self.block_break();
                    }
                    "li" => {
                        self.line_start();
                        let marker = match self.ordered.last_mut() {
                            Some(Some(counter)) => {
                                *counter += 1;
                                format!("{counter}. ")
                            }
                            _ => "- ".to_string(),
                        };
                        self.out.push_str(&marker);
                        self.render_children(parser, tag);
                        self.line_start();
                    }
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        let depth = name[1..].parse::<usize>().unwrap_or(1);
                        self.block_break();
                        self.out.push_str(&"#".repeat(depth));
                        self.out.push(' ');
                        self.render_children(parser, tag);
                        self.block_break();
                    }
                    "p" | "div" | "section" | "article" | "blockquote" | "table" | "tr"
                    | "pre" => {
                        self.block_break();
                        self.render_children(parser, tag);
                        self.block_break();
                    }
                    "td" | "th" => {
                        self.render_children(parser, tag);
                        self.push_raw(" ");
                    }
                    _ => self.render_children(parser, tag),
                }
            }
        }
    }

    fn render_children(&mut self, parser: &Parser, tag: &tl::HTMLTag) {
        for child in tag.children().top().iter() {
            self.render(parser, *child);
        }
    }

    fn render_detached(&mut self, parser: &Parser, tag: &tl::HTMLTag) -> String {
        let outer = std::mem::take(&mut self.out);
        self.render_children(parser, tag);
        std::mem::replace(&mut self.out, outer)
    }

    fn wrap_inline(&mut self, parser: &Parser, tag: &tl::HTMLTag, marker: &str) {
        let inner = self.render_detached(parser, tag);
        let inner = inner.trim();
        if inner.is_empty() {
            return;
        }
        self.push_raw(&format!("{marker}{inner}{marker}"));
    }

    fn push_text(&mut self, raw: &str) {
        let decoded = self.converter.decode_entities(raw);
        let collapsed = self.converter.whitespace.replace_all(&decoded, " ");
        let mut text = collapsed.as_ref();

        if self.at_line_start() {
            text = text.trim_start();
            if text.is_empty() {
                return;
            }
            // A paragraph opening with "12." would read as an ordered list.
            if self.converter.leading_ordinal.is_match(text) {
                let escaped = self
                    .converter
                    .leading_ordinal
                    .replace(text, "${1}\\.")
                    .into_owned();
                self.out.push_str(&escaped);
                return;
            }
        }

        self.out.push_str(text);
    }

    fn push_raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn trim_trailing_spaces(&mut self) {
        let trimmed = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(trimmed);
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        self.out.push('\n');
    }

    fn line_start(&mut self) {
        self.trim_trailing_spaces();
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }
}
