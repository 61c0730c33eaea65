//! HTML rendering and parsing for the reference engine.
//!
//! Rendering produces one `<div>` per line (list lines grouped into `<ol>` /
//! `<ul>`), with inline runs wrapped in `a`, `span`, `b`, `i`, `u`, `s` in that
//! order. Parsing accepts the same vocabulary plus common aliases (`strong`,
//! `em`, `p`, `del`) and ignores everything else but its text.

use pulldown_cmark_escape::{FmtWriter, escape_href, escape_html};
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::EngineError;
use crate::formats::{self, Attributes};
use crate::{Delta, FormatValue};

use super::{Content, Piece};

/// Markup of a document with a single empty line.
pub const EMPTY_LINE_HTML: &str = "<div><br></div>";

/// Render pieces (ending with a newline) as HTML.
pub(crate) fn render(pieces: &[Piece]) -> String {
    let mut out = String::new();
    let mut open_list: Option<&'static str> = None;

    for (line, line_attrs) in lines(pieces) {
        let list_tag = if line_attrs.is_active(formats::LIST) {
            Some("ol")
        } else if line_attrs.is_active(formats::BULLET) {
            Some("ul")
        } else {
            None
        };

        if open_list != list_tag {
            if let Some(tag) = open_list {
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            if let Some(tag) = list_tag {
                out.push('<');
                out.push_str(tag);
                out.push('>');
            }
            open_list = list_tag;
        }

        let block = if list_tag.is_some() { "li" } else { "div" };
        out.push('<');
        out.push_str(block);
        if let Some(align) = line_attrs.get(formats::ALIGN).and_then(FormatValue::as_str) {
            out.push_str(" style=\"text-align: ");
            push_escaped(&mut out, align);
            out.push_str(";\"");
        }
        out.push('>');

        if line.is_empty() {
            out.push_str("<br>");
        } else {
            for (run, attrs) in runs(line) {
                push_run(&mut out, run, attrs);
            }
        }

        out.push_str("</");
        out.push_str(block);
        out.push('>');
    }

    if let Some(tag) = open_list {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
    out
}

/// Split pieces into (line content, line attributes) pairs.
fn lines(pieces: &[Piece]) -> impl Iterator<Item = (&[Piece], &Attributes)> {
    pieces
        .split_inclusive(|p| p.content == Content::Char('\n'))
        .filter_map(|line| {
            let (newline, content) = line.split_last()?;
            Some((content, &newline.attrs))
        })
}

/// Group consecutive pieces with equal attributes.
fn runs(line: &[Piece]) -> Vec<(&[Piece], &Attributes)> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=line.len() {
        if i == line.len() || line[i].attrs != line[start].attrs {
            out.push((&line[start..i], &line[start].attrs));
            start = i;
        }
    }
    out
}

fn push_run(out: &mut String, run: &[Piece], attrs: &Attributes) {
    let mut closers: Vec<&str> = Vec::new();

    if let Some(href) = attrs.get(formats::LINK).and_then(FormatValue::as_str) {
        out.push_str("<a href=\"");
        let _ = escape_href(FmtWriter(&mut *out), href);
        out.push_str("\">");
        closers.push("</a>");
    }

    let mut style = String::new();
    for (name, property) in [
        (formats::COLOR, "color"),
        (formats::BACKGROUND, "background-color"),
        (formats::FONT, "font-family"),
        (formats::SIZE, "font-size"),
    ] {
        if let Some(value) = attrs.get(name).and_then(FormatValue::as_str) {
            style.push_str(property);
            style.push_str(": ");
            style.push_str(value);
            style.push(';');
        }
    }
    if !style.is_empty() {
        out.push_str("<span style=\"");
        push_escaped(out, &style);
        out.push_str("\">");
        closers.push("</span>");
    }

    for (name, tag) in [
        (formats::BOLD, "b"),
        (formats::ITALIC, "i"),
        (formats::UNDERLINE, "u"),
        (formats::STRIKE, "s"),
    ] {
        if attrs.is_active(name) {
            out.push('<');
            out.push_str(tag);
            out.push('>');
            closers.push(match tag {
                "b" => "</b>",
                "i" => "</i>",
                "u" => "</u>",
                _ => "</s>",
            });
        }
    }

    let mut text = String::new();
    for piece in run {
        match &piece.content {
            Content::Char(c) => text.push(*c),
            Content::Embed(embed) => {
                push_escaped(out, &text);
                text.clear();
                let src = attrs
                    .get(formats::IMAGE)
                    .and_then(FormatValue::as_str)
                    .or_else(|| embed.get(formats::IMAGE).and_then(Value::as_str))
                    .unwrap_or_default();
                out.push_str("<img src=\"");
                let _ = escape_href(FmtWriter(&mut *out), src);
                out.push_str("\">");
            }
        }
    }
    push_escaped(out, &text);

    for closer in closers.iter().rev() {
        out.push_str(closer);
    }
}

fn push_escaped(out: &mut String, text: &str) {
    // Writing into a String cannot fail.
    let _ = escape_html(FmtWriter(out), text);
}

#[derive(Debug)]
struct Tag {
    name: SmolStr,
    closing: bool,
    attrs: Vec<(SmolStr, String)>,
}

impl Tag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a `style` property, e.g. `text-align`.
    fn style(&self, property: &str) -> Option<String> {
        self.attr("style")?.split(';').find_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            (k.trim() == property).then(|| v.trim().to_string())
        })
    }
}

const BLOCK_TAGS: &[&str] = &[
    "div", "p", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
];

struct Block {
    name: SmolStr,
    lines_at_open: usize,
}

/// Builds a document delta from a stream of tags and text.
struct Parser {
    delta: Delta,
    inline: Vec<(SmolStr, SmolStr, FormatValue)>,
    blocks: Vec<Block>,
    lists: Vec<&'static str>,
    line_attrs: Attributes,
    line_open: bool,
    lines: usize,
}

impl Parser {
    fn new() -> Self {
        Self {
            delta: Delta::new(),
            inline: Vec::new(),
            blocks: Vec::new(),
            lists: Vec::new(),
            line_attrs: Attributes::new(),
            line_open: false,
            lines: 0,
        }
    }

    fn inline_attrs(&self) -> Attributes {
        let mut attrs = Attributes::new();
        for (_, name, value) in &self.inline {
            attrs.insert(name.clone(), value.clone());
        }
        attrs
    }

    fn end_line(&mut self) {
        let attrs = std::mem::take(&mut self.line_attrs);
        self.delta = std::mem::take(&mut self.delta).insert("\n", attrs);
        self.line_open = false;
        self.lines += 1;
    }

    fn text(&mut self, raw: &str) {
        if raw.trim().is_empty() && raw.contains('\n') {
            return;
        }
        let text = decode_entities(raw).replace('\n', " ");
        if text.is_empty() {
            return;
        }
        let attrs = self.inline_attrs();
        self.delta = std::mem::take(&mut self.delta).insert(text, attrs);
        self.line_open = true;
    }

    fn tag(&mut self, tag: Tag) {
        let name = tag.name.as_str();
        match (name, tag.closing) {
            ("br", _) => {
                if self.line_open {
                    self.end_line();
                }
            }
            ("ol", false) => self.lists.push(formats::LIST),
            ("ul", false) => self.lists.push(formats::BULLET),
            ("ol" | "ul", true) => {
                self.lists.pop();
            }
            ("img", _) => {
                let mut attrs = self.inline_attrs();
                attrs.insert(formats::IMAGE, tag.attr("src").unwrap_or_default());
                self.delta = std::mem::take(&mut self.delta).insert_embed(1, attrs);
                self.line_open = true;
            }
            (block, false) if BLOCK_TAGS.contains(&block) => {
                if self.line_open {
                    self.end_line();
                }
                if block == "li" {
                    let list = self.lists.last().copied().unwrap_or(formats::BULLET);
                    self.line_attrs.insert(list, true);
                }
                if let Some(align) = tag.style("text-align") {
                    self.line_attrs.insert(formats::ALIGN, align.as_str());
                }
                self.blocks.push(Block {
                    name: tag.name.clone(),
                    lines_at_open: self.lines,
                });
            }
            (block, true) if BLOCK_TAGS.contains(&block) => {
                let Some(pos) = self.blocks.iter().rposition(|b| b.name == block) else {
                    return;
                };
                let opened = self.blocks.remove(pos);
                if self.line_open || self.lines == opened.lines_at_open {
                    self.end_line();
                }
            }
            (_, false) => {
                let format = match name {
                    "b" | "strong" => Some((formats::BOLD, FormatValue::Bool(true))),
                    "i" | "em" => Some((formats::ITALIC, FormatValue::Bool(true))),
                    "u" => Some((formats::UNDERLINE, FormatValue::Bool(true))),
                    "s" | "strike" | "del" => Some((formats::STRIKE, FormatValue::Bool(true))),
                    "a" => tag.attr("href").map(|href| (formats::LINK, href.into())),
                    _ => None,
                };
                if let Some((format, value)) = format {
                    self.inline.push((tag.name.clone(), format.into(), value));
                }
            }
            (_, true) => {
                if let Some(pos) = self.inline.iter().rposition(|(t, _, _)| t == name) {
                    self.inline.remove(pos);
                }
            }
        }
    }

    fn finish(mut self) -> Delta {
        if self.line_open || self.lines == 0 {
            self.end_line();
        }
        self.delta
    }
}

/// Parse HTML into a document delta.
pub fn parse(html: &str) -> Result<Delta, EngineError> {
    let mut parser = Parser::new();
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        parser.text(&rest[..lt]);
        let after = &rest[lt + 1..];
        let gt = after
            .find('>')
            .ok_or_else(|| EngineError::Html(format!("unterminated tag at byte {lt}")))?;
        let raw = &after[..gt];
        if let Some(tag) = parse_tag(raw) {
            parser.tag(tag);
        }
        rest = &after[gt + 1..];
    }
    parser.text(rest);

    Ok(parser.finish())
}

/// Parse the inside of `<...>`. Comments and doctypes yield `None`.
fn parse_tag(raw: &str) -> Option<Tag> {
    let raw = raw.trim();
    if raw.starts_with('!') || raw.starts_with('?') {
        return None;
    }
    let (closing, raw) = match raw.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let raw = raw.trim_end_matches('/').trim();
    let name_end = raw.find(char::is_whitespace).unwrap_or(raw.len());
    let name: SmolStr = raw[..name_end].to_ascii_lowercase().into();
    if name.is_empty() {
        return None;
    }

    let mut attrs = Vec::new();
    let mut rest = raw[name_end..].trim_start();
    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key: SmolStr = rest[..key_end].to_ascii_lowercase().into();
        rest = rest[key_end..].trim_start();
        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let quote = after_eq.chars().next().filter(|c| *c == '"' || *c == '\'');
            match quote {
                Some(q) => {
                    let body = &after_eq[1..];
                    let end = body.find(q).unwrap_or(body.len());
                    rest = body.get(end + 1..).unwrap_or("").trim_start();
                    decode_entities(&body[..end])
                }
                None => {
                    let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                    rest = after_eq[end..].trim_start();
                    decode_entities(&after_eq[..end])
                }
            }
        } else {
            String::new()
        };
        if !key.is_empty() {
            attrs.push((key, value));
        }
    }

    Some(Tag {
        name,
        closing,
        attrs,
    })
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let decoded = after.find(';').and_then(|semi| {
            let entity = &after[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" | "#x27" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix('#')
                    .and_then(|n| n.parse::<u32>().ok())
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &after[consumed..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::pieces_from_delta;

    fn round(html: &str) -> String {
        let delta = parse(html).unwrap();
        render(&pieces_from_delta(&delta))
    }

    #[test]
    fn test_empty_document_renders_empty_line() {
        let delta = parse("").unwrap();
        assert_eq!(delta.text(), "\n");
        assert_eq!(render(&pieces_from_delta(&delta)), EMPTY_LINE_HTML);
    }

    #[test]
    fn test_empty_line_markup_is_one_line() {
        assert_eq!(parse(EMPTY_LINE_HTML).unwrap().text(), "\n");
    }

    #[test]
    fn test_paragraphs_become_lines() {
        let delta = parse("<p>one</p>\n<p>two</p>").unwrap();
        assert_eq!(delta.text(), "one\ntwo\n");
        assert_eq!(
            round("<p>one</p><p>two</p>"),
            "<div>one</div><div>two</div>"
        );
    }

    #[test]
    fn test_inline_formats() {
        let delta = parse("<strong>Hi</strong> <em>there</em>").unwrap();
        assert_eq!(delta.text(), "Hi there\n");
        assert_eq!(
            render(&pieces_from_delta(&delta)),
            "<div><b>Hi</b> <i>there</i></div>"
        );
    }

    #[test]
    fn test_lists_group() {
        let html = "<ul><li>a</li><li>b</li></ul><div>c</div>";
        assert_eq!(round(html), "<ul><li>a</li><li>b</li></ul><div>c</div>");
        assert_eq!(round("<ol><li>x</li></ol>"), "<ol><li>x</li></ol>");
    }

    #[test]
    fn test_links_and_alignment() {
        let html = r#"<div style="text-align: center;"><a href="https://example.com/?a=1&amp;b=2">go</a></div>"#;
        assert_eq!(
            round(html),
            r#"<div style="text-align: center;"><a href="https://example.com/?a=1&amp;b=2">go</a></div>"#
        );
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(round("a &lt; b &amp; c"), "<div>a &lt; b &amp; c</div>");
    }

    #[test]
    fn test_nested_blocks_do_not_double_break() {
        assert_eq!(parse("<div><div>a</div></div>").unwrap().text(), "a\n");
    }

    #[test]
    fn test_unterminated_tag_errors() {
        assert!(matches!(parse("<b"), Err(EngineError::Html(_))));
    }
}
