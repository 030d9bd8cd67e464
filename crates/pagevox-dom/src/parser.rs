//! Forgiving HTML parser
//!
//! Recursive-descent parser that builds straight into the document arena.
//! Whitespace-only text nodes are preserved: the reader relies on them for
//! positional continuity between speakable runs. Unclosed or misnested tags
//! degrade to whatever tree could be built.

use crate::node::{Document, NodeId};
use tracing::debug;

pub struct HtmlParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> HtmlParser<'a> {
    pub fn new(html: &'a str) -> Self {
        Self { input: html, pos: 0 }
    }

    /// Parse the input into a document. A missing `<html>` element gets
    /// synthesized around the parsed content so the tree always has a root.
    pub fn parse(mut self) -> Document {
        let mut doc = Document::new();
        let top = self.parse_nodes(&mut doc);

        let html = top
            .iter()
            .copied()
            .find(|&id| doc.tag_name(id) == Some("html"));

        match html {
            Some(root) => doc.set_root(root),
            None => {
                let root = doc.create_element("html");
                let body = doc.create_element("body");
                doc.append_child(root, body);
                for id in top {
                    doc.append_child(body, id);
                }
                doc.set_root(root);
            }
        }

        debug!(nodes = doc.len(), "parsed document");
        doc
    }

    fn parse_nodes(&mut self, doc: &mut Document) -> Vec<NodeId> {
        let mut nodes = Vec::new();

        while !self.eof() {
            if self.starts_with("<!--") {
                if let Some(comment) = self.parse_comment(doc) {
                    nodes.push(comment);
                }
                continue;
            }

            if self.starts_with_insensitive("<!doctype") {
                self.consume_tag_remainder();
                continue;
            }

            if self.starts_with("</") {
                break;
            }

            if self.starts_with("<") {
                if let Some(element) = self.parse_element(doc) {
                    nodes.push(element);
                }
                continue;
            }

            if let Some(text) = self.parse_text(doc) {
                nodes.push(text);
            }
        }

        nodes
    }

    fn parse_element(&mut self, doc: &mut Document) -> Option<NodeId> {
        self.consume_char(); // '<'

        let tag = self.parse_tag_name();
        if tag.is_empty() {
            return None;
        }

        let id = doc.create_element(&tag);

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            if let Some((name, value)) = self.parse_attribute() {
                doc.set_attribute(id, &name, &value);
            }
        }

        if self.starts_with("/>") {
            self.consume_char();
            self.consume_char();
            return Some(id);
        }
        if self.starts_with(">") {
            self.consume_char();
        }

        if is_void_tag(&tag) {
            return Some(id);
        }

        // script/style content is raw text, not markup
        if tag == "script" || tag == "style" {
            let content = self.parse_raw_text(&tag);
            if !content.is_empty() {
                let text = doc.create_text(&content);
                doc.append_child(id, text);
            }
            return Some(id);
        }

        let children = self.parse_nodes(doc);
        for child in children {
            doc.append_child(id, child);
        }

        self.consume_closing_tag();
        Some(id)
    }

    fn parse_tag_name(&mut self) -> String {
        let mut name = String::new();
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                name.push(self.consume_char());
            } else {
                break;
            }
        }
        name.to_lowercase()
    }

    fn parse_attribute(&mut self) -> Option<(String, String)> {
        let name = self.parse_attribute_name();
        if name.is_empty() {
            // skip whatever confused us, keep going
            if !self.eof() {
                self.consume_char();
            }
            return None;
        }

        self.skip_whitespace();
        if !self.starts_with("=") {
            // boolean attribute, e.g. `hidden`
            return Some((name, String::new()));
        }
        self.consume_char();
        self.skip_whitespace();

        Some((name, self.parse_attribute_value()))
    }

    fn parse_attribute_name(&mut self) -> String {
        let mut name = String::new();
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' || c == '.' {
                name.push(self.consume_char());
            } else {
                break;
            }
        }
        name.to_lowercase()
    }

    fn parse_attribute_value(&mut self) -> String {
        for quote in ['"', '\''] {
            if self.current_char() == quote {
                self.consume_char();
                let value = self.consume_until(quote);
                if !self.eof() {
                    self.consume_char();
                }
                return decode_entities(&value);
            }
        }

        let mut value = String::new();
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' || c == '/' {
                break;
            }
            value.push(self.consume_char());
        }
        decode_entities(&value)
    }

    fn parse_text(&mut self, doc: &mut Document) -> Option<NodeId> {
        let mut text = String::new();
        while !self.eof() && !self.starts_with("<") {
            text.push(self.consume_char());
        }
        if text.is_empty() {
            return None;
        }
        Some(doc.create_text(&decode_entities(&text)))
    }

    fn parse_comment(&mut self, doc: &mut Document) -> Option<NodeId> {
        for _ in 0..4 {
            self.consume_char();
        }
        let mut content = String::new();
        while !self.eof() {
            if self.starts_with("-->") {
                for _ in 0..3 {
                    self.consume_char();
                }
                break;
            }
            content.push(self.consume_char());
        }
        Some(doc.create_comment(&content))
    }

    fn parse_raw_text(&mut self, tag: &str) -> String {
        let end_tag = format!("</{}", tag);
        let mut content = String::new();
        while !self.eof() {
            if self.starts_with_insensitive(&end_tag) {
                break;
            }
            content.push(self.consume_char());
        }
        self.consume_closing_tag();
        content
    }

    fn consume_closing_tag(&mut self) {
        if !self.starts_with("</") {
            return;
        }
        self.consume_char();
        self.consume_char();
        self.consume_tag_remainder();
    }

    fn consume_tag_remainder(&mut self) {
        while !self.eof() && !self.starts_with(">") {
            self.consume_char();
        }
        if self.starts_with(">") {
            self.consume_char();
        }
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn consume_char(&mut self) -> char {
        let c = self.current_char();
        if !self.eof() {
            self.pos += c.len_utf8();
        }
        c
    }

    fn consume_until(&mut self, end: char) -> String {
        let mut result = String::new();
        while !self.eof() && self.current_char() != end {
            result.push(self.consume_char());
        }
        result
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.consume_char();
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn starts_with_insensitive(&self, s: &str) -> bool {
        let remaining = self.input[self.pos..].as_bytes();
        remaining.len() >= s.len() && remaining[..s.len()].eq_ignore_ascii_case(s.as_bytes())
    }
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input"
            | "link" | "meta" | "param" | "source" | "track" | "wbr"
    )
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '&' {
            result.push(c);
            continue;
        }

        let mut entity = String::new();
        let mut terminated = false;
        while let Some(&next) = chars.peek() {
            if next == ';' {
                chars.next();
                terminated = true;
                break;
            }
            if next.is_whitespace() || next == '&' || entity.len() > 10 {
                break;
            }
            entity.push(next);
            chars.next();
        }

        let decoded = match entity.as_str() {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            "minus" => Some('\u{2212}'),
            "mdash" => Some('\u{2014}'),
            "ndash" => Some('\u{2013}'),
            "hellip" => Some('\u{2026}'),
            s if s.starts_with('#') => {
                let num = if let Some(hex) = s.strip_prefix("#x").or_else(|| s.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).ok()
                } else {
                    s[1..].parse().ok()
                };
                num.and_then(char::from_u32)
            }
            _ => None,
        };

        match decoded {
            Some(c) => result.push(c),
            None => {
                result.push('&');
                result.push_str(&entity);
                if terminated {
                    result.push(';');
                }
            }
        }
    }

    result
}
