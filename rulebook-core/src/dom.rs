//! Owned markup tree
//!
//! The preprocessor converts whatever the markup parser produces into this
//! small owned tree. Everything downstream (flattening, heading detection,
//! table reading) only needs ordered children, tag names, attribute lookup
//! and text extraction, so that is all this module exposes.

use crate::text::collapse_whitespace;

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Lowercase local tag name (`p`, `table`, `font`, ...)
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(MarkupNode::Text(text.to_string()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(MarkupNode::Element(child));
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Attribute value by name (names are stored lowercase).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Direct element children in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            MarkupNode::Element(el) => Some(el),
            MarkupNode::Text(_) => None,
        })
    }

    /// First descendant (excluding `self`) matching `predicate`, depth-first.
    pub fn find_descendant<P>(&self, predicate: P) -> Option<&Element>
    where
        P: Fn(&Element) -> bool + Copy,
    {
        for child in self.child_elements() {
            if predicate(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(predicate) {
                return Some(found);
            }
        }
        None
    }

    /// Every element named `name` in pre-order, `self` included.
    pub fn descendants_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.is(name) {
            out.push(self);
        }
        for child in self.child_elements() {
            child.descendants_named(name, out);
        }
    }

    /// First descendant element named `name`.
    pub fn find_first(&self, name: &str) -> Option<&Element> {
        self.child_elements().find_map(|child| {
            if child.is(name) {
                Some(child)
            } else {
                child.find_first(name)
            }
        })
    }

    /// Concatenated text with source whitespace intact; `<br>` becomes a newline.
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        self.push_raw_text(&mut out);
        out
    }

    fn push_raw_text(&self, out: &mut String) {
        if self.is("br") {
            out.push('\n');
            return;
        }
        for child in &self.children {
            match child {
                MarkupNode::Text(text) => out.push_str(text),
                MarkupNode::Element(el) => el.push_raw_text(out),
            }
        }
    }

    /// Whitespace-collapsed text.
    pub fn text(&self) -> String {
        collapse_whitespace(&self.raw_text())
    }

    /// Text pieces trimmed and joined with single spaces, so adjacent runs
    /// such as `<b>Cure</b><b>Light</b>` do not fuse into one word.
    pub fn joined_text(&self) -> String {
        let mut pieces = Vec::new();
        self.collect_text_pieces(&mut pieces);
        collapse_whitespace(&pieces.join(" "))
    }

    fn collect_text_pieces(&self, pieces: &mut Vec<String>) {
        for child in &self.children {
            match child {
                MarkupNode::Text(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        pieces.push(trimmed.to_string());
                    }
                }
                MarkupNode::Element(el) => el.collect_text_pieces(pieces),
            }
        }
    }
}
