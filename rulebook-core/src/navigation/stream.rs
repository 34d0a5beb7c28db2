//! Element Stream Flattener
//!
//! The rulebook export wraps runs of its pages in `<div>` containers to get a
//! two-column layout. Reading order is still document order, so the wrappers
//! are dissolved: their direct children are yielded where the wrapper stood.

use super::heading::{is_part_title, HeadingDetector};
use crate::dom::{Element, MarkupNode};
use std::slice;

/// Elements that never carry rulebook content.
const SKIPPED_TAGS: &[&str] = &["script", "style", "meta", "link", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Paragraph,
    Table,
    Other,
}

impl NodeKind {
    fn of(element: &Element) -> Self {
        match element.name.as_str() {
            "p" => NodeKind::Paragraph,
            "table" => NodeKind::Table,
            _ => NodeKind::Other,
        }
    }
}

/// One entry of the flattened stream. Borrowed from the document tree.
#[derive(Debug, Clone)]
pub struct ContentNode<'a> {
    pub element: &'a Element,
    pub kind: NodeKind,
    heading: Option<String>,
    text: String,
}

impl<'a> ContentNode<'a> {
    pub fn new(element: &'a Element, detector: &dyn HeadingDetector) -> Self {
        Self {
            element,
            kind: NodeKind::of(element),
            heading: detector.heading_text(element),
            text: element.text(),
        }
    }

    /// Section title if this node carries the heading sentinel.
    pub fn heading(&self) -> Option<&str> {
        self.heading.as_deref()
    }

    pub fn is_heading(&self) -> bool {
        self.heading.is_some()
    }

    /// `PART n: ...` paragraph, styled or not.
    pub fn is_part_title(&self) -> bool {
        is_part_title(self.element, &self.text)
    }

    /// Whitespace-collapsed text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn raw_text(&self) -> String {
        self.element.raw_text()
    }

    pub fn is_paragraph(&self) -> bool {
        self.kind == NodeKind::Paragraph
    }

    pub fn is_table(&self) -> bool {
        self.kind == NodeKind::Table
    }
}

/// Lazy flattening iterator over a body container.
pub struct Flatten<'a> {
    outer: slice::Iter<'a, MarkupNode>,
    wrapper: Option<slice::Iter<'a, MarkupNode>>,
    detector: &'a dyn HeadingDetector,
}

impl<'a> Flatten<'a> {
    fn content_element(node: &'a MarkupNode) -> Option<&'a Element> {
        match node {
            MarkupNode::Element(el) if !SKIPPED_TAGS.contains(&el.name.as_str()) => Some(el),
            _ => None,
        }
    }
}

impl<'a> Iterator for Flatten<'a> {
    type Item = ContentNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(wrapper) = self.wrapper.as_mut() {
                if let Some(el) = wrapper.by_ref().find_map(Self::content_element) {
                    return Some(ContentNode::new(el, self.detector));
                }
                self.wrapper = None;
            }

            let el = Self::content_element(self.outer.next()?);
            match el {
                Some(el) if el.is("div") => self.wrapper = Some(el.children.iter()),
                Some(el) => return Some(ContentNode::new(el, self.detector)),
                None => {}
            }
        }
    }
}

/// Flatten `body` into reading order. Calling it again restarts the pass.
pub fn flatten<'a>(body: &'a Element, detector: &'a dyn HeadingDetector) -> Flatten<'a> {
    Flatten {
        outer: body.children.iter(),
        wrapper: None,
        detector,
    }
}
