//! HTML Preprocessor
//!
//! Parses the rulebook's HTML export with html5ever into an `RcDom`, then
//! copies elements and text into the owned `dom::Element` tree. Comments,
//! doctypes and processing instructions are dropped.

use crate::dom::{Element, MarkupNode};
use crate::preprocessors::preprocessor::Preprocessor;
use anyhow::{anyhow, Result};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::path::Path;

#[derive(Debug, Default)]
pub struct HtmlPreprocessor;

impl HtmlPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for HtmlPreprocessor {
    fn parse_markup(&self, markup: &[u8]) -> Result<Element> {
        let dom = parse_document(RcDom::default(), ParseOpts::default())
            .from_utf8()
            .one(markup);

        let root = dom
            .document
            .children
            .borrow()
            .iter()
            .find_map(|child| match convert_node(child) {
                Some(MarkupNode::Element(el)) => Some(el),
                _ => None,
            })
            .ok_or_else(|| anyhow!("HTML document has no root element"))?;

        log::debug!(
            "Parsed HTML export: root <{}> with {} children",
            root.name,
            root.children.len()
        );
        Ok(root)
    }

    fn name(&self) -> &str {
        "html5ever"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "html" | "htm" | "xhtml"))
            .unwrap_or(false)
    }
}

fn convert_node(handle: &Handle) -> Option<MarkupNode> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let mut element = Element::new(&name.local);
            for attr in attrs.borrow().iter() {
                element
                    .attrs
                    .push((attr.name.local.to_ascii_lowercase().to_string(), attr.value.to_string()));
            }
            for child in handle.children.borrow().iter() {
                if let Some(node) = convert_node(child) {
                    element.children.push(node);
                }
            }
            Some(MarkupNode::Element(element))
        }
        NodeData::Text { contents } => Some(MarkupNode::Text(contents.borrow().to_string())),
        _ => None,
    }
}
