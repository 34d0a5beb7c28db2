// Preprocessor abstraction for rulebook loading
//
// This module defines the boundary between markup parsing (bytes -> tree) and
// the extraction core (tree -> record sets). Everything after this point works
// with dom::Element and is parser-agnostic.

use crate::dom::Element;
use crate::error::RulebookError;
use anyhow::Result;
use std::path::Path;

/// Preprocessor trait - converts a rulebook export to an owned element tree
pub trait Preprocessor {
    /// Parse raw markup bytes into the document root element.
    fn parse_markup(&self, markup: &[u8]) -> Result<Element>;

    /// Convenience method: read and parse a file
    fn process_file(&self, input: &Path) -> Result<Element> {
        let bytes = std::fs::read(input)?;
        self.parse_markup(&bytes)
    }

    /// Locate the top-level body container the flattener walks.
    fn body<'a>(&self, root: &'a Element) -> Result<&'a Element> {
        if root.is("body") {
            return Ok(root);
        }
        root.find_first("body")
            .ok_or_else(|| RulebookError::MissingBody.into())
    }

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}
