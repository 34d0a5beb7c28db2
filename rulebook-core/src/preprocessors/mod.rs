//! Document Preprocessors
//!
//! This module provides the loading layer that turns a rulebook export into
//! the owned markup tree the extraction core navigates.
//!
//! ## Architecture
//!
//! ```text
//! Rulebook export (HTML)
//!     ↓
//! [Format-specific Preprocessor]
//!     ↓
//! Element tree (dom::Element)
//!     ↓
//! [Element Stream Flattener → Extractors]
//!     ↓
//! Record sets
//! ```
//!
//! ## Available Preprocessors
//!
//! - `HtmlPreprocessor` - HTML exports via html5ever

pub mod html;
pub mod preprocessor;

pub use html::HtmlPreprocessor;
pub use preprocessor::Preprocessor;
