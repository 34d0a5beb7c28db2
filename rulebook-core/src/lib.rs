// Rulebook Core Library
//
// Turns a styled HTML rulebook export into normalized, cross-checked JSON
// record sets. Main interface is RulebookProcessor; the navigation, table
// and extractor layers are public for callers that drive stages themselves.

pub mod config;
pub mod dom;
pub mod error;
pub mod extractors;
pub mod navigation;
pub mod normalize;
pub mod preprocessors;
pub mod processor;
pub mod storage;
pub mod tables;
pub mod text;
pub mod types;
pub mod validation;

// Re-export main types and functions for easy use
pub use config::ExtractionConfig;
pub use error::RulebookError;
pub use extractors::{ExtractionEngine, Extractor, RecordSets};
pub use preprocessors::{HtmlPreprocessor, Preprocessor};
pub use processor::{RulebookProcessor, RunSummary, StepProfiler};
pub use storage::{FileStorage, MemoryStorage, RecordStorage};
pub use types::*;
pub use validation::{ValidationReport, ValidationStatus};
