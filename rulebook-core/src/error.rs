use thiserror::Error;

/// Failure causes surfaced by the pipeline seams.
///
/// Document-shape problems (missing sections, irregular tables) are never
/// errors; they degrade to empty ranges or typed warnings on the records.
#[derive(Debug, Error)]
pub enum RulebookError {
    #[error("document has no <body> element")]
    MissingBody,

    #[error("{preprocessor} preprocessor does not read {path}")]
    UnsupportedInput { path: String, preprocessor: String },

    #[error("failed to load config from {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("storage failure for record set '{name}': {source}")]
    Storage {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown extractor stage: {0}")]
    UnknownExtractor(String),

    #[error("unknown warning tag: {0}")]
    UnknownWarning(String),

    #[error("failed to serialize record set '{name}': {source}")]
    Serialization {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
