use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Corpus artifacts could not be loaded: {0}")]
    CorpusLoad(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No images were indexed successfully")]
    EmptyCorpus,

    #[error("No index has been loaded; run a build or load an existing index first")]
    IndexNotLoaded,

    #[error("Captioning failed: {0}")]
    Captioning(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Another build is already running (lock: {0})")]
    BuildInProgress(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable kind, paired with the display message when a
    /// failure is reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::CorpusLoad(_) => "corpus_load",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::EmptyCorpus => "empty_corpus",
            Error::IndexNotLoaded => "index_not_loaded",
            Error::Captioning(_) => "captioning",
            Error::Translation(_) => "translation",
            Error::Embedding(_) => "embedding",
            Error::BuildInProgress(_) => "build_in_progress",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Storage(_) => "storage",
            Error::Io(_) => "io",
        }
    }

    /// Wrap any displayable backend error (tantivy, lance, arrow) as a storage failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Error::Storage(err.to_string())
    }

    pub fn corpus_load(err: impl std::fmt::Display) -> Self {
        Error::CorpusLoad(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_for_precondition_errors() {
        let kinds = [
            Error::IndexNotLoaded.kind(),
            Error::EmptyCorpus.kind(),
            Error::DimensionMismatch { expected: 384, actual: 3 }.kind(),
        ];
        assert_eq!(kinds, ["index_not_loaded", "empty_corpus", "dimension_mismatch"]);
    }

    #[test]
    fn dimension_mismatch_message_names_both_sizes() {
        let msg = Error::DimensionMismatch { expected: 384, actual: 512 }.to_string();
        assert!(msg.contains("384") && msg.contains("512"));
    }
}
