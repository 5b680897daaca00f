use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolutionStoreError {
    #[error("solution store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("solution store data is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported snapshot version '{0}'")]
    UnsupportedVersion(String),

    #[error("solution '{0}' not found")]
    UnknownSolution(String),

    #[error("invalid solution candidate: {0}")]
    InvalidCandidate(String),

    #[error("solution '{id}' was already evolved into '{successor}'")]
    AlreadyEvolved { id: String, successor: String },
}
