use thiserror::Error;

/// Errors surfaced by the voting engine and the model persistence layer.
#[derive(Debug, Error)]
pub enum VotingError {
    /// Vote lookup for a class id that never received a vote.
    #[error("no votes found for class id {0}")]
    UnknownClass(u32),

    /// Malformed or missing sections in persisted model state.
    #[error("model data error: {0}")]
    Format(String),

    /// Global features are enabled but absent from the loaded model.
    #[error("global features enabled but not present in the model data; disable global features and try again")]
    GlobalFeaturesMissing,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("model document error: {0}")]
    Json(#[from] serde_json::Error),
}
