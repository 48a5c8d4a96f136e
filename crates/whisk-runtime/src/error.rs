use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Artifact load failed: {0}")]
    LoadFailed(String),

    #[error("Instantiation failed: {0}")]
    InstantiationFailed(String),

    #[error("Entry point not found: {0}")]
    EntryPointNotFound(String),

    #[error("Invocation failed: {0}")]
    InvocationFailed(String),

    #[error("Action reported failure: {0}")]
    GuestFailure(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
