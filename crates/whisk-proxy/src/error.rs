//! Proxy error taxonomy and its HTTP mapping.
//!
//! Every failure crossing the `/init` or `/run` boundary is downgraded to
//! one of these variants with a canned message; diagnostic detail goes to
//! tracing only, never the wire.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::codec;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyError {
    /// Init is one-shot per container; the slot is already occupied.
    #[error("Cannot initialize the action more than once.")]
    AlreadyInitialized,

    /// The init payload did not declare `binary: true`; only precompiled
    /// artifacts are supported.
    #[error("The action failed to generate or locate a binary. See logs for details.")]
    BinaryArtifactRequired,

    /// Base64 decode, temp-file write, or runtime load failed.
    #[error("The action failed to generate or locate a binary. See logs for details.")]
    ArtifactLoadFailed,

    /// The init payload is missing the code/main fields.
    #[error("Missing main/no code to execute.")]
    MissingEntryPoint,

    #[error("Function not initialized")]
    NotInitialized,

    #[error("Invalid input parameters for action run")]
    InvalidInput,

    /// Wraps any runtime exception raised during invocation.
    #[error("Running Function failed")]
    InvocationFailed,

    /// The action returned zero, multiple, or non-JSON values.
    #[error("The action did not return a dictionary.")]
    NonJsonResult,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::AlreadyInitialized => StatusCode::BAD_GATEWAY,
            ProxyError::BinaryArtifactRequired
            | ProxyError::ArtifactLoadFailed
            | ProxyError::MissingEntryPoint => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::NotInitialized
            | ProxyError::InvalidInput
            | ProxyError::InvocationFailed
            | ProxyError::NonJsonResult => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        codec::envelope(self.status(), codec::RESPONSE_ERROR, &self.to_string())
    }
}
