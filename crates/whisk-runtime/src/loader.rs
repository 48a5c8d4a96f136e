use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use crate::error::RuntimeError;

/// One value returned by an action invocation.
///
/// The lifecycle layer requires exactly one [`ReturnValue::Json`] per run;
/// anything the runtime cannot read back as JSON is surfaced as
/// [`ReturnValue::Opaque`] so the caller can reject it with the platform's
/// not-a-dictionary error instead of a 200.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    Json(serde_json::Value),
    Opaque(String),
}

/// A loaded action program, ready for repeated invocation.
///
/// Implementations must be safe to invoke concurrently: the proxy holds a
/// single program for the life of the container and does not serialize
/// `run` calls.
#[async_trait]
pub trait Program: Send + Sync + std::fmt::Debug {
    /// Invoke `entry_point` with the given JSON arguments.
    ///
    /// `env` is the per-invocation activation context (`__OW_*` pairs); it
    /// must be visible to the action as ambient environment without touching
    /// the host process environment.
    async fn invoke(
        &self,
        entry_point: &str,
        args: &[serde_json::Value],
        env: &HashMap<String, String>,
    ) -> Result<Vec<ReturnValue>, RuntimeError>;
}

/// Loads a staged artifact into an executable [`Program`].
#[async_trait]
pub trait ProgramLoader: Send + Sync {
    async fn load(&self, artifact: &Path) -> Result<Box<dyn Program>, RuntimeError>;
}
