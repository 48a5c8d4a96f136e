//! One-shot action lifecycle.
//!
//! `ActionLifecycle` owns the container's single program slot: empty at
//! process start, filled by the first successful `/init`, read by every
//! `/run` thereafter, never replaced or cleared. The write lock is held
//! across the whole init transition, so a racing or duplicate init observes
//! an atomic check-and-set, never a read-then-write window.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tempfile::TempPath;
use tokio::sync::RwLock;
use whisk_runtime::{Program, ProgramLoader, ReturnValue};

use crate::context::InvocationContext;
use crate::error::ProxyError;
use crate::stager;

/// Well-known entry point, used unless init overrides it.
pub const DEFAULT_ENTRY_POINT: &str = "main";

/// The `value` object of an init request.
#[derive(Debug, Deserialize)]
pub struct InitValue {
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// The initialized program, held for the rest of the container's life.
struct LoadedAction {
    program: Box<dyn Program>,
    entry_point: String,
    /// Owns the staged artifact file; unlinked at process teardown.
    _artifact: TempPath,
}

pub struct ActionLifecycle {
    loader: Arc<dyn ProgramLoader>,
    slot: RwLock<Option<LoadedAction>>,
}

impl ActionLifecycle {
    pub fn new(loader: Arc<dyn ProgramLoader>) -> Self {
        Self {
            loader,
            slot: RwLock::new(None),
        }
    }

    pub async fn initialized(&self) -> bool {
        self.slot.read().await.is_some()
    }

    /// One-shot initialization: stage the artifact, load it, fill the slot.
    ///
    /// Stage and load failures leave the slot empty, so init may be retried;
    /// an occupied slot is rejected without touching the stored program.
    pub async fn init(&self, value: InitValue) -> Result<(), ProxyError> {
        let mut slot = self.slot.write().await;

        if slot.is_some() {
            tracing::warn!("Rejecting repeated init");
            return Err(ProxyError::AlreadyInitialized);
        }

        // Only precompiled binary artifacts are supported
        if !value.binary {
            return Err(ProxyError::BinaryArtifactRequired);
        }

        let code = value.code.as_deref().ok_or(ProxyError::MissingEntryPoint)?;

        let artifact = stager::stage(code).map_err(|e| {
            tracing::error!(error = %e, "Artifact staging failed");
            ProxyError::ArtifactLoadFailed
        })?;

        let program = self.loader.load(&artifact).await.map_err(|e| {
            tracing::error!(error = %e, "Artifact load failed");
            ProxyError::ArtifactLoadFailed
        })?;

        // A non-default name in the request permanently overrides the entry point
        let entry_point = match value.main {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_ENTRY_POINT.to_string(),
        };

        tracing::info!(entry_point, "Action initialized");

        *slot = Some(LoadedAction {
            program,
            entry_point,
            _artifact: artifact,
        });
        Ok(())
    }

    /// Invoke the loaded program with one activation's payload and context.
    ///
    /// Runs share the read lock, so activations may execute concurrently;
    /// per-activation isolation is the runtime's contract. The result must
    /// be exactly one JSON-typed value; its canonical string form is the
    /// success body.
    pub async fn run(
        &self,
        payload: Value,
        ctx: &InvocationContext,
    ) -> Result<String, ProxyError> {
        let slot = self.slot.read().await;
        let action = slot.as_ref().ok_or(ProxyError::NotInitialized)?;

        let env = ctx.env_map();
        let results = action
            .program
            .invoke(&action.entry_point, std::slice::from_ref(&payload), &env)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Invocation failed");
                ProxyError::InvocationFailed
            })?;

        let mut results = results.into_iter();
        match (results.next(), results.next()) {
            (Some(ReturnValue::Json(value)), None) => Ok(value.to_string()),
            _ => Err(ProxyError::NonJsonResult),
        }
    }
}
