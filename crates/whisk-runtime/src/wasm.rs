//! Wasmtime-backed implementation of [`ProgramLoader`] / [`Program`].
//!
//! The action artifact is a precompiled WASM component exporting its entry
//! point as `entry(input: string) -> result<string, string>` (or a plain
//! string return). Loading compiles and pre-instantiates once; each
//! invocation gets its own `Store` and WASI state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use wasmtime::Store;
use wasmtime::component::{Component, InstancePre, Val};

use crate::error::RuntimeError;
use crate::loader::{Program, ProgramLoader, ReturnValue};
use crate::runtime_context::RuntimeContext;
use crate::wasistate::WasiState;

pub struct WasmLoader {
    runtime: Arc<RuntimeContext>,
}

impl WasmLoader {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            runtime: Arc::new(RuntimeContext::new()?),
        })
    }
}

#[async_trait]
impl ProgramLoader for WasmLoader {
    async fn load(&self, artifact: &Path) -> Result<Box<dyn Program>, RuntimeError> {
        tracing::info!(path = %artifact.display(), "Loading action component");

        let bytes = tokio::fs::read(artifact)
            .await
            .map_err(|e| RuntimeError::LoadFailed(format!("{}: {e}", artifact.display())))?;

        let component = Component::from_binary(&self.runtime.engine, &bytes)
            .map_err(|e| RuntimeError::LoadFailed(e.to_string()))?;

        // Pre-instantiate (expensive; done once per container)
        let instance_pre = self
            .runtime
            .linker
            .instantiate_pre(&component)
            .map_err(|e| RuntimeError::InstantiationFailed(e.to_string()))?;

        tracing::info!("Action component loaded and ready");

        Ok(Box::new(WasmProgram {
            runtime: Arc::clone(&self.runtime),
            instance_pre,
        }))
    }
}

struct WasmProgram {
    runtime: Arc<RuntimeContext>,
    instance_pre: InstancePre<WasiState>,
}

impl std::fmt::Debug for WasmProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmProgram").finish_non_exhaustive()
    }
}

#[async_trait]
impl Program for WasmProgram {
    async fn invoke(
        &self,
        entry_point: &str,
        args: &[serde_json::Value],
        env: &HashMap<String, String>,
    ) -> Result<Vec<ReturnValue>, RuntimeError> {
        tracing::debug!(entry_point, "Invoking action");

        // Fresh per-activation state
        let mut store = Store::new(&self.runtime.engine, WasiState::new(env));

        let instance = self
            .instance_pre
            .instantiate_async(&mut store)
            .await
            .map_err(|e| RuntimeError::InstantiationFailed(format!("{entry_point}: {e}")))?;

        let func = instance
            .get_func(&mut store, entry_point)
            .ok_or_else(|| RuntimeError::EntryPointNotFound(entry_point.to_string()))?;

        // Arguments cross the component boundary as JSON strings
        let mut params = Vec::with_capacity(args.len());
        for arg in args {
            params.push(Val::String(serde_json::to_string(arg)?));
        }

        let mut results = vec![Val::Bool(false)]; // placeholder; overwritten by call
        func.call_async(&mut store, &params, &mut results)
            .await
            .map_err(|e| RuntimeError::InvocationFailed(format!("{entry_point}: {e}")))?;

        // Required after any component call that may return results
        func.post_return_async(&mut store)
            .await
            .map_err(|e| RuntimeError::InvocationFailed(format!("{entry_point} post_return: {e}")))?;

        decode_results(results)
    }
}

/// Decode the raw component values into [`ReturnValue`]s.
///
/// A guest-reported `result::err` aborts the whole invocation; everything
/// else is classified per value so the lifecycle layer can enforce its
/// exactly-one-JSON-value contract.
fn decode_results(results: Vec<Val>) -> Result<Vec<ReturnValue>, RuntimeError> {
    results.into_iter().map(decode_val).collect()
}

fn decode_val(val: Val) -> Result<ReturnValue, RuntimeError> {
    match val {
        Val::String(s) => Ok(parse_return(s)),
        Val::Result(Ok(Some(boxed))) => match *boxed {
            Val::String(s) => Ok(parse_return(s)),
            other => Ok(ReturnValue::Opaque(format!("{other:?}"))),
        },
        Val::Result(Ok(None)) => Ok(ReturnValue::Json(serde_json::Value::Null)),
        Val::Result(Err(Some(boxed))) => match *boxed {
            Val::String(e) => Err(RuntimeError::GuestFailure(e)),
            other => Err(RuntimeError::GuestFailure(format!("{other:?}"))),
        },
        Val::Result(Err(None)) => Err(RuntimeError::GuestFailure("(no error detail)".into())),
        other => Ok(ReturnValue::Opaque(format!("{other:?}"))),
    }
}

fn parse_return(s: String) -> ReturnValue {
    match serde_json::from_str(&s) {
        Ok(v) => ReturnValue::Json(v),
        Err(_) => ReturnValue::Opaque(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_result_parses_as_json() {
        let out = decode_results(vec![Val::String(r#"{"x":1}"#.into())]).unwrap();
        assert_eq!(out, vec![ReturnValue::Json(json!({"x": 1}))]);
    }

    #[test]
    fn ok_variant_unwraps_to_json() {
        let val = Val::Result(Ok(Some(Box::new(Val::String("[1,2]".into())))));
        let out = decode_results(vec![val]).unwrap();
        assert_eq!(out, vec![ReturnValue::Json(json!([1, 2]))]);
    }

    #[test]
    fn non_json_string_is_opaque() {
        let out = decode_results(vec![Val::String("not json at all".into())]).unwrap();
        assert_eq!(out, vec![ReturnValue::Opaque("not json at all".into())]);
    }

    #[test]
    fn non_string_val_is_opaque() {
        let out = decode_results(vec![Val::U32(7)]).unwrap();
        assert!(matches!(out[0], ReturnValue::Opaque(_)));
    }

    #[test]
    fn guest_err_aborts_invocation() {
        let val = Val::Result(Err(Some(Box::new(Val::String("boom".into())))));
        let err = decode_results(vec![val]).unwrap_err();
        assert!(matches!(err, RuntimeError::GuestFailure(ref m) if m == "boom"));
    }

    #[test]
    fn empty_ok_maps_to_json_null() {
        let out = decode_results(vec![Val::Result(Ok(None))]).unwrap();
        assert_eq!(out, vec![ReturnValue::Json(serde_json::Value::Null)]);
    }
}
