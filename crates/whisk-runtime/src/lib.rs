//! WASM action runtime for the whisk action proxy.
//!
//! The proxy's lifecycle layer only knows the [`ProgramLoader`] and
//! [`Program`] traits: load a staged artifact once, invoke its entry point
//! with JSON arguments many times. This crate provides the wasmtime-backed
//! implementation, [`WasmLoader`], which compiles a precompiled component
//! at init time and runs each invocation in a fresh store with its own
//! WASI state.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//! use whisk_runtime::{Program, ProgramLoader, WasmLoader};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let loader = WasmLoader::new()?;
//! let program = loader.load(Path::new("/tmp/action.wasm")).await?;
//!
//! let env = HashMap::from([("__OW_NAMESPACE".to_string(), "guest".to_string())]);
//! let results = program
//!     .invoke("main", &[serde_json::json!({"name": "whisk"})], &env)
//!     .await?;
//! # let _ = results;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;
pub mod runtime_context;
pub mod wasistate;
pub mod wasm;

pub use error::RuntimeError;
pub use loader::{Program, ProgramLoader, ReturnValue};
pub use wasm::WasmLoader;
