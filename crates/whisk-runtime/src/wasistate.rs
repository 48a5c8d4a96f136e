// Ported from microsoft/wassette (MIT License)
// Copyright (c) Microsoft Corporation.

use std::collections::HashMap;

use wasmtime::component::ResourceTable;
use wasmtime_wasi::{WasiCtx, WasiCtxBuilder, WasiCtxView, WasiView};
use wasmtime_wasi_http::{WasiHttpCtx, WasiHttpView};

/// Per-invocation WASM state.
///
/// A fresh `WasiState` is created for each `run`, so activations are
/// isolated from one another and nothing set for one invocation leaks into
/// the next.
///
/// Sandbox posture:
/// - No filesystem preopens
/// - Environment limited to the injected `__OW_*` activation context
/// - stdout/stderr inherited from the container, so action logs land in the
///   stream the log collector reads (ahead of the end-of-activation marker)
/// - Network access via WASI HTTP only
pub struct WasiState {
    ctx: WasiCtx,
    table: ResourceTable,
    http: WasiHttpCtx,
}

impl WasiView for WasiState {
    fn ctx(&mut self) -> WasiCtxView<'_> {
        WasiCtxView {
            ctx: &mut self.ctx,
            table: &mut self.table,
        }
    }
}

impl WasiHttpView for WasiState {
    fn ctx(&mut self) -> &mut WasiHttpCtx {
        &mut self.http
    }
    fn table(&mut self) -> &mut ResourceTable {
        &mut self.table
    }
}

impl WasiState {
    /// Build the WASI sandbox for one activation.
    ///
    /// `env` carries the activation context as explicit key-value overrides;
    /// the host process environment is never exposed or mutated.
    pub fn new(env: &HashMap<String, String>) -> Self {
        let mut builder = WasiCtxBuilder::new();
        builder.inherit_stdout();
        builder.inherit_stderr();
        for (key, value) in env {
            builder.env(key, value);
        }
        let ctx = builder.build();

        Self {
            ctx,
            table: ResourceTable::new(),
            http: WasiHttpCtx::new(),
        }
    }
}
