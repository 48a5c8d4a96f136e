//! Action container proxy for whisk actions.
//!
//! A container runs exactly one action for its lifetime. The orchestrator
//! POSTs `/init` once with a base64 precompiled artifact, then `/run`
//! repeatedly with per-activation JSON input. [`lifecycle::ActionLifecycle`]
//! owns the one-shot program slot; [`stager`] persists the artifact;
//! [`context`] projects activation metadata into `__OW_*` environment pairs
//! handed to the runtime; [`codec`] shapes the wire envelope and emits the
//! end-of-activation log markers.

pub mod codec;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod proxy;
pub mod stager;

pub use error::ProxyError;
pub use lifecycle::ActionLifecycle;
