//! Per-activation invocation context.
//!
//! The orchestrator ships activation metadata alongside the `value` payload
//! of every run request. The five recognized fields are projected into
//! `__OW_`-prefixed environment pairs and handed to the runtime as explicit
//! per-invocation overrides. The host process environment is never
//! mutated, and nothing persists between activations.

use std::collections::HashMap;

use serde_json::Value;

pub const ENV_PREFIX: &str = "__OW_";

const CONTEXT_FIELDS: [&str; 5] = [
    "api_key",
    "namespace",
    "action_name",
    "activation_id",
    "deadline",
];

/// Activation metadata parsed once per run request.
///
/// Missing fields are silently omitted; extraction never fails.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    fields: HashMap<&'static str, String>,
}

impl InvocationContext {
    /// Extract the recognized fields from a run request body.
    ///
    /// Fields are read from the top level of the envelope, falling back to
    /// the `value` object. JSON strings, numbers, and booleans all project
    /// to their string form (the deadline arrives as a number).
    pub fn from_request(body: &Value) -> Self {
        let mut fields = HashMap::new();
        for name in CONTEXT_FIELDS {
            let raw = body
                .get(name)
                .or_else(|| body.get("value").and_then(|v| v.get(name)));
            if let Some(text) = raw.and_then(primitive_to_string) {
                fields.insert(name, text);
            }
        }
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Project the present fields into namespaced environment pairs,
    /// e.g. `api_key` → `__OW_API_KEY`.
    pub fn env_map(&self) -> HashMap<String, String> {
        self.fields
            .iter()
            .map(|(name, value)| {
                (
                    format!("{ENV_PREFIX}{}", name.to_uppercase()),
                    value.clone(),
                )
            })
            .collect()
    }
}

fn primitive_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
