//! Wire response envelope and activation log markers.
//!
//! Every response carries `Content-Encoding: identity` so no transport
//! compression sits between the proxy and the orchestrator's log pipeline.
//! Every `/run` response is preceded by the end-of-activation marker on
//! both stdout and stderr; the log collector blocks on it to delimit one
//! activation's output.

use std::io::Write;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Sentinel the log collector waits for after each activation.
pub const END_OF_ACTIVATION_MARKER: &str = "XXX_THE_END_OF_A_WHISK_ACTIVATION_XXX";

pub const RESPONSE_SUCCESS: &str = "success";
pub const RESPONSE_ERROR: &str = "error";

const IDENTITY: &str = "identity";

/// Build the flat `{"<kind>":"<message>"}` envelope body.
pub fn envelope_body(kind: &str, message: &str) -> String {
    let mut body = serde_json::Map::new();
    body.insert(kind.to_string(), serde_json::Value::String(message.to_string()));
    serde_json::Value::Object(body).to_string()
}

/// Envelope response: `{"success": …}` / `{"error": …}`, identity-encoded.
pub fn envelope(status: StatusCode, kind: &str, message: &str) -> Response {
    raw(status, envelope_body(kind, message))
}

/// Raw-text response (a run's JSON result goes out unwrapped).
pub fn raw(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_ENCODING, IDENTITY)], body).into_response()
}

/// Emit the end-of-activation marker on both output streams.
///
/// Flushed so the marker lands after any output the action wrote during the
/// invocation. Omitting this hangs the orchestrator's log pipeline.
pub fn end_of_activation() {
    write_end_of_activation(std::io::stdout(), std::io::stderr());
}

fn write_end_of_activation(mut out: impl Write, mut err: impl Write) {
    let _ = writeln!(out, "{END_OF_ACTIVATION_MARKER}");
    let _ = out.flush();

    let _ = writeln!(err, "{END_OF_ACTIVATION_MARKER}");
    let _ = err.flush();
}
