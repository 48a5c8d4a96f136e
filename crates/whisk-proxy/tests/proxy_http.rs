//! End-to-end tests for the /init + /run lifecycle contract.
//!
//! A real server is started on an ephemeral port and driven with reqwest;
//! the language runtime is mocked behind `ProgramLoader` so no real
//! artifact is needed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde_json::{Value, json};
use whisk_proxy::lifecycle::ActionLifecycle;
use whisk_proxy::proxy::{AppState, router};
use whisk_runtime::{Program, ProgramLoader, ReturnValue, RuntimeError};

/// Test double for a loaded action.
///
/// Echoes its payload back; special keys steer it into the failure shapes
/// the error taxonomy has to classify:
/// - `"fail": true`       → runtime error
/// - `"text": true`       → non-JSON return value
/// - `"reflect_env": true`→ returns the injected environment instead
#[derive(Debug)]
struct ScriptedProgram;

#[async_trait]
impl Program for ScriptedProgram {
    async fn invoke(
        &self,
        _entry_point: &str,
        args: &[Value],
        env: &HashMap<String, String>,
    ) -> Result<Vec<ReturnValue>, RuntimeError> {
        let payload = &args[0];
        if payload.get("fail").is_some() {
            return Err(RuntimeError::InvocationFailed("scripted failure".into()));
        }
        if payload.get("text").is_some() {
            return Ok(vec![ReturnValue::Opaque("plain text, not JSON".into())]);
        }
        if payload.get("reflect_env").is_some() {
            return Ok(vec![ReturnValue::Json(json!(env))]);
        }
        Ok(vec![ReturnValue::Json(payload.clone())])
    }
}

struct ScriptedLoader;

#[async_trait]
impl ProgramLoader for ScriptedLoader {
    async fn load(&self, artifact: &Path) -> Result<Box<dyn Program>, RuntimeError> {
        let bytes = std::fs::read(artifact)
            .map_err(|e| RuntimeError::LoadFailed(e.to_string()))?;
        if bytes == b"corrupt" {
            return Err(RuntimeError::LoadFailed("unrecognized artifact format".into()));
        }
        Ok(Box::new(ScriptedProgram))
    }
}

async fn start_server() -> String {
    let lifecycle = Arc::new(ActionLifecycle::new(Arc::new(ScriptedLoader)));
    let app = router(AppState { lifecycle });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn init_body() -> Value {
    json!({
        "value": {
            "binary": true,
            "main": "main",
            "code": STANDARD.encode(b"valid artifact")
        }
    })
}

#[tokio::test]
async fn full_lifecycle_scenario() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    // First init succeeds
    let resp = client
        .post(format!("{base}/init"))
        .json(&init_body())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_ENCODING).unwrap(),
        "identity"
    );
    assert_eq!(
        resp.text().await.unwrap(),
        r#"{"success":"Function init success"}"#
    );

    // Second init with the same body is rejected without touching the slot
    let resp = client
        .post(format!("{base}/init"))
        .json(&init_body())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        resp.text().await.unwrap(),
        r#"{"error":"Cannot initialize the action more than once."}"#
    );

    // Run echoes the value object back as raw JSON text
    let resp = client
        .post(format!("{base}/run"))
        .json(&json!({"value": {"x": 1}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_ENCODING).unwrap(),
        "identity"
    );
    assert_eq!(resp.text().await.unwrap(), r#"{"x":1}"#);
}

#[tokio::test]
async fn repeated_init_rejected_before_body_is_parsed() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/init"))
        .json(&init_body())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Once the slot is occupied, every init answers AlreadyInitialized,
    // even with a malformed or incomplete body
    for body in ["{{{", "", r#"{"value": {"binary": false}}"#, r#"{"value": null}"#] {
        let resp = client
            .post(format!("{base}/init"))
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY, "body: {body:?}");
        assert_eq!(
            resp.text().await.unwrap(),
            r#"{"error":"Cannot initialize the action more than once."}"#
        );
    }
}

#[tokio::test]
async fn run_before_init_is_rejected() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/run"))
        .json(&json!({"value": {"x": 1}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.text().await.unwrap(),
        r#"{"error":"Function not initialized"}"#
    );
}

#[tokio::test]
async fn run_without_value_object_is_invalid_input() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/init"))
        .json(&init_body())
        .send()
        .await
        .unwrap();

    for body in [
        json!({}),
        json!({"value": null}),
        json!({"value": [1, 2]}),
        json!({"value": "text"}),
    ] {
        let resp = client
            .post(format!("{base}/run"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(
            resp.text().await.unwrap(),
            r#"{"error":"Invalid input parameters for action run"}"#
        );
    }

    // Malformed JSON is invalid input too
    let resp = client
        .post(format!("{base}/run"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn init_without_binary_flag_is_rejected() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/init"))
        .json(&json!({"value": {"binary": false, "main": "main", "code": "aGk="}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.text().await.unwrap(),
        r#"{"error":"The action failed to generate or locate a binary. See logs for details."}"#
    );
}

#[tokio::test]
async fn init_failures_are_retryable() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    // Malformed base64
    let resp = client
        .post(format!("{base}/init"))
        .json(&json!({"value": {"binary": true, "main": "main", "code": "%%%"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Artifact the loader rejects
    let resp = client
        .post(format!("{base}/init"))
        .json(&json!({"value": {
            "binary": true, "main": "main", "code": STANDARD.encode(b"corrupt")
        }}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // A good init still goes through afterwards
    let resp = client
        .post(format!("{base}/init"))
        .json(&init_body())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unparseable_init_body_maps_to_locate_binary_error() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/init"))
        .body("{{{")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.text().await.unwrap(),
        r#"{"error":"The action failed to generate or locate a binary. See logs for details."}"#
    );
}

#[tokio::test]
async fn runtime_failure_maps_to_running_failed() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/init"))
        .json(&init_body())
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/run"))
        .json(&json!({"value": {"fail": true}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.text().await.unwrap(),
        r#"{"error":"Running Function failed"}"#
    );
}

#[tokio::test]
async fn non_json_result_never_yields_200() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/init"))
        .json(&init_body())
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/run"))
        .json(&json!({"value": {"text": true}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.text().await.unwrap(),
        r#"{"error":"The action did not return a dictionary."}"#
    );
}

#[tokio::test]
async fn activation_context_reaches_the_action_as_env() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/init"))
        .json(&init_body())
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/run"))
        .json(&json!({
            "api_key": "k1",
            "namespace": "n1",
            "deadline": 1756400000000u64,
            "value": {"reflect_env": true}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let env: HashMap<String, String> = resp.json().await.unwrap();
    assert_eq!(env.get("__OW_API_KEY").map(String::as_str), Some("k1"));
    assert_eq!(env.get("__OW_NAMESPACE").map(String::as_str), Some("n1"));
    assert_eq!(
        env.get("__OW_DEADLINE").map(String::as_str),
        Some("1756400000000")
    );
    assert!(!env.contains_key("__OW_ACTIVATION_ID"));
}

#[tokio::test]
async fn health_reports_initialization_state() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let before: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["status"], "ok");
    assert_eq!(before["initialized"], false);

    client
        .post(format!("{base}/init"))
        .json(&init_body())
        .send()
        .await
        .unwrap();

    let after: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["initialized"], true);
}
