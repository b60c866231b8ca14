//! HTTP control surface: one JSON endpoint carrying both gateway operations.
//!
//! `POST /message` takes `{"method": ..., "params": ...}` and dispatches to
//! the shared [`Gateway`]. `tools/list` returns the annotated catalogue,
//! `tools/call` returns the owning provider's result verbatim, anything else
//! is a 400. Provider, gateway, and body-decode failures surface as 500 with
//! the error message in the body; callers always get a JSON object back.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::gateway::Gateway;

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the application router around a shared gateway.
pub fn app(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/message", post(handle_message))
        .with_state(gateway)
}

/// Bind `0.0.0.0:port` and serve until the shutdown signal resolves.
pub async fn serve(gateway: Arc<Gateway>, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, app(gateway))
        .with_graceful_shutdown(super::shutdown::shutdown_signal())
        .await
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// Dispatch one message by its `method` field.
///
/// The body is taken as raw JSON and picked apart by hand: a body the
/// extractor cannot decode still answers with a JSON `{"error": ...}`
/// object, and a body without a `method` lands in the unknown-method arm
/// rather than a plain-text rejection.
async fn handle_message(
    State(gateway): State<Arc<Gateway>>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(reason = %rejection, "undecodable request body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": rejection.body_text() })),
            );
        }
    };

    match request.get("method").and_then(Value::as_str) {
        Some("tools/list") => {
            let tools = gateway.list_tools().await;
            (StatusCode::OK, Json(json!({ "tools": tools })))
        }
        Some("tools/call") => {
            let (name, arguments) = match call_params(request.get("params")) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": reason })),
                    );
                }
            };
            match gateway.call_tool(&name, arguments).await {
                Ok(result) => (StatusCode::OK, Json(result)),
                Err(e) => {
                    tracing::warn!(tool = %name, error = %e, "tool call failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": e.to_string() })),
                    )
                }
            }
        }
        other => {
            tracing::debug!(method = ?other, "unknown method");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Unknown method" })),
            )
        }
    }
}

/// Pull `name` and `arguments` out of `tools/call` params. Arguments default
/// to an empty object; a missing name is the caller's error.
fn call_params(params: Option<&Value>) -> Result<(String, Value), String> {
    let name = params
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| "tools/call params missing tool name".to_string())?
        .to_string();
    let arguments = params
        .and_then(|p| p.get("arguments"))
        .cloned()
        .unwrap_or_else(|| json!({}));
    Ok((name, arguments))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::config::ProviderConfig;
    use crate::gateway::control::GatewayOptions;
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    fn sh_config(script: &str) -> ProviderConfig {
        ProviderConfig {
            command: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            env: HashMap::new(),
        }
    }

    fn provider_script(tools_json: &str, call_result: &str) -> String {
        format!(
            r#"IFS= read -r line
printf '%s\n' '{{"result":{{"tools":{tools_json}}}}}'
while IFS= read -r line; do printf '%s\n' '{call_result}'; done"#
        )
    }

    async fn start_gateway(script: String) -> Arc<Gateway> {
        let mut configs = BTreeMap::new();
        configs.insert("files".to_string(), sh_config(&script));
        let options = GatewayOptions {
            rpc_timeout: Duration::from_millis(500),
            grace_period: Duration::from_millis(300),
            ..GatewayOptions::default()
        };
        Arc::new(Gateway::start_with(configs, options).await.unwrap())
    }

    /// Serve on an ephemeral port; returns the bound address.
    async fn spawn_app(gateway: Arc<Gateway>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(gateway)).await.unwrap();
        });
        addr
    }

    async fn post_message(addr: SocketAddr, body: Value) -> (StatusCode, Value) {
        let response = reqwest::Client::new()
            .post(format!("http://{addr}/message"))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_tools_list_annotates_owning_server() {
        let gateway = start_gateway(provider_script(
            r#"[{"name":"read_file","description":"Read a file"}]"#,
            r#"{"result":"unused"}"#,
        ))
        .await;
        let addr = spawn_app(Arc::clone(&gateway)).await;

        let (status, body) = post_message(addr, json!({ "method": "tools/list" })).await;
        assert_eq!(status, StatusCode::OK);

        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "read_file");
        assert_eq!(tools[0]["description"], "Read a file");
        assert_eq!(tools[0]["server"], "files");
        // no schema declared, so the key is absent rather than null
        assert!(tools[0].get("input_schema").is_none());

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn test_tools_call_returns_provider_result_verbatim() {
        let gateway = start_gateway(provider_script(
            r#"[{"name":"echo","description":""}]"#,
            r#"{"result":{"content":[{"type":"text","text":"hello"}]}}"#,
        ))
        .await;
        let addr = spawn_app(Arc::clone(&gateway)).await;

        let (status, body) = post_message(
            addr,
            json!({ "method": "tools/call", "params": { "name": "echo", "arguments": {} } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "content": [{ "type": "text", "text": "hello" }] }));

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_method_is_bad_request() {
        let gateway = start_gateway(provider_script(
            r#"[{"name":"t","description":""}]"#,
            r#"{"result":1}"#,
        ))
        .await;
        let addr = spawn_app(Arc::clone(&gateway)).await;

        let (status, body) = post_message(addr, json!({ "method": "tools/delete" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Unknown method" }));

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn test_body_without_method_is_unknown_method() {
        let gateway = start_gateway(provider_script(
            r#"[{"name":"t","description":""}]"#,
            r#"{"result":1}"#,
        ))
        .await;
        let addr = spawn_app(Arc::clone(&gateway)).await;

        // Valid JSON with no method field: answered like any unrecognized
        // method, not as an extractor rejection.
        let (status, body) = post_message(addr, json!({ "foo": 1 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Unknown method" }));

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn test_unparseable_body_still_gets_json_error() {
        let gateway = start_gateway(provider_script(
            r#"[{"name":"t","description":""}]"#,
            r#"{"result":1}"#,
        ))
        .await;
        let addr = spawn_app(Arc::clone(&gateway)).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/message"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let content_type = response.headers()[reqwest::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("application/json"));

        let body: Value = response.json().await.unwrap();
        assert!(!body["error"].as_str().unwrap().is_empty());

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_tool_is_server_error_with_message() {
        let gateway = start_gateway(provider_script(
            r#"[{"name":"real","description":""}]"#,
            r#"{"result":1}"#,
        ))
        .await;
        let addr = spawn_app(Arc::clone(&gateway)).await;

        let (status, body) = post_message(
            addr,
            json!({ "method": "tools/call", "params": { "name": "ghost" } }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("ghost"));
        assert!(message.contains("not found"));

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn test_call_without_tool_name_is_server_error() {
        let gateway = start_gateway(provider_script(
            r#"[{"name":"t","description":""}]"#,
            r#"{"result":1}"#,
        ))
        .await;
        let addr = spawn_app(Arc::clone(&gateway)).await;

        let (status, body) = post_message(
            addr,
            json!({ "method": "tools/call", "params": {} }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("tool name"));

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn test_provider_error_payload_surfaces_as_server_error() {
        let gateway = start_gateway(provider_script(
            r#"[{"name":"fails","description":""}]"#,
            r#"{"error":{"code":-32000,"message":"tool blew up"}}"#,
        ))
        .await;
        let addr = spawn_app(Arc::clone(&gateway)).await;

        let (status, body) = post_message(
            addr,
            json!({ "method": "tools/call", "params": { "name": "fails" } }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("tool blew up"));

        gateway.shutdown().await;
    }
}
