//! Gateway client for agent loops.
//!
//! Wraps the HTTP surface for programs that hand tools to an LLM: fetches
//! and caches the catalogue, normalizes model-emitted arguments (which often
//! arrive as a JSON string rather than an object), and flattens text-content
//! results down to the string a transcript wants.

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};

use super::errors::AgentError;
use crate::gateway::types::ToolEntry;

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout. A tool call blocks on the provider, so this sits
/// above the gateway's own per-call deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the gateway listens by default.
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8808";

// ─── GatewayClient ───────────────────────────────────────────────────────────

/// Client for one gateway endpoint.
///
/// Holds the tool catalogue after [`refresh_tools`](Self::refresh_tools);
/// the cached entries carry everything an agent needs to advertise the tools
/// to a model (name, description, schema, owning server).
pub struct GatewayClient {
    http: HttpClient,
    base_url: String,
    tools: Vec<ToolEntry>,
}

#[derive(Deserialize)]
struct ToolListing {
    #[serde(default)]
    tools: Vec<ToolEntry>,
}

impl GatewayClient {
    /// Create a client for `base_url` (e.g. [`DEFAULT_GATEWAY_URL`]).
    ///
    /// Does NOT check connectivity — that happens on the first request.
    pub fn new(base_url: &str) -> Result<Self, AgentError> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::ConnectionFailed {
                endpoint: base_url.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tools: Vec::new(),
        })
    }

    /// Fetch the catalogue from the gateway and cache it.
    pub async fn refresh_tools(&mut self) -> Result<&[ToolEntry], AgentError> {
        let value = self.post_message(json!({ "method": "tools/list" })).await?;
        let listing: ToolListing =
            serde_json::from_value(value).map_err(|e| AgentError::MalformedResponse {
                reason: format!("tools/list response: {e}"),
            })?;
        self.tools = listing.tools;
        Ok(&self.tools)
    }

    /// The cached catalogue. Empty until the first [`refresh_tools`](Self::refresh_tools).
    pub fn tools(&self) -> &[ToolEntry] {
        &self.tools
    }

    /// Call one tool and flatten its result for a model transcript.
    ///
    /// `arguments` is normalized first, so the string form models emit is
    /// accepted directly. Text-content results collapse to their text;
    /// anything else comes back as compact JSON.
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> Result<String, AgentError> {
        let arguments = normalize_arguments(arguments)?;
        let body = json!({
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments },
        });
        let result = self.post_message(body).await?;
        Ok(render_result(&result))
    }

    async fn post_message(&self, body: Value) -> Result<Value, AgentError> {
        let url = format!("{}/message", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::ConnectionFailed {
                endpoint: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AgentError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse {
                reason: e.to_string(),
            })
    }
}

// ─── Argument Normalization ──────────────────────────────────────────────────

/// Accept tool arguments as an object, an object-in-a-string, or null;
/// reject everything else.
pub fn normalize_arguments(raw: &Value) -> Result<Value, AgentError> {
    let value = match raw {
        Value::String(text) => {
            serde_json::from_str(text).map_err(|e| AgentError::InvalidArguments {
                reason: format!("arguments string is not valid JSON: {e}"),
            })?
        }
        other => other.clone(),
    };

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(json!({})),
        other => Err(AgentError::InvalidArguments {
            reason: format!("expected a JSON object, got {other}"),
        }),
    }
}

/// Text-content results collapse to the text of their first block; anything
/// else renders as compact JSON.
fn render_result(result: &Value) -> String {
    let text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| blocks.first())
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str);

    match text {
        Some(text) => text.to_string(),
        None => result.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
