//! Wire types for the provider protocol and the tool catalogue.
//!
//! Providers speak newline-delimited JSON-RPC 2.0 over stdio; the gateway
//! re-exposes their tools over HTTP. Both sides of that bridge live here.

use serde::{Deserialize, Serialize};

// ─── JSON-RPC 2.0 ────────────────────────────────────────────────────────────

/// JSON-RPC 2.0 request envelope, one per line on a provider's stdin.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: serde_json::Value,
}

impl RpcRequest {
    /// Create a request envelope. `params` defaults to `{}` when the method
    /// takes none — the envelope always carries a params object.
    pub fn new(id: u64, method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// Response envelope read back from a provider's stdout.
///
/// The contract only requires `{"result": …}` or `{"error": …}`; well-behaved
/// JSON-RPC providers also echo the request `id`, which the channel uses to
/// discard stale replies left over from an abandoned exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<serde_json::Value>,
}

// ─── Tool Catalogue ──────────────────────────────────────────────────────────

/// A tool as declared by a provider in its `tools/list` response.
///
/// The input schema arrives under either `input_schema` or `inputSchema`
/// depending on the provider; both are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

/// Payload of a `tools/list` result. A provider that omits the `tools` key
/// declares no tools.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// One row of the aggregated catalogue served to HTTP callers.
///
/// The owning provider is published under the `server` wire key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "server")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
