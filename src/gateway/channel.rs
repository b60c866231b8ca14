//! Serialized JSON-RPC exchange over a provider's stdio.
//!
//! Handles one framed request/response at a time against a child process:
//! - Writing the request envelope to stdin (one JSON object per line)
//! - Reading the response line from stdout
//! - Timeout enforcement and desynchronization tracking
//!
//! The protocol carries no correlation beyond "the next response line answers
//! the outstanding request", so the write and the read happen inside a single
//! lock: a second call on the same provider queues until the first finishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use super::errors::GatewayError;
use super::types::{RpcRequest, RpcResponse};

// ─── RpcChannel ──────────────────────────────────────────────────────────────

/// Pipe ends plus framing state, guarded by the exchange lock.
#[derive(Debug)]
struct ChannelInner {
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    /// Set while an exchange may have left half-written or unread bytes on
    /// the pipes. A desynchronized channel can no longer be trusted to frame
    /// responses correctly.
    desynced: bool,
}

/// One provider's request/response channel.
///
/// Exchanges are strictly serialized; channels to different providers are
/// fully independent.
#[derive(Debug)]
pub struct RpcChannel {
    provider: String,
    inner: Mutex<ChannelInner>,
    next_id: AtomicU64,
}

impl RpcChannel {
    /// Create a channel from a freshly spawned provider's pipes.
    pub fn new(provider: &str, stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            provider: provider.to_string(),
            inner: Mutex::new(ChannelInner {
                stdin,
                reader: BufReader::new(stdout),
                desynced: false,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Perform one request/response exchange within `timeout`.
    ///
    /// Returns the response's `result` payload. Fails with
    /// [`GatewayError::Protocol`] when the stream closes before a full line
    /// arrives, the line is not a response envelope, the response carries an
    /// `error` payload, or the channel was poisoned by an earlier failure;
    /// fails with [`GatewayError::Timeout`] when the deadline expires — which
    /// also poisons the channel, since the aborted exchange may have left the
    /// framing out of step.
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match tokio::time::timeout(timeout, self.exchange(id, method, params)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GatewayError::Timeout {
                provider: self.provider.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Write one request line, then read response lines until this request's
    /// answer arrives. Must only run inside `call`'s timeout.
    async fn exchange(
        &self,
        id: u64,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let req = RpcRequest::new(id, method, params);
        let mut json = serde_json::to_string(&req).map_err(|e| GatewayError::Protocol {
            provider: self.provider.clone(),
            detail: format!("failed to serialize request: {e}"),
        })?;
        json.push('\n');

        let mut inner = self.inner.lock().await;
        if inner.desynced {
            return Err(GatewayError::Protocol {
                provider: self.provider.clone(),
                detail: "channel desynchronized by an earlier failed exchange".into(),
            });
        }
        // From here until a cleanly framed exit, bytes may be in flight.
        inner.desynced = true;

        inner
            .stdin
            .write_all(json.as_bytes())
            .await
            .map_err(|e| GatewayError::Protocol {
                provider: self.provider.clone(),
                detail: format!("failed to write request: {e}"),
            })?;
        inner.stdin.flush().await.map_err(|e| GatewayError::Protocol {
            provider: self.provider.clone(),
            detail: format!("failed to flush request: {e}"),
        })?;

        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read =
                inner
                    .reader
                    .read_line(&mut line)
                    .await
                    .map_err(|e| GatewayError::Protocol {
                        provider: self.provider.clone(),
                        detail: format!("failed to read response: {e}"),
                    })?;

            if bytes_read == 0 {
                return Err(GatewayError::Protocol {
                    provider: self.provider.clone(),
                    detail: "empty response (stdout closed, process may have exited)".into(),
                });
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let resp: RpcResponse =
                serde_json::from_str(trimmed).map_err(|e| GatewayError::Protocol {
                    provider: self.provider.clone(),
                    detail: format!("unparseable response line: {e}"),
                })?;

            // A reply correlated to an abandoned exchange — skip it and keep
            // reading for our own answer.
            if matches!(resp.id, Some(resp_id) if resp_id != id) {
                tracing::debug!(
                    provider = %self.provider,
                    stale_id = ?resp.id,
                    expected_id = id,
                    "skipping stale response"
                );
                continue;
            }

            // The exchange consumed exactly its own response line; the
            // framing is intact whatever the payload says.
            inner.desynced = false;

            if let Some(error) = resp.error {
                return Err(GatewayError::Protocol {
                    provider: self.provider.clone(),
                    detail: format!("error response: {error}"),
                });
            }
            return match resp.result {
                Some(result) => Ok(result),
                None => Err(GatewayError::Protocol {
                    provider: self.provider.clone(),
                    detail: "response missing both result and error".into(),
                }),
            };
        }
    }

    /// Clear a poisoning left by a failed exchange.
    ///
    /// Only sound before the provider serves real calls: the startup
    /// discovery loop retries through failures, and stale replies from its
    /// abandoned attempts are screened out by the response-id check.
    pub(crate) async fn recover(&self) {
        self.inner.lock().await.desynced = false;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
