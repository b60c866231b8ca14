//! Agent-side error types.
//!
//! All errors implement `std::error::Error` via `thiserror` and carry the
//! context a caller needs for its own log entries.

use thiserror::Error;

/// Errors a gateway client can hit.
#[derive(Debug, Error)]
pub enum AgentError {
    /// TCP/HTTP connection to the gateway failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// Non-2xx HTTP response from the gateway.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// Tool arguments could not be normalized to a JSON object.
    #[error("invalid tool arguments: {reason}")]
    InvalidArguments { reason: String },

    /// The gateway's response body did not parse.
    #[error("malformed gateway response: {reason}")]
    MalformedResponse { reason: String },
}
