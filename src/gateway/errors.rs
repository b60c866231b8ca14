//! Gateway error types.

use thiserror::Error;

/// Errors that can occur across the gateway's lifecycle and call paths.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A provider process failed to start.
    #[error("failed to spawn provider '{name}': {reason}")]
    Spawn {
        name: String,
        reason: String,
    },

    /// Malformed, empty, or error-bearing response from a provider,
    /// or its channel is no longer trusted.
    #[error("protocol error from provider '{provider}': {detail}")]
    Protocol {
        provider: String,
        detail: String,
    },

    /// An exchange with a provider exceeded its deadline.
    #[error("call to provider '{provider}' timed out after {timeout_ms}ms")]
    Timeout {
        provider: String,
        timeout_ms: u64,
    },

    /// Tool not present in the aggregated registry.
    #[error("tool '{name}' not found")]
    NotFound {
        name: String,
    },

    /// Configuration error (unreadable file, no providers configured).
    #[error("config error: {reason}")]
    Config {
        reason: String,
    },
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mentions_tool_name() {
        let err = GatewayError::NotFound { name: "missing".into() };
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_timeout_display() {
        let err = GatewayError::Timeout { provider: "demo".into(), timeout_ms: 250 };
        let msg = err.to_string();
        assert!(msg.contains("demo"));
        assert!(msg.contains("250"));
    }
}
