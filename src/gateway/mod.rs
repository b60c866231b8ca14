//! Gateway core — JSON-RPC over stdio transport for tool provider management.
//!
//! This module handles:
//! - Spawning and supervising tool provider child processes
//! - JSON-RPC 2.0 communication over process stdio, one exchange at a time
//! - Tool discovery (doubling as the readiness probe) and aggregation
//! - Tool call routing to the owning provider
//! - Two-phase shutdown (SIGTERM, grace period, SIGKILL)
//!
//! The [`Gateway`] is constructed once at startup and shared with the HTTP
//! layer behind an `Arc`.

pub mod channel;
pub mod config;
pub mod control;
pub mod errors;
pub mod registry;
pub mod supervisor;
pub mod types;

// Re-exports for convenience
pub use channel::RpcChannel;
pub use config::{load_config, ProviderConfig};
pub use control::{Gateway, GatewayOptions};
pub use errors::GatewayError;
pub use registry::ToolRegistry;
pub use types::{RpcRequest, RpcResponse, ToolDescriptor, ToolEntry};
