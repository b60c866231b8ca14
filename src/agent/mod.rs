//! Agent-side client for the gateway's HTTP surface.
//!
//! This module handles:
//! - Fetching and caching the aggregated tool catalogue
//! - Normalizing model-emitted tool arguments (string or object form)
//! - Flattening text-content tool results for a model transcript

pub mod client;
pub mod errors;

// Re-exports for convenience
pub use client::{normalize_arguments, GatewayClient, DEFAULT_GATEWAY_URL};
pub use errors::AgentError;
