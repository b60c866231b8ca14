//! Tool registry — aggregates tool declarations across all providers.
//!
//! Provides:
//! - Name → owning-provider resolution for call routing
//! - The ordered catalogue served by `tools/list`
//! - Deterministic first-registered-wins deduplication

use std::collections::HashMap;

use super::types::{ToolDescriptor, ToolEntry};

// ─── ToolRegistry ────────────────────────────────────────────────────────────

/// Aggregated tool catalogue across all providers.
///
/// Tool names are kept exactly as declared; when two providers declare the
/// same name, the provider registered first keeps it. The catalogue preserves
/// provider registration order, then each provider's declaration order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Catalogue rows in registration order.
    entries: Vec<ToolEntry>,
    /// `tool name → owning provider name`.
    owners: HashMap<String, String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider's declared tools, in declaration order.
    ///
    /// Names already present (from this or an earlier provider) keep their
    /// existing registration. Returns the number of tools actually added.
    pub fn register(&mut self, provider: &str, tools: &[ToolDescriptor]) -> usize {
        let mut added = 0;
        for tool in tools {
            if let Some(owner) = self.owners.get(&tool.name) {
                tracing::debug!(
                    tool = %tool.name,
                    owner = %owner,
                    skipped_provider = %provider,
                    "duplicate tool name, keeping first registration"
                );
                continue;
            }
            self.owners.insert(tool.name.clone(), provider.to_string());
            self.entries.push(ToolEntry {
                name: tool.name.clone(),
                description: tool.description.clone(),
                provider: provider.to_string(),
                input_schema: tool.input_schema.clone(),
            });
            added += 1;
        }
        added
    }

    /// The provider that owns a tool, if any.
    pub fn resolve(&self, tool_name: &str) -> Option<&str> {
        self.owners.get(tool_name).map(String::as_str)
    }

    /// The full catalogue, in registration order.
    pub fn list_all(&self) -> &[ToolEntry] {
        &self.entries
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no tools.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.owners.clear();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
