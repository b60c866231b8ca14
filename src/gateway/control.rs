//! Gateway control plane.
//!
//! Owns the running providers and the aggregated registry: starts every
//! configured provider concurrently (tolerating partial failure), treats the
//! first successful `tools/list` answer as the readiness signal, routes tool
//! calls to the owning provider's serialized channel, and shuts the whole
//! fleet down in two phases.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::channel::RpcChannel;
use super::config::ProviderConfig;
use super::errors::GatewayError;
use super::registry::ToolRegistry;
use super::supervisor;
use super::types::{ToolDescriptor, ToolEntry, ToolsListResult};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default deadline for one tool-call exchange.
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Overall deadline for a provider's first discovery answer.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for a single discovery attempt.
const DISCOVERY_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Base delay between discovery attempts (doubles each time).
const DISCOVERY_BACKOFF: Duration = Duration::from_millis(200);

// ─── Options ─────────────────────────────────────────────────────────────────

/// Gateway deadlines. The defaults suit real providers; tests tighten them.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Per-exchange deadline for `call_tool`.
    pub rpc_timeout: Duration,
    /// Total time a provider gets to answer its first `tools/list`.
    pub startup_timeout: Duration,
    /// Deadline for each individual discovery attempt.
    pub discovery_attempt_timeout: Duration,
    /// Initial backoff between discovery attempts.
    pub discovery_backoff: Duration,
    /// Grace period between SIGTERM and SIGKILL at shutdown.
    pub grace_period: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            rpc_timeout: RPC_TIMEOUT,
            startup_timeout: STARTUP_TIMEOUT,
            discovery_attempt_timeout: DISCOVERY_ATTEMPT_TIMEOUT,
            discovery_backoff: DISCOVERY_BACKOFF,
            grace_period: supervisor::DEFAULT_GRACE_PERIOD,
        }
    }
}

// ─── RunningProvider ─────────────────────────────────────────────────────────

/// A started provider: its process handle, channel, and declared tools.
#[derive(Debug)]
pub struct RunningProvider {
    name: String,
    #[allow(dead_code)]
    config: ProviderConfig,
    child: Mutex<Child>,
    channel: RpcChannel,
    tools: Vec<ToolDescriptor>,
}

impl RunningProvider {
    /// Tools this provider declared during discovery.
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// The externally visible gateway: constructed once at startup and shared
/// (behind `Arc`) with the HTTP layer. No ambient globals.
#[derive(Debug)]
pub struct Gateway {
    providers: BTreeMap<String, RunningProvider>,
    registry: RwLock<ToolRegistry>,
    options: GatewayOptions,
}

impl Gateway {
    /// Start every configured provider and build the catalogue.
    ///
    /// Fails only when `configs` is empty ([`GatewayError::Config`]);
    /// individual spawn or discovery failures are logged and that provider's
    /// tools are simply absent.
    pub async fn start(
        configs: BTreeMap<String, ProviderConfig>,
    ) -> Result<Self, GatewayError> {
        Self::start_with(configs, GatewayOptions::default()).await
    }

    /// [`Gateway::start`] with explicit deadlines.
    pub async fn start_with(
        configs: BTreeMap<String, ProviderConfig>,
        options: GatewayOptions,
    ) -> Result<Self, GatewayError> {
        if configs.is_empty() {
            return Err(GatewayError::Config {
                reason: "no providers configured".into(),
            });
        }

        // Launch every provider concurrently; startup latency is bounded by
        // the slowest provider, not the sum.
        let mut handles = Vec::new();
        for (name, config) in configs {
            let opts = options.clone();
            handles.push((
                name.clone(),
                tokio::spawn(async move { start_provider(name, config, opts).await }),
            ));
        }

        let mut providers = BTreeMap::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(provider)) => {
                    providers.insert(name, provider);
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider = %name, error = %e, "provider failed to start");
                }
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "provider startup task failed");
                }
            }
        }

        // Registration runs in name order regardless of which provider
        // finished starting first, so duplicate-name resolution and the
        // catalogue order are stable across runs.
        let mut registry = ToolRegistry::new();
        for (name, provider) in &providers {
            let added = registry.register(name, provider.tools());
            tracing::info!(provider = %name, tools = added, "provider registered");
        }
        tracing::info!(
            providers = providers.len(),
            tools = registry.len(),
            "gateway started"
        );

        Ok(Self {
            providers,
            registry: RwLock::new(registry),
            options,
        })
    }

    /// The aggregated catalogue; a registry read, no subprocess contact.
    pub async fn list_tools(&self) -> Vec<ToolEntry> {
        self.registry.read().await.list_all().to_vec()
    }

    /// Route one tool call to the provider that owns `name`.
    ///
    /// Fails with [`GatewayError::NotFound`] before any subprocess I/O when
    /// no provider owns the name; otherwise performs one serialized
    /// `tools/call` exchange and propagates its outcome unchanged.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let owner = {
            let registry = self.registry.read().await;
            registry.resolve(name).map(str::to_string)
        };
        let owner = owner.ok_or_else(|| GatewayError::NotFound {
            name: name.to_string(),
        })?;

        let provider = self
            .providers
            .get(&owner)
            .ok_or_else(|| GatewayError::NotFound {
                name: name.to_string(),
            })?;

        let params = serde_json::json!({ "name": name, "arguments": arguments });
        provider
            .channel
            .call("tools/call", params, self.options.rpc_timeout)
            .await
    }

    /// Two-phase shutdown of every provider, then clear the registry.
    ///
    /// Termination problems are logged inside the supervisor, never raised;
    /// shutdown always completes.
    pub async fn shutdown(&self) {
        for provider in self.providers.values() {
            let mut child = provider.child.lock().await;
            supervisor::terminate(&provider.name, &mut child, self.options.grace_period).await;
        }
        self.registry.write().await.clear();
        tracing::info!("gateway shut down");
    }
}

// ─── Startup ─────────────────────────────────────────────────────────────────

/// Spawn one provider, wire its stderr drain, and run discovery.
///
/// Spawn failure is fatal for this provider; discovery failure is not — the
/// provider comes up with an empty tool list.
async fn start_provider(
    name: String,
    config: ProviderConfig,
    options: GatewayOptions,
) -> Result<RunningProvider, GatewayError> {
    let spawned = supervisor::spawn_provider(&name, &config)?;
    let mut child = spawned.child;

    // Runs for the provider's lifetime; exits on stream close.
    supervisor::drain_stderr(name.clone(), spawned.stderr);

    let channel = RpcChannel::new(&name, spawned.stdin, spawned.stdout);
    let tools = discover_tools(&name, &channel, &mut child, &options).await;

    Ok(RunningProvider {
        name: name.clone(),
        config,
        child: Mutex::new(child),
        channel,
        tools,
    })
}

/// Discovery doubles as the readiness probe: keep asking `tools/list` with
/// backoff until the provider answers or the startup deadline passes.
///
/// Best-effort by contract — every failure path returns an empty tool list
/// and the provider still counts as started.
async fn discover_tools(
    name: &str,
    channel: &RpcChannel,
    child: &mut Child,
    options: &GatewayOptions,
) -> Vec<ToolDescriptor> {
    let deadline = Instant::now() + options.startup_timeout;
    let mut backoff = options.discovery_backoff;
    let mut attempt = 0u32;

    loop {
        let remaining = deadline.duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::warn!(
                provider = %name,
                attempts = attempt,
                "tool discovery timed out, serving provider with no tools"
            );
            return Vec::new();
        }

        attempt += 1;
        let attempt_timeout = remaining.min(options.discovery_attempt_timeout);

        match channel
            .call("tools/list", serde_json::json!({}), attempt_timeout)
            .await
        {
            Ok(result) => {
                let parsed: ToolsListResult = match serde_json::from_value(result) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        tracing::warn!(
                            provider = %name,
                            error = %e,
                            "malformed tools/list result, serving provider with no tools"
                        );
                        return Vec::new();
                    }
                };
                tracing::info!(
                    provider = %name,
                    tools = parsed.tools.len(),
                    attempt,
                    "tool discovery complete"
                );
                return parsed.tools;
            }
            Err(e) => {
                // A provider that already exited will never answer.
                if let Ok(Some(status)) = child.try_wait() {
                    tracing::warn!(
                        provider = %name,
                        %status,
                        error = %e,
                        "provider exited before discovery completed"
                    );
                    return Vec::new();
                }

                tracing::debug!(
                    provider = %name,
                    error = %e,
                    attempt,
                    "discovery attempt failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                // Safe here: the provider is not serving calls yet, and the
                // id check screens replies to abandoned attempts.
                channel.recover().await;
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
