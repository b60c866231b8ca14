//! Gateway configuration loading.
//!
//! Reads the provider catalogue from a JSON file shaped
//! `{"mcp": {"servers": {<name>: {"command", "args", "env"}}}}`. The file
//! path and the HTTP listen port come from the environment (`MCP_CONFIG`,
//! `MCP_PORT`) with sensible defaults.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::errors::GatewayError;

/// Default config file path when `MCP_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default HTTP listen port when `MCP_PORT` is unset.
const DEFAULT_PORT: u16 = 8808;

// ─── Public Types ────────────────────────────────────────────────────────────

/// Launch configuration for one tool provider.
///
/// `env` entries overlay the ambient process environment; ambient keys not
/// named here are inherited unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// The `mcp` section of the config file.
///
/// `servers` is a `BTreeMap` so provider registration order is the sorted
/// name order — duplicate tool names then resolve the same way on every run.
#[derive(Debug, Clone, Deserialize)]
struct McpSection {
    #[serde(default)]
    servers: BTreeMap<String, ProviderConfig>,
}

/// Top-level config file shape.
#[derive(Debug, Clone, Deserialize)]
struct GatewayConfigFile {
    mcp: McpSection,
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Load the provider catalogue from `path`.
///
/// Fails with [`GatewayError::Config`] when the file is unreadable or
/// unparseable, when no providers are configured, or when a provider name
/// is empty.
pub fn load_config(path: &Path) -> Result<BTreeMap<String, ProviderConfig>, GatewayError> {
    let raw = std::fs::read_to_string(path).map_err(|e| GatewayError::Config {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    let parsed: GatewayConfigFile =
        serde_json::from_str(&raw).map_err(|e| GatewayError::Config {
            reason: format!("failed to parse {}: {e}", path.display()),
        })?;

    let servers = parsed.mcp.servers;
    if servers.is_empty() {
        return Err(GatewayError::Config {
            reason: format!("no providers configured in {}", path.display()),
        });
    }
    if servers.keys().any(|name| name.is_empty()) {
        return Err(GatewayError::Config {
            reason: format!("empty provider name in {}", path.display()),
        });
    }

    Ok(servers)
}

/// Config file path: `MCP_CONFIG` or `config.json`.
pub fn config_path() -> PathBuf {
    std::env::var("MCP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// HTTP listen port: `MCP_PORT` or 8808.
pub fn listen_port() -> Result<u16, GatewayError> {
    match std::env::var("MCP_PORT") {
        Ok(raw) => raw.parse().map_err(|_| GatewayError::Config {
            reason: format!("MCP_PORT is not a valid port: '{raw}'"),
        }),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config_full_shape() {
        let file = write_config(
            r#"{
                "mcp": {
                    "servers": {
                        "files": {
                            "command": "python",
                            "args": ["-m", "files_server"],
                            "env": {"DEBUG": "1"}
                        },
                        "search": {"command": "search-server"}
                    }
                }
            }"#,
        );

        let servers = load_config(file.path()).unwrap();
        assert_eq!(servers.len(), 2);

        let files = &servers["files"];
        assert_eq!(files.command, "python");
        assert_eq!(files.args, vec!["-m", "files_server"]);
        assert_eq!(files.env.get("DEBUG").map(String::as_str), Some("1"));

        // args and env default to empty
        let search = &servers["search"];
        assert!(search.args.is_empty());
        assert!(search.env.is_empty());
    }

    #[test]
    fn test_load_config_orders_providers_by_name() {
        let file = write_config(
            r#"{"mcp": {"servers": {
                "zeta": {"command": "z"},
                "alpha": {"command": "a"},
                "mid": {"command": "m"}
            }}}"#,
        );
        let servers = load_config(file.path()).unwrap();
        let names: Vec<&str> = servers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, GatewayError::Config { .. }));
    }

    #[test]
    fn test_load_config_empty_servers() {
        let file = write_config(r#"{"mcp": {"servers": {}}}"#);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("no providers configured"));
    }

    #[test]
    fn test_load_config_missing_servers_key() {
        let file = write_config(r#"{"mcp": {}}"#);
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, GatewayError::Config { .. }));
    }

    #[test]
    fn test_load_config_empty_provider_name() {
        let file = write_config(r#"{"mcp": {"servers": {"": {"command": "x"}}}}"#);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("empty provider name"));
    }

    #[test]
    fn test_load_config_invalid_json() {
        let file = write_config("not json");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, GatewayError::Config { .. }));
    }

    #[test]
    fn test_listen_port_env_handling() {
        // Checks run sequentially in one test: MCP_PORT is process-global.
        std::env::remove_var("MCP_PORT");
        assert_eq!(listen_port().unwrap(), 8808);

        std::env::set_var("MCP_PORT", "9102");
        assert_eq!(listen_port().unwrap(), 9102);

        std::env::set_var("MCP_PORT", "not-a-port");
        assert!(listen_port().is_err());

        std::env::remove_var("MCP_PORT");
    }

    #[test]
    fn test_config_path_env_handling() {
        std::env::remove_var("MCP_CONFIG");
        assert_eq!(config_path(), PathBuf::from("config.json"));

        std::env::set_var("MCP_CONFIG", "/etc/gateway/providers.json");
        assert_eq!(config_path(), PathBuf::from("/etc/gateway/providers.json"));

        std::env::remove_var("MCP_CONFIG");
    }
}
