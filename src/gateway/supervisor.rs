//! Provider process lifecycle.
//!
//! Spawns one OS subprocess per configured provider with piped stdio, placed
//! in its own process group so the whole subtree can be signaled together,
//! and terminates it in two phases (graceful signal, bounded wait, forceful
//! kill). Stderr is drained continuously so a chatty provider never blocks
//! on a full pipe.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use super::config::ProviderConfig;
use super::errors::GatewayError;

/// Default grace period between the termination signal and the forced kill.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

// ─── Spawning ────────────────────────────────────────────────────────────────

/// A freshly spawned provider process with its pipes taken.
#[derive(Debug)]
pub struct SpawnedProvider {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Spawn a provider subprocess with all three stdio pipes captured.
///
/// The command runs exec-style (no shell). `env` entries overlay the ambient
/// environment; ambient keys not named in `env` are inherited unchanged. On
/// Unix the child becomes the leader of a new process group.
pub fn spawn_provider(name: &str, config: &ProviderConfig) -> Result<SpawnedProvider, GatewayError> {
    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args);

    for (key, value) in &config.env {
        cmd.env(key, value);
    }

    // Wire stdio for JSON-RPC plus diagnostics
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| GatewayError::Spawn {
        name: name.to_string(),
        reason: format!("{e}"),
    })?;

    let stdin = child.stdin.take().ok_or(GatewayError::Spawn {
        name: name.to_string(),
        reason: "failed to capture stdin".into(),
    })?;

    let stdout = child.stdout.take().ok_or(GatewayError::Spawn {
        name: name.to_string(),
        reason: "failed to capture stdout".into(),
    })?;

    let stderr = child.stderr.take().ok_or(GatewayError::Spawn {
        name: name.to_string(),
        reason: "failed to capture stderr".into(),
    })?;

    Ok(SpawnedProvider {
        child,
        stdin,
        stdout,
        stderr,
    })
}

// ─── Termination ─────────────────────────────────────────────────────────────

/// Terminate a provider's process group.
///
/// Sends a graceful termination signal to the group, waits up to `grace`,
/// then force-kills the group if it has not exited. Idempotent: a process
/// that already exited is reaped, not an error. Never fails after the
/// best-effort kill.
pub async fn terminate(name: &str, child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        if !signal_group(child, libc::SIGTERM) {
            // Group already gone; reap a possible zombie and be done
            let _ = child.wait().await;
            return;
        }

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(provider = %name, %status, "provider exited after SIGTERM");
            }
            _ => {
                tracing::warn!(provider = %name, "grace period expired, force-killing process group");
                signal_group(child, libc::SIGKILL);
                // SIGKILL cannot be caught; the wait returns promptly
                let _ = child.wait().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(_) => {}
            Err(_) => tracing::warn!(provider = %name, "provider did not exit after kill"),
        }
    }
}

/// Signal the child's process group. Returns `false` when the group no
/// longer exists (or the child was already reaped).
#[cfg(unix)]
fn signal_group(child: &Child, signal: i32) -> bool {
    match child.id() {
        // The child was spawned with process_group(0), so its pid is the pgid.
        Some(pid) => unsafe { libc::killpg(pid as i32, signal) == 0 },
        None => false,
    }
}

// ─── Stderr Drain ────────────────────────────────────────────────────────────

/// Continuously drain a provider's stderr, logging each line.
///
/// Runs on its own task for the provider's lifetime and exits quietly when
/// the stream closes or errors — this is a diagnostic sink, never part of
/// the request/response path.
pub fn drain_stderr(name: String, stderr: ChildStderr) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => tracing::info!(provider = %name, "stderr: {line}"),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(provider = %name, error = %e, "stderr read failed");
                    break;
                }
            }
        }
        tracing::debug!(provider = %name, "stderr drain finished");
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
