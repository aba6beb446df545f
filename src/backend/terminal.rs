//! Terminal-attached launcher.
//!
//! Runs the sandbox with stdin and stderr inherited from this process. Stdout
//! is piped so it can be copied to the terminal and scanned for the result
//! at the same time.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use super::{LaunchOutcome, SessionLauncher};
use crate::command::LaunchPlan;
use crate::error::{DebugError, Result};
use crate::extract;

/// Launcher that shares the controlling terminal with the debugger.
#[derive(Debug, Default, Clone)]
pub struct TerminalLauncher {
    /// Bound on the wait for a result. `None` waits as long as the process runs.
    result_timeout: Option<Duration>,
}

impl TerminalLauncher {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            result_timeout: None,
        }
    }

    /// Kill the session if no result has arrived after `timeout`.
    #[must_use]
    pub fn with_result_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.result_timeout = timeout;
        self
    }
}

#[async_trait]
impl SessionLauncher for TerminalLauncher {
    #[instrument(skip(self, plan), fields(program = %plan.command))]
    async fn launch(&self, plan: &LaunchPlan) -> Result<LaunchOutcome> {
        let process_error = |source: std::io::Error| DebugError::Process {
            program: plan.command.clone(),
            source,
        };

        debug!(args = ?plan.args, "Starting sandbox");

        let mut child = Command::new(&plan.command)
            .args(&plan.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(process_error)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| process_error(std::io::Error::other("stdout was not captured")))?;

        // Listen before waiting so nothing printed early is missed
        let (tx, rx) = oneshot::channel();
        let tap = tokio::spawn(extract::tap(stdout, tokio::io::stdout(), tx));

        let received = match self.result_timeout {
            None => rx.await,
            Some(limit) => {
                if let Ok(received) = tokio::time::timeout(limit, rx).await {
                    received
                } else {
                    warn!(timeout = ?limit, "No result before timeout, killing sandbox");
                    stop_sandbox(plan, &mut child).await;
                    if let Err(e) = tap.await {
                        warn!(error = %e, "Output passthrough task panicked");
                    }
                    return Err(DebugError::ResultTimeout {
                        seconds: limit.as_secs(),
                    });
                }
            }
        };

        let status = child.wait().await.map_err(process_error)?;

        match tap.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Output passthrough failed"),
            Err(e) => warn!(error = %e, "Output passthrough task panicked"),
        }

        let exit_code = status.code();
        if !status.success() {
            warn!(exit_code = ?exit_code, "Sandbox exited unsuccessfully");
        }

        let payload = received.map_err(|_| DebugError::IncompleteResult)?;
        info!(exit_code = ?exit_code, payload_len = payload.len(), "Session finished");

        Ok(LaunchOutcome { exit_code, payload })
    }
}

/// Stop the container, then the client process.
///
/// Killing only the client leaves the container running, since SIGKILL is
/// not forwarded to it.
async fn stop_sandbox(plan: &LaunchPlan, child: &mut Child) {
    if let Some(name) = &plan.container_name {
        let status = Command::new(&plan.command)
            .args(["kill", name.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) if status.success() => debug!(container = %name, "Container killed"),
            Ok(status) => {
                warn!(container = %name, exit_code = ?status.code(), "Failed to kill container");
            }
            Err(e) => warn!(container = %name, error = %e, "Failed to run container kill"),
        }
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill sandbox client");
    }
}
