//! Session launcher trait and implementations.
//!
//! A launcher runs an assembled [`LaunchPlan`] and hands back the result the
//! debugger printed. The terminal launcher is the real one; tests swap in
//! their own.

mod terminal;

pub use terminal::TerminalLauncher;

use async_trait::async_trait;

use crate::command::LaunchPlan;
use crate::error::Result;

/// What a finished session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Exit code of the sandbox process, `None` if killed by a signal.
    pub exit_code: Option<i32>,
    /// Trimmed text found between the result sentinels.
    pub payload: String,
}

/// Trait for running a planned session.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Run `plan` to completion and return its extracted result.
    ///
    /// Fails with `Process` if the program cannot be started and with
    /// `IncompleteResult` if its output ends without a result block.
    async fn launch(&self, plan: &LaunchPlan) -> Result<LaunchOutcome>;
}
