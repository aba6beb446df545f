//! Debug session requests and end-to-end orchestration.
//!
//! A session resolves the runtime for the target file, plans its mounts,
//! assembles the sandbox command and hands it to a [`SessionLauncher`].
//! Sessions share nothing; callers that must not overlap them serialize at
//! a higher layer.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::SessionLauncher;
use crate::command::{self, LaunchPlan};
use crate::config::SandboxConfig;
use crate::error::Result;
use crate::mounts;
use crate::runtime;

/// Log level forwarded to the debugger runtime, least verbose first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    /// Source file to debug, passed into the sandbox exactly as given.
    pub main_file: PathBuf,
    pub log_level: LogLevel,
}

impl SessionRequest {
    pub fn new(main_file: impl Into<PathBuf>) -> Self {
        Self {
            main_file: main_file.into(),
            log_level: LogLevel::default(),
        }
    }

    #[must_use]
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }
}

/// Resolve, plan mounts and assemble the command for `request`.
///
/// Unsupported extensions fail here, before any filesystem access.
pub fn plan(request: &SessionRequest, config: &SandboxConfig) -> Result<LaunchPlan> {
    let descriptor = runtime::resolve_for_path(&request.main_file, config)?;
    let project_dir = mounts::project_dir(&request.main_file)?;
    let mounts = mounts::build_mounts(&descriptor, &project_dir, config);

    debug!(
        file = %request.main_file.display(),
        extension = %descriptor.extension,
        image = %descriptor.image,
        "Resolved runtime"
    );

    let name = command::container_name();
    Ok(command::assemble(
        &descriptor,
        request,
        &mounts,
        config,
        Some(&name),
    ))
}

/// Run a full debug session and return the raw result payload.
///
/// The payload is expected, but not checked, to be JSON.
pub async fn run<L>(
    request: SessionRequest,
    config: &SandboxConfig,
    launcher: &L,
) -> Result<String>
where
    L: SessionLauncher + ?Sized,
{
    let plan = plan(&request, config)?;

    info!(
        file = %request.main_file.display(),
        log_level = %request.log_level,
        "Launching debug session"
    );

    let outcome = launcher.launch(&plan).await?;
    Ok(outcome.payload)
}
