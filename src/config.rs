//! Process-wide sandbox configuration.
//!
//! Paths shared by every session (output, dependency and tool-asset
//! directories) plus the sandbox program to invoke. Optionally overridden by
//! JSON in the `DEBUG_SANDBOX_CONFIG` environment variable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

/// Environment variable holding a JSON configuration override.
pub const CONFIG_ENV: &str = "DEBUG_SANDBOX_CONFIG";

/// Environment variable overriding the sandbox program.
pub const PROGRAM_ENV: &str = "DEBUG_SANDBOX_PROGRAM";

/// Immutable configuration shared by the mount planner and command assembler.
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    /// Container runtime executable (e.g. `docker`, `podman`).
    #[serde(default = "default_program")]
    pub program: String,

    /// Directory relative paths below are resolved against.
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,

    /// This program's build output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// This program's dependency directory.
    #[serde(default = "default_dependency_dir")]
    pub dependency_dir: PathBuf,

    /// Root of the per-runtime debugger tool assets.
    #[serde(default = "default_tools_dir")]
    pub tools_dir: PathBuf,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::with_install_root(default_install_root())
    }
}

impl SandboxConfig {
    /// Build a configuration with default directories under `root`.
    pub fn with_install_root(root: impl Into<PathBuf>) -> Self {
        Self {
            program: default_program(),
            install_root: root.into(),
            output_dir: default_output_dir(),
            dependency_dir: default_dependency_dir(),
            tools_dir: default_tools_dir(),
        }
    }

    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(json) => Self::from_json(&json)
                .with_context(|| format!("Failed to parse {CONFIG_ENV}"))?,
            Err(_) => Self::default(),
        };

        if let Ok(program) = std::env::var(PROGRAM_ENV) {
            if !program.is_empty() {
                config.program = program;
            }
        }

        debug!(
            program = %config.program,
            install_root = %config.install_root.display(),
            "Loaded sandbox configuration"
        );
        Ok(config)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse JSON")?;
        Ok(config)
    }

    /// Absolute path of the output directory.
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    /// Absolute path of the dependency directory.
    pub fn dependency_path(&self) -> PathBuf {
        self.resolve(&self.dependency_dir)
    }

    /// Absolute path of a runtime's tool assets, e.g. `tool_path("gdb")`.
    pub fn tool_path(&self, name: &str) -> PathBuf {
        self.resolve(&self.tools_dir).join(name)
    }

    fn resolve(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            return dir.to_path_buf();
        }
        if self.install_root.is_absolute() {
            return self.install_root.join(dir);
        }
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(&self.install_root).join(dir),
            Err(e) => {
                warn!(
                    install_root = %self.install_root.display(),
                    error = %e,
                    "Cannot read current directory, mount path stays relative"
                );
                self.install_root.join(dir)
            }
        }
    }
}

fn default_program() -> String {
    "docker".into()
}

/// Directory holding the running executable.
fn default_install_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| ".".into())
}

fn default_output_dir() -> PathBuf {
    "out".into()
}

fn default_dependency_dir() -> PathBuf {
    "node_modules".into()
}

fn default_tools_dir() -> PathBuf {
    "runtimes".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "program": "podman",
            "install_root": "/opt/debug-sandbox",
            "output_dir": "dist",
            "dependency_dir": "vendor",
            "tools_dir": "/srv/tools"
        }"#;

        let config = SandboxConfig::from_json(json).unwrap();

        assert_eq!(config.program, "podman");
        assert_eq!(config.output_path(), PathBuf::from("/opt/debug-sandbox/dist"));
        assert_eq!(
            config.dependency_path(),
            PathBuf::from("/opt/debug-sandbox/vendor")
        );
        // Absolute directories are not re-rooted
        assert_eq!(config.tool_path("gdb"), PathBuf::from("/srv/tools/gdb"));
    }

    #[test]
    fn parse_applies_defaults() {
        let config = SandboxConfig::from_json(r#"{"install_root": "/opt/ds"}"#).unwrap();

        assert_eq!(config.program, "docker");
        assert_eq!(config.output_path(), PathBuf::from("/opt/ds/out"));
        assert_eq!(config.dependency_path(), PathBuf::from("/opt/ds/node_modules"));
        assert_eq!(config.tool_path("xdebug"), PathBuf::from("/opt/ds/runtimes/xdebug"));
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(SandboxConfig::from_json("{not json").is_err());
    }

    #[test]
    fn relative_install_root_is_made_absolute() {
        let config = SandboxConfig::with_install_root("relative/root");
        let out = config.output_path();
        assert!(out.is_absolute());
        assert!(out.ends_with("relative/root/out"));
    }

    #[test]
    fn default_install_root_is_executable_dir() {
        let config = SandboxConfig::default();
        let exe = std::env::current_exe().unwrap();
        assert_eq!(Some(config.install_root.as_path()), exe.parent());
    }

    #[test]
    fn tempdir_install_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = SandboxConfig::with_install_root(dir.path());
        assert!(config.output_path().starts_with(dir.path()));
        assert!(config.tool_path("gdb").starts_with(dir.path()));
    }
}
