//! Bind mount planning.
//!
//! Every mount exposes a host path at the same path inside the sandbox, so
//! the file path handed to the debugger resolves identically on both sides.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::config::SandboxConfig;
use crate::runtime::RuntimeDescriptor;

/// Kind of filesystem binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountType {
    #[default]
    Bind,
}

impl MountType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bind => "bind",
        }
    }
}

/// A single host → sandbox filesystem binding.
///
/// The source must exist on the host; that is left for the container
/// runtime to enforce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub source: PathBuf,
    pub target: PathBuf,
    pub read_only: bool,
    pub kind: MountType,
}

impl MountSpec {
    /// Bind `path` at the same location inside the sandbox.
    pub fn identity(path: impl Into<PathBuf>, read_only: bool) -> Self {
        let path = path.into();
        Self {
            target: path.clone(),
            source: path,
            read_only,
            kind: MountType::Bind,
        }
    }

    fn is_empty(&self) -> bool {
        self.source.as_os_str().is_empty() || self.target.as_os_str().is_empty()
    }
}

/// Absolute directory containing `main_file`.
///
/// Relative paths are anchored at the current directory, then `.` and `..`
/// are folded lexically. Symlinks are not resolved, so the result matches
/// what the caller typed.
pub fn project_dir(main_file: &Path) -> std::io::Result<PathBuf> {
    let absolute = if main_file.is_absolute() {
        main_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(main_file)
    };
    let absolute = normalize(&absolute);
    Ok(absolute
        .parent()
        .map_or_else(|| absolute.clone(), Path::to_path_buf))
}

/// Drop `.` components and collapse `..` against the preceding component.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Compute the ordered mount set for a session.
///
/// Order: runtime tool assets, output dir, dependency dir, project dir.
/// Entries without a source or target are dropped.
pub fn build_mounts(
    descriptor: &RuntimeDescriptor,
    project_dir: &Path,
    config: &SandboxConfig,
) -> Vec<MountSpec> {
    let mounts: Vec<MountSpec> = descriptor
        .mounts
        .iter()
        .cloned()
        .chain([
            MountSpec::identity(config.output_path(), true),
            MountSpec::identity(config.dependency_path(), true),
            MountSpec::identity(project_dir, false),
        ])
        .filter(|m| !m.is_empty())
        .collect();

    debug!(
        image = %descriptor.image,
        count = mounts.len(),
        project = %project_dir.display(),
        "Planned mounts"
    );
    mounts
}
