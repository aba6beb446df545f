//! Extension → debugger runtime dispatch.
//!
//! A fixed table maps source file extensions to the container image that
//! bundles the matching debugger, along with any tool assets it needs
//! mounted from the host.

use std::path::Path;

use crate::config::SandboxConfig;
use crate::error::{DebugError, Result};
use crate::mounts::MountSpec;

/// Static description of one debugger runtime.
#[derive(Debug)]
pub struct RuntimeSpec {
    /// Short name, used in logs.
    pub name: &'static str,
    /// Extensions (with leading dot, lowercase) handled by this runtime.
    pub extensions: &'static [&'static str],
    /// Container image identifier.
    pub image: &'static str,
    /// Tool asset directories under the configured tools dir, mounted read-only.
    pub tools: &'static [&'static str],
}

/// Every supported runtime. Extensions must be unique across entries.
pub const RUNTIMES: &[RuntimeSpec] = &[
    RuntimeSpec {
        name: "native",
        extensions: &[".c", ".cc", ".cpp", ".cxx", ".h", ".hpp"],
        image: "debug-runtime-native",
        tools: &["gdb"],
    },
    RuntimeSpec {
        name: "python",
        extensions: &[".py"],
        image: "debug-runtime-python",
        tools: &[],
    },
    RuntimeSpec {
        name: "php",
        extensions: &[".php"],
        image: "debug-runtime-php",
        tools: &["xdebug"],
    },
];

/// A runtime resolved for a particular extension, with host paths filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDescriptor {
    pub extension: String,
    pub image: String,
    /// Runtime-specific tool mounts; may be empty.
    pub mounts: Vec<MountSpec>,
}

/// All supported extensions, in table order.
pub fn supported_extensions() -> Vec<&'static str> {
    RUNTIMES
        .iter()
        .flat_map(|rt| rt.extensions.iter().copied())
        .collect()
}

/// Look up the runtime for a normalized extension such as `".cpp"`.
pub fn resolve(extension: &str, config: &SandboxConfig) -> Result<RuntimeDescriptor> {
    let normalized = extension.to_ascii_lowercase();
    let entry = RUNTIMES
        .iter()
        .find(|rt| rt.extensions.contains(&normalized.as_str()))
        .ok_or_else(|| DebugError::UnsupportedExtension {
            extension: extension.to_string(),
            supported: supported_extensions(),
        })?;

    let mounts = entry
        .tools
        .iter()
        .map(|tool| MountSpec::identity(config.tool_path(tool), true))
        .collect();

    Ok(RuntimeDescriptor {
        extension: normalized,
        image: entry.image.to_string(),
        mounts,
    })
}

/// Resolve the runtime for a source file by its extension.
pub fn resolve_for_path(path: &Path, config: &SandboxConfig) -> Result<RuntimeDescriptor> {
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    resolve(&extension, config)
}
