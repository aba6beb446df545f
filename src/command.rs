//! Sandbox command assembly.

use std::fmt;

use uuid::Uuid;

use crate::config::SandboxConfig;
use crate::mounts::MountSpec;
use crate::runtime::RuntimeDescriptor;
use crate::session::SessionRequest;

/// Environment variable carrying the debugger's log level.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Fully assembled external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub command: String,
    pub args: Vec<String>,
    /// Name given to the container, used to stop it from outside the client.
    pub container_name: Option<String>,
}

/// Fresh, unique container name for one session.
pub fn container_name() -> String {
    format!("debug-sandbox-{}", Uuid::new_v4().simple())
}

/// Serialize a mount as a `--mount` flag value.
///
/// `readonly` is appended only for read-only mounts.
pub fn mount_flag(mount: &MountSpec) -> String {
    let mut flag = format!(
        "type={},source={},target={}",
        mount.kind.as_str(),
        mount.source.display(),
        mount.target.display()
    );
    if mount.read_only {
        flag.push_str(",readonly");
    }
    flag
}

/// Build the interactive, auto-removing `run` invocation for a session.
///
/// With `name`, the container is started as `--name <name>`.
pub fn assemble(
    descriptor: &RuntimeDescriptor,
    request: &SessionRequest,
    mounts: &[MountSpec],
    config: &SandboxConfig,
    name: Option<&str>,
) -> LaunchPlan {
    let mut args: Vec<String> = vec!["run".into(), "-it".into(), "--rm".into()];

    let container_name = name.filter(|n| !n.is_empty()).map(str::to_string);
    if let Some(name) = &container_name {
        args.push("--name".into());
        args.push(name.clone());
    }

    args.push("--env".into());
    args.push(format!("{LOG_LEVEL_ENV}={}", request.log_level));

    for mount in mounts {
        if mount.source.as_os_str().is_empty() || mount.target.as_os_str().is_empty() {
            continue;
        }
        args.push("--mount".into());
        args.push(mount_flag(mount));
    }

    args.push(descriptor.image.clone());
    args.push(request.main_file.to_string_lossy().into_owned());
    args.retain(|arg| !arg.is_empty());

    LaunchPlan {
        command: config.program.clone(),
        args,
        container_name,
    }
}

impl fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::join(
            std::iter::once(&self.command).chain(&self.args),
        ))
    }
}
