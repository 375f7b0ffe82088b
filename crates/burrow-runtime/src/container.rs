//! Parent and child roles of the container lifecycle.
//!
//! The parent owns host-global state: it prepares the rootfs, clones the
//! child, wires its network, waits, and tears down NAT rules and the cgroup
//! directory no matter how the child finished. The child owns in-namespace
//! state: cgroup membership, mounts, hostname, root, and the user command.

use std::path::Path;
use std::process::{Command, ExitStatus};

use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;

use burrow_common::config::ContainerConfig;
use burrow_common::constants;
use burrow_common::envbridge;
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::CgroupLimits;
use burrow_core::cgroup::CgroupManager;
use burrow_core::filesystem;
use burrow_core::network;

/// Runs a container to completion; the parent role.
///
/// Returns the exit code of the user command (`128 + signal` when it was
/// killed by a signal).
///
/// # Errors
///
/// Returns an error if validation, rootfs preparation, the spawn, or
/// network setup fails. A network failure kills and reaps the child before
/// the error propagates.
pub fn run_container(config: &ContainerConfig) -> Result<i32> {
    config.validate()?;
    filesystem::prepare_rootfs(&config.rootfs)?;

    tracing::info!(command = ?config.command, "starting container");
    if !config.mounts.is_empty() {
        tracing::info!(mounts = config.mounts.len(), "bind mounts configured");
    }

    let child = crate::spawn::spawn_child(config)?;
    tracing::info!(pid = child.as_raw(), "container started");
    arm_sigint_handler(child);

    if let Err(e) = network::setup_networking(child, config) {
        let _ = kill(child, Signal::SIGKILL);
        let _ = waitpid(child, None);
        return Err(e);
    }
    tracing::info!("network setup completed");

    let status = wait_for_child(child);

    network::cleanup_networking(config);
    if let Err(e) = CgroupManager::new(&CgroupLimits::default()).destroy() {
        tracing::debug!("cgroup removal failed: {e}");
    }
    tracing::info!("container finished");
    status
}

/// Runs the re-entered child role.
///
/// Reconstructs the configuration from the environment, joins the cgroup,
/// builds the in-namespace filesystem, and reaps the user command, running
/// it from `/app` when that directory exists inside the new root.
///
/// # Errors
///
/// Returns an error if any setup step fails. A command that cannot be
/// executed exits 127; one that runs but fails propagates its own status.
pub fn run_child(command: &[String]) -> Result<i32> {
    let mut config = envbridge::from_env()?;
    config.command = command.to_vec();
    tracing::debug!(
        hostname = %config.hostname,
        rootfs = %config.rootfs.display(),
        "child starting"
    );

    let cgroup = CgroupManager::new(&CgroupLimits::default());
    cgroup.setup()?;
    cgroup.join()?;
    tracing::debug!(stats = ?cgroup.stats(), "cgroup joined");

    filesystem::setup_filesystem(&config)?;
    tracing::debug!("filesystem setup completed");

    let mut cmd = Command::new(&command[0]);
    cmd.args(&command[1..]);
    if Path::new(constants::APP_DIR).is_dir() {
        cmd.current_dir(constants::APP_DIR);
        tracing::debug!("working directory set to {}", constants::APP_DIR);
    }

    let run = cmd.status();
    filesystem::cleanup_filesystem();

    match run {
        Ok(status) => Ok(exit_code(status)),
        Err(e) => {
            tracing::error!("failed to execute {:?}: {e}", command[0]);
            Ok(127)
        }
    }
}

/// Kills the child on SIGINT so `waitpid` returns and teardown still runs.
/// Without this, an interrupted parent would leak the iptables rules.
fn arm_sigint_handler(child: Pid) {
    let raw = child.as_raw();
    let result = ctrlc::set_handler(move || {
        let _ = kill(Pid::from_raw(raw), Signal::SIGKILL);
    });
    if let Err(e) = result {
        tracing::warn!("failed to install SIGINT handler: {e}");
    }
}

fn wait_for_child(child: Pid) -> Result<i32> {
    match waitpid(child, None) {
        Ok(status) => wait_status_code(status),
        Err(e) => Err(BurrowError::Spawn {
            message: format!("failed to wait for child: {e}"),
        }),
    }
}

/// Maps a terminal wait status to a shell-style exit code.
fn wait_status_code(status: WaitStatus) -> Result<i32> {
    match status {
        WaitStatus::Exited(_, code) => Ok(code),
        WaitStatus::Signaled(_, signal, _) => Ok(128 + signal as i32),
        other => Err(BurrowError::Spawn {
            message: format!("unexpected wait status: {other:?}"),
        }),
    }
}

/// Maps a reaped command's status to an exit code.
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .unwrap_or_else(|| status.signal().map_or(1, |signal| 128 + signal))
}

#[cfg(test)]
mod tests {
    use std::os::unix::process::ExitStatusExt;

    use super::*;

    #[test]
    fn exited_status_propagates_code() {
        let status = WaitStatus::Exited(Pid::from_raw(42), 3);
        assert_eq!(wait_status_code(status).expect("terminal status"), 3);
    }

    #[test]
    fn signaled_status_maps_to_128_plus_signal() {
        let status = WaitStatus::Signaled(Pid::from_raw(42), Signal::SIGKILL, false);
        assert_eq!(wait_status_code(status).expect("terminal status"), 137);
    }

    #[test]
    fn non_terminal_status_is_an_error() {
        let status = WaitStatus::Stopped(Pid::from_raw(42), Signal::SIGSTOP);
        assert!(wait_status_code(status).is_err());
    }

    #[test]
    fn command_exit_codes_map_like_a_shell() {
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(1 << 8)), 1);
        // Raw status 9 means "killed by SIGKILL".
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }
}
