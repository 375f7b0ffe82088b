//! Child process creation.
//!
//! The runtime obtains its in-namespace child by re-executing itself:
//! `clone(2)` with the namespace flags makes the new process init of a
//! fresh PID namespace, and the cloned child immediately `execve`s
//! `/proc/self/exe child <command…>` with the serialized configuration
//! appended to its environment. Stdio is inherited across clone and exec.

use std::ffi::CString;

use nix::sched::{clone, CloneFlags};
use nix::sys::signal::Signal;
use nix::unistd::{execve, Pid};

use burrow_common::config::ContainerConfig;
use burrow_common::envbridge;
use burrow_common::error::{BurrowError, Result};

/// Stack for the cloned child; only used until `execve` replaces the image.
const CHILD_STACK_SIZE: usize = 1024 * 1024;

/// Clones the container child and returns its PID.
///
/// The child gets new UTS, PID, mount, and network namespaces and runs this
/// binary's `child` role with the user command as trailing arguments.
///
/// # Errors
///
/// Returns an error if an argument contains a NUL byte or `clone(2)` fails.
/// An `execve` failure surfaces as the child exiting with status 127.
pub fn spawn_child(config: &ContainerConfig) -> Result<Pid> {
    let exe = cstring("/proc/self/exe")?;
    let mut argv = vec![exe.clone(), cstring("child")?];
    for arg in &config.command {
        argv.push(cstring(arg)?);
    }
    let env = child_environment(config)?;

    let mut stack = vec![0u8; CHILD_STACK_SIZE];
    let flags = CloneFlags::CLONE_NEWUTS
        | CloneFlags::CLONE_NEWPID
        | CloneFlags::CLONE_NEWNS
        | CloneFlags::CLONE_NEWNET;

    let child = Box::new(|| {
        if let Err(err) = execve(&exe, &argv, &env) {
            eprintln!("failed to re-exec container child: {err}");
        }
        127
    });

    // SAFETY: the callback only execs; it touches no parent state beyond the
    // pre-built argv/env buffers copied into the child's address space.
    unsafe { clone(child, &mut stack, flags, Some(Signal::SIGCHLD as i32)) }.map_err(|e| {
        BurrowError::Spawn {
            message: format!("failed to clone container child: {e}"),
        }
    })
}

/// Builds the child's environment: the parent's, minus anything in the
/// reserved `CONTAINER_*` namespace, plus the bridge variables.
fn child_environment(config: &ContainerConfig) -> Result<Vec<CString>> {
    let mut env = Vec::new();
    for (key, value) in std::env::vars() {
        if key.starts_with("CONTAINER_") {
            continue;
        }
        env.push(cstring(&format!("{key}={value}"))?);
    }
    for (key, value) in envbridge::to_env(config) {
        env.push(cstring(&format!("{key}={value}"))?);
    }
    Ok(env)
}

fn cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| BurrowError::Spawn {
        message: format!("NUL byte in argument {s:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_bytes_are_rejected() {
        assert!(cstring("a\0b").is_err());
    }

    #[test]
    fn child_environment_carries_bridge_and_drops_reserved_keys() {
        // Vars are process-global; use a key no other test touches.
        std::env::set_var("CONTAINER_SMUGGLED", "1");
        let config = ContainerConfig {
            command: vec!["/bin/true".into()],
            ..ContainerConfig::default()
        };

        let env = child_environment(&config).expect("env builds");
        let entries: Vec<String> = env
            .into_iter()
            .map(|c| c.into_string().expect("utf-8"))
            .collect();

        assert!(entries.iter().any(|e| e == "CONTAINER_HOSTNAME=container"));
        assert!(!entries.iter().any(|e| e.starts_with("CONTAINER_SMUGGLED=")));
        std::env::remove_var("CONTAINER_SMUGGLED");
    }
}
