//! Network-namespace handles.
//!
//! A [`Netns`] is a scoped acquisition of `/proc/<pid>/ns/net`; entering one
//! switches the *calling thread* only, so callers keep namespace changes on
//! a dedicated thread.

use std::fs::File;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use nix::sched::{setns, CloneFlags};
use nix::unistd::Pid;

use burrow_common::error::{BurrowError, Result};

/// An open file descriptor to a network namespace.
#[derive(Debug)]
pub struct Netns {
    fd: OwnedFd,
}

impl Netns {
    /// Acquires the calling process's own network namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if `/proc/self/ns/net` cannot be opened.
    pub fn current() -> Result<Self> {
        Self::open("/proc/self/ns/net".into())
    }

    /// Acquires the network namespace of another process.
    ///
    /// # Errors
    ///
    /// Returns an error if `/proc/<pid>/ns/net` cannot be opened.
    pub fn from_pid(pid: Pid) -> Result<Self> {
        Self::open(format!("/proc/{}/ns/net", pid.as_raw()))
    }

    fn open(path: String) -> Result<Self> {
        let file = File::open(&path).map_err(|e| BurrowError::Namespace {
            message: format!("failed to open {path}: {e}"),
        })?;
        Ok(Self { fd: file.into() })
    }

    /// Moves the calling thread into this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if `setns(2)` fails.
    pub fn enter(&self) -> Result<()> {
        setns(self.fd.as_fd(), CloneFlags::CLONE_NEWNET).map_err(|e| BurrowError::Namespace {
            message: format!("failed to enter network namespace: {e}"),
        })
    }
}

impl AsFd for Netns {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_namespace_is_openable() {
        Netns::current().expect("own namespace should open");
    }

    #[test]
    fn own_pid_matches_current() {
        // Both paths resolve to the same namespace inode.
        Netns::from_pid(Pid::this()).expect("own PID namespace should open");
    }

    #[test]
    fn nonexistent_pid_fails() {
        // PID 0 has no /proc entry.
        assert!(Netns::from_pid(Pid::from_raw(0)).is_err());
    }
}
