//! Unified error types for the burrow workspace.
//!
//! Every variant names the phase it belongs to in its display string, so
//! operator-facing messages identify where a run failed without extra
//! wrapping.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BurrowError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A privilege requirement is not met.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denied operation.
        message: String,
    },

    /// A cgroup operation failed.
    #[error("cgroup error: {message}")]
    Cgroup {
        /// Description of the failed operation.
        message: String,
    },

    /// A mount, chroot, or other in-namespace filesystem step failed.
    #[error("filesystem error: {message}")]
    Filesystem {
        /// Description of the failed step.
        message: String,
    },

    /// A netlink round trip failed.
    #[error("netlink error: {message}")]
    Netlink {
        /// Description of the failed operation.
        message: String,
    },

    /// A namespace acquisition or switch failed.
    #[error("namespace error: {message}")]
    Namespace {
        /// Description of the failed operation.
        message: String,
    },

    /// An iptables invocation failed.
    #[error("firewall error: {message}")]
    Firewall {
        /// Description of the failed rule operation.
        message: String,
    },

    /// Cloning or executing the container child failed.
    #[error("spawn error: {message}")]
    Spawn {
        /// Description of the failure.
        message: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BurrowError>;
