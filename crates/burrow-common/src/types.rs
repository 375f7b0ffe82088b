//! Domain primitive types used across the burrow workspace.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::BurrowError;

/// A bind mount from a host path to a path inside the container.
///
/// Materialized in the child's mount namespace before the root change and
/// torn down implicitly when that namespace is destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    /// Host path to expose inside the container.
    pub source: PathBuf,
    /// Path inside the container the source appears at.
    pub destination: PathBuf,
    /// Whether the mount is remounted read-only.
    pub read_only: bool,
}

impl BindMount {
    /// Creates a read-write bind mount.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            read_only: false,
        }
    }
}

impl FromStr for BindMount {
    type Err = BurrowError;

    /// Parses the CLI mount syntax `host:container[:ro]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let read_only = match parts.as_slice() {
            [_, _] => false,
            [_, _, "ro"] => true,
            _ => {
                return Err(BurrowError::Config {
                    message: format!("mount spec '{s}' is not host:container[:ro]"),
                })
            }
        };
        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(BurrowError::Config {
                message: format!("mount spec '{s}' has an empty path"),
            });
        }
        Ok(Self {
            source: PathBuf::from(parts[0]),
            destination: PathBuf::from(parts[1]),
            read_only,
        })
    }
}

impl fmt::Display for BindMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}{}",
            self.source.display(),
            self.destination.display(),
            if self.read_only { " (read-only)" } else { "" }
        )
    }
}

/// Resource limits applied to the per-run control group.
///
/// Empty strings mean "do not constrain"; the fields are written verbatim to
/// the cgroup-v2 control files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgroupLimits {
    /// Group name under the unified hierarchy root.
    pub name: String,
    /// Value for `pids.max`.
    pub max_pids: String,
    /// Value for `memory.max`, in bytes.
    pub memory_limit: String,
    /// Quota half of `cpu.max`, in microseconds per period.
    pub cpu_quota: String,
    /// Period half of `cpu.max`, in microseconds.
    pub cpu_period: String,
}

impl Default for CgroupLimits {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_CGROUP_NAME.into(),
            max_pids: "max".into(),
            memory_limit: String::new(),
            cpu_quota: String::new(),
            cpu_period: constants::DEFAULT_CPU_PERIOD.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_two_parts_is_read_write() {
        let m: BindMount = "a:b".parse().expect("valid spec");
        assert_eq!(m.source, PathBuf::from("a"));
        assert_eq!(m.destination, PathBuf::from("b"));
        assert!(!m.read_only);
    }

    #[test]
    fn mount_ro_suffix_is_read_only() {
        let m: BindMount = "/etc/hostname:/x:ro".parse().expect("valid spec");
        assert!(m.read_only);
    }

    #[test]
    fn mount_rejects_other_shapes() {
        for bad in ["a", "a:b:rw", "a:b:ro:c", "", ":b", "a:"] {
            assert!(bad.parse::<BindMount>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn mount_display_marks_read_only() {
        let m: BindMount = "/src:/dst:ro".parse().expect("valid spec");
        assert_eq!(format!("{m}"), "/src -> /dst (read-only)");
    }

    #[test]
    fn cgroup_limits_defaults() {
        let limits = CgroupLimits::default();
        assert_eq!(limits.name, "namespace_test");
        assert_eq!(limits.max_pids, "max");
        assert!(limits.memory_limit.is_empty());
        assert!(limits.cpu_quota.is_empty());
        assert_eq!(limits.cpu_period, "100000");
    }
}
