//! Cgroups v2 resource management.
//!
//! Creates a per-run control group under the unified hierarchy at
//! `/sys/fs/cgroup`, applies PID/memory/CPU limits, and joins the calling
//! process. Control files absent on the running kernel are skipped
//! silently; the kernel simply does not offer that controller here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use burrow_common::constants;
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::CgroupLimits;

/// Control files read back by [`CgroupManager::stats`].
const STAT_FILES: [&str; 4] = ["pids.current", "memory.current", "memory.max", "cpu.stat"];

/// Handle to one container's control group.
#[derive(Debug)]
pub struct CgroupManager {
    path: PathBuf,
    limits: CgroupLimits,
}

impl CgroupManager {
    /// Creates a manager for the given limits under `/sys/fs/cgroup`.
    ///
    /// No filesystem state is touched until [`CgroupManager::setup`].
    #[must_use]
    pub fn new(limits: &CgroupLimits) -> Self {
        Self::rooted(Path::new(constants::CGROUP_ROOT), limits)
    }

    /// Creates a manager under an alternate hierarchy root, used by tests.
    #[must_use]
    pub fn rooted(root: &Path, limits: &CgroupLimits) -> Self {
        Self {
            path: root.join(&limits.name),
            limits: limits.clone(),
        }
    }

    /// Path of the group directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the group directory and applies the configured limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the memory limit
    /// cannot be parsed, or a write to an existing control file fails.
    pub fn setup(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path).map_err(|e| BurrowError::Cgroup {
            message: format!("failed to create {}: {e}", self.path.display()),
        })?;

        self.write_control("pids.max", &self.limits.max_pids)?;

        if !self.limits.memory_limit.is_empty() {
            let bytes = parse_memory_size(&self.limits.memory_limit);
            self.write_control("memory.max", &bytes)?;
        }

        if !self.limits.cpu_quota.is_empty() {
            let value = format!("{} {}", self.limits.cpu_quota, self.limits.cpu_period);
            self.write_control("cpu.max", &value)?;
        }

        tracing::debug!(path = %self.path.display(), "cgroup configured");
        Ok(())
    }

    /// Joins the calling process to the group.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `cgroup.procs` fails.
    pub fn join(&self) -> Result<()> {
        let pid = std::process::id();
        self.write_control("cgroup.procs", &pid.to_string())?;
        tracing::debug!(pid, "joined cgroup");
        Ok(())
    }

    /// Reads current usage counters from the control files that exist.
    #[must_use]
    pub fn stats(&self) -> BTreeMap<String, String> {
        let mut stats = BTreeMap::new();
        for file in STAT_FILES {
            if let Ok(content) = std::fs::read_to_string(self.path.join(file)) {
                stats.insert(file.to_string(), content.trim().to_string());
            }
        }
        stats
    }

    /// Removes the group directory.
    ///
    /// The kernel removes empty groups when their last process exits, so
    /// callers treat failure here as non-fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn destroy(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_dir(&self.path).map_err(|e| BurrowError::Cgroup {
                message: format!("failed to remove {}: {e}", self.path.display()),
            })?;
        }
        Ok(())
    }

    /// Writes a value to a control file, skipping files the kernel does not
    /// provide.
    fn write_control(&self, file: &str, value: &str) -> Result<()> {
        let path = self.path.join(file);
        if !path.exists() {
            tracing::debug!(file, "control file absent, skipping");
            return Ok(());
        }
        std::fs::write(&path, value).map_err(|e| BurrowError::Cgroup {
            message: format!("failed to write {value:?} to {}: {e}", path.display()),
        })
    }
}

/// Converts a human-readable memory size to a byte count string.
///
/// Suffixes are decimal: `K`/`k` is 10^3, `M`/`m` is 10^6, `G`/`g` is 10^9.
/// Anything without a recognized suffix passes through unchanged (assumed
/// to already be in bytes) and the empty string stays empty (no limit).
#[must_use]
pub fn parse_memory_size(size: &str) -> String {
    if size.is_empty() {
        return String::new();
    }
    let (digits, zeros) = match size.chars().next_back() {
        Some('K' | 'k') => (&size[..size.len() - 1], "000"),
        Some('M' | 'm') => (&size[..size.len() - 1], "000000"),
        Some('G' | 'g') => (&size[..size.len() - 1], "000000000"),
        _ => (size, ""),
    };
    format!("{digits}{zeros}")
}
