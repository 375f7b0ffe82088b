//! One-way serialization of [`ContainerConfig`] across the re-exec boundary.
//!
//! The parent appends flat `CONTAINER_*` variables to the child's
//! environment; the re-executed child reconstructs the configuration from
//! them. The user command travels in argv, not the environment.
//!
//! A configuration with zero mounts omits `CONTAINER_MOUNT_COUNT` entirely:
//! the count is parsed with a strictly-positive integer parser, so `0` in
//! the variable would be rejected.

use crate::config::ContainerConfig;
use crate::constants;
use crate::error::{BurrowError, Result};
use crate::types::BindMount;

fn mount_key(index: usize, field: &str) -> String {
    format!("CONTAINER_MOUNT_{index}_{field}")
}

/// Serializes a configuration to environment variable pairs.
#[must_use]
pub fn to_env(config: &ContainerConfig) -> Vec<(String, String)> {
    let mut vars = vec![
        (constants::ENV_HOSTNAME.into(), config.hostname.clone()),
        (
            constants::ENV_ROOTFS.into(),
            config.rootfs.display().to_string(),
        ),
        (
            constants::ENV_NETWORK_CIDR.into(),
            config.network.to_string(),
        ),
        (constants::ENV_HOST_IP.into(), config.host_ip.to_string()),
        (
            constants::ENV_CONTAINER_IP.into(),
            config.container_ip.to_string(),
        ),
    ];
    for (i, mount) in config.mounts.iter().enumerate() {
        vars.push((mount_key(i, "SOURCE"), mount.source.display().to_string()));
        vars.push((
            mount_key(i, "DEST"),
            mount.destination.display().to_string(),
        ));
        vars.push((
            mount_key(i, "READONLY"),
            if mount.read_only { "true" } else { "false" }.into(),
        ));
    }
    if !config.mounts.is_empty() {
        vars.push((
            constants::ENV_MOUNT_COUNT.into(),
            config.mounts.len().to_string(),
        ));
    }
    vars
}

/// Reconstructs a configuration from the process environment.
///
/// The returned configuration has an empty `command`; the child receives the
/// user command through argv.
///
/// # Errors
///
/// Returns a configuration error if a required variable is missing or
/// unparseable, or if the mount count is present but not a positive integer.
pub fn from_env() -> Result<ContainerConfig> {
    parse_with(|key| std::env::var(key).ok())
}

/// Environment-independent parse, driven by a lookup closure.
pub(crate) fn parse_with(lookup: impl Fn(&str) -> Option<String>) -> Result<ContainerConfig> {
    let required = |key: &str| {
        lookup(key).ok_or_else(|| BurrowError::Config {
            message: format!("{key} is not set"),
        })
    };
    let hostname = required(constants::ENV_HOSTNAME)?;
    let rootfs = required(constants::ENV_ROOTFS)?.into();
    let network = required(constants::ENV_NETWORK_CIDR)?
        .parse()
        .map_err(|e| BurrowError::Config {
            message: format!("bad {}: {e}", constants::ENV_NETWORK_CIDR),
        })?;
    let host_ip = required(constants::ENV_HOST_IP)?
        .parse()
        .map_err(|e| BurrowError::Config {
            message: format!("bad {}: {e}", constants::ENV_HOST_IP),
        })?;
    let container_ip = required(constants::ENV_CONTAINER_IP)?
        .parse()
        .map_err(|e| BurrowError::Config {
            message: format!("bad {}: {e}", constants::ENV_CONTAINER_IP),
        })?;

    let mut mounts = Vec::new();
    if let Some(raw) = lookup(constants::ENV_MOUNT_COUNT) {
        let count = parse_mount_count(&raw)?;
        for i in 0..count {
            let source = required(&mount_key(i, "SOURCE"))?;
            let dest = required(&mount_key(i, "DEST"))?;
            let read_only = lookup(&mount_key(i, "READONLY")).as_deref() == Some("true");
            mounts.push(BindMount {
                source: source.into(),
                destination: dest.into(),
                read_only,
            });
        }
    }

    Ok(ContainerConfig {
        hostname,
        rootfs,
        network,
        host_ip,
        container_ip,
        mounts,
        command: Vec::new(),
    })
}

/// Parses the mount count, accepting only strictly positive integers.
fn parse_mount_count(raw: &str) -> Result<usize> {
    let count: i64 = raw.parse().map_err(|_| BurrowError::Config {
        message: format!("invalid mount count: {raw}"),
    })?;
    if count <= 0 {
        return Err(BurrowError::Config {
            message: format!("mount count must be positive: {count}"),
        });
    }
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_map(config: &ContainerConfig) -> HashMap<String, String> {
        to_env(config).into_iter().collect()
    }

    fn sample_config() -> ContainerConfig {
        let mut config = ContainerConfig {
            command: vec!["/bin/sh".into()],
            ..ContainerConfig::default()
        };
        config.mounts.push(BindMount {
            source: "/tmp".into(),
            destination: "/data".into(),
            read_only: false,
        });
        config.mounts.push(BindMount {
            source: "/etc/hostname".into(),
            destination: "/x".into(),
            read_only: true,
        });
        config
    }

    #[test]
    fn round_trip_preserves_config_and_mount_order() {
        let config = sample_config();
        let map = env_map(&config);
        let parsed = parse_with(|k| map.get(k).cloned()).expect("parse");

        let mut expected = config;
        expected.command.clear();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn zero_mounts_omits_count_variable() {
        let config = ContainerConfig {
            command: vec!["/bin/true".into()],
            ..ContainerConfig::default()
        };
        let map = env_map(&config);
        assert!(!map.contains_key(constants::ENV_MOUNT_COUNT));

        let parsed = parse_with(|k| map.get(k).cloned()).expect("parse");
        assert!(parsed.mounts.is_empty());
    }

    #[test]
    fn readonly_flag_is_literal_true_false() {
        let map = env_map(&sample_config());
        assert_eq!(map["CONTAINER_MOUNT_0_READONLY"], "false");
        assert_eq!(map["CONTAINER_MOUNT_1_READONLY"], "true");
    }

    #[test]
    fn non_positive_or_garbage_count_is_rejected() {
        let mut map = env_map(&sample_config());
        for bad in ["0", "-1", "two"] {
            map.insert(constants::ENV_MOUNT_COUNT.into(), bad.into());
            assert!(
                parse_with(|k| map.get(k).cloned()).is_err(),
                "count {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn missing_required_variable_is_an_error() {
        let mut map = env_map(&sample_config());
        map.remove(constants::ENV_ROOTFS);
        let err = parse_with(|k| map.get(k).cloned()).expect_err("should fail");
        assert!(format!("{err}").contains("CONTAINER_ROOTFS"));
    }

    #[test]
    fn missing_mount_entry_under_count_is_an_error() {
        let mut map = env_map(&sample_config());
        map.remove("CONTAINER_MOUNT_1_DEST");
        assert!(parse_with(|k| map.get(k).cloned()).is_err());
    }
}
