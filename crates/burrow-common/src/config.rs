//! Container configuration model.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{BurrowError, Result};
use crate::types::BindMount;

/// Complete specification of one container invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Hostname set inside the container's UTS namespace.
    pub hostname: String,
    /// Directory used as `/` inside the container.
    pub rootfs: PathBuf,
    /// Network both veth addresses must lie in.
    pub network: Ipv4Network,
    /// Address of the host end of the veth pair.
    pub host_ip: Ipv4Addr,
    /// Address of the container end of the veth pair.
    pub container_ip: Ipv4Addr,
    /// Bind mounts, in materialization order.
    pub mounts: Vec<BindMount>,
    /// User command; the first element is resolved inside the rootfs.
    pub command: Vec<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            hostname: constants::DEFAULT_HOSTNAME.into(),
            rootfs: PathBuf::from(constants::DEFAULT_ROOTFS),
            network: constants::DEFAULT_NETWORK
                .parse()
                .expect("default network is valid CIDR"),
            host_ip: constants::DEFAULT_HOST_IP
                .parse()
                .expect("default host IP is valid"),
            container_ip: constants::DEFAULT_CONTAINER_IP
                .parse()
                .expect("default container IP is valid"),
            mounts: Vec::new(),
            command: Vec::new(),
        }
    }
}

impl ContainerConfig {
    /// Injects the default current-directory mount and validates the result.
    ///
    /// With no mounts configured, the invoking directory is mapped to
    /// `/app` read-write so the container starts with the caller's files
    /// visible.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any invariant fails; see
    /// [`ContainerConfig::validate`].
    pub fn finalize(mut self) -> Result<Self> {
        if self.mounts.is_empty() {
            if let Ok(cwd) = std::env::current_dir() {
                self.mounts.push(BindMount::new(cwd, constants::APP_DIR));
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the hostname or command is empty,
    /// the two addresses coincide or fall outside the network, a mount
    /// source does not exist, or a mount destination is empty.
    pub fn validate(&self) -> Result<()> {
        if self.hostname.is_empty() {
            return Err(config_err("hostname must not be empty"));
        }
        if self.command.is_empty() {
            return Err(config_err("no command specified"));
        }
        if self.command[0].is_empty() {
            return Err(config_err("command name must not be empty"));
        }
        if self.host_ip == self.container_ip {
            return Err(config_err(format!(
                "host IP and container IP are both {}",
                self.host_ip
            )));
        }
        for (label, ip) in [("host", self.host_ip), ("container", self.container_ip)] {
            if !self.network.contains(ip) {
                return Err(config_err(format!(
                    "{label} IP {ip} is outside network {}",
                    self.network
                )));
            }
        }
        for (i, mount) in self.mounts.iter().enumerate() {
            if !mount.source.exists() {
                return Err(config_err(format!(
                    "mount {i} source does not exist: {}",
                    mount.source.display()
                )));
            }
            if mount.destination.as_os_str().is_empty() {
                return Err(config_err(format!("mount {i} destination is empty")));
            }
        }
        Ok(())
    }
}

fn config_err(message: impl Into<String>) -> BurrowError {
    BurrowError::Config {
        message: message.into(),
    }
}
