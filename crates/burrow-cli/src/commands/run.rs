//! `burrow run` — launch a container.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Args;
use ipnetwork::Ipv4Network;

use burrow_common::config::ContainerConfig;
use burrow_common::constants;
use burrow_common::types::BindMount;

/// Arguments for the `run` command.
///
/// All flags must precede the command; the first token that does not start
/// with `-` begins the command and captures everything after it.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Container hostname.
    #[arg(long, default_value = constants::DEFAULT_HOSTNAME)]
    pub hostname: String,

    /// Path to the container root filesystem.
    #[arg(long, default_value = constants::DEFAULT_ROOTFS)]
    pub rootfs: PathBuf,

    /// Container network in CIDR notation.
    #[arg(long, value_name = "CIDR", default_value = constants::DEFAULT_NETWORK)]
    pub network: Ipv4Network,

    /// Address of the host end of the veth pair.
    #[arg(long, value_name = "IPV4", default_value = constants::DEFAULT_HOST_IP)]
    pub host_ip: Ipv4Addr,

    /// Address of the container end of the veth pair.
    #[arg(long, value_name = "IPV4", default_value = constants::DEFAULT_CONTAINER_IP)]
    pub container_ip: Ipv4Addr,

    /// Bind mount; repeatable. Defaults to the current directory on /app.
    #[arg(long = "mount", value_name = "HOST:CONTAINER[:ro]")]
    pub mount: Vec<BindMount>,

    /// Command to run inside the container.
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required = true
    )]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Assembles the container configuration, injecting the default mount
    /// and validating invariants.
    fn into_config(self) -> burrow_common::error::Result<ContainerConfig> {
        ContainerConfig {
            hostname: self.hostname,
            rootfs: self.rootfs,
            network: self.network,
            host_ip: self.host_ip,
            container_ip: self.container_ip,
            mounts: self.mount,
            command: self.command,
        }
        .finalize()
    }
}

/// Executes the `run` command; the parent role.
///
/// # Errors
///
/// Returns an error when not running as root, on invalid configuration, or
/// when container setup fails.
pub fn execute(args: RunArgs) -> anyhow::Result<u8> {
    super::require_root()?;

    let config = args.into_config()?;
    if std::env::var_os(constants::ENV_DEBUG).is_some_and(|v| !v.is_empty()) {
        eprintln!("{}", serde_json::to_string_pretty(&config)?);
    }

    let status = burrow_runtime::container::run_container(&config)?;
    Ok(super::as_exit_code(status))
}
