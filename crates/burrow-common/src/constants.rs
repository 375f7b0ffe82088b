//! System-wide constants and default values.
//!
//! Interface and cgroup names are fixed, so only one container can run at a
//! time; concurrent invocations collide on `veth0`/`veth1` and the cgroup
//! directory.

/// Cgroups v2 unified hierarchy mount point.
pub const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Name of the per-run control group under [`CGROUP_ROOT`].
pub const DEFAULT_CGROUP_NAME: &str = "namespace_test";

/// Default CPU period in microseconds for `cpu.max`.
pub const DEFAULT_CPU_PERIOD: &str = "100000";

/// Default container hostname.
pub const DEFAULT_HOSTNAME: &str = "container";

/// Default root filesystem path, relative to the invoking directory.
pub const DEFAULT_ROOTFS: &str = "./namespace_fs";

/// Default container network in CIDR notation.
pub const DEFAULT_NETWORK: &str = "192.168.1.0/24";

/// Default address of the host end of the veth pair.
pub const DEFAULT_HOST_IP: &str = "192.168.1.1";

/// Default address of the container end of the veth pair.
pub const DEFAULT_CONTAINER_IP: &str = "192.168.1.2";

/// Name of the host end of the veth pair.
pub const VETH_HOST: &str = "veth0";

/// Name of the container end of the veth pair.
pub const VETH_CONTAINER: &str = "veth1";

/// Interface assumed to provide upstream connectivity for NAT.
pub const UPSTREAM_INTERFACE: &str = "eth0";

/// Nameservers written to the container's `/etc/resolv.conf`.
pub const DNS_SERVERS: [&str; 2] = ["8.8.8.8", "8.8.4.4"];

/// In-container directory the default bind mount maps the host CWD onto,
/// and the working directory of the user command when present.
pub const APP_DIR: &str = "/app";

/// Environment variable carrying the container hostname to the child.
pub const ENV_HOSTNAME: &str = "CONTAINER_HOSTNAME";

/// Environment variable carrying the rootfs path to the child.
pub const ENV_ROOTFS: &str = "CONTAINER_ROOTFS";

/// Environment variable carrying the network CIDR to the child.
pub const ENV_NETWORK_CIDR: &str = "CONTAINER_NETWORK_CIDR";

/// Environment variable carrying the host-side veth address to the child.
pub const ENV_HOST_IP: &str = "CONTAINER_HOST_IP";

/// Environment variable carrying the container-side veth address to the child.
pub const ENV_CONTAINER_IP: &str = "CONTAINER_CONTAINER_IP";

/// Environment variable carrying the bind-mount count to the child.
/// Omitted entirely when there are no mounts.
pub const ENV_MOUNT_COUNT: &str = "CONTAINER_MOUNT_COUNT";

/// Environment variable enabling debug logging and the config echo.
pub const ENV_DEBUG: &str = "DEBUG";

/// Application name used in CLI output.
pub const APP_NAME: &str = "burrow";
