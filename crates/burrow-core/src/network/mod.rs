//! Container network plumbing.
//!
//! All of this runs in the parent: moving one end of a veth pair into the
//! child requires handles to both namespaces at once, and the NAT rules are
//! host-global. `setns(2)` switches the calling thread only, so the whole
//! sequence executes on a dedicated thread and the main thread never leaves
//! the host namespace.

pub mod firewall;
pub mod netlink;
pub mod netns;

use std::os::fd::AsFd;

use nix::unistd::Pid;

use burrow_common::config::ContainerConfig;
use burrow_common::constants;
use burrow_common::error::{BurrowError, Result};

use firewall::NatRules;
use netlink::RouteSocket;
use netns::Netns;

/// Wires the container's network against a spawned child.
///
/// Creates the `veth0`/`veth1` pair, configures the host end, moves the
/// container end into the child's namespace, configures it there (loopback,
/// address, default route via the host), and installs the NAT rules.
///
/// # Errors
///
/// Returns an error if any step fails; the thread is back in the host
/// namespace before the error propagates.
pub fn setup_networking(child: Pid, config: &ContainerConfig) -> Result<()> {
    let config = config.clone();
    let handle = std::thread::Builder::new()
        .name("burrow-net".into())
        .spawn(move || setup_on_pinned_thread(child, &config))
        .map_err(|e| BurrowError::Namespace {
            message: format!("failed to spawn network setup thread: {e}"),
        })?;
    handle.join().map_err(|_| BurrowError::Namespace {
        message: "network setup thread panicked".into(),
    })?
}

fn setup_on_pinned_thread(child: Pid, config: &ContainerConfig) -> Result<()> {
    let host_ns = Netns::current()?;
    let container_ns = Netns::from_pid(child)?;

    let mut route = RouteSocket::open()?;
    route.create_veth(constants::VETH_HOST, constants::VETH_CONTAINER)?;
    route.set_link_up(constants::VETH_HOST)?;
    route.add_address(constants::VETH_HOST, config.host_ip, config.network.prefix())?;
    route.move_to_netns(constants::VETH_CONTAINER, container_ns.as_fd())?;
    tracing::debug!(pid = child.as_raw(), "veth pair created, container end moved");

    container_ns.enter()?;
    let container_side = configure_container_side(config);
    // Re-enter the host namespace before looking at the result, so an error
    // never leaves this thread configured against the wrong namespace.
    let returned = host_ns.enter();
    container_side?;
    returned?;

    NatRules::new(config.network).install()?;
    tracing::debug!(network = %config.network, "networking configured");
    Ok(())
}

/// Configures the container end from inside its namespace.
///
/// The route socket must be opened after `setns`; sockets stay bound to
/// the namespace they were created in.
fn configure_container_side(config: &ContainerConfig) -> Result<()> {
    let mut route = RouteSocket::open()?;
    route.set_link_up("lo")?;
    route.set_link_up(constants::VETH_CONTAINER)?;
    route.add_address(
        constants::VETH_CONTAINER,
        config.container_ip,
        config.network.prefix(),
    )?;
    route.add_default_route(config.host_ip, constants::VETH_CONTAINER)?;
    Ok(())
}

/// Removes the NAT rules installed by [`setup_networking`].
///
/// Best-effort: missing rules are ignored. The veth pair disappears with
/// the child's network namespace and needs no explicit teardown.
pub fn cleanup_networking(config: &ContainerConfig) {
    NatRules::new(config.network).remove();
}
