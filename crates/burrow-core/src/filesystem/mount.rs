//! In-namespace filesystem setup for the container child.
//!
//! The order is load-bearing: bind mounts need the host paths to still be
//! visible, so they happen before the root change; `/proc` and `/dev/pts`
//! must appear inside the new root, so they are mounted after it.

use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use nix::mount::{mount, umount, MsFlags};

use burrow_common::config::ContainerConfig;
use burrow_common::constants;
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::BindMount;

/// Runs the full child-side filesystem sequence.
///
/// 1. Remount `/` private-recursive so nothing propagates back to the host.
/// 2. Materialize the configured bind mounts.
/// 3. Set the UTS hostname.
/// 4. Change root into the rootfs and move to `/`.
/// 5. Write `/etc/resolv.conf`.
/// 6. Mount `proc` and `/dev/pts`.
///
/// # Errors
///
/// Returns an error as soon as any step fails; the child aborts before
/// exec and its mount namespace is discarded on exit.
pub fn setup_filesystem(config: &ContainerConfig) -> Result<()> {
    make_propagation_private()?;

    for bind in &config.mounts {
        create_bind_mount(bind, &config.rootfs)?;
    }

    nix::unistd::sethostname(&config.hostname).map_err(|e| BurrowError::Filesystem {
        message: format!("failed to set hostname {:?}: {e}", config.hostname),
    })?;

    nix::unistd::chroot(&config.rootfs).map_err(|e| BurrowError::Filesystem {
        message: format!("failed to chroot to {}: {e}", config.rootfs.display()),
    })?;
    std::env::set_current_dir("/").map_err(|e| BurrowError::Io {
        path: "/".into(),
        source: e,
    })?;

    write_resolv_conf()?;

    mount(Some("proc"), "proc", Some("proc"), MsFlags::empty(), None::<&str>).map_err(|e| {
        BurrowError::Filesystem {
            message: format!("failed to mount proc: {e}"),
        }
    })?;

    mount(
        Some("devpts"),
        "/dev/pts",
        Some("devpts"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| BurrowError::Filesystem {
        message: format!("failed to mount devpts: {e}"),
    })?;

    tracing::debug!(rootfs = %config.rootfs.display(), "filesystem setup complete");
    Ok(())
}

/// Unmounts the pseudo-filesystems, in reverse mount order.
///
/// Runs after the user command exits. The kernel reclaims everything when
/// the mount namespace is destroyed, so failures are only logged.
pub fn cleanup_filesystem() {
    for mountpoint in ["/dev/pts", "proc"] {
        if let Err(e) = umount(mountpoint) {
            tracing::debug!(mountpoint, "unmount failed: {e}");
        }
    }
}

/// Remounts `/` with `MS_REC | MS_PRIVATE` so mount events in this
/// namespace never propagate to the host.
fn make_propagation_private() -> Result<()> {
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| BurrowError::Filesystem {
        message: format!("failed to make mount propagation private: {e}"),
    })
}

/// Bind-mounts one host path into the rootfs.
///
/// Read-only binds take two steps: the kernel ignores `MS_RDONLY` on the
/// initial bind, so a `MS_REMOUNT | MS_BIND | MS_RDONLY` pass enforces it.
fn create_bind_mount(bind: &BindMount, rootfs: &Path) -> Result<()> {
    if !bind.source.exists() {
        return Err(BurrowError::Filesystem {
            message: format!("mount source does not exist: {}", bind.source.display()),
        });
    }

    let relative = bind
        .destination
        .strip_prefix("/")
        .unwrap_or(&bind.destination);
    let target = rootfs.join(relative);
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(&target)
        .map_err(|e| BurrowError::Io {
            path: target.clone(),
            source: e,
        })?;

    let mut flags = MsFlags::MS_BIND;
    if bind.read_only {
        flags |= MsFlags::MS_RDONLY;
    }
    mount(
        Some(&bind.source),
        &target,
        None::<&str>,
        flags,
        None::<&str>,
    )
    .map_err(|e| BurrowError::Filesystem {
        message: format!("failed to bind mount {bind}: {e}"),
    })?;

    if bind.read_only {
        mount(
            None::<&str>,
            &target,
            None::<&str>,
            flags | MsFlags::MS_REMOUNT,
            None::<&str>,
        )
        .map_err(|e| BurrowError::Filesystem {
            message: format!("failed to remount {bind} read-only: {e}"),
        })?;
    }

    tracing::debug!(%bind, "bind mount created");
    Ok(())
}

/// Writes the container's DNS configuration.
fn write_resolv_conf() -> Result<()> {
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create("/etc")
        .map_err(|e| BurrowError::Io {
            path: "/etc".into(),
            source: e,
        })?;

    let content: String = constants::DNS_SERVERS
        .iter()
        .map(|server| format!("nameserver {server}\n"))
        .collect();
    std::fs::write("/etc/resolv.conf", content).map_err(|e| BurrowError::Io {
        path: "/etc/resolv.conf".into(),
        source: e,
    })
}
