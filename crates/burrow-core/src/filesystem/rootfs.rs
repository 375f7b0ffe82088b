//! Rootfs skeleton preparation.

use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use burrow_common::error::{BurrowError, Result};

/// Subdirectories every rootfs needs before the child mounts into it:
/// `proc` for the proc mount, `dev/pts` for pseudo-terminals, `etc` for
/// DNS, `app` for the default bind mount, `tmp` for scratch space.
const REQUIRED_DIRS: [&str; 6] = ["proc", "dev", "dev/pts", "etc", "app", "tmp"];

/// Verifies the rootfs exists and ensures its skeleton directories.
///
/// Does not populate or validate the distribution inside; the operator
/// provides a usable Linux tree. Safe to run repeatedly.
///
/// # Errors
///
/// Returns an error if the rootfs path is not an existing directory or a
/// skeleton directory cannot be created.
pub fn prepare_rootfs(rootfs: &Path) -> Result<()> {
    if !rootfs.is_dir() {
        return Err(BurrowError::Filesystem {
            message: format!(
                "root filesystem path {} does not exist",
                rootfs.display()
            ),
        });
    }

    for dir in REQUIRED_DIRS {
        let path = rootfs.join(dir);
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(&path)
            .map_err(|e| BurrowError::Io { path, source: e })?;
    }

    tracing::debug!(rootfs = %rootfs.display(), "rootfs skeleton prepared");
    Ok(())
}
