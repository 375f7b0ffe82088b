//! Container filesystem management.
//!
//! Rootfs skeleton preparation runs in the parent; the mount sequence runs
//! inside the child's mount namespace.

pub mod mount;
pub mod rootfs;

pub use mount::{cleanup_filesystem, setup_filesystem};
pub use rootfs::prepare_rootfs;
