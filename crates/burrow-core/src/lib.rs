//! # burrow-core
//!
//! Kernel-facing primitives for the burrow runtime:
//! - **Cgroups v2**: per-run control group with PID, memory, and CPU limits.
//! - **Filesystem**: rootfs skeleton preparation, bind mounts, root change,
//!   pseudo-filesystems, DNS.
//! - **Network**: veth pair plumbing over rtnetlink, network-namespace
//!   handles, and host-side NAT rules.
//!
//! Everything here assumes a Linux host; the orchestration that sequences
//! these primitives lives in `burrow-runtime`.

pub mod cgroup;
pub mod filesystem;
pub mod network;
