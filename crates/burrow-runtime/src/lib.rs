//! # burrow-runtime
//!
//! The container lifecycle orchestrator: a parent role that spawns a child
//! into fresh namespaces and owns all host-global state (veth, NAT rules,
//! the cgroup directory), and a child role that builds its in-namespace
//! world (mounts, hostname, root change, cgroup membership) and runs the
//! user command.

pub mod container;
pub mod spawn;
