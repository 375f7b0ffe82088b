//! # burrow-common
//!
//! Shared foundations for the burrow workspace: the unified error type,
//! the container configuration model, domain primitives, workspace-wide
//! constants, and the environment bridge that carries configuration from
//! the parent process to the re-executed child.

pub mod config;
pub mod constants;
pub mod envbridge;
pub mod error;
pub mod types;
