//! `burrow child` — the re-entered container half of the lifecycle.
//!
//! Spawned by `run` via `/proc/self/exe`; reconstructs its configuration
//! from the `CONTAINER_*` environment variables the parent injected.

use clap::Args;

/// Arguments for the hidden `child` command.
#[derive(Args, Debug)]
pub struct ChildArgs {
    /// User command to run inside the container.
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required = true
    )]
    pub command: Vec<String>,
}

/// Executes the child role.
///
/// # Errors
///
/// Returns an error when not running as root or when in-namespace setup
/// fails before the user command starts.
pub fn execute(args: ChildArgs) -> anyhow::Result<u8> {
    super::require_root()?;

    let status = burrow_runtime::container::run_child(&args.command)?;
    Ok(super::as_exit_code(status))
}
