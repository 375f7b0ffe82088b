//! CLI command definitions and dispatch.

pub mod child;
pub mod run;

use clap::{ArgAction, Parser, Subcommand};

use burrow_common::error::BurrowError;

/// burrow — minimal educational Linux container runtime.
#[derive(Parser, Debug)]
#[command(name = "burrow", version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Print version information.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command in a new container.
    Run(run::RunArgs),
    /// Internal re-entry point for the container child; do not invoke manually.
    #[command(hide = true)]
    Child(child::ChildArgs),
    /// Print version information.
    Version,
}

/// Dispatches the parsed CLI command and returns the process exit code.
///
/// # Errors
///
/// Returns an error if privilege checks, configuration, or the container
/// run fail.
pub fn execute(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Command::Run(args) => run::execute(args),
        Command::Child(args) => child::execute(args),
        Command::Version => {
            println!(
                "{} {}",
                burrow_common::constants::APP_NAME,
                env!("CARGO_PKG_VERSION")
            );
            Ok(0)
        }
    }
}

/// Fails unless the effective UID is root.
///
/// Both roles need root: the parent for namespaces, netlink, and iptables;
/// the child for mounts, chroot, and cgroup writes.
pub(crate) fn require_root() -> anyhow::Result<()> {
    if !nix::unistd::geteuid().is_root() {
        return Err(BurrowError::PermissionDenied {
            message: "this program must be run as root".into(),
        }
        .into());
    }
    Ok(())
}

/// Clamps a container exit status into the process exit code range.
pub(crate) fn as_exit_code(status: i32) -> u8 {
    status.clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::*;

    fn parse(argv: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(argv)
    }

    fn parse_run(argv: &[&str]) -> run::RunArgs {
        match parse(argv).expect("argv parses").command {
            Command::Run(args) => args,
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn flags_before_the_command_are_parsed() {
        let args = parse_run(&[
            "burrow", "run", "--hostname", "myhost", "--rootfs", "/fs", "/bin/sh",
        ]);
        assert_eq!(args.hostname, "myhost");
        assert_eq!(args.rootfs, PathBuf::from("/fs"));
        assert_eq!(args.command, ["/bin/sh"]);
    }

    #[test]
    fn first_non_flag_token_starts_the_command() {
        let args = parse_run(&["burrow", "run", "/bin/sh", "-c", "echo hi"]);
        assert_eq!(args.command, ["/bin/sh", "-c", "echo hi"]);
        assert_eq!(args.hostname, "container");
    }

    #[test]
    fn flag_like_tokens_after_the_command_are_command_arguments() {
        let args = parse_run(&["burrow", "run", "/bin/echo", "--hostname", "x"]);
        assert_eq!(args.command, ["/bin/echo", "--hostname", "x"]);
        assert_eq!(args.hostname, "container");
    }

    #[test]
    fn missing_command_is_a_parse_error() {
        assert!(parse(&["burrow", "run"]).is_err());
        assert!(parse(&["burrow", "run", "--hostname", "h"]).is_err());
    }

    #[test]
    fn unknown_flag_before_the_command_is_a_parse_error() {
        assert!(parse(&["burrow", "run", "--bogus", "/bin/sh"]).is_err());
    }

    #[test]
    fn unknown_subcommand_is_a_parse_error() {
        assert!(parse(&["burrow", "launch", "/bin/sh"]).is_err());
    }

    #[test]
    fn mount_flag_is_repeatable_and_parsed() {
        let args = parse_run(&[
            "burrow", "run", "--mount", "/a:/b", "--mount", "/c:/d:ro", "/bin/sh",
        ]);
        assert_eq!(args.mount.len(), 2);
        assert!(!args.mount[0].read_only);
        assert!(args.mount[1].read_only);
    }

    #[test]
    fn malformed_mount_spec_is_a_parse_error() {
        assert!(parse(&["burrow", "run", "--mount", "justonepath", "/bin/sh"]).is_err());
        assert!(parse(&["burrow", "run", "--mount", "/a:/b:rw", "/bin/sh"]).is_err());
    }

    #[test]
    fn network_flags_parse_into_typed_values() {
        let args = parse_run(&[
            "burrow",
            "run",
            "--network",
            "10.0.0.0/24",
            "--host-ip",
            "10.0.0.1",
            "--container-ip",
            "10.0.0.2",
            "/bin/sh",
        ]);
        assert_eq!(args.network.to_string(), "10.0.0.0/24");
        assert_eq!(args.host_ip.to_string(), "10.0.0.1");
        assert_eq!(args.container_ip.to_string(), "10.0.0.2");
    }

    #[test]
    fn child_subcommand_captures_trailing_arguments() {
        let cli = parse(&["burrow", "child", "/bin/sh", "-c", "true"]).expect("parses");
        match cli.command {
            Command::Child(args) => assert_eq!(args.command, ["/bin/sh", "-c", "true"]),
            other => panic!("expected child command, got {other:?}"),
        }
    }

    #[test]
    fn exit_codes_clamp_to_u8_range() {
        assert_eq!(as_exit_code(0), 0);
        assert_eq!(as_exit_code(137), 137);
        assert_eq!(as_exit_code(-1), 0);
        assert_eq!(as_exit_code(300), 255);
    }
}
