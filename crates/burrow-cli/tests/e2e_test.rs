//! End-to-end scenarios for the burrow binary.
//!
//! The container scenarios launch real namespaces, so they need root, a
//! Linux host with cgroups v2 and `iptables`, and a prepared rootfs (an
//! extracted Alpine minirootfs works). The rootfs is taken from
//! `BURROW_TEST_ROOTFS`, falling back to `./namespace_fs`; without it — or
//! without root — each privileged test skips with a note.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const BURROW: &str = env!("CARGO_BIN_EXE_burrow");

fn test_rootfs() -> Option<PathBuf> {
    if !nix::unistd::geteuid().is_root() {
        eprintln!("skipping: requires root");
        return None;
    }
    let rootfs = std::env::var_os("BURROW_TEST_ROOTFS")
        .map_or_else(|| PathBuf::from("./namespace_fs"), PathBuf::from);
    if !rootfs.join("bin/sh").exists() {
        eprintln!(
            "skipping: no usable rootfs at {} (set BURROW_TEST_ROOTFS)",
            rootfs.display()
        );
        return None;
    }
    Some(rootfs)
}

fn run_in_container(rootfs: &Path, args: &[&str]) -> Output {
    Command::new(BURROW)
        .arg("run")
        .arg("--rootfs")
        .arg(rootfs)
        .args(args)
        .output()
        .expect("burrow should execute")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// ── Unprivileged surface ─────────────────────────────────────────────

#[test]
fn help_exits_zero() {
    for flag in ["--help", "-h"] {
        let output = Command::new(BURROW).arg(flag).output().expect("runs");
        assert!(output.status.success(), "{flag} should exit 0");
    }
}

#[test]
fn version_surface_exits_zero() {
    for argv in [&["version"][..], &["--version"][..], &["-v"][..]] {
        let output = Command::new(BURROW).args(argv).output().expect("runs");
        assert!(output.status.success(), "{argv:?} should exit 0");
    }
}

#[test]
fn unknown_command_exits_nonzero_with_usage() {
    let output = Command::new(BURROW).arg("launch").output().expect("runs");
    assert!(!output.status.success());
    assert!(stderr_of(&output).to_lowercase().contains("usage"));
}

#[test]
fn run_without_root_reports_privilege_error() {
    if nix::unistd::geteuid().is_root() {
        eprintln!("skipping: test needs an unprivileged caller");
        return;
    }
    let output = Command::new(BURROW)
        .args(["run", "/bin/true"])
        .output()
        .expect("runs");
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("must be run as root"));
}

// ── Container scenarios (root + rootfs required) ─────────────────────

#[test]
fn s1_true_exits_zero_and_app_holds_cwd() {
    let Some(rootfs) = test_rootfs() else { return };
    let output = run_in_container(&rootfs, &["/bin/true"]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    // The default mount maps the invoking directory (this crate) onto /app.
    let listing = run_in_container(&rootfs, &["/bin/sh", "-c", "ls /app"]);
    assert!(listing.status.success());
    assert!(stdout_of(&listing).contains("Cargo.toml"));
}

#[test]
fn s2_hostname_flag_is_visible_inside() {
    let Some(rootfs) = test_rootfs() else { return };
    let output = run_in_container(&rootfs, &["--hostname", "myhost", "/bin/sh", "-c", "hostname"]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "myhost\n");
}

#[test]
fn s3_read_only_mount_rejects_writes() {
    let Some(rootfs) = test_rootfs() else { return };
    let output = run_in_container(
        &rootfs,
        &["--mount", "/etc/hostname:/x:ro", "/bin/sh", "-c", "echo hi > /x"],
    );
    assert!(!output.status.success());
    assert!(stderr_of(&output).to_lowercase().contains("read-only"));
}

#[test]
fn s4_default_route_goes_via_the_host_ip() {
    let Some(rootfs) = test_rootfs() else { return };
    if !rootfs.join("sbin/ip").exists() && !rootfs.join("bin/ip").exists() {
        eprintln!("skipping: rootfs has no ip binary");
        return;
    }
    let output = run_in_container(
        &rootfs,
        &[
            "--network",
            "10.0.0.0/24",
            "--host-ip",
            "10.0.0.1",
            "--container-ip",
            "10.0.0.2",
            "/bin/sh",
            "-c",
            "ip route",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert!(stdout_of(&output).contains("default via 10.0.0.1"));
}

#[test]
fn s5_resolv_conf_names_both_servers() {
    let Some(rootfs) = test_rootfs() else { return };
    let output = run_in_container(&rootfs, &["/bin/sh", "-c", "cat /etc/resolv.conf"]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("nameserver 8.8.8.8"));
    assert!(stdout.contains("nameserver 8.8.4.4"));
}

#[test]
fn s6_proc_1_is_the_container_init() {
    let Some(rootfs) = test_rootfs() else { return };
    let output = run_in_container(&rootfs, &["/bin/sh", "-c", "ls /proc/1"]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
}

#[test]
fn exit_status_of_the_command_propagates() {
    let Some(rootfs) = test_rootfs() else { return };
    let output = run_in_container(&rootfs, &["/bin/sh", "-c", "exit 3"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn nat_rules_are_gone_after_a_run() {
    let Some(rootfs) = test_rootfs() else { return };
    let output = run_in_container(&rootfs, &["/bin/true"]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    // iptables -C fails when the rule is absent.
    let checks: [&[&str]; 3] = [
        &[
            "-t",
            "nat",
            "-C",
            "POSTROUTING",
            "-s",
            "192.168.1.0/24",
            "-o",
            "eth0",
            "-j",
            "MASQUERADE",
        ],
        &["-C", "FORWARD", "-s", "192.168.1.0/24", "-j", "ACCEPT"],
        &["-C", "FORWARD", "-d", "192.168.1.0/24", "-j", "ACCEPT"],
    ];
    for check in checks {
        let present = Command::new("iptables")
            .args(check)
            .output()
            .expect("iptables runs")
            .status
            .success();
        assert!(!present, "rule should be removed: {check:?}");
    }
}
