//! Host-side NAT and forwarding rules.
//!
//! Shells out to the `iptables` binary, mirroring what an operator would
//! type. Three rules give the container outbound connectivity: masquerade
//! on the upstream interface plus accept rules for forwarded traffic in
//! both directions.

use std::process::Command;

use ipnetwork::Ipv4Network;

use burrow_common::constants;
use burrow_common::error::{BurrowError, Result};

/// The set of iptables rules installed for one container run.
///
/// Owned by the parent; installed after the veth pair is configured and
/// removed after the child exits.
#[derive(Debug, Clone)]
pub struct NatRules {
    network: Ipv4Network,
}

/// One rule: optional table, chain, and match/target arguments.
struct Rule {
    table: Option<&'static str>,
    chain: &'static str,
    spec: Vec<String>,
}

impl Rule {
    fn to_args(&self, action: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(self.spec.len() + 4);
        if let Some(table) = self.table {
            args.push("-t".into());
            args.push(table.into());
        }
        args.push(action.into());
        args.push(self.chain.into());
        args.extend(self.spec.iter().cloned());
        args
    }
}

impl NatRules {
    /// Builds the rule set for a container network.
    ///
    /// The selector is the network address of the CIDR, so host bits in the
    /// configured value are masked off.
    #[must_use]
    pub fn new(network: Ipv4Network) -> Self {
        let network = Ipv4Network::new(network.network(), network.prefix())
            .expect("network address with same prefix is valid");
        Self { network }
    }

    fn rules(&self) -> [Rule; 3] {
        let net = self.network.to_string();
        [
            Rule {
                table: Some("nat"),
                chain: "POSTROUTING",
                spec: vec![
                    "-s".into(),
                    net.clone(),
                    "-o".into(),
                    constants::UPSTREAM_INTERFACE.into(),
                    "-j".into(),
                    "MASQUERADE".into(),
                ],
            },
            Rule {
                table: None,
                chain: "FORWARD",
                spec: vec!["-s".into(), net.clone(), "-j".into(), "ACCEPT".into()],
            },
            Rule {
                table: None,
                chain: "FORWARD",
                spec: vec!["-d".into(), net, "-j".into(), "ACCEPT".into()],
            },
        ]
    }

    /// Installs all three rules.
    ///
    /// # Errors
    ///
    /// Returns an error on the first failing `iptables` invocation.
    pub fn install(&self) -> Result<()> {
        for rule in &self.rules() {
            run_iptables(&rule.to_args("-A"))?;
        }
        tracing::debug!(network = %self.network, "NAT rules installed");
        Ok(())
    }

    /// Deletes all three rules, ignoring per-rule failures.
    ///
    /// Rules may already be absent (for example after a partial setup); a
    /// failed delete only produces a debug log.
    pub fn remove(&self) {
        for rule in &self.rules() {
            if let Err(e) = run_iptables(&rule.to_args("-D")) {
                tracing::debug!("rule removal failed: {e}");
            }
        }
        tracing::debug!(network = %self.network, "NAT rules removed");
    }
}

fn run_iptables(args: &[String]) -> Result<()> {
    let output = Command::new("iptables")
        .args(args)
        .output()
        .map_err(|e| BurrowError::Firewall {
            message: format!("failed to run iptables: {e}"),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BurrowError::Firewall {
            message: format!("iptables {} failed: {}", args.join(" "), stderr.trim()),
        });
    }
    Ok(())
}
