// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network reachability checker.
//!
//! Used by the fetch cycle to distinguish "network down" from
//! "controller down" after a transport failure: if even the local
//! network's default gateway does not answer, the problem is not the
//! controller.

use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Probes whether the local network's default gateway is reachable.
///
/// Resolves the machine's default gateway and issues a single `ping`
/// probe against it, bounded by a timeout. Any failure along the way
/// (no gateway found, probe failed, probe timed out) is treated as
/// "cannot determine" and conservatively reported as unreachable.
///
/// Gateway discovery reads the kernel routing table and is currently
/// implemented for Linux; on other platforms the checker reports
/// unreachable.
#[derive(Debug, Clone)]
pub struct GatewayChecker {
    probe_timeout: Duration,
}

impl GatewayChecker {
    /// Default bound on a single gateway probe.
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

    /// Creates a checker with the default probe timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            probe_timeout: Self::DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Creates a checker with a custom probe timeout.
    #[must_use]
    pub fn with_timeout(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    /// Returns `true` if the default gateway answered a single probe.
    pub async fn is_gateway_reachable(&self) -> bool {
        let Some(gateway) = default_gateway() else {
            tracing::warn!("cannot identify default gateway address");
            return false;
        };

        match tokio::time::timeout(self.probe_timeout, ping_once(gateway)).await {
            Ok(alive) => {
                tracing::debug!(%gateway, alive, "gateway probe finished");
                alive
            }
            Err(_) => {
                tracing::debug!(%gateway, "gateway probe timed out");
                false
            }
        }
    }
}

impl Default for GatewayChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends a single ICMP echo via the system `ping` binary.
async fn ping_once(address: IpAddr) -> bool {
    let status = Command::new("ping")
        .arg("-c")
        .arg("1")
        .arg(address.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;

    status.is_ok_and(|s| s.success())
}

/// Resolves the default gateway from the kernel routing table.
#[cfg(target_os = "linux")]
fn default_gateway() -> Option<IpAddr> {
    let contents = std::fs::read_to_string("/proc/net/route").ok()?;
    parse_route_table(&contents).map(IpAddr::V4)
}

#[cfg(not(target_os = "linux"))]
fn default_gateway() -> Option<IpAddr> {
    None
}

/// Parses `/proc/net/route`, looking for the default route's gateway.
///
/// Addresses in the table are little-endian hex words.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_route_table(contents: &str) -> Option<std::net::Ipv4Addr> {
    for line in contents.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        let (destination, gateway) = (fields[1], fields[2]);
        if destination == "00000000" && gateway != "00000000" {
            let raw = u32::from_str_radix(gateway, 16).ok()?;
            return Some(std::net::Ipv4Addr::from(raw.swap_bytes()));
        }
    }
    None
}
