//! Endpoint resolution for the listening socket and the forwarding target.
//!
//! Both endpoints are resolved once, when the simulator is constructed.

use std::net::{SocketAddr, ToSocketAddrs};

use udpsim_config::NetworkConfig;

use crate::error::SimulatorError;

/// The two concrete addresses a simulator instance works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub listen: SocketAddr,
    pub target: SocketAddr,
}

/// Resolves `host:port` to every address the system resolver reports.
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, SimulatorError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| SimulatorError::Resolution {
            host: host.to_owned(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(SimulatorError::Resolution {
            host: host.to_owned(),
            reason: "no addresses found".into(),
        });
    }
    Ok(addrs)
}

/// Resolves the listen and target endpoints of `config`.
///
/// A socket can only reach peers of its own address family, so the target
/// address is picked from the same family as the listen address whenever the
/// target host offers one.
pub fn resolve_endpoints(config: &NetworkConfig) -> Result<Endpoints, SimulatorError> {
    let listen = first(resolve(&config.listen_host, config.listen_port)?);
    let candidates = resolve(&config.target_host, config.target_port)?;
    let target = candidates
        .iter()
        .copied()
        .find(|addr| addr.is_ipv4() == listen.is_ipv4())
        .unwrap_or_else(|| first(candidates));

    Ok(Endpoints { listen, target })
}

// `resolve` never returns an empty list.
fn first(addrs: Vec<SocketAddr>) -> SocketAddr {
    addrs[0]
}
