//! Endpoint validation against server-side request forgery.
//!
//! Solver endpoints are attacker-supplied URLs the aggregator will POST
//! to, so they must never resolve into the deployment's own network.
//! Validation runs at registration and again immediately before every
//! outbound request (DNS rebinding protection).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use tokio::net::lookup_host;
use url::Url;

/// Hostnames that are blocked outright, resolvable or not.
const RESERVED_HOSTNAMES: &[&str] = &[
	"localhost",
	"metadata",
	"metadata.google.internal",
	"instance-data",
	"metadata.azure.internal",
];

#[derive(Error, Debug)]
pub enum SsrfError {
	#[error("endpoint is not a valid url: {0}")]
	Malformed(String),

	#[error("endpoint scheme {0} is not allowed")]
	SchemeNotAllowed(String),

	#[error("endpoint hostname is reserved")]
	ReservedHostname,

	#[error("endpoint resolves to a reserved address: {0}")]
	ReservedAddress(IpAddr),

	#[error("endpoint hostname does not resolve: {0}")]
	Unresolvable(String),
}

fn is_reserved_v4(addr: Ipv4Addr) -> bool {
	addr.is_loopback()
		|| addr.is_private()
		|| addr.is_link_local()
		|| addr.is_unspecified()
		|| addr.is_broadcast()
		// CGNAT range, where cloud metadata proxies also live
		|| (addr.octets()[0] == 100 && (addr.octets()[1] & 0xc0) == 64)
}

fn is_reserved_v6(addr: Ipv6Addr) -> bool {
	if let Some(mapped) = addr.to_ipv4_mapped() {
		return is_reserved_v4(mapped);
	}
	let first = addr.segments()[0];
	addr.is_loopback()
		|| addr.is_unspecified()
		// unique-local fc00::/7
		|| (first & 0xfe00) == 0xfc00
		// link-local fe80::/10
		|| (first & 0xffc0) == 0xfe80
}

pub fn is_reserved_ip(addr: IpAddr) -> bool {
	match addr {
		IpAddr::V4(v4) => is_reserved_v4(v4),
		IpAddr::V6(v6) => is_reserved_v6(v6),
	}
}

/// Validate scheme, hostname and every resolved address of an endpoint.
pub async fn validate_endpoint(endpoint: &str, dev_mode: bool) -> Result<(), SsrfError> {
	let url = Url::parse(endpoint).map_err(|e| SsrfError::Malformed(e.to_string()))?;

	match url.scheme() {
		"https" => {}
		"http" if dev_mode => {}
		other => return Err(SsrfError::SchemeNotAllowed(other.to_string())),
	}

	let host = url
		.host()
		.ok_or_else(|| SsrfError::Malformed("missing host".into()))?;
	let port = url.port_or_known_default().unwrap_or(443);

	match host {
		url::Host::Ipv4(addr) => {
			if is_reserved_v4(addr) {
				return Err(SsrfError::ReservedAddress(IpAddr::V4(addr)));
			}
		}
		url::Host::Ipv6(addr) => {
			if is_reserved_v6(addr) {
				return Err(SsrfError::ReservedAddress(IpAddr::V6(addr)));
			}
		}
		url::Host::Domain(name) => {
			let lowered = name.to_ascii_lowercase();
			if RESERVED_HOSTNAMES.contains(&lowered.as_str()) {
				return Err(SsrfError::ReservedHostname);
			}
			let addrs: Vec<_> = lookup_host((lowered.as_str(), port))
				.await
				.map_err(|e| SsrfError::Unresolvable(e.to_string()))?
				.collect();
			if addrs.is_empty() {
				return Err(SsrfError::Unresolvable(lowered));
			}
			for addr in addrs {
				if is_reserved_ip(addr.ip()) {
					return Err(SsrfError::ReservedAddress(addr.ip()));
				}
			}
		}
	}

	Ok(())
}
