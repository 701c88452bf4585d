//! Client identity derivation.

use axum::{extract::ConnectInfo, http::Request};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// The network origin of a request, used as the rate-limit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientIdentity(IpAddr);

impl ClientIdentity {
    /// Placeholder for requests whose peer address is unknown.
    pub const UNKNOWN: ClientIdentity = ClientIdentity(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    /// IPv4-mapped IPv6 addresses collapse to their IPv4 form.
    pub fn new(ip: IpAddr) -> Self {
        Self(ip.to_canonical())
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }

    /// Derive the identity from the peer address, or from the left-most
    /// `X-Forwarded-For` entry when the deployment trusts that header.
    pub fn from_request<B>(request: &Request<B>, trust_forwarded_for: bool) -> Option<Self> {
        if trust_forwarded_for {
            let forwarded = request
                .headers()
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            if let Some(ip) = forwarded {
                return Some(Self::new(ip));
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self::new(addr.ip()))
    }
}

impl From<IpAddr> for ClientIdentity {
    fn from(ip: IpAddr) -> Self {
        Self::new(ip)
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
