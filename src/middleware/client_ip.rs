use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// Parses one header hop: a bare address or `address:port`.
fn parse_hop(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// The caller's address: the first `X-Forwarded-For` hop, then `X-Real-IP`,
/// then the socket peer, else `"unknown"`.
///
/// Header values that are not IP addresses are ignored, so the result is
/// always a canonical address (at most 45 characters) or `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
        };

        let forwarded = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .and_then(parse_hop);
        let real_ip = || header("x-real-ip").and_then(parse_hop);
        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        };

        let ip = forwarded
            .or_else(real_ip)
            .or_else(peer)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ClientIp(ip))
    }
}
