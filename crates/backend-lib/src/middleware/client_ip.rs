//! Client address resolution.
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use crate::AppState;

/// Best-effort client IP.
///
/// The socket peer, unless the peer is one of `rate_limit.trusted_proxies`, in
/// which case the address it reports in `X-Real-IP` or `X-Forwarded-For` is
/// used. `None` when the peer is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

/// Resolve the client address for a request arriving from `peer`.
///
/// Forwarding headers are only read when `peer` is trusted. In
/// `X-Forwarded-For` the nearest hop that is not itself a trusted proxy wins,
/// since anything further left was written by the client.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> Option<IpAddr> {
    let peer = peer?;
    if !trusted_proxies.contains(&peer) {
        return Some(peer);
    }

    let real_ip: Option<IpAddr> = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    real_ip
        .or_else(|| {
            let hops: Vec<IpAddr> = headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())?
                .split(',')
                .filter_map(|v| v.trim().parse().ok())
                .collect();
            hops.iter()
                .rev()
                .find(|hop| !trusted_proxies.contains(*hop))
                .or_else(|| hops.first())
                .copied()
        })
        .or(Some(peer))
}

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(ClientIp(resolve_client_ip(
            &parts.headers,
            peer,
            &state.settings.rate_limit.trusted_proxies,
        )))
    }
}
