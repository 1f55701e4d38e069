use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use std::net::{IpAddr, SocketAddr};

use crate::app::AppContext;
use crate::error::WebhookError;

/// Network address of the caller
///
/// Uses the TCP peer address. When `trust_proxy` is enabled, the first
/// `X-Forwarded-For` entry or `X-Real-IP` is used instead if it parses as an
/// IP address.
///
/// The server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`; without a peer
/// address the request fails with an internal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl FromRequestParts<AppContext> for ClientIp {
    type Rejection = WebhookError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        if ctx.trust_proxy {
            if let Some(ip) = forwarded_ip(parts) {
                return Ok(ClientIp(ip));
            }
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| ClientIp(addr.ip()))
            .ok_or_else(|| WebhookError::internal("Client address unavailable"))
    }
}

fn forwarded_ip(parts: &Parts) -> Option<IpAddr> {
    let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());

    // X-Forwarded-For may contain multiple IPs: "client, proxy1, proxy2"
    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| header("x-real-ip").and_then(|v| v.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)], peer: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/webhook");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let mut request = builder.body(()).unwrap();
        if let Some(peer) = peer {
            let addr: SocketAddr = peer.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request.into_parts().0
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let p = parts(&[("x-forwarded-for", "203.0.113.1, 10.0.0.1")], None);
        assert_eq!(forwarded_ip(&p), Some("203.0.113.1".parse().unwrap()));
    }

    #[test]
    fn test_real_ip_fallback() {
        let p = parts(&[("x-forwarded-for", "garbage"), ("x-real-ip", "::1")], None);
        assert_eq!(forwarded_ip(&p), Some("::1".parse().unwrap()));
    }

    #[test]
    fn test_no_proxy_headers() {
        let p = parts(&[], Some("10.0.0.2:4000"));
        assert_eq!(forwarded_ip(&p), None);
    }
}
