//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `login_rate_limiter`: strict limit for `POST /api/auth/login` (~10/min)
//! - `order_rate_limiter`: moderate limit for public order creation (~30/min)
//!
//! Rejections render through [`AppError`], so a throttled client gets the
//! usual JSON envelope with a `Retry-After` header.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderValue, Request, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor that trusts proxy headers before the socket peer.
///
/// Order: `CF-Connecting-IP`, first `X-Forwarded-For` entry, `X-Real-IP`,
/// then the connection's peer address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

/// Resolve the client IP from proxy headers, falling back to `peer`.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("cf-connecting-ip")
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse().ok())
        })
        .or_else(|| header("x-real-ip").and_then(|s| s.trim().parse().ok()))
        .or(peer)
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        client_ip(req.headers(), peer).ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Map a governor rejection onto the API error envelope.
pub fn governor_error_response(error: GovernorError) -> Response {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            tracing::warn!(wait_time, "Rate limit exceeded");
            let mut response = AppError::RateLimited.into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(wait_time));
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::Internal("unable to determine client address".to_owned()).into_response()
        }
        GovernorError::Other { code, msg, .. } => AppError::Internal(format!(
            "rate limiter failed with {code}: {}",
            msg.unwrap_or_default()
        ))
        .into_response(),
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for login: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. `per_second(6)` and `burst_size(5)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn login_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(governor_error_response)
}

/// Create rate limiter for public order creation: ~30 requests per minute
/// per IP.
///
/// Configuration: 1 request every 2 seconds (replenish), burst of 10.
///
/// # Panics
///
/// This function will not panic. `per_second(2)` and `burst_size(10)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn order_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(2)
        .burst_size(10)
        .finish()
        .expect("rate limiter config with per_second(2) and burst_size(10) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(governor_error_response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use axum::routing::post;
    use tower::ServiceExt;

    use super::*;

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let map = headers(&[
            ("cf-connecting-ip", "203.0.113.7"),
            ("x-forwarded-for", "198.51.100.1"),
        ]);
        assert_eq!(client_ip(&map, None), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_first_forwarded_for_entry() {
        let map = headers(&[("x-forwarded-for", "198.51.100.1, 10.0.0.1")]);
        assert_eq!(client_ip(&map, None), Some("198.51.100.1".parse().unwrap()));
    }

    #[test]
    fn test_real_ip_then_peer() {
        let map = headers(&[("x-real-ip", "192.0.2.4")]);
        assert_eq!(client_ip(&map, None), Some("192.0.2.4".parse().unwrap()));

        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), Some(peer));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_unparseable_header_falls_through() {
        let map = headers(&[("cf-connecting-ip", "unknown"), ("x-real-ip", "192.0.2.9")]);
        assert_eq!(client_ip(&map, None), Some("192.0.2.9".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_too_many_requests_uses_json_envelope() {
        let response = governor_error_response(GovernorError::TooManyRequests {
            wait_time: 4,
            headers: None,
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "4");

        let body = json_body(response).await;
        assert_eq!(body["statusCode"], 429);
        assert_eq!(body["message"], "Too many requests");
        assert_eq!(body["error"], "Too Many Requests");
    }

    #[tokio::test]
    async fn test_missing_client_address_is_a_json_error() {
        let response = governor_error_response(GovernorError::UnableToExtractKey);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["statusCode"], 500);
    }

    #[tokio::test]
    async fn test_login_limiter_rejects_after_burst() {
        let app = Router::new()
            .route("/login", post(|| async { "ok" }))
            .route_layer(login_rate_limiter());

        let attempt = || {
            Request::post("/login")
                .header("x-forwarded-for", "198.51.100.23")
                .body(Body::empty())
                .unwrap()
        };
        for _ in 0..5 {
            let response = app.clone().oneshot(attempt()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(attempt()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(RETRY_AFTER));
        assert_eq!(json_body(response).await["statusCode"], 429);
    }
}
