//! Client address extraction.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Pick the client address for rate limiting and geolocation.
///
/// The left-most `X-Forwarded-For` entry wins when it parses as an address;
/// otherwise the peer address is used. The header is trusted as-is, so the
/// service must sit behind a proxy that controls it.
pub fn client_ip(headers: &HeaderMap, peer: IpAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .unwrap_or(peer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 198.51.100.1"),
        );
        let peer: IpAddr = "192.168.1.1".parse().unwrap();

        assert_eq!(
            client_ip(&headers, peer),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_falls_back_to_peer_without_header() {
        let headers = HeaderMap::new();
        let peer: IpAddr = "192.168.1.1".parse().unwrap();

        assert_eq!(client_ip(&headers, peer), peer);
    }

    #[test]
    fn test_falls_back_to_peer_on_garbage_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let peer: IpAddr = "10.0.0.7".parse().unwrap();

        assert_eq!(client_ip(&headers, peer), peer);
    }

    #[test]
    fn test_parses_ipv6_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("2001:db8::1"));
        let peer: IpAddr = "127.0.0.1".parse().unwrap();

        assert_eq!(
            client_ip(&headers, peer),
            "2001:db8::1".parse::<IpAddr>().unwrap()
        );
    }
}
