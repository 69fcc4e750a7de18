//! Client address resolution behind reverse proxies.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Forwarding headers consulted in order before the socket address.
const FORWARDING_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "forwarded"];

/// Resolve the originating client IP.
///
/// Takes the first parseable address from the forwarding header chain
/// (`X-Forwarded-For`, `X-Real-IP`, RFC 7239 `Forwarded: for=`) and falls back
/// to the direct connection address.
pub fn resolve_client_ip(headers: &HeaderMap, direct: Option<SocketAddr>) -> Option<IpAddr> {
    for name in FORWARDING_HEADERS {
        let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
            continue;
        };

        let candidate = if name == "forwarded" {
            parse_forwarded_for(value)
        } else {
            value
                .split(',')
                .next()
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        if candidate.is_some() {
            return candidate;
        }
    }

    direct.map(|addr| addr.ip())
}

fn parse_forwarded_for(value: &str) -> Option<IpAddr> {
    let first = value.split(',').next()?;
    first.split(';').find_map(|pair| {
        let (key, raw) = pair.trim().split_once('=')?;
        if !key.eq_ignore_ascii_case("for") {
            return None;
        }
        let raw = raw.trim_matches('"');
        // `for="[2001:db8::1]:4711"` or `for=192.0.2.60:8080`
        let host = if let Some(rest) = raw.strip_prefix('[') {
            rest.split(']').next()?
        } else {
            raw.split(':').next()?
        };
        host.parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, v.parse().unwrap());
        }
        map
    }

    #[test]
    fn prefers_first_forwarded_for_entry() {
        let h = headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        let direct: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(
            resolve_client_ip(&h, Some(direct)),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn falls_through_to_real_ip_then_socket() {
        let h = headers(&[("x-forwarded-for", "garbage"), ("x-real-ip", "198.51.100.2")]);
        assert_eq!(
            resolve_client_ip(&h, None),
            Some("198.51.100.2".parse().unwrap())
        );

        let direct: SocketAddr = "192.0.2.1:443".parse().unwrap();
        assert_eq!(
            resolve_client_ip(&HeaderMap::new(), Some(direct)),
            Some("192.0.2.1".parse().unwrap())
        );
        assert_eq!(resolve_client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn parses_rfc7239_forwarded() {
        let h = headers(&[("forwarded", "for=\"[2001:db8::1]:4711\";proto=https")]);
        assert_eq!(
            resolve_client_ip(&h, None),
            Some("2001:db8::1".parse().unwrap())
        );

        let h = headers(&[("forwarded", "for=192.0.2.60;proto=http, for=10.0.0.1")]);
        assert_eq!(
            resolve_client_ip(&h, None),
            Some("192.0.2.60".parse().unwrap())
        );
    }
}
