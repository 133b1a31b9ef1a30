//! Client identity extraction.
//!
//! The rate limiter keys buckets on whatever identifies a client. Behind a
//! CDN or reverse proxy the transport peer is the proxy, so forwarding
//! headers take precedence:
//!
//! ```text
//!     CF-Connecting-IP ──► X-Forwarded-For ──► peer address ──► Unknown
//! ```
//!
//! Headers are trusted as sent. Every request that yields [`ClientIdentity::Unknown`]
//! shares a single bucket.

use axum::http::HeaderMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const CF_CONNECTING_IP: &str = "cf-connecting-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Key identifying one rate-limited client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    /// Value of a forwarding header, verbatim.
    Forwarded(String),
    /// Transport peer IP; the source port is dropped.
    Peer(IpAddr),
    /// Nothing identified the client.
    Unknown,
}

impl ClientIdentity {
    /// Derives the identity from request headers and the peer address.
    ///
    /// # Example
    ///
    /// ```rust
    /// use axum::http::HeaderMap;
    /// use qrgate::ClientIdentity;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
    ///
    /// let peer = "10.0.0.1:55000".parse().ok();
    /// assert_eq!(
    ///     ClientIdentity::from_parts(&headers, peer),
    ///     ClientIdentity::Forwarded("203.0.113.9".to_string())
    /// );
    /// ```
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        if let Some(value) = header_value(headers, CF_CONNECTING_IP) {
            return Self::Forwarded(value);
        }
        if let Some(value) = header_value(headers, X_FORWARDED_FOR) {
            return Self::Forwarded(value);
        }
        match peer {
            Some(addr) => Self::Peer(addr.ip()),
            None => Self::Unknown,
        }
    }

    /// `true` for the shared fallback identity.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forwarded(value) => f.write_str(value),
            Self::Peer(ip) => write!(f, "{ip}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
