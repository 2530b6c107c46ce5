//! Validation of remote PDF URLs before the server fetches them.
//!
//! PDFs may live on any public host, so there is no domain allowlist.
//! What is enforced:
//! - http or https only
//! - the host must resolve, and no resolved address may be internal
//!   (loopback, private, link-local, ...) unless private URLs are allowed

use crate::error::AppError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum UrlValidationError {
    InvalidUrl(String),
    UnsupportedScheme(String),
    InternalIpAddress(String),
    DnsResolutionFailed(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlValidationError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            UrlValidationError::UnsupportedScheme(scheme) => {
                write!(f, "Only http and https URLs are allowed, got {}", scheme)
            }
            UrlValidationError::InternalIpAddress(ip) => {
                write!(f, "Internal IP addresses are not allowed: {}", ip)
            }
            UrlValidationError::DnsResolutionFailed(msg) => {
                write!(f, "DNS resolution failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for UrlValidationError {}

impl From<UrlValidationError> for AppError {
    fn from(e: UrlValidationError) -> Self {
        match e {
            UrlValidationError::InvalidUrl(_) | UrlValidationError::UnsupportedScheme(_) => {
                AppError::Validation(e.to_string())
            }
            UrlValidationError::InternalIpAddress(_) | UrlValidationError::DnsResolutionFailed(_) => {
                AppError::Fetch(e.to_string())
            }
        }
    }
}

fn is_internal_ipv4(ip: &Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        // Documentation ranges
        || (a == 192 && b == 0 && c == 2)
        || (a == 198 && b == 51 && c == 100)
        || (a == 203 && b == 0 && c == 113)
        // Shared address space 100.64.0.0/10
        || (a == 100 && (b & 0xC0) == 64)
        || (a == 192 && b == 0 && c == 0)
        // Benchmarking 198.18.0.0/15
        || (a == 198 && (b == 18 || b == 19))
}

fn is_internal_ipv6(ip: &Ipv6Addr) -> bool {
    let segments = ip.segments();
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.to_ipv4_mapped().map(|v4| is_internal_ipv4(&v4)).unwrap_or(false)
        // Unique local fc00::/7
        || (segments[0] & 0xFE00) == 0xFC00
        // Link-local fe80::/10
        || (segments[0] & 0xFFC0) == 0xFE80
        || (segments[0] == 0x2001 && segments[1] == 0x0DB8)
}

pub fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => is_internal_ipv6(v6),
    }
}

/// Syntactic checks only: parse and scheme.
pub fn parse_pdf_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlValidationError::InvalidUrl(e.to_string()))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlValidationError::InvalidUrl("No host in URL".to_string()));
    }
    Ok(url)
}

/// Validate a URL for fetching, resolving the host to guard against
/// requests into the local network.
pub async fn validate_pdf_url(url_str: &str, allow_private: bool) -> Result<Url, UrlValidationError> {
    let url = parse_pdf_url(url_str)?;
    if allow_private {
        return Ok(url);
    }

    let host = url
        .host_str()
        .ok_or_else(|| UrlValidationError::InvalidUrl("No host in URL".to_string()))?;
    let port = url.port_or_known_default().unwrap_or(443);
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| UrlValidationError::DnsResolutionFailed(e.to_string()))?;
    for addr in addrs {
        if is_internal_ip(&addr.ip()) {
            return Err(UrlValidationError::InternalIpAddress(addr.ip().to_string()));
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_ips() {
        assert!(is_internal_ipv4(&Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(192, 168, 1, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(172, 16, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(169, 254, 1, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(100, 64, 0, 1)));
        assert!(!is_internal_ipv4(&Ipv4Addr::new(8, 8, 8, 8)));

        assert!(is_internal_ipv6(&Ipv6Addr::LOCALHOST));
        assert!(is_internal_ipv6(&Ipv6Addr::UNSPECIFIED));
        assert!(is_internal_ipv6(&"fe80::1".parse().unwrap()));
        assert!(is_internal_ipv6(&"::ffff:10.0.0.1".parse().unwrap()));
        assert!(!is_internal_ipv6(&"2606:4700::1111".parse().unwrap()));
    }

    #[test]
    fn test_parse_pdf_url() {
        assert!(parse_pdf_url("https://storage.example.org/papers/a.pdf").is_ok());
        assert!(parse_pdf_url("http://example.org/a.pdf").is_ok());
        assert!(matches!(
            parse_pdf_url("ftp://example.org/a.pdf"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            parse_pdf_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_loopback_blocked_unless_allowed() {
        let result = validate_pdf_url("http://127.0.0.1:9/a.pdf", false).await;
        assert!(matches!(result, Err(UrlValidationError::InternalIpAddress(_))));
        assert!(validate_pdf_url("http://127.0.0.1:9/a.pdf", true).await.is_ok());
    }

    #[test]
    fn test_error_mapping() {
        let e: AppError = UrlValidationError::UnsupportedScheme("file".into()).into();
        assert_eq!(e.status_code(), axum::http::StatusCode::BAD_REQUEST);
        let e: AppError = UrlValidationError::InternalIpAddress("10.0.0.1".into()).into();
        assert_eq!(e.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
