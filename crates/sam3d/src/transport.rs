//! Mixed-content detection for plaintext endpoints
//!
//! When the embedding context is served over an encrypted transport, a
//! plaintext `http://` endpoint will be silently blocked by the environment
//! before any bytes leave the machine. Surfacing this as a distinct condition
//! lets the caller present actionable guidance instead of a generic network
//! error.

/// Returns true if a request to `endpoint` from a secure context would be
/// blocked as mixed content.
///
/// Loopback hosts are exempt, matching browser behavior.
pub fn mixed_content_blocked(secure_context: bool, endpoint: &str) -> bool {
    if !secure_context {
        return false;
    }
    let Some(rest) = endpoint.strip_prefix("http://") else {
        return false;
    };
    !is_loopback(host_of(rest))
}

/// Extract the host portion from an endpoint with the scheme stripped
fn host_of(rest: &str) -> &str {
    // Bracketed IPv6 hosts carry colons of their own
    if rest.starts_with('[') {
        if let Some(close) = rest.find(']') {
            return &rest[..=close];
        }
    }
    let end = rest.find(['/', ':', '?']).unwrap_or(rest.len());
    &rest[..end]
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "0.0.0.0")
}
