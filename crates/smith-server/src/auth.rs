//! Handshake header checks (spec.md §4.6). Failures never reach the wire —
//! the connection is refused before upgrade, matching the `Unauthenticated`
//! taxonomy entry in spec.md §7 ("surfaced only as a refused handshake").

use axum::http::HeaderMap;
use thiserror::Error;

use crate::messages::PROTOCOL_VERSION;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing or incorrect x-smith-auth header")]
    BadToken,
    #[error("unsupported protocol version")]
    BadProtocolVersion,
}

pub fn check_handshake(headers: &HeaderMap, auth_token: &str) -> Result<(), AuthError> {
    let presented = headers
        .get("x-smith-auth")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if presented != auth_token {
        return Err(AuthError::BadToken);
    }

    if let Some(version) = headers.get("x-smith-protocol-version") {
        let version = version.to_str().unwrap_or("");
        match version.parse::<u32>() {
            Ok(v) if v == PROTOCOL_VERSION => {}
            _ => return Err(AuthError::BadProtocolVersion),
        }
    }

    Ok(())
}
