use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the fingerprint core.
///
/// None of these are retried internally; the caller decides whether to retry,
/// fall back to an unfingerprinted handshake, or drop the connection.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("invalid fingerprint syntax: {0}")]
    InvalidFingerprintSyntax(String),

    #[error("unknown browser profile: {0}")]
    UnknownProfile(String),

    #[error("cannot read ClientHello spec file {path}: {source}")]
    SpecSourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ClientHello spec file {path} matched no supported schema (reflector: {reflector}; compat: {compat})")]
    SpecSourceMalformed {
        path: PathBuf,
        reflector: String,
        compat: String,
    },

    #[error("deadline exceeded")]
    Timeout,

    #[error("dial failed: {0}")]
    DialFailed(#[source] std::io::Error),

    #[error("TLS handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("HTTP/2 profile not found: {0}")]
    ProfileUnsupported(String),
}

pub type Result<T> = std::result::Result<T, FingerprintError>;
