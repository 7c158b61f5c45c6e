//! tlsmimic-core — TLS/HTTP2 fingerprint engine for an intercepting proxy.
//!
//! Makes outbound TLS and HTTP/2 connections look, at the byte level of the
//! ClientHello and the HTTP/2 preamble, like a specific real-world browser:
//!
//! - [`fingerprint`] — JA3/JA4 value types, wire tables, GREASE
//! - [`spec`] — ClientHello templates built from a JA3 string, a JSON
//!   descriptor, or a named browser profile
//! - [`profiles`] / [`http2`] — the browser catalogs and the HTTP/2
//!   transport configurator
//! - [`cache`] — bounded spec cache keyed by fingerprint source
//! - [`dial`] / [`mitm`] — deadline-bound TLS dialing and the sniffer facade
//! - [`wire`] — byte-exact template emission
//! - [`engine`] — the handshake engine seam over rustls

pub mod cache;
pub mod dial;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod http2;
pub mod mitm;
pub mod profiles;
pub mod spec;
pub mod wire;

pub use cache::{global_cache, init_global_cache, CacheConfig, CacheKey, SpecCache};
pub use dial::TlsDialerConfig;
pub use engine::{SessionInfo, TlsSession};
pub use error::{FingerprintError, Result};
pub use fingerprint::{ClientHelloSummary, Ja3, Ja4};
pub use spec::{ClientHelloSpec, ExtensionSpec, HelloInput};
