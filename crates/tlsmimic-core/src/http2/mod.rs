//! Akamai-format HTTP/2 fingerprints and their (partial) application to a
//! client transport.

pub mod akamai;
pub mod transport;

pub use akamai::{http2_profile, http2_profile_names, Http2Fingerprint, Http2Priority, Http2Profile};
pub use transport::{
    configurable_settings, validate, H2Transport, H2Warning, MimicClient, MimicClientConfig,
};
