//! Fingerprint value types: wire tables, GREASE, JA3, JA4.

pub mod grease;
pub mod ja3;
pub mod ja4;
pub mod summary;
pub mod tables;

pub use grease::{is_grease_u16, GREASE_VALUES};
pub use ja3::Ja3;
pub use ja4::{alpn_tag, Ja4};
pub use summary::ClientHelloSummary;
