use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::FingerprintError;
use crate::fingerprint::summary::ClientHelloSummary;
use crate::fingerprint::tables::ja4_version_tag;

/// A JA4 fingerprint, split into its parts.
///
/// Canonical form: `{part_a}_{cipher_hash}_{extension_hash}` where part a is
/// `{t|q}{version}{d|i}{cipher_count:02x}{extension_count:02x}{alpn_tag}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ja4 {
    /// `t` for TCP, `q` for QUIC
    pub protocol: char,
    /// `10` / `11` / `12` / `13` / `s3` / `00`
    pub version_tag: String,
    /// `d` when the SNI is a domain, `i` when absent or an IP literal
    pub sni: char,
    /// Cipher count, clamped to 0xff
    pub cipher_count: u8,
    /// Extension count, clamped to 0xff
    pub extension_count: u8,
    /// Two-character ALPN tag (`h2`, `00`, ...)
    pub alpn_tag: String,
    /// First 12 hex chars of SHA-256 over the cipher list in original order
    pub cipher_hash: String,
    /// First 12 hex chars of SHA-256 over the filtered, sorted extension list
    pub extension_hash: String,
}

impl Ja4 {
    /// Compute the JA4 fingerprint of a ClientHello.
    pub fn compute(summary: &ClientHelloSummary, alpn_tag: &str) -> Ja4 {
        Ja4 {
            protocol: if summary.is_quic { 'q' } else { 't' },
            version_tag: ja4_version_tag(summary.tls_version).to_string(),
            sni: sni_char(&summary.server_name),
            cipher_count: summary.cipher_suites.len().min(0xff) as u8,
            extension_count: summary.extensions.len().min(0xff) as u8,
            alpn_tag: alpn_tag.to_string(),
            cipher_hash: cipher_hash(&summary.cipher_suites),
            extension_hash: extension_hash(&summary.extensions),
        }
    }
}

impl fmt::Display for Ja4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{:02x}{:02x}{}_{}_{}",
            self.protocol,
            self.version_tag,
            self.sni,
            self.cipher_count,
            self.extension_count,
            self.alpn_tag,
            self.cipher_hash,
            self.extension_hash
        )
    }
}

impl FromStr for Ja4 {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = |msg: String| FingerprintError::InvalidFingerprintSyntax(msg);

        let parts: Vec<&str> = s.split('_').collect();
        if parts.len() != 3 {
            return Err(syntax(format!(
                "expected 'a_b_c' JA4 form, got {} parts",
                parts.len()
            )));
        }
        let (a, cipher_hash, extension_hash) = (parts[0], parts[1], parts[2]);
        if a.len() < 7 {
            return Err(syntax(format!("JA4 part a too short: {} chars", a.len())));
        }
        if cipher_hash.len() != 12 || extension_hash.len() != 12 {
            return Err(syntax("JA4 hashes must be 12 hex chars".to_string()));
        }

        let protocol = a.chars().next().unwrap_or('?');
        if protocol != 't' && protocol != 'q' {
            return Err(syntax(format!("invalid protocol char: {}", protocol)));
        }
        let version_tag = a.get(1..3).unwrap_or("").to_string();
        if !matches!(version_tag.as_str(), "10" | "11" | "12" | "13" | "s3" | "00") {
            return Err(syntax(format!("invalid TLS version tag: {}", version_tag)));
        }
        let sni = a.chars().nth(3).unwrap_or('?');
        if sni != 'd' && sni != 'i' {
            return Err(syntax(format!("invalid SNI char: {}", sni)));
        }

        let hex_pair = |range: Option<&str>| {
            range
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| syntax("invalid count field".to_string()))
        };
        let cipher_count = hex_pair(a.get(4..6))?;
        let extension_count = hex_pair(a.get(6..8).or_else(|| a.get(6..)))?;

        Ok(Ja4 {
            protocol,
            version_tag,
            sni,
            cipher_count,
            extension_count,
            alpn_tag: a.get(8..).unwrap_or("").to_string(),
            cipher_hash: cipher_hash.to_string(),
            extension_hash: extension_hash.to_string(),
        })
    }
}

/// Derive the two-character ALPN tag from an offered protocol list: first and
/// last alphanumeric characters of the first value, `00` when there is none.
pub fn alpn_tag(alpn: &[String]) -> String {
    let Some(first) = alpn.first() else {
        return "00".to_string();
    };
    let chars: Vec<char> = first.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    match (chars.first(), chars.last()) {
        (Some(a), Some(b)) => format!("{}{}", a, b),
        _ => "00".to_string(),
    }
}

/// SNI indicator: `i` when absent or an IP literal, `d` for a domain name.
fn sni_char(server_name: &str) -> char {
    if server_name.is_empty() {
        return 'i';
    }
    // IPv4 literal: nothing but digits and dots
    if server_name.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return 'i';
    }
    // IPv6 literal: contains a colon, everything else is a hex digit
    if server_name.contains(':')
        && server_name
            .bytes()
            .all(|b| b == b':' || b.is_ascii_hexdigit())
    {
        return 'i';
    }
    'd'
}

/// SHA-256 over the cipher ids in original order, truncated to 12 hex chars.
///
/// The empty list hashes the empty byte string.
fn cipher_hash(ciphers: &[u16]) -> String {
    truncated_sha256(&join_hex(ciphers), 12)
}

/// SHA-256 over the extension ids with SNI (0) and ALPN (16) removed and the
/// remainder sorted ascending, truncated to 12 hex chars. GREASE stays in.
fn extension_hash(extensions: &[u16]) -> String {
    let mut filtered: Vec<u16> = extensions
        .iter()
        .copied()
        .filter(|e| *e != 0 && *e != 16)
        .collect();
    filtered.sort_unstable();
    truncated_sha256(&join_hex(&filtered), 12)
}

fn join_hex(values: &[u16]) -> String {
    values
        .iter()
        .map(|v| format!("{:04x}", v))
        .collect::<Vec<_>>()
        .join(",")
}

/// SHA-256 hash, lowercase hex, truncated to `len` characters.
fn truncated_sha256(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let full = hex::encode(hasher.finalize());
    full[..len].to_string()
}
