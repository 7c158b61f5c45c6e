use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};

use crate::error::FingerprintError;

/// A parsed JA3 fingerprint.
///
/// JA3 format: `SSLVersion,Ciphers,Extensions,EllipticCurves,EcPointFormats`
///
/// - Fields separated by commas, exactly five of them
/// - Values within each field separated by dashes
/// - All values decimal; the first four fields are u16, the fifth is u8
/// - An empty field means "no values", not an error
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ja3 {
    /// Record-layer TLS version (e.g. 771 for TLS 1.2)
    pub version: u16,
    /// Cipher suite ids in wire order, GREASE included
    pub ciphers: Vec<u16>,
    /// Extension ids in wire order, GREASE included
    pub extensions: Vec<u16>,
    /// Supported groups (extension 10)
    pub groups: Vec<u16>,
    /// EC point format bytes (extension 11)
    pub point_formats: Vec<u8>,
}

impl Ja3 {
    /// Lowercase-hex MD5 of the canonical string.
    ///
    /// Not needed to build a spec; used for logging and profile metadata.
    pub fn hash(&self) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl FromStr for Ja3 {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 5 {
            return Err(FingerprintError::InvalidFingerprintSyntax(format!(
                "expected 5 comma-separated fields, got {}",
                parts.len()
            )));
        }

        let version = if parts[0].is_empty() {
            0
        } else {
            parse_field_u16(parts[0], "version")?
        };

        Ok(Ja3 {
            version,
            ciphers: parse_list_u16(parts[1], "cipher")?,
            extensions: parse_list_u16(parts[2], "extension")?,
            groups: parse_list_u16(parts[3], "group")?,
            point_formats: parse_list_u8(parts[4])?,
        })
    }
}

impl fmt::Display for Ja3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.version,
            join_dashed(&self.ciphers),
            join_dashed(&self.extensions),
            join_dashed(&self.groups),
            self.point_formats
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join("-")
        )
    }
}

fn join_dashed(values: &[u16]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("-")
}

fn parse_field_u16(token: &str, what: &str) -> Result<u16, FingerprintError> {
    token.parse::<u16>().map_err(|_| {
        FingerprintError::InvalidFingerprintSyntax(format!("invalid {} value: {}", what, token))
    })
}

fn parse_list_u16(field: &str, what: &str) -> Result<Vec<u16>, FingerprintError> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split('-')
        .map(|t| parse_field_u16(t, what))
        .collect()
}

fn parse_list_u8(field: &str) -> Result<Vec<u8>, FingerprintError> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split('-')
        .map(|t| {
            t.parse::<u8>().map_err(|_| {
                FingerprintError::InvalidFingerprintSyntax(format!(
                    "invalid point format value: {}",
                    t
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME: &str = "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-21,29-23-24,0";

    #[test]
    fn test_parse_chrome() {
        let ja3: Ja3 = CHROME.parse().unwrap();
        assert_eq!(ja3.version, 771);
        assert_eq!(ja3.ciphers.len(), 15);
        assert_eq!(ja3.ciphers[0], 4865);
        assert_eq!(ja3.extensions.len(), 16);
        assert_eq!(ja3.extensions[0], 0);
        assert_eq!(ja3.groups, vec![29, 23, 24]);
        assert_eq!(ja3.point_formats, vec![0]);
    }

    #[test]
    fn test_round_trip() {
        let ja3: Ja3 = CHROME.parse().unwrap();
        assert_eq!(ja3.to_string(), CHROME);
    }

    #[test]
    fn test_empty_fields_allowed() {
        let ja3: Ja3 = "771,,,,".parse().unwrap();
        assert_eq!(ja3.version, 771);
        assert!(ja3.ciphers.is_empty());
        assert!(ja3.extensions.is_empty());
        assert_eq!(ja3.to_string(), "771,,,,");
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        assert!("".parse::<Ja3>().is_err());
        assert!("a,b,c,d".parse::<Ja3>().is_err());
        assert!("a,b,c,d,e,f".parse::<Ja3>().is_err());
    }

    #[test]
    fn test_rejects_overflow() {
        // 70000 > u16::MAX
        assert!("771,70000,0,29,0".parse::<Ja3>().is_err());
        // 300 > u8::MAX in the point-format field
        assert!("771,4865,0,29,300".parse::<Ja3>().is_err());
        // but 300 is a fine u16 extension id
        assert!("771,4865,300,29,0".parse::<Ja3>().is_ok());
    }

    #[test]
    fn test_grease_values_survive() {
        let ja3: Ja3 = "771,2570-4865,2570-0,29,0".parse().unwrap();
        assert_eq!(ja3.ciphers[0], 0x0a0a);
        assert_eq!(ja3.extensions[0], 0x0a0a);
        assert_eq!(ja3.to_string(), "771,2570-4865,2570-0,29,0");
    }

    #[test]
    fn test_hash_is_md5_hex() {
        let ja3: Ja3 = CHROME.parse().unwrap();
        let hash = ja3.hash();
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
