use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::FingerprintError;

/// HTTP/2 SETTINGS identifiers.
pub mod setting {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// An Akamai-format HTTP/2 fingerprint.
///
/// Canonical form: `SETTINGS|WINDOW_UPDATE|PRIORITY|PSEUDO_HEADER_ORDER`,
/// e.g. `1:65536;2:0;3:100;4:6291456;6:262144|15663105|0|m,a,s,p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Http2Fingerprint {
    /// SETTINGS frame parameters; serialized ascending by key
    pub settings: BTreeMap<u16, u32>,
    /// Initial WINDOW_UPDATE increment
    pub window_update: u32,
    /// PRIORITY frame info; `None` when the client sends none
    pub priority: Option<Http2Priority>,
    /// Pseudo-header emission order, e.g. `m,a,s,p` for
    /// :method, :authority, :scheme, :path
    pub pseudo_header_order: String,
}

/// Stream priority information carried by a PRIORITY frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Http2Priority {
    pub stream_dependency: u32,
    pub weight: u8,
    pub exclusive: bool,
}

impl Http2Fingerprint {
    /// SHA-256 hex digest of the canonical string.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// A settings value, if the fingerprint carries it.
    pub fn setting(&self, id: u16) -> Option<u32> {
        self.settings.get(&id).copied()
    }
}

impl FromStr for Http2Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('|').collect();
        if parts.len() != 4 {
            return Err(FingerprintError::InvalidFingerprintSyntax(format!(
                "expected 4 pipe-separated HTTP/2 fingerprint parts, got {}",
                parts.len()
            )));
        }

        let mut settings = BTreeMap::new();
        if !parts[0].is_empty() {
            for pair in parts[0].split(';') {
                // malformed pairs are skipped, not fatal
                let Some((k, v)) = pair.split_once(':') else {
                    continue;
                };
                let (Ok(key), Ok(value)) = (k.parse::<u16>(), v.parse::<u32>()) else {
                    continue;
                };
                settings.insert(key, value);
            }
        }

        let window_update = parts[1].parse::<u32>().unwrap_or(0);

        let priority = match parts[2].parse::<u32>() {
            Ok(dep) if dep > 0 => Some(Http2Priority {
                stream_dependency: dep,
                weight: 255,
                exclusive: true,
            }),
            _ => None,
        };

        Ok(Http2Fingerprint {
            settings,
            window_update,
            priority,
            pseudo_header_order: parts[3].to_string(),
        })
    }
}

impl fmt::Display for Http2Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self
            .settings
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(";");
        let priority = self
            .priority
            .map(|p| p.stream_dependency)
            .unwrap_or(0);
        let order = if self.pseudo_header_order.is_empty() {
            "m,a,s,p"
        } else {
            &self.pseudo_header_order
        };
        write!(f, "{}|{}|{}|{}", settings, self.window_update, priority, order)
    }
}

/// A named HTTP/2 browser profile.
#[derive(Debug, Clone)]
pub struct Http2Profile {
    /// Human-readable name
    pub name: &'static str,
    /// Canonical Akamai string
    pub akamai: &'static str,
    /// Parsed form, derived from `akamai` at catalog construction
    pub fingerprint: Http2Fingerprint,
    /// HPACK dynamic table size the browser uses
    pub header_table_size: u32,
}

const CHROMIUM_AKAMAI: &str = "1:65536;2:0;3:100;4:6291456;6:262144|15663105|0|m,a,s,p";
const FIREFOX_AKAMAI: &str = "1:65536;2:0;4:131072;5:16384|12517377|0|m,p,a,s";
const SAFARI_AKAMAI: &str = "2:0;3:100;4:6291456;6:262144|15663105|0|m,a,s,p";

static CATALOG: &[(&str, &str, &str, u32)] = &[
    ("chrome_120", "Chrome 120", CHROMIUM_AKAMAI, 65536),
    ("chrome_108", "Chrome 108", CHROMIUM_AKAMAI, 65536),
    ("edge_120", "Edge 120", CHROMIUM_AKAMAI, 65536),
    ("android_chrome", "Chrome Android", CHROMIUM_AKAMAI, 65536),
    ("firefox_120", "Firefox 120", FIREFOX_AKAMAI, 65536),
    ("firefox_102", "Firefox 102", FIREFOX_AKAMAI, 65536),
    ("safari_17", "Safari 17", SAFARI_AKAMAI, 4096),
    ("safari_ios_17", "Safari iOS 17", SAFARI_AKAMAI, 4096),
    (
        "okhttp_android",
        "OkHttp Android",
        "1:65536;2:1;3:1000;4:6291456|10485760|0|m,a,s,p",
        65536,
    ),
    ("curl_8", "curl 8.x", "2:0;3:100;4:1048576|1048576|0|m,a,s,p", 4096),
    (
        "go_http",
        "Go HTTP Client",
        "3:100;4:1048576;6:262144|1048576|0|m,a,s,p",
        4096,
    ),
];

/// Look up an HTTP/2 profile by its lower-snake id.
pub fn http2_profile(name: &str) -> Option<Http2Profile> {
    let name = name.to_lowercase();
    CATALOG
        .iter()
        .find(|(k, _, _, _)| *k == name)
        .map(|(_, display, akamai, table)| Http2Profile {
            name: display,
            akamai,
            // catalog strings are well-formed by construction
            fingerprint: akamai.parse().expect("catalog fingerprint string"),
            header_table_size: *table,
        })
}

/// All HTTP/2 profile ids, in catalog order.
pub fn http2_profile_names() -> Vec<&'static str> {
    CATALOG.iter().map(|(k, _, _, _)| *k).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chrome_fingerprint() {
        let fp: Http2Fingerprint = CHROMIUM_AKAMAI.parse().unwrap();
        assert_eq!(fp.setting(setting::HEADER_TABLE_SIZE), Some(65536));
        assert_eq!(fp.setting(setting::ENABLE_PUSH), Some(0));
        assert_eq!(fp.setting(setting::MAX_CONCURRENT_STREAMS), Some(100));
        assert_eq!(fp.setting(setting::INITIAL_WINDOW_SIZE), Some(6291456));
        assert_eq!(fp.setting(setting::MAX_HEADER_LIST_SIZE), Some(262144));
        assert_eq!(fp.window_update, 15663105);
        assert!(fp.priority.is_none());
        assert_eq!(fp.pseudo_header_order, "m,a,s,p");
    }

    #[test]
    fn catalog_round_trips() {
        for name in http2_profile_names() {
            let profile = http2_profile(name).unwrap();
            assert_eq!(
                profile.fingerprint.to_string(),
                profile.akamai,
                "canonical form for {}",
                name
            );
        }
    }

    #[test]
    fn nonzero_priority_field_is_exclusive_weight_255() {
        let fp: Http2Fingerprint = "1:65536|65535|3|m,a,s,p".parse().unwrap();
        let p = fp.priority.unwrap();
        assert_eq!(p.stream_dependency, 3);
        assert_eq!(p.weight, 255);
        assert!(p.exclusive);
    }

    #[test]
    fn malformed_setting_pairs_are_skipped() {
        let fp: Http2Fingerprint = "1:65536;nonsense;9:;3:100|0|0|m,p,a,s".parse().unwrap();
        assert_eq!(fp.settings.len(), 2);
        assert_eq!(fp.setting(1), Some(65536));
        assert_eq!(fp.setting(3), Some(100));
    }

    #[test]
    fn wrong_part_count_is_rejected() {
        assert!("1:65536|0|0".parse::<Http2Fingerprint>().is_err());
        assert!("1:65536|0|0|m,a,s,p|extra".parse::<Http2Fingerprint>().is_err());
    }

    #[test]
    fn serializes_settings_in_ascending_key_order() {
        let fp: Http2Fingerprint = "6:262144;1:65536;3:100|15663105|0|m,a,s,p".parse().unwrap();
        assert_eq!(fp.to_string(), "1:65536;3:100;6:262144|15663105|0|m,a,s,p");
    }

    #[test]
    fn empty_pseudo_header_order_defaults_on_output() {
        let mut fp: Http2Fingerprint = CHROMIUM_AKAMAI.parse().unwrap();
        fp.pseudo_header_order = String::new();
        assert!(fp.to_string().ends_with("|m,a,s,p"));
    }

    #[test]
    fn firefox_pseudo_header_order_differs() {
        let profile = http2_profile("firefox_120").unwrap();
        assert_eq!(profile.fingerprint.pseudo_header_order, "m,p,a,s");
        assert_eq!(profile.fingerprint.setting(setting::MAX_FRAME_SIZE), Some(16384));
    }

    #[test]
    fn unknown_profile_is_none() {
        assert!(http2_profile("mosaic_1993").is_none());
        assert!(http2_profile("CHROME_120").is_some());
    }

    #[test]
    fn hash_is_sha256_hex() {
        let fp: Http2Fingerprint = CHROMIUM_AKAMAI.parse().unwrap();
        let hash = fp.hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
