use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{FingerprintError, Result};
use crate::fingerprint::tables::{
    cipher_id_by_name, group_id_by_name, group, signature_scheme_by_name, tls_version_by_name,
    version,
};
use crate::spec::model::{
    ClientHelloSpec, ExtensionSpec, KeyShareEntry, PaddingStyle, RenegotiationMode,
};

/// A JSON ClientHello descriptor, as produced by TLS fingerprint reflector
/// services.
///
/// Two layouts are accepted: the reflector format with a top-level `tls`
/// object, and a compatibility layout carrying the same fields at the
/// document root. Extension order in the JSON array defines emission order.
#[derive(Debug, Clone)]
pub struct Descriptor {
    tls: TlsSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ReflectorDocument {
    tls: TlsSection,
}

#[derive(Debug, Clone, Deserialize)]
struct TlsSection {
    #[serde(default)]
    ciphers: Vec<String>,
    #[serde(default)]
    extensions: Vec<ExtensionEntry>,
    #[serde(default)]
    ja3: Option<String>,
    #[serde(default)]
    ja3_hash: Option<String>,
    #[serde(default)]
    ja4: Option<String>,
    #[serde(default)]
    tls_version_record: Option<String>,
    #[serde(default)]
    tls_version_negotiated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ExtensionEntry {
    name: String,
    #[serde(default)]
    server_name: Option<String>,
    #[serde(default)]
    elliptic_curves_point_formats: Vec<String>,
    #[serde(default)]
    supported_groups: Vec<String>,
    #[serde(default)]
    protocols: Vec<String>,
    #[serde(default)]
    signature_algorithms: Vec<String>,
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    padding_data_length: Option<u16>,
    #[serde(default)]
    shared_keys: Vec<BTreeMap<String, String>>,
}

impl Descriptor {
    /// Load a descriptor file, trying the reflector schema first and the
    /// compatibility schema second.
    pub fn load(path: &Path) -> Result<Descriptor> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            FingerprintError::SpecSourceUnavailable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_json(&raw).map_err(|(reflector, compat)| {
            FingerprintError::SpecSourceMalformed {
                path: path.to_path_buf(),
                reflector,
                compat,
            }
        })
    }

    /// Parse descriptor JSON; on failure returns both schema errors.
    pub(crate) fn from_json(raw: &str) -> std::result::Result<Descriptor, (String, String)> {
        let reflector_err = match serde_json::from_str::<ReflectorDocument>(raw) {
            Ok(doc) => return Ok(Descriptor { tls: doc.tls }),
            Err(e) => e.to_string(),
        };
        match serde_json::from_str::<TlsSection>(raw) {
            Ok(tls) if !(tls.ciphers.is_empty() && tls.extensions.is_empty()) => {
                Ok(Descriptor { tls })
            }
            Ok(_) => Err((
                reflector_err,
                "document carries no ciphers or extensions".to_string(),
            )),
            Err(e) => Err((reflector_err, e.to_string())),
        }
    }

    /// The embedded JA3 string, when the reflector recorded one.
    pub fn ja3(&self) -> Option<&str> {
        self.tls.ja3.as_deref()
    }

    /// The embedded JA3 hash, when recorded.
    pub fn ja3_hash(&self) -> Option<&str> {
        self.tls.ja3_hash.as_deref()
    }

    /// The embedded JA4 string, when recorded.
    pub fn ja4(&self) -> Option<&str> {
        self.tls.ja4.as_deref()
    }

    /// The negotiated TLS version recorded by the reflector.
    pub fn tls_version_negotiated(&self) -> Option<&str> {
        self.tls.tls_version_negotiated.as_deref()
    }

    /// Build the ClientHello template.
    ///
    /// Unknown cipher names are dropped; extensions are emitted in array
    /// order; names outside the recognized set are skipped (a name alone
    /// carries no wire id to preserve).
    pub fn build(&self, server_name: &str) -> ClientHelloSpec {
        let mut spec = ClientHelloSpec::default();

        for name in &self.tls.ciphers {
            match cipher_id_by_name(name) {
                Some(id) => spec.cipher_suites.push(id),
                None => debug!(cipher = name.as_str(), "dropping unknown cipher name"),
            }
        }

        match self
            .tls
            .tls_version_record
            .as_deref()
            .and_then(tls_version_by_name)
        {
            Some(v) => {
                spec.tls_version_min = v;
                spec.tls_version_max = v;
            }
            None => {
                spec.tls_version_min = version::TLS10;
                spec.tls_version_max = version::TLS13;
            }
        }

        for entry in &self.tls.extensions {
            if let Some(e) = build_extension(entry, server_name) {
                spec.extensions.push(e);
            }
        }

        spec
    }
}

fn build_extension(entry: &ExtensionEntry, server_name: &str) -> Option<ExtensionSpec> {
    let name = entry.name.to_lowercase();

    if name.contains("server_name") {
        let sni = if !server_name.is_empty() {
            server_name
        } else {
            entry.server_name.as_deref().unwrap_or("")
        };
        if sni.is_empty() {
            return None;
        }
        return Some(ExtensionSpec::ServerName(sni.to_string()));
    }
    if name.contains("supported_groups") {
        let groups: Vec<u16> = entry
            .supported_groups
            .iter()
            .filter_map(|g| group_id_by_name(g))
            .collect();
        return Some(ExtensionSpec::SupportedGroups(groups));
    }
    if name.contains("ec_point_formats") {
        let formats: Vec<u8> = entry
            .elliptic_curves_point_formats
            .iter()
            .filter_map(|p| parse_point_format(p))
            .collect();
        return Some(ExtensionSpec::EcPointFormats(formats));
    }
    if name.contains("signature_algorithms") {
        let schemes: Vec<u16> = entry
            .signature_algorithms
            .iter()
            .filter_map(|s| signature_scheme_by_name(s))
            .collect();
        return Some(ExtensionSpec::SignatureAlgorithms(schemes));
    }
    if name.contains("application_layer_protocol_negotiation") {
        return Some(ExtensionSpec::Alpn(entry.protocols.clone()));
    }
    if name.contains("supported_versions") {
        let versions: Vec<u16> = entry
            .versions
            .iter()
            .filter_map(|v| tls_version_by_name(v))
            .collect();
        return Some(ExtensionSpec::SupportedVersions(versions));
    }
    if name.contains("key_share") {
        let mut entries: Vec<KeyShareEntry> = entry
            .shared_keys
            .iter()
            .flat_map(|m| m.keys())
            .filter_map(|k| group_id_by_name(k))
            .map(KeyShareEntry::auto)
            .collect();
        if entries.is_empty() {
            entries.push(KeyShareEntry::auto(group::X25519));
        }
        return Some(ExtensionSpec::KeyShare(entries));
    }
    if name.contains("psk_key_exchange_modes") {
        return Some(ExtensionSpec::PskKeyExchangeModes(vec![1]));
    }
    if name.contains("session_ticket") {
        return Some(ExtensionSpec::SessionTicket);
    }
    if name.contains("signed_certificate_timestamp") {
        return Some(ExtensionSpec::Sct);
    }
    if name.contains("status_request") {
        return Some(ExtensionSpec::StatusRequest);
    }
    if name.contains("extended_master_secret") {
        return Some(ExtensionSpec::ExtendedMasterSecret);
    }
    if name.contains("renegotiation") {
        return Some(ExtensionSpec::RenegotiationInfo(
            RenegotiationMode::OnceAsClient,
        ));
    }
    if name.contains("padding") {
        if entry.padding_data_length.unwrap_or(0) > 0 {
            return Some(ExtensionSpec::Padding(PaddingStyle::Boring));
        }
        return None;
    }

    debug!(extension = entry.name.as_str(), "skipping unrecognized extension name");
    None
}

fn parse_point_format(token: &str) -> Option<u8> {
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u8::from_str_radix(hex, 16).ok()
}
