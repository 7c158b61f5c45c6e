use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::{FingerprintError, Result};
use crate::fingerprint::tables::{ext, group, version};
use crate::fingerprint::Ja3;
use crate::profiles::{self, HelloId};
use crate::spec::model::{
    ClientHelloSpec, ExtensionSpec, KeyShareEntry, PaddingStyle, RenegotiationMode,
};

/// Signature algorithms emitted when a JA3 lists extension 13 but carries no
/// payload for it. Matches the list common Chromium-family browsers offer.
pub const DEFAULT_SIGNATURE_ALGORITHMS: [u16; 8] = [
    0x0403, // ecdsa_secp256r1_sha256
    0x0804, // rsa_pss_rsae_sha256
    0x0401, // rsa_pkcs1_sha256
    0x0503, // ecdsa_secp384r1_sha384
    0x0805, // rsa_pss_rsae_sha384
    0x0501, // rsa_pkcs1_sha384
    0x0806, // rsa_pss_rsae_sha512
    0x0601, // rsa_pkcs1_sha512
];

/// Where the ClientHello template comes from.
///
/// Precedence when a configuration carries several sources:
/// JSON spec file > JA3 string > named profile > default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    File(PathBuf),
    Ja3(String),
    Profile(String),
    Default,
}

impl SpecSource {
    /// Select the build source from the configured knobs by precedence.
    pub fn select(
        spec_file: Option<&PathBuf>,
        ja3: Option<&str>,
        profile: Option<&str>,
    ) -> SpecSource {
        if let Some(path) = spec_file {
            SpecSource::File(path.clone())
        } else if let Some(ja3) = ja3 {
            SpecSource::Ja3(ja3.to_string())
        } else if let Some(profile) = profile {
            SpecSource::Profile(profile.to_string())
        } else {
            SpecSource::Default
        }
    }
}

/// What the builder hands the TLS engine: a byte-exact template, or the name
/// of a built-in imitation when no template can be produced.
#[derive(Debug, Clone)]
pub enum HelloInput {
    Spec(Arc<ClientHelloSpec>),
    Builtin(HelloId),
}

/// Build a spec from a parsed JA3 and the connection's server name.
///
/// Extensions are emitted in the exact order the JA3 lists them. Ids the
/// builder recognizes get typed payloads (with browser-like defaults for data
/// the JA3 does not carry); everything else, GREASE included, becomes a
/// `Generic` at the same index.
pub fn from_ja3(ja3: &Ja3, server_name: &str, alpn: Option<&[String]>) -> ClientHelloSpec {
    let mut spec = ClientHelloSpec {
        tls_version_min: ja3.version,
        tls_version_max: ja3.version,
        cipher_suites: ja3.ciphers.clone(),
        ..Default::default()
    };

    for &ext_id in &ja3.extensions {
        if let Some(e) = build_extension(ext_id, ja3, server_name, alpn) {
            spec.extensions.push(e);
        }
    }

    spec
}

fn build_extension(
    ext_id: u16,
    ja3: &Ja3,
    server_name: &str,
    alpn: Option<&[String]>,
) -> Option<ExtensionSpec> {
    let built = match ext_id {
        ext::SERVER_NAME => {
            if server_name.is_empty() {
                return None;
            }
            ExtensionSpec::ServerName(server_name.to_string())
        }
        ext::STATUS_REQUEST => ExtensionSpec::StatusRequest,
        // a JA3 may list id 10 or 11 with an empty payload field; the id
        // stays on the wire as a placeholder so the position survives
        ext::SUPPORTED_GROUPS => {
            if ja3.groups.is_empty() {
                ExtensionSpec::Generic {
                    id: ext_id,
                    data: Vec::new(),
                }
            } else {
                ExtensionSpec::SupportedGroups(ja3.groups.clone())
            }
        }
        ext::EC_POINT_FORMATS => {
            if ja3.point_formats.is_empty() {
                ExtensionSpec::Generic {
                    id: ext_id,
                    data: Vec::new(),
                }
            } else {
                ExtensionSpec::EcPointFormats(ja3.point_formats.clone())
            }
        }
        ext::SIGNATURE_ALGORITHMS => {
            ExtensionSpec::SignatureAlgorithms(DEFAULT_SIGNATURE_ALGORITHMS.to_vec())
        }
        ext::ALPN => ExtensionSpec::Alpn(match alpn {
            Some(list) if !list.is_empty() => list.to_vec(),
            _ => vec!["h2".to_string(), "http/1.1".to_string()],
        }),
        ext::SCT => ExtensionSpec::Sct,
        ext::PADDING => ExtensionSpec::Padding(PaddingStyle::Boring),
        ext::EXTENDED_MASTER_SECRET => ExtensionSpec::ExtendedMasterSecret,
        ext::SESSION_TICKET => ExtensionSpec::SessionTicket,
        ext::SUPPORTED_VERSIONS => {
            ExtensionSpec::SupportedVersions(vec![version::TLS13, version::TLS12])
        }
        ext::PSK_KEY_EXCHANGE_MODES => ExtensionSpec::PskKeyExchangeModes(vec![1]),
        ext::KEY_SHARE => ExtensionSpec::KeyShare(vec![KeyShareEntry::auto(group::X25519)]),
        ext::RENEGOTIATION_INFO => {
            ExtensionSpec::RenegotiationInfo(RenegotiationMode::OnceAsClient)
        }
        other => ExtensionSpec::Generic {
            id: other,
            data: Vec::new(),
        },
    };
    Some(built)
}

/// Build from a named profile: resolve the catalog JA3 and take the JA3 path.
///
/// An unknown name falls back to the family built-in (`chrome_125` still
/// dials as a generic Chrome); a name with no family match is an error.
pub fn from_profile(
    profile_name: &str,
    server_name: &str,
    alpn: Option<&[String]>,
) -> Result<HelloInput> {
    if let Some(ja3_str) = profiles::profile_ja3(profile_name) {
        let ja3: Ja3 = ja3_str.parse()?;
        return Ok(HelloInput::Spec(Arc::new(from_ja3(
            &ja3,
            server_name,
            alpn,
        ))));
    }
    match profiles::family_fallback(profile_name) {
        Some(id) => {
            debug!(profile = profile_name, ?id, "profile not in catalog, using family built-in");
            Ok(HelloInput::Builtin(id))
        }
        None => Err(FingerprintError::UnknownProfile(profile_name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome_ja3() -> Ja3 {
        crate::profiles::profile_ja3("chrome_120")
            .unwrap()
            .parse()
            .unwrap()
    }

    #[test]
    fn extension_order_follows_ja3() {
        let spec = from_ja3(&chrome_ja3(), "example.com", None);
        // 0-23-65281-10-11-35-16-5-13-18-51-45-43-27-21
        assert_eq!(
            spec.extension_ids(),
            vec![0, 23, 65281, 10, 11, 35, 16, 5, 13, 18, 51, 45, 43, 27, 21]
        );
        assert!(matches!(
            &spec.extensions[0],
            ExtensionSpec::ServerName(name) if name == "example.com"
        ));
    }

    #[test]
    fn ciphers_copied_in_order() {
        let ja3 = chrome_ja3();
        let spec = from_ja3(&ja3, "example.com", None);
        assert_eq!(spec.cipher_suites, ja3.ciphers);
        assert_eq!(spec.tls_version_min, 771);
        assert_eq!(spec.tls_version_max, 771);
    }

    #[test]
    fn sni_skipped_without_server_name() {
        let spec = from_ja3(&chrome_ja3(), "", None);
        assert!(!spec.extension_ids().contains(&0));
    }

    #[test]
    fn alpn_default_and_override() {
        let spec = from_ja3(&chrome_ja3(), "example.com", None);
        assert!(matches!(
            spec.extension(16),
            Some(ExtensionSpec::Alpn(protos)) if protos == &["h2", "http/1.1"]
        ));

        let override_list = vec!["http/1.1".to_string()];
        let spec = from_ja3(&chrome_ja3(), "example.com", Some(&override_list));
        assert!(matches!(
            spec.extension(16),
            Some(ExtensionSpec::Alpn(protos)) if protos == &["http/1.1"]
        ));
    }

    #[test]
    fn grease_extension_becomes_generic_in_place() {
        let ja3: Ja3 = "771,4865,0-2570-16,29,0".parse().unwrap();
        let spec = from_ja3(&ja3, "example.com", None);
        assert!(matches!(
            &spec.extensions[1],
            ExtensionSpec::Generic { id: 0x0a0a, .. }
        ));
        assert_eq!(spec.extension_ids(), vec![0, 0x0a0a, 16]);
    }

    #[test]
    fn empty_group_and_point_fields_keep_extension_positions() {
        // ids 10 and 11 listed, but the JA3's group and point-format fields
        // are empty
        let ja3: Ja3 = "771,4865,0-10-11-16,,".parse().unwrap();
        let spec = from_ja3(&ja3, "example.com", None);

        assert_eq!(spec.extension_ids(), vec![0, 10, 11, 16]);
        assert!(matches!(
            spec.extension(10),
            Some(ExtensionSpec::Generic { id: 10, data }) if data.is_empty()
        ));
        assert!(matches!(
            spec.extension(11),
            Some(ExtensionSpec::Generic { id: 11, data }) if data.is_empty()
        ));
    }

    #[test]
    fn padding_present_iff_listed() {
        let with: Ja3 = "771,4865,21,29,0".parse().unwrap();
        assert!(matches!(
            from_ja3(&with, "", None).extensions[0],
            ExtensionSpec::Padding(PaddingStyle::Boring)
        ));

        let without: Ja3 = "771,4865,16,29,0".parse().unwrap();
        assert!(!from_ja3(&without, "", None).extension_ids().contains(&21));
    }

    #[test]
    fn key_share_defaults_to_auto_x25519() {
        let ja3: Ja3 = "771,4865,51,29,0".parse().unwrap();
        let spec = from_ja3(&ja3, "", None);
        assert!(matches!(
            spec.extension(51),
            Some(ExtensionSpec::KeyShare(entries))
                if entries.len() == 1 && entries[0] == KeyShareEntry::auto(29)
        ));
    }

    #[test]
    fn profile_path_builds_spec() {
        let input = from_profile("chrome_120", "example.com", None).unwrap();
        match input {
            HelloInput::Spec(spec) => {
                assert_eq!(spec.extension_ids()[0], 0);
                assert_eq!(spec.cipher_suites.len(), 15);
            }
            HelloInput::Builtin(_) => panic!("expected a built spec"),
        }
    }

    #[test]
    fn unknown_profile_family_falls_back() {
        let input = from_profile("chrome_999", "example.com", None).unwrap();
        assert!(matches!(input, HelloInput::Builtin(HelloId::Chrome)));
    }

    #[test]
    fn unknown_profile_without_family_errors() {
        let err = from_profile("mosaic_1993", "example.com", None).unwrap_err();
        assert!(matches!(err, FingerprintError::UnknownProfile(_)));
    }

    #[test]
    fn source_precedence() {
        let file = PathBuf::from("/tmp/hello.json");
        let selected = SpecSource::select(Some(&file), Some("771,,,,"), Some("chrome_120"));
        assert_eq!(selected, SpecSource::File(file));

        let selected = SpecSource::select(None, Some("771,,,,"), Some("chrome_120"));
        assert_eq!(selected, SpecSource::Ja3("771,,,,".to_string()));

        let selected = SpecSource::select(None, None, Some("chrome_120"));
        assert_eq!(selected, SpecSource::Profile("chrome_120".to_string()));

        assert_eq!(SpecSource::select(None, None, None), SpecSource::Default);
    }
}
