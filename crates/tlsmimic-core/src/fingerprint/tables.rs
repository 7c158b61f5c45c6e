//! Read-only wire tables for the names that appear in fingerprint sources.
//!
//! These are closed-universe mappings: unknown cipher and signature names are
//! skipped by callers, unknown extension names become `Generic` variants at
//! the spec builder.

/// TLS extension ids the builder recognizes.
pub mod ext {
    pub const SERVER_NAME: u16 = 0;
    pub const MAX_FRAGMENT_LENGTH: u16 = 1;
    pub const STATUS_REQUEST: u16 = 5;
    pub const SUPPORTED_GROUPS: u16 = 10;
    pub const EC_POINT_FORMATS: u16 = 11;
    pub const SIGNATURE_ALGORITHMS: u16 = 13;
    pub const ALPN: u16 = 16;
    pub const SCT: u16 = 18;
    pub const PADDING: u16 = 21;
    pub const EXTENDED_MASTER_SECRET: u16 = 23;
    pub const COMPRESS_CERTIFICATE: u16 = 27;
    pub const SESSION_TICKET: u16 = 35;
    pub const SUPPORTED_VERSIONS: u16 = 43;
    pub const PSK_KEY_EXCHANGE_MODES: u16 = 45;
    pub const KEY_SHARE: u16 = 51;
    pub const RENEGOTIATION_INFO: u16 = 65281;
}

/// TLS protocol version ids.
pub mod version {
    pub const SSL30: u16 = 0x0300;
    pub const TLS10: u16 = 0x0301;
    pub const TLS11: u16 = 0x0302;
    pub const TLS12: u16 = 0x0303;
    pub const TLS13: u16 = 0x0304;
}

/// Named group (curve) ids.
pub mod group {
    pub const SECP256R1: u16 = 23;
    pub const SECP384R1: u16 = 24;
    pub const SECP521R1: u16 = 25;
    pub const X25519: u16 = 29;
}

/// Convert an IANA cipher suite name (or `0x....` hex form) to its id.
///
/// Returns `None` for unknown names; callers drop those tokens.
pub fn cipher_id_by_name(name: &str) -> Option<u16> {
    let name = name.trim();
    if let Some(id) = parse_hex_u16(name) {
        return Some(id);
    }
    let id = match name {
        // TLS 1.3
        "TLS_AES_128_GCM_SHA256" => 0x1301,
        "TLS_AES_256_GCM_SHA384" => 0x1302,
        "TLS_CHACHA20_POLY1305_SHA256" => 0x1303,
        "TLS_AES_128_CCM_SHA256" => 0x1304,
        "TLS_AES_128_CCM_8_SHA256" => 0x1305,
        // ECDHE-ECDSA
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256" => 0xc02b,
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384" => 0xc02c,
        "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA" => 0xc009,
        "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA" => 0xc00a,
        "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256" => 0xc023,
        "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384" => 0xc024,
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256" => 0xcca9,
        // ECDHE-RSA
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256" => 0xc02f,
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384" => 0xc030,
        "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA" => 0xc013,
        "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA" => 0xc014,
        "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256" => 0xc027,
        "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384" => 0xc028,
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256" => 0xcca8,
        // RSA
        "TLS_RSA_WITH_AES_128_GCM_SHA256" => 0x009c,
        "TLS_RSA_WITH_AES_256_GCM_SHA384" => 0x009d,
        "TLS_RSA_WITH_AES_128_CBC_SHA" => 0x002f,
        "TLS_RSA_WITH_AES_256_CBC_SHA" => 0x0035,
        "TLS_RSA_WITH_AES_128_CBC_SHA256" => 0x003c,
        "TLS_RSA_WITH_AES_256_CBC_SHA256" => 0x003d,
        // DHE-RSA
        "TLS_DHE_RSA_WITH_AES_128_GCM_SHA256" => 0x009e,
        "TLS_DHE_RSA_WITH_AES_256_GCM_SHA384" => 0x009f,
        "TLS_DHE_RSA_WITH_AES_128_CBC_SHA" => 0x0033,
        "TLS_DHE_RSA_WITH_AES_256_CBC_SHA" => 0x0039,
        "TLS_DHE_RSA_WITH_AES_128_CBC_SHA256" => 0x0067,
        "TLS_DHE_RSA_WITH_AES_256_CBC_SHA256" => 0x006b,
        "TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256" => 0xccaa,
        // Legacy
        "TLS_RSA_WITH_3DES_EDE_CBC_SHA" => 0x000a,
        "TLS_RSA_WITH_RC4_128_SHA" => 0x0005,
        "TLS_RSA_WITH_RC4_128_MD5" => 0x0004,
        "TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA" => 0xc012,
        "TLS_ECDHE_ECDSA_WITH_3DES_EDE_CBC_SHA" => 0xc008,
        // PSK
        "TLS_PSK_WITH_AES_128_GCM_SHA256" => 0x00a8,
        "TLS_PSK_WITH_AES_256_GCM_SHA384" => 0x00a9,
        "TLS_PSK_WITH_AES_128_CBC_SHA256" => 0x00ae,
        "TLS_DHE_PSK_WITH_AES_128_GCM_SHA256" => 0x00aa,
        "TLS_DHE_PSK_WITH_AES_256_GCM_SHA384" => 0x00ab,
        "TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA256" => 0xc037,
        "TLS_ECDHE_PSK_WITH_AES_256_CBC_SHA384" => 0xc038,
        "TLS_ECDHE_PSK_WITH_CHACHA20_POLY1305_SHA256" => 0xccac,
        // ARIA
        "TLS_RSA_WITH_ARIA_128_GCM_SHA256" => 0xc050,
        "TLS_RSA_WITH_ARIA_256_GCM_SHA384" => 0xc051,
        "TLS_ECDHE_ECDSA_WITH_ARIA_128_GCM_SHA256" => 0xc05c,
        "TLS_ECDHE_ECDSA_WITH_ARIA_256_GCM_SHA384" => 0xc05d,
        "TLS_ECDHE_RSA_WITH_ARIA_128_GCM_SHA256" => 0xc060,
        "TLS_ECDHE_RSA_WITH_ARIA_256_GCM_SHA384" => 0xc061,
        _ => return None,
    };
    Some(id)
}

/// Convert a named-group token to its id.
///
/// Fingerprint reflectors emit the `"X25519 (29)"` form; the id in
/// parentheses wins when present. Bare names are matched otherwise.
pub fn group_id_by_name(name: &str) -> Option<u16> {
    if let Some(id) = parse_parenthesized_id(name) {
        return Some(id);
    }
    let id = match name.trim() {
        "X25519" | "x25519" => group::X25519,
        "P-256" | "secp256r1" => group::SECP256R1,
        "P-384" | "secp384r1" => group::SECP384R1,
        "P-521" | "secp521r1" => group::SECP521R1,
        _ => return None,
    };
    Some(id)
}

/// Convert a signature scheme name to its id.
pub fn signature_scheme_by_name(name: &str) -> Option<u16> {
    let id = match name.trim() {
        "rsa_pkcs1_sha1" => 0x0201,
        "rsa_pkcs1_sha256" => 0x0401,
        "rsa_pkcs1_sha384" => 0x0501,
        "rsa_pkcs1_sha512" => 0x0601,
        "ecdsa_secp256r1_sha256" => 0x0403,
        "ecdsa_secp384r1_sha384" => 0x0503,
        "ecdsa_secp521r1_sha512" => 0x0603,
        "rsa_pss_rsae_sha256" => 0x0804,
        "rsa_pss_rsae_sha384" => 0x0805,
        "rsa_pss_rsae_sha512" => 0x0806,
        "ed25519" => 0x0807,
        "rsa_pss_pss_sha256" => 0x0809,
        "rsa_pss_pss_sha384" => 0x080a,
        "rsa_pss_pss_sha512" => 0x080b,
        _ => return None,
    };
    Some(id)
}

/// Convert a TLS version token (`"TLS 1.2"`, decimal, or `0x0303`) to its id.
pub fn tls_version_by_name(name: &str) -> Option<u16> {
    let name = name.trim();
    match name {
        "SSL 3.0" => return Some(version::SSL30),
        "TLS 1.0" => return Some(version::TLS10),
        "TLS 1.1" => return Some(version::TLS11),
        "TLS 1.2" => return Some(version::TLS12),
        "TLS 1.3" => return Some(version::TLS13),
        _ => {}
    }
    if let Some(id) = parse_hex_u16(name) {
        return Some(id);
    }
    name.parse::<u16>().ok()
}

/// Convert an extension name (canonicalized to lowercase) to its id.
pub fn extension_id_by_name(name: &str) -> Option<u16> {
    let id = match name.trim().to_lowercase().as_str() {
        "server_name" => ext::SERVER_NAME,
        "max_fragment_length" => ext::MAX_FRAGMENT_LENGTH,
        "status_request" => ext::STATUS_REQUEST,
        "supported_groups" => ext::SUPPORTED_GROUPS,
        "ec_point_formats" => ext::EC_POINT_FORMATS,
        "signature_algorithms" => ext::SIGNATURE_ALGORITHMS,
        "application_layer_protocol_negotiation" => ext::ALPN,
        "signed_certificate_timestamp" => ext::SCT,
        "padding" => ext::PADDING,
        "extended_master_secret" => ext::EXTENDED_MASTER_SECRET,
        "compress_certificate" => ext::COMPRESS_CERTIFICATE,
        "session_ticket" => ext::SESSION_TICKET,
        "supported_versions" => ext::SUPPORTED_VERSIONS,
        "psk_key_exchange_modes" => ext::PSK_KEY_EXCHANGE_MODES,
        "key_share" => ext::KEY_SHARE,
        "renegotiation_info" => ext::RENEGOTIATION_INFO,
        _ => return None,
    };
    Some(id)
}

/// Map a TLS version id to its JA4 tag.
pub fn ja4_version_tag(version: u16) -> &'static str {
    match version {
        version::TLS13 => "13",
        version::TLS12 => "12",
        version::TLS11 => "11",
        version::TLS10 => "10",
        version::SSL30 => "s3",
        _ => "00",
    }
}

fn parse_hex_u16(s: &str) -> Option<u16> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    u16::from_str_radix(hex, 16).ok()
}

/// Extract a decimal id from a `"name (id)"` token.
fn parse_parenthesized_id(s: &str) -> Option<u16> {
    let open = s.find('(')?;
    let close = s[open..].find(')')? + open;
    s[open + 1..close].trim().parse::<u16>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_names_resolve() {
        assert_eq!(cipher_id_by_name("TLS_AES_128_GCM_SHA256"), Some(0x1301));
        assert_eq!(
            cipher_id_by_name("TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256"),
            Some(0xc02f)
        );
        assert_eq!(cipher_id_by_name("0x1303"), Some(0x1303));
        assert_eq!(cipher_id_by_name("TLS_NOT_A_CIPHER"), None);
    }

    #[test]
    fn group_names_resolve() {
        assert_eq!(group_id_by_name("X25519"), Some(29));
        assert_eq!(group_id_by_name("secp256r1"), Some(23));
        assert_eq!(group_id_by_name("X25519 (29)"), Some(29));
        assert_eq!(group_id_by_name("GREASE (31354)"), Some(31354));
        assert_eq!(group_id_by_name("wat"), None);
    }

    #[test]
    fn version_tokens_resolve() {
        assert_eq!(tls_version_by_name("TLS 1.3"), Some(0x0304));
        assert_eq!(tls_version_by_name("771"), Some(0x0303));
        assert_eq!(tls_version_by_name("0x0301"), Some(0x0301));
        assert_eq!(tls_version_by_name("TLS 9.9"), None);
    }

    #[test]
    fn extension_names_resolve() {
        assert_eq!(extension_id_by_name("server_name"), Some(0));
        assert_eq!(
            extension_id_by_name("application_layer_protocol_negotiation"),
            Some(16)
        );
        assert_eq!(extension_id_by_name("key_share"), Some(51));
        assert_eq!(extension_id_by_name("renegotiation_info"), Some(65281));
        assert_eq!(extension_id_by_name("quantum_entanglement"), None);
    }

    #[test]
    fn ja4_tags() {
        assert_eq!(ja4_version_tag(0x0304), "13");
        assert_eq!(ja4_version_tag(0x0300), "s3");
        assert_eq!(ja4_version_tag(0x1234), "00");
    }
}
