//! Byte-exact ClientHello emission from a [`ClientHelloSpec`].
//!
//! Every byte of the output is determined by the spec plus the randoms and
//! key material supplied in [`EncodeParams`]: cipher order, extension order,
//! payload contents, and GREASE positions are reproduced verbatim. A sniffer
//! can diff this template against captured bytes, and the ordering
//! invariants of the builder are asserted against it in tests.

use std::collections::BTreeMap;

use rand::RngCore;

use crate::spec::{
    ClientHelloSpec, ExtensionSpec, KeyMaterial, KeyShareEntry, PaddingStyle,
};

const RECORD_TYPE_HANDSHAKE: u8 = 0x16;
const HANDSHAKE_TYPE_CLIENT_HELLO: u8 = 0x01;
// record-layer version is pinned for middlebox compatibility
const RECORD_VERSION: u16 = 0x0301;
// the version field in the hello body never exceeds TLS 1.2; 1.3 negotiates
// through supported_versions
const LEGACY_VERSION_CAP: u16 = 0x0303;

/// Inputs that complete a template: the 32-byte client random, the legacy
/// session id, and ephemeral key material per key-share group.
#[derive(Debug, Clone)]
pub struct EncodeParams {
    pub client_random: [u8; 32],
    pub session_id: Vec<u8>,
    /// Key material by group id; `KeyMaterial::Auto` entries not present here
    /// get fresh random bytes of the group's customary length
    pub key_material: BTreeMap<u16, Vec<u8>>,
}

impl EncodeParams {
    /// Fresh random values, the way a live handshake would pick them.
    pub fn fresh() -> EncodeParams {
        let mut rng = rand::thread_rng();
        let mut client_random = [0u8; 32];
        rng.fill_bytes(&mut client_random);
        let mut session_id = vec![0u8; 32];
        rng.fill_bytes(&mut session_id);
        EncodeParams {
            client_random,
            session_id,
            key_material: BTreeMap::new(),
        }
    }
}

/// Serialize the full TLS record carrying the ClientHello.
pub fn encode_client_hello(spec: &ClientHelloSpec, params: &EncodeParams) -> Vec<u8> {
    let body = encode_hello_body(spec, params);

    let mut out = Vec::with_capacity(body.len() + 9);
    out.push(RECORD_TYPE_HANDSHAKE);
    put_u16(&mut out, RECORD_VERSION);
    put_u16(&mut out, (body.len() + 4) as u16);
    out.push(HANDSHAKE_TYPE_CLIENT_HELLO);
    put_u24(&mut out, body.len() as u32);
    out.extend_from_slice(&body);
    out
}

fn encode_hello_body(spec: &ClientHelloSpec, params: &EncodeParams) -> Vec<u8> {
    let mut body = Vec::with_capacity(512);

    put_u16(&mut body, spec.tls_version_max.min(LEGACY_VERSION_CAP));
    body.extend_from_slice(&params.client_random);

    body.push(params.session_id.len() as u8);
    body.extend_from_slice(&params.session_id);

    put_u16(&mut body, (spec.cipher_suites.len() * 2) as u16);
    for &suite in &spec.cipher_suites {
        put_u16(&mut body, suite);
    }

    body.push(spec.compression_methods.len() as u8);
    body.extend_from_slice(&spec.compression_methods);

    // encode extensions in spec order; padding needs the unpadded length, so
    // it is sized in a second step
    let mut encoded: Vec<(u16, Vec<u8>)> = Vec::with_capacity(spec.extensions.len());
    let mut padding_at: Option<(usize, PaddingStyle)> = None;
    for (i, extension) in spec.extensions.iter().enumerate() {
        if let ExtensionSpec::Padding(style) = extension {
            padding_at = Some((i, *style));
            encoded.push((extension.id(), Vec::new()));
        } else {
            encoded.push((extension.id(), encode_extension(extension, params)));
        }
    }

    if let Some((index, style)) = padding_at {
        let unpadded = body.len() + 2 + encoded.iter().map(|(_, p)| p.len() + 4).sum::<usize>();
        encoded[index].1 = vec![0u8; padding_len(style, unpadded)];
    }

    let extensions_len: usize = encoded.iter().map(|(_, p)| p.len() + 4).sum();
    put_u16(&mut body, extensions_len as u16);
    for (id, payload) in encoded {
        put_u16(&mut body, id);
        put_u16(&mut body, payload.len() as u16);
        body.extend_from_slice(&payload);
    }

    body
}

fn encode_extension(extension: &ExtensionSpec, params: &EncodeParams) -> Vec<u8> {
    let mut p = Vec::new();
    match extension {
        ExtensionSpec::ServerName(name) => {
            put_u16(&mut p, (name.len() + 3) as u16);
            p.push(0); // host_name
            put_u16(&mut p, name.len() as u16);
            p.extend_from_slice(name.as_bytes());
        }
        ExtensionSpec::SupportedGroups(groups) => {
            put_u16(&mut p, (groups.len() * 2) as u16);
            for &g in groups {
                put_u16(&mut p, g);
            }
        }
        ExtensionSpec::EcPointFormats(formats) => {
            p.push(formats.len() as u8);
            p.extend_from_slice(formats);
        }
        ExtensionSpec::SignatureAlgorithms(schemes) => {
            put_u16(&mut p, (schemes.len() * 2) as u16);
            for &s in schemes {
                put_u16(&mut p, s);
            }
        }
        ExtensionSpec::Alpn(protocols) => {
            let list_len: usize = protocols.iter().map(|proto| proto.len() + 1).sum();
            put_u16(&mut p, list_len as u16);
            for proto in protocols {
                p.push(proto.len() as u8);
                p.extend_from_slice(proto.as_bytes());
            }
        }
        ExtensionSpec::SupportedVersions(versions) => {
            p.push((versions.len() * 2) as u8);
            for &v in versions {
                put_u16(&mut p, v);
            }
        }
        ExtensionSpec::KeyShare(entries) => {
            let shares: Vec<(u16, Vec<u8>)> = entries
                .iter()
                .map(|e| (e.group, key_share_bytes(e, params)))
                .collect();
            let list_len: usize = shares.iter().map(|(_, k)| k.len() + 4).sum();
            put_u16(&mut p, list_len as u16);
            for (g, key) in shares {
                put_u16(&mut p, g);
                put_u16(&mut p, key.len() as u16);
                p.extend_from_slice(&key);
            }
        }
        ExtensionSpec::PskKeyExchangeModes(modes) => {
            p.push(modes.len() as u8);
            p.extend_from_slice(modes);
        }
        ExtensionSpec::StatusRequest => {
            p.push(1); // ocsp
            put_u16(&mut p, 0); // responder id list
            put_u16(&mut p, 0); // request extensions
        }
        ExtensionSpec::RenegotiationInfo(_) => {
            p.push(0); // empty renegotiated_connection
        }
        ExtensionSpec::SessionTicket
        | ExtensionSpec::Sct
        | ExtensionSpec::ExtendedMasterSecret => {}
        ExtensionSpec::Generic { data, .. } => {
            p.extend_from_slice(data);
        }
        // sized by the caller once the unpadded length is known
        ExtensionSpec::Padding(_) => {}
    }
    p
}

fn key_share_bytes(entry: &KeyShareEntry, params: &EncodeParams) -> Vec<u8> {
    match &entry.material {
        KeyMaterial::Bytes(bytes) => bytes.clone(),
        KeyMaterial::Auto => {
            if let Some(bytes) = params.key_material.get(&entry.group) {
                return bytes.clone();
            }
            let mut bytes = vec![0u8; public_key_len(entry.group)];
            rand::thread_rng().fill_bytes(&mut bytes);
            bytes
        }
    }
}

/// Customary public key lengths per group.
fn public_key_len(group: u16) -> usize {
    match group {
        29 => 32,  // x25519
        23 => 65,  // secp256r1, uncompressed point
        24 => 97,  // secp384r1
        25 => 133, // secp521r1
        _ => 32,
    }
}

/// BoringSSL pads hellos landing in 256..512 bytes up to 512; the 4-byte
/// extension header counts toward the target.
fn padding_len(style: PaddingStyle, unpadded_body_len: usize) -> usize {
    match style {
        PaddingStyle::Fixed(n) => n as usize,
        PaddingStyle::Boring => {
            // header sizes already in unpadded_body_len via the empty entry
            if (256..512).contains(&unpadded_body_len) {
                512 - unpadded_body_len
            } else {
                0
            }
        }
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u24(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes()[1..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::builder::from_ja3;
    use crate::fingerprint::Ja3;
    use tls_parser::{parse_tls_plaintext, TlsMessage, TlsMessageHandshake};

    fn chrome_spec() -> ClientHelloSpec {
        let ja3: Ja3 = crate::profiles::profile_ja3("chrome_120")
            .unwrap()
            .parse()
            .unwrap();
        from_ja3(&ja3, "example.com", None)
    }

    fn fixed_params() -> EncodeParams {
        EncodeParams {
            client_random: [7u8; 32],
            session_id: vec![9u8; 32],
            key_material: BTreeMap::from([(29, vec![1u8; 32])]),
        }
    }

    /// Walk the raw extensions block and collect ids in emission order.
    fn extension_ids_on_wire(hello: &[u8]) -> Vec<u16> {
        // record(5) + handshake(4) + version(2) + random(32)
        let mut at = 5 + 4 + 2 + 32;
        let sid_len = hello[at] as usize;
        at += 1 + sid_len;
        let ciphers_len = u16::from_be_bytes([hello[at], hello[at + 1]]) as usize;
        at += 2 + ciphers_len;
        let comp_len = hello[at] as usize;
        at += 1 + comp_len;
        let ext_total = u16::from_be_bytes([hello[at], hello[at + 1]]) as usize;
        at += 2;
        let end = at + ext_total;

        let mut ids = Vec::new();
        while at < end {
            let id = u16::from_be_bytes([hello[at], hello[at + 1]]);
            let len = u16::from_be_bytes([hello[at + 2], hello[at + 3]]) as usize;
            ids.push(id);
            at += 4 + len;
        }
        assert_eq!(at, end, "extension block must be exactly consumed");
        ids
    }

    #[test]
    fn emission_is_parseable_tls() {
        let hello = encode_client_hello(&chrome_spec(), &fixed_params());
        let (rest, record) = parse_tls_plaintext(&hello).expect("well-formed TLS record");
        assert!(rest.is_empty());
        let is_client_hello = record.msg.iter().any(|m| {
            matches!(
                m,
                TlsMessage::Handshake(TlsMessageHandshake::ClientHello(_))
            )
        });
        assert!(is_client_hello);
    }

    #[test]
    fn cipher_order_matches_spec() {
        let spec = chrome_spec();
        let hello = encode_client_hello(&spec, &fixed_params());
        let (_, record) = parse_tls_plaintext(&hello).unwrap();
        for msg in &record.msg {
            if let TlsMessage::Handshake(TlsMessageHandshake::ClientHello(ch)) = msg {
                let wire: Vec<u16> = ch.ciphers.iter().map(|c| c.0).collect();
                assert_eq!(wire, spec.cipher_suites);
            }
        }
    }

    #[test]
    fn extension_order_matches_spec() {
        let spec = chrome_spec();
        let hello = encode_client_hello(&spec, &fixed_params());
        assert_eq!(extension_ids_on_wire(&hello), spec.extension_ids());
    }

    #[test]
    fn grease_positions_survive_to_the_wire() {
        let ja3: Ja3 = "771,2570-4865-1302,2570-0-16,29,0".parse().unwrap();
        let spec = from_ja3(&ja3, "example.com", None);
        let hello = encode_client_hello(&spec, &fixed_params());

        let (_, record) = parse_tls_plaintext(&hello).unwrap();
        for msg in &record.msg {
            if let TlsMessage::Handshake(TlsMessageHandshake::ClientHello(ch)) = msg {
                assert_eq!(ch.ciphers[0].0, 0x0a0a);
            }
        }
        assert_eq!(extension_ids_on_wire(&hello)[0], 0x0a0a);
    }

    #[test]
    fn deterministic_for_fixed_params() {
        let spec = chrome_spec();
        let a = encode_client_hello(&spec, &fixed_params());
        let b = encode_client_hello(&spec, &fixed_params());
        assert_eq!(a, b);
    }

    #[test]
    fn sni_value_is_emitted() {
        let hello = encode_client_hello(&chrome_spec(), &fixed_params());
        let (_, record) = parse_tls_plaintext(&hello).unwrap();
        for msg in &record.msg {
            if let TlsMessage::Handshake(TlsMessageHandshake::ClientHello(ch)) = msg {
                let ext = ch.ext.expect("extensions present");
                let (_, exts) = tls_parser::parse_tls_extensions(ext).unwrap();
                let sni = exts.iter().find_map(|e| match e {
                    tls_parser::TlsExtension::SNI(list) => Some(list),
                    _ => None,
                });
                let name = sni.expect("SNI present")[0].1;
                assert_eq!(name, b"example.com");
            }
        }
    }

    #[test]
    fn boring_padding_pads_to_512() {
        let spec = chrome_spec();
        assert!(spec.extension_ids().contains(&21));
        let hello = encode_client_hello(&spec, &fixed_params());
        // handshake body length = total - record header - handshake header
        let body_len = hello.len() - 5 - 4;
        assert!(
            body_len >= 512 || body_len < 256,
            "hello of {} bytes should have been padded out of 256..512",
            body_len
        );
    }

    #[test]
    fn fixed_padding_is_exact() {
        let spec = ClientHelloSpec {
            tls_version_min: 0x0303,
            tls_version_max: 0x0303,
            cipher_suites: vec![0x1301],
            extensions: vec![ExtensionSpec::Padding(PaddingStyle::Fixed(17))],
            ..Default::default()
        };
        let hello = encode_client_hello(&spec, &fixed_params());
        let mut at = 5 + 4 + 2 + 32 + 1 + 32 + 2 + 2 + 1 + 1 + 2;
        let id = u16::from_be_bytes([hello[at], hello[at + 1]]);
        at += 2;
        let len = u16::from_be_bytes([hello[at], hello[at + 1]]);
        assert_eq!(id, 21);
        assert_eq!(len, 17);
    }
}
