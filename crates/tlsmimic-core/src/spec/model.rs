use crate::fingerprint::tables::ext;

/// A full ClientHello template.
///
/// This is the authoritative build output: the engine and the wire encoder
/// consume it verbatim. Extension order in the spec equals emission order on
/// the wire, and GREASE values in cipher or extension positions are never
/// normalized or reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHelloSpec {
    pub tls_version_min: u16,
    pub tls_version_max: u16,
    /// Cipher suite ids in emission order, GREASE preserved in place
    pub cipher_suites: Vec<u16>,
    /// Always `[0]` (null compression)
    pub compression_methods: Vec<u8>,
    /// Extensions in emission order
    pub extensions: Vec<ExtensionSpec>,
}

impl Default for ClientHelloSpec {
    fn default() -> Self {
        ClientHelloSpec {
            tls_version_min: 0,
            tls_version_max: 0,
            cipher_suites: Vec::new(),
            compression_methods: vec![0],
            extensions: Vec::new(),
        }
    }
}

impl ClientHelloSpec {
    /// Extension ids in emission order.
    pub fn extension_ids(&self) -> Vec<u16> {
        self.extensions.iter().map(|e| e.id()).collect()
    }

    /// Find an extension by wire id.
    pub fn extension(&self, id: u16) -> Option<&ExtensionSpec> {
        self.extensions.iter().find(|e| e.id() == id)
    }
}

/// One ClientHello extension with its typed payload.
///
/// Recognized extensions get a typed variant; everything else (GREASE
/// included) is carried as `Generic`, so an observed extension ordering
/// survives even when a payload is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionSpec {
    ServerName(String),
    SupportedGroups(Vec<u16>),
    EcPointFormats(Vec<u8>),
    SignatureAlgorithms(Vec<u16>),
    Alpn(Vec<String>),
    SupportedVersions(Vec<u16>),
    KeyShare(Vec<KeyShareEntry>),
    PskKeyExchangeModes(Vec<u8>),
    SessionTicket,
    StatusRequest,
    Sct,
    ExtendedMasterSecret,
    RenegotiationInfo(RenegotiationMode),
    Padding(PaddingStyle),
    Generic { id: u16, data: Vec<u8> },
}

impl ExtensionSpec {
    /// The wire id this extension is emitted with.
    pub fn id(&self) -> u16 {
        match self {
            ExtensionSpec::ServerName(_) => ext::SERVER_NAME,
            ExtensionSpec::SupportedGroups(_) => ext::SUPPORTED_GROUPS,
            ExtensionSpec::EcPointFormats(_) => ext::EC_POINT_FORMATS,
            ExtensionSpec::SignatureAlgorithms(_) => ext::SIGNATURE_ALGORITHMS,
            ExtensionSpec::Alpn(_) => ext::ALPN,
            ExtensionSpec::SupportedVersions(_) => ext::SUPPORTED_VERSIONS,
            ExtensionSpec::KeyShare(_) => ext::KEY_SHARE,
            ExtensionSpec::PskKeyExchangeModes(_) => ext::PSK_KEY_EXCHANGE_MODES,
            ExtensionSpec::SessionTicket => ext::SESSION_TICKET,
            ExtensionSpec::StatusRequest => ext::STATUS_REQUEST,
            ExtensionSpec::Sct => ext::SCT,
            ExtensionSpec::ExtendedMasterSecret => ext::EXTENDED_MASTER_SECRET,
            ExtensionSpec::RenegotiationInfo(_) => ext::RENEGOTIATION_INFO,
            ExtensionSpec::Padding(_) => ext::PADDING,
            ExtensionSpec::Generic { id, .. } => *id,
        }
    }
}

/// One key_share entry: a group plus its ephemeral key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareEntry {
    pub group: u16,
    pub material: KeyMaterial,
}

impl KeyShareEntry {
    /// Entry whose ephemeral material is generated by the engine.
    pub fn auto(group: u16) -> Self {
        KeyShareEntry {
            group,
            material: KeyMaterial::Auto,
        }
    }
}

/// Ephemeral key material for a key share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Generated fresh by the TLS engine at handshake time
    Auto,
    /// Fixed bytes (templates reproduced from a capture)
    Bytes(Vec<u8>),
}

/// Renegotiation indication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenegotiationMode {
    Never,
    OnceAsClient,
}

/// ClientHello padding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingStyle {
    /// Pad the hello to 512 bytes when it lands in the 256..511 range,
    /// as BoringSSL does.
    Boring,
    /// Fixed-length zero padding
    Fixed(u16),
}
