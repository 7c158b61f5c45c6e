/// The fields of a ClientHello needed to compute JA4 and derive a spec.
///
/// Wire order is preserved everywhere; GREASE values stay in the lists.
#[derive(Debug, Clone, Default)]
pub struct ClientHelloSummary {
    /// True when the hello was carried over QUIC rather than TCP
    pub is_quic: bool,
    /// Negotiated (or record-layer) TLS version, e.g. 0x0304
    pub tls_version: u16,
    /// SNI value; empty when the extension was absent
    pub server_name: String,
    /// Cipher suite ids in wire order
    pub cipher_suites: Vec<u16>,
    /// Extension ids in wire order
    pub extensions: Vec<u16>,
    /// ALPN protocol values
    pub alpn_protocols: Vec<String>,
    /// Supported groups (extension 10)
    pub supported_groups: Vec<u16>,
    /// Signature schemes (extension 13)
    pub signature_algorithms: Vec<u16>,
    /// EC point format bytes (extension 11)
    pub ec_point_formats: Vec<u8>,
    /// Groups offered in the key_share extension (51)
    pub key_share_groups: Vec<u16>,
}
