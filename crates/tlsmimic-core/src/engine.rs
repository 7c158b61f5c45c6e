//! Handshake engine over rustls.
//!
//! The core never implements the TLS state machine. [`HelloInput`] is the
//! seam between template construction and handshake execution: the shipped
//! engine drives rustls and honors what rustls exposes (server name, ALPN,
//! protocol versions, cipher-suite order within the supported set, trust
//! anchors, verification toggle). Template fields rustls cannot reproduce
//! byte-exactly are reported by [`limitations`], mirroring the HTTP/2
//! configurator's validate contract. A template-capable engine slots in
//! behind the same input type.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::error::{FingerprintError, Result};
use crate::fingerprint::grease::is_grease_u16;
use crate::fingerprint::tables::version;
use crate::spec::{ClientHelloSpec, ExtensionSpec, HelloInput};

/// Cipher suites the rustls provider can negotiate.
const RUSTLS_SUITES: [u16; 9] = [
    0x1301, 0x1302, 0x1303, 0xc02b, 0xc02c, 0xc02f, 0xc030, 0xcca8, 0xcca9,
];

/// Connection-level options that live outside the ClientHello template.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub server_name: String,
    /// ALPN protocols; overrides the template's ALPN payload when non-empty
    pub alpn: Vec<String>,
    /// Trust anchors; the webpki bundle when absent
    pub root_store: Option<Arc<RootCertStore>>,
    pub insecure_skip_verify: bool,
    pub tls_min_version: Option<u16>,
    pub tls_max_version: Option<u16>,
}

/// A template field the rustls engine cannot honor byte-exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLimitation {
    /// Suite outside the provider's set; dropped from the offer
    CipherSuite(u16),
    /// GREASE placement is chosen by the engine, not the template
    Grease(u16),
    /// rustls lays out extensions in its own order
    ExtensionOrder,
    /// Unknown-payload extension the engine will not emit
    GenericExtension(u16),
}

impl fmt::Display for EngineLimitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineLimitation::CipherSuite(id) => {
                write!(f, "cipher suite 0x{:04x} is outside the provider set", id)
            }
            EngineLimitation::Grease(id) => {
                write!(f, "GREASE value 0x{:04x} cannot be pinned in place", id)
            }
            EngineLimitation::ExtensionOrder => {
                write!(f, "extension emission order is engine-controlled")
            }
            EngineLimitation::GenericExtension(id) => {
                write!(f, "extension {} has no engine counterpart", id)
            }
        }
    }
}

/// Report which fields of a template the rustls engine cannot reproduce.
pub fn limitations(spec: &ClientHelloSpec) -> Vec<EngineLimitation> {
    let mut out = Vec::new();
    if !spec.extensions.is_empty() {
        out.push(EngineLimitation::ExtensionOrder);
    }
    for &suite in &spec.cipher_suites {
        if is_grease_u16(suite) {
            out.push(EngineLimitation::Grease(suite));
        } else if !RUSTLS_SUITES.contains(&suite) {
            out.push(EngineLimitation::CipherSuite(suite));
        }
    }
    for extension in &spec.extensions {
        if let ExtensionSpec::Generic { id, .. } = extension {
            if is_grease_u16(*id) {
                out.push(EngineLimitation::Grease(*id));
            } else {
                out.push(EngineLimitation::GenericExtension(*id));
            }
        }
    }
    out
}

/// Observable state of an established session.
///
/// The negotiated fields are `None` when the engine in use hides them;
/// callers fall back to their pre-TLS known values.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub server_name: String,
    pub alpn: Option<String>,
    pub cipher_suite: Option<u16>,
    pub tls_version: Option<u16>,
}

/// A TLS-upgraded byte stream plus its session info.
#[derive(Debug)]
pub struct TlsSession<S> {
    stream: tokio_rustls::client::TlsStream<S>,
    info: SessionInfo,
}

impl<S> TlsSession<S> {
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn get_ref(&self) -> &tokio_rustls::client::TlsStream<S> {
        &self.stream
    }

    pub fn into_inner(self) -> tokio_rustls::client::TlsStream<S> {
        self.stream
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncRead for TlsSession<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncWrite for TlsSession<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// Drive the TLS handshake on `stream` according to `input`.
pub async fn handshake<S>(
    stream: S,
    input: &HelloInput,
    opts: &EngineOptions,
) -> Result<TlsSession<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let config = client_config(input, opts)?;
    let server_name = ServerName::try_from(opts.server_name.clone()).map_err(|e| {
        FingerprintError::HandshakeFailed(format!(
            "invalid server name {:?}: {}",
            opts.server_name, e
        ))
    })?;

    let connector = TlsConnector::from(config);
    let stream = connector
        .connect(server_name, stream)
        .await
        .map_err(|e| FingerprintError::HandshakeFailed(e.to_string()))?;

    let info = {
        let (_, conn) = stream.get_ref();
        SessionInfo {
            server_name: opts.server_name.clone(),
            alpn: conn
                .alpn_protocol()
                .map(|p| String::from_utf8_lossy(p).into_owned()),
            cipher_suite: conn.negotiated_cipher_suite().map(|s| u16::from(s.suite())),
            tls_version: conn.protocol_version().map(u16::from),
        }
    };
    debug!(
        server_name = info.server_name.as_str(),
        alpn = info.alpn.as_deref().unwrap_or("-"),
        "TLS handshake complete"
    );

    Ok(TlsSession { stream, info })
}

/// Build the rustls client config for an input.
pub fn client_config(input: &HelloInput, opts: &EngineOptions) -> Result<Arc<ClientConfig>> {
    let (min, max, spec_alpn, ordered_suites) = match input {
        HelloInput::Spec(spec) => {
            for limitation in limitations(spec) {
                debug!(%limitation, "template field not engine-exact");
            }
            let alpn = match spec.extension(crate::fingerprint::tables::ext::ALPN) {
                Some(ExtensionSpec::Alpn(protocols)) => protocols.clone(),
                _ => Vec::new(),
            };
            (
                spec.tls_version_min,
                template_version_max(spec),
                alpn,
                suite_order(&spec.cipher_suites),
            )
        }
        HelloInput::Builtin(id) => {
            debug!(?id, "using built-in browser imitation");
            (0, 0, vec!["h2".to_string(), "http/1.1".to_string()], Vec::new())
        }
    };

    let min = opts.tls_min_version.unwrap_or(min);
    let max = opts.tls_max_version.unwrap_or(max);
    let versions = protocol_versions(min, max);

    let provider = cipher_provider(ordered_suites);
    let builder = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&versions)
        .map_err(|e| FingerprintError::HandshakeFailed(e.to_string()))?;

    let mut config = if opts.insecure_skip_verify {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerification))
            .with_no_client_auth()
    } else {
        let roots = match &opts.root_store {
            Some(store) => Arc::clone(store),
            None => {
                let store = RootCertStore {
                    roots: webpki_roots::TLS_SERVER_ROOTS.into(),
                };
                Arc::new(store)
            }
        };
        builder.with_root_certificates(roots).with_no_client_auth()
    };

    let alpn = if !opts.alpn.is_empty() {
        &opts.alpn
    } else {
        &spec_alpn
    };
    config.alpn_protocols = alpn.iter().map(|p| p.as_bytes().to_vec()).collect();

    Ok(Arc::new(config))
}

/// A supported_versions extension outranks the record-layer bound: a JA3's
/// version field says 0x0303 even for TLS 1.3 hellos.
fn template_version_max(spec: &ClientHelloSpec) -> u16 {
    match spec.extension(crate::fingerprint::tables::ext::SUPPORTED_VERSIONS) {
        Some(ExtensionSpec::SupportedVersions(versions)) => versions
            .iter()
            .copied()
            .filter(|v| !is_grease_u16(*v))
            .max()
            .unwrap_or(spec.tls_version_max),
        _ => spec.tls_version_max,
    }
}

/// The provider's suites reordered to the template's cipher order; suites the
/// provider does not carry are dropped (and reported by `limitations`).
fn suite_order(spec_suites: &[u16]) -> Vec<rustls::SupportedCipherSuite> {
    let all = rustls::crypto::ring::DEFAULT_CIPHER_SUITES;
    spec_suites
        .iter()
        .filter_map(|&id| all.iter().find(|s| u16::from(s.suite()) == id).copied())
        .collect()
}

fn cipher_provider(ordered: Vec<rustls::SupportedCipherSuite>) -> Arc<rustls::crypto::CryptoProvider> {
    let mut provider = rustls::crypto::ring::default_provider();
    if !ordered.is_empty() {
        provider.cipher_suites = ordered;
    }
    Arc::new(provider)
}

/// Map a template version range onto the protocol versions rustls supports.
fn protocol_versions(min: u16, max: u16) -> Vec<&'static rustls::SupportedProtocolVersion> {
    if min == 0 && max == 0 {
        return vec![&rustls::version::TLS13, &rustls::version::TLS12];
    }
    let mut versions = Vec::new();
    if max >= version::TLS13 {
        versions.push(&rustls::version::TLS13);
    }
    if min <= version::TLS12 && max >= version::TLS12 {
        versions.push(&rustls::version::TLS12);
    }
    if versions.is_empty() {
        // pre-1.2-only templates cannot be negotiated by rustls
        warn!(min = %min, max = %max, "template version range below TLS 1.2; offering TLS 1.2");
        versions.push(&rustls::version::TLS12);
    }
    versions
}

/// Accepts any certificate. Only reachable through `insecure_skip_verify`.
#[derive(Debug)]
struct NoVerification;

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}
