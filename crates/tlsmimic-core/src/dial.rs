//! Fingerprinted TLS dialing and upgrading.
//!
//! Both entry points share one pipeline: pre-check the deadline (no I/O when
//! it already passed), resolve the build source by precedence through the
//! spec cache, hand the result to the engine, and drive the handshake with
//! the deadline applied. Any failure drops the raw stream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::cache::{CacheKey, SpecCache};
use crate::engine::{self, EngineOptions, TlsSession};
use crate::error::{FingerprintError, Result};
use crate::profiles::HelloId;
use crate::spec::{builder, Descriptor, HelloInput, SpecSource};

/// Configuration for fingerprinted dialing.
///
/// When several fingerprint sources are set at once, precedence is
/// `client_hello_spec_file` > `ja3` > `browser_profile` > a generic
/// Chrome-like built-in.
#[derive(Debug, Clone, Default)]
pub struct TlsDialerConfig {
    /// JA3 string to build the ClientHello from
    pub ja3: Option<String>,
    /// Expected JA4; informational only, never used to build
    pub ja4: Option<String>,
    /// Path to a JSON ClientHello descriptor; highest precedence
    pub client_hello_spec_file: Option<PathBuf>,
    /// Named browser profile; lowest precedence among explicit sources
    pub browser_profile: Option<String>,
    /// HTTP/2 profile override; `browser_profile` when unset
    pub http2_profile: Option<String>,
    /// Server name for SNI and certificate verification
    pub server_name: String,
    /// ALPN protocols, overriding the template's default when non-empty
    pub alpn: Vec<String>,
    /// Trust anchors; the webpki bundle when unset
    pub root_store: Option<Arc<rustls::RootCertStore>>,
    /// Disable upstream certificate verification
    pub insecure_skip_verify: bool,
    pub tls_min_version: Option<u16>,
    pub tls_max_version: Option<u16>,
    /// HTTP/2 read-idle override, consumed by the transport configurator
    pub read_idle_timeout: Option<Duration>,
}

impl TlsDialerConfig {
    /// The HTTP/2 profile to apply: the explicit override, else the browser
    /// profile.
    pub fn effective_http2_profile(&self) -> Option<&str> {
        self.http2_profile
            .as_deref()
            .or(self.browser_profile.as_deref())
    }

    fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            server_name: self.server_name.clone(),
            alpn: self.alpn.clone(),
            root_store: self.root_store.clone(),
            insecure_skip_verify: self.insecure_skip_verify,
            tls_min_version: self.tls_min_version,
            tls_max_version: self.tls_max_version,
        }
    }
}

/// Open a TCP connection to `addr` and upgrade it.
pub async fn dial(
    deadline: Instant,
    addr: &str,
    config: &TlsDialerConfig,
    cache: &SpecCache,
) -> Result<TlsSession<TcpStream>> {
    check_deadline(deadline)?;

    let stream = timeout_at(deadline, TcpStream::connect(addr))
        .await
        .map_err(|_| FingerprintError::Timeout)?
        .map_err(FingerprintError::DialFailed)?;

    // a failed upgrade drops (and thereby closes) the fresh connection
    upgrade(deadline, stream, config, cache).await
}

/// Upgrade a caller-provided byte stream to fingerprinted TLS.
///
/// Nothing is written to `stream` before the ClientHello; an already-expired
/// deadline returns [`FingerprintError::Timeout`] without touching it.
pub async fn upgrade<S>(
    deadline: Instant,
    stream: S,
    config: &TlsDialerConfig,
    cache: &SpecCache,
) -> Result<TlsSession<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    check_deadline(deadline)?;

    if let Some(ja4) = &config.ja4 {
        debug!(ja4 = ja4.as_str(), "expected JA4 for this upgrade");
    }

    let input = resolve_input(config, cache)?;

    timeout_at(
        deadline,
        engine::handshake(stream, &input, &config.engine_options()),
    )
    .await
    .map_err(|_| FingerprintError::Timeout)?
}

/// Dial with just a JA3 string.
pub async fn dial_with_ja3(
    deadline: Instant,
    addr: &str,
    ja3: &str,
    server_name: &str,
    cache: &SpecCache,
) -> Result<TlsSession<TcpStream>> {
    let config = TlsDialerConfig {
        ja3: Some(ja3.to_string()),
        server_name: server_name.to_string(),
        ..Default::default()
    };
    dial(deadline, addr, &config, cache).await
}

/// Dial with just a profile name.
pub async fn dial_with_profile(
    deadline: Instant,
    addr: &str,
    profile: &str,
    server_name: &str,
    cache: &SpecCache,
) -> Result<TlsSession<TcpStream>> {
    let config = TlsDialerConfig {
        browser_profile: Some(profile.to_string()),
        server_name: server_name.to_string(),
        ..Default::default()
    };
    dial(deadline, addr, &config, cache).await
}

/// Resolve the ClientHello input by source precedence, consulting the cache.
pub fn resolve_input(config: &TlsDialerConfig, cache: &SpecCache) -> Result<HelloInput> {
    let alpn = if config.alpn.is_empty() {
        None
    } else {
        Some(config.alpn.as_slice())
    };

    let source = SpecSource::select(
        config.client_hello_spec_file.as_ref(),
        config.ja3.as_deref(),
        config.browser_profile.as_deref(),
    );

    match source {
        SpecSource::File(path) => {
            let key = CacheKey::for_file(&path).map_err(|source| {
                FingerprintError::SpecSourceUnavailable {
                    path: path.clone(),
                    source,
                }
            })?;
            if let Some(spec) = cache.get(&key) {
                return Ok(HelloInput::Spec(spec));
            }
            let descriptor = Descriptor::load(&path)?;
            let spec = Arc::new(descriptor.build(&config.server_name));
            cache.set(key, Arc::clone(&spec));
            debug!(path = %path.display(), "built spec from descriptor file");
            Ok(HelloInput::Spec(spec))
        }
        SpecSource::Ja3(ja3_str) => {
            let key = CacheKey::for_ja3(&ja3_str);
            if let Some(spec) = cache.get(&key) {
                return Ok(HelloInput::Spec(spec));
            }
            let ja3 = ja3_str.parse()?;
            let spec = Arc::new(builder::from_ja3(&ja3, &config.server_name, alpn));
            cache.set(key, Arc::clone(&spec));
            debug!("built spec from JA3 string");
            Ok(HelloInput::Spec(spec))
        }
        SpecSource::Profile(name) => {
            let key = CacheKey::for_profile(&name, &config.server_name);
            if let Some(spec) = cache.get(&key) {
                return Ok(HelloInput::Spec(spec));
            }
            match builder::from_profile(&name, &config.server_name, alpn)? {
                HelloInput::Spec(spec) => {
                    cache.set(key, Arc::clone(&spec));
                    debug!(profile = name.as_str(), "built spec from profile");
                    Ok(HelloInput::Spec(spec))
                }
                // built-ins carry no template to cache
                fallback => Ok(fallback),
            }
        }
        SpecSource::Default => Ok(HelloInput::Builtin(HelloId::Chrome)),
    }
}

fn check_deadline(deadline: Instant) -> Result<()> {
    if deadline <= Instant::now() {
        return Err(FingerprintError::Timeout);
    }
    Ok(())
}
