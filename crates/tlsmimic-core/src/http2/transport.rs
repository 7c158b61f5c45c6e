//! Applying an HTTP/2 browser profile to a client transport.
//!
//! The `h2` client hardcodes most of what an Akamai fingerprint describes
//! (SETTINGS order, initial WINDOW_UPDATE, pseudo-header order), so only a
//! small subset of a profile is honored: the max header list size, a strict
//! concurrency cap, and an idle-timeout heuristic. [`validate`] reports every
//! profile setting the transport cannot honor; warnings are observability,
//! never errors.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::global_cache;
use crate::dial::{self, TlsDialerConfig};
use crate::engine::SessionInfo;
use crate::error::{FingerprintError, Result};
use crate::http2::akamai::{http2_profile, setting, Http2Profile};
use crate::profiles::profile_user_agent;

/// The knobs of the HTTP/2 client transport this crate can actually set.
#[derive(Debug, Clone)]
pub struct H2Transport {
    /// SETTINGS_MAX_HEADER_LIST_SIZE (6), advertised to the server
    pub max_header_list_size: Option<u32>,
    /// Cap local concurrency at the profile's SETTINGS_MAX_CONCURRENT_STREAMS
    pub strict_max_concurrent_streams: bool,
    /// The profile's concurrency value, applied when strict mode is on
    pub max_concurrent_streams: Option<u32>,
    /// Connection keepalive; derived from the profile's WINDOW_UPDATE
    pub read_idle_timeout: Duration,
    /// Cleartext HTTP/2 is never offered
    pub allow_http: bool,
}

impl Default for H2Transport {
    fn default() -> Self {
        H2Transport {
            max_header_list_size: None,
            strict_max_concurrent_streams: false,
            max_concurrent_streams: None,
            read_idle_timeout: Duration::from_secs(10),
            allow_http: false,
        }
    }
}

impl H2Transport {
    /// A transport pre-configured to a profile.
    pub fn for_profile(profile_name: &str) -> Result<H2Transport> {
        let mut transport = H2Transport::default();
        transport.apply_profile(profile_name)?;
        Ok(transport)
    }

    /// Copy a profile's honorable knobs into this transport.
    pub fn apply_profile(&mut self, profile_name: &str) -> Result<()> {
        let profile = lookup(profile_name)?;
        let fp = &profile.fingerprint;

        if let Some(size) = fp.setting(setting::MAX_HEADER_LIST_SIZE) {
            self.max_header_list_size = Some(size);
        }
        if let Some(streams) = fp.setting(setting::MAX_CONCURRENT_STREAMS) {
            self.strict_max_concurrent_streams = streams > 0;
            self.max_concurrent_streams = Some(streams);
        }
        self.read_idle_timeout = read_idle_timeout_for(fp.window_update);
        self.allow_http = false;

        debug!(
            profile = profile.name,
            max_header_list_size = ?self.max_header_list_size,
            strict = self.strict_max_concurrent_streams,
            "applied HTTP/2 profile"
        );
        Ok(())
    }

    /// Map the knobs onto an `h2` client builder.
    pub fn builder(&self) -> h2::client::Builder {
        let mut builder = h2::client::Builder::new();
        if let Some(size) = self.max_header_list_size {
            builder.max_header_list_size(size);
        }
        if self.strict_max_concurrent_streams {
            if let Some(streams) = self.max_concurrent_streams {
                builder.initial_max_send_streams(streams as usize);
            }
        }
        builder
    }
}

/// Idle timeout from the initial WINDOW_UPDATE magnitude.
///
/// A large window means the browser keeps the connection alive for big
/// transfers; the thresholds mirror the session lengths real clients sustain
/// at each size. Heuristic, local to this module.
fn read_idle_timeout_for(window_update: u32) -> Duration {
    if window_update > 10_000_000 {
        Duration::from_secs(30)
    } else if window_update > 1_000_000 {
        Duration::from_secs(15)
    } else {
        Duration::from_secs(10)
    }
}

/// A profile setting the transport cannot honor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum H2Warning {
    HeaderTableSize(u32),
    EnablePush(u32),
    InitialWindowSize(u32),
    MaxFrameSize(u32),
    WindowUpdate(u32),
    PseudoHeaderOrder(String),
    Priority,
}

impl fmt::Display for H2Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            H2Warning::HeaderTableSize(v) => {
                write!(f, "SETTINGS_HEADER_TABLE_SIZE ({}) is fixed by the h2 library", v)
            }
            H2Warning::EnablePush(v) => {
                write!(f, "SETTINGS_ENABLE_PUSH ({}) cannot be enabled; push is always off", v)
            }
            H2Warning::InitialWindowSize(v) => {
                write!(f, "SETTINGS_INITIAL_WINDOW_SIZE ({}) is not applied to the transport", v)
            }
            H2Warning::MaxFrameSize(v) => {
                write!(f, "SETTINGS_MAX_FRAME_SIZE ({}) is fixed at 16384", v)
            }
            H2Warning::WindowUpdate(v) => {
                write!(f, "initial WINDOW_UPDATE ({}) is chosen by the h2 library", v)
            }
            H2Warning::PseudoHeaderOrder(order) => {
                write!(f, "pseudo-header order '{}' is not controllable (library emits 'm,a,s,p')", order)
            }
            H2Warning::Priority => write!(f, "PRIORITY frames are not sent by this client"),
        }
    }
}

/// One warning per profile setting the transport cannot honor.
pub fn validate(profile_name: &str) -> Result<Vec<H2Warning>> {
    let profile = lookup(profile_name)?;
    let fp = &profile.fingerprint;
    let mut warnings = Vec::new();

    if let Some(v) = fp.setting(setting::HEADER_TABLE_SIZE) {
        warnings.push(H2Warning::HeaderTableSize(v));
    }
    if let Some(v) = fp.setting(setting::ENABLE_PUSH) {
        if v != 0 {
            warnings.push(H2Warning::EnablePush(v));
        }
    }
    if let Some(v) = fp.setting(setting::INITIAL_WINDOW_SIZE) {
        warnings.push(H2Warning::InitialWindowSize(v));
    }
    if let Some(v) = fp.setting(setting::MAX_FRAME_SIZE) {
        warnings.push(H2Warning::MaxFrameSize(v));
    }
    if fp.window_update != 0 && fp.window_update != 65535 {
        warnings.push(H2Warning::WindowUpdate(fp.window_update));
    }
    if !fp.pseudo_header_order.is_empty() && fp.pseudo_header_order != "m,a,s,p" {
        warnings.push(H2Warning::PseudoHeaderOrder(fp.pseudo_header_order.clone()));
    }
    if fp.priority.is_some() {
        warnings.push(H2Warning::Priority);
    }

    Ok(warnings)
}

/// The subset of a profile that is actually controllable, by knob name.
pub fn configurable_settings(profile_name: &str) -> Result<BTreeMap<&'static str, String>> {
    let profile = lookup(profile_name)?;
    let fp = &profile.fingerprint;
    let mut out = BTreeMap::new();

    if let Some(size) = fp.setting(setting::MAX_HEADER_LIST_SIZE) {
        out.insert("MaxHeaderListSize", size.to_string());
    }
    out.insert(
        "ReadIdleTimeout",
        format!("{}s", read_idle_timeout_for(fp.window_update).as_secs()),
    );
    out.insert(
        "StrictMaxConcurrentStreams",
        fp.setting(setting::MAX_CONCURRENT_STREAMS)
            .map(|v| v > 0)
            .unwrap_or(false)
            .to_string(),
    );
    Ok(out)
}

fn lookup(profile_name: &str) -> Result<Http2Profile> {
    http2_profile(profile_name)
        .ok_or_else(|| FingerprintError::ProfileUnsupported(profile_name.to_string()))
}

/// Everything needed to build a fingerprinted HTTP/2 client.
#[derive(Debug, Clone)]
pub struct MimicClientConfig {
    /// TLS fingerprint configuration; also names the HTTP/2 profile
    pub tls: TlsDialerConfig,
    pub dial_timeout: Duration,
    /// Per-request timeout; zero means none
    pub request_timeout: Duration,
    /// Overrides the profile heuristic when set
    pub read_idle_timeout: Option<Duration>,
    /// Overrides the profile's User-Agent when set
    pub user_agent: Option<String>,
    /// Extra headers sent on every request
    pub headers: Vec<(String, String)>,
}

impl Default for MimicClientConfig {
    fn default() -> Self {
        MimicClientConfig {
            tls: TlsDialerConfig::default(),
            dial_timeout: Duration::from_secs(30),
            request_timeout: Duration::ZERO,
            read_idle_timeout: None,
            user_agent: None,
            headers: Vec::new(),
        }
    }
}

/// An HTTP/2 client over one fingerprinted TLS connection.
pub struct MimicClient {
    send: h2::client::SendRequest<Bytes>,
    session: SessionInfo,
    transport: H2Transport,
    authority: String,
    user_agent: String,
    headers: Vec<(String, String)>,
    request_timeout: Duration,
}

impl MimicClient {
    /// Dial `addr`, upgrade to fingerprinted TLS, and run the HTTP/2
    /// preamble with the profile's transport knobs applied.
    pub async fn connect(addr: &str, config: MimicClientConfig) -> Result<MimicClient> {
        let mut transport = H2Transport::default();
        let profile_name = config.tls.effective_http2_profile().map(str::to_string);
        if let Some(name) = &profile_name {
            transport.apply_profile(name)?;
            for warning in validate(name)? {
                warn!(%warning, profile = name.as_str(), "HTTP/2 profile setting not honored");
            }
        }
        if let Some(idle) = config.read_idle_timeout.or(config.tls.read_idle_timeout) {
            transport.read_idle_timeout = idle;
        }

        let mut tls = config.tls.clone();
        if tls.alpn.is_empty() {
            tls.alpn = vec!["h2".to_string()];
        }

        let deadline = Instant::now() + config.dial_timeout;
        let session = dial::dial(deadline, addr, &tls, global_cache()).await?;
        let info = session.info().clone();

        let (send, connection) = transport
            .builder()
            .handshake::<_, Bytes>(session)
            .await
            .map_err(|e| FingerprintError::HandshakeFailed(format!("h2 preamble: {}", e)))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "h2 connection closed");
            }
        });

        let user_agent = config
            .user_agent
            .or_else(|| {
                profile_name
                    .as_deref()
                    .and_then(profile_user_agent)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "tlsmimic/0.2".to_string());

        Ok(MimicClient {
            send,
            session: info,
            transport,
            authority: tls.server_name.clone(),
            user_agent,
            headers: config.headers,
            request_timeout: config.request_timeout,
        })
    }

    /// The TLS session info of the underlying connection.
    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// The transport knobs in effect.
    pub fn transport(&self) -> &H2Transport {
        &self.transport
    }

    /// Send a GET for `path` and collect the full response body.
    pub async fn get(&mut self, path: &str) -> Result<(http::response::Parts, Bytes)> {
        let uri = format!("https://{}{}", self.authority, path);
        let mut request = http::Request::builder()
            .method(http::Method::GET)
            .uri(uri.as_str())
            .header(http::header::USER_AGENT, self.user_agent.as_str());
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let request = request
            .body(())
            .map_err(|e| FingerprintError::HandshakeFailed(format!("bad request: {}", e)))?;

        // SendRequest is a cheap cloneable handle to the connection
        let send = self.send.clone();
        let exchange = async {
            let mut send = send
                .ready()
                .await
                .map_err(|e| FingerprintError::HandshakeFailed(format!("h2 ready: {}", e)))?;
            let (response, _) = send
                .send_request(request, true)
                .map_err(|e| FingerprintError::HandshakeFailed(format!("h2 send: {}", e)))?;

            let response = response
                .await
                .map_err(|e| FingerprintError::HandshakeFailed(format!("h2 response: {}", e)))?;
            let (parts, mut body) = response.into_parts();

            let mut data = BytesMut::new();
            while let Some(chunk) = body.data().await {
                let chunk = chunk
                    .map_err(|e| FingerprintError::HandshakeFailed(format!("h2 body: {}", e)))?;
                let _ = body.flow_control().release_capacity(chunk.len());
                data.extend_from_slice(&chunk);
            }
            Ok((parts, data.freeze()))
        };

        if self.request_timeout > Duration::ZERO {
            tokio::time::timeout(self.request_timeout, exchange)
                .await
                .map_err(|_| FingerprintError::Timeout)?
        } else {
            exchange.await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_profile_knobs() {
        let transport = H2Transport::for_profile("chrome_120").unwrap();
        assert_eq!(transport.max_header_list_size, Some(262144));
        assert!(transport.strict_max_concurrent_streams);
        assert_eq!(transport.max_concurrent_streams, Some(100));
        // 15663105 > 10MB window
        assert!(transport.read_idle_timeout >= Duration::from_secs(20));
        assert!(!transport.allow_http);
    }

    #[test]
    fn idle_timeout_thresholds() {
        assert_eq!(read_idle_timeout_for(15_663_105), Duration::from_secs(30));
        assert_eq!(read_idle_timeout_for(1_048_576), Duration::from_secs(15));
        assert_eq!(read_idle_timeout_for(65_535), Duration::from_secs(10));
    }

    #[test]
    fn chrome_warnings_cover_exactly_the_unconfigurable_settings() {
        let warnings = validate("chrome_120").unwrap();
        assert_eq!(warnings.len(), 4);
        assert!(warnings.contains(&H2Warning::HeaderTableSize(65536)));
        assert!(warnings.contains(&H2Warning::InitialWindowSize(6291456)));
        assert!(warnings.contains(&H2Warning::MaxFrameSize(16384)));
        assert!(warnings.contains(&H2Warning::WindowUpdate(15663105)));
    }

    #[test]
    fn firefox_warns_about_pseudo_header_order() {
        let warnings = validate("firefox_120").unwrap();
        assert!(warnings
            .iter()
            .any(|w| matches!(w, H2Warning::PseudoHeaderOrder(o) if o == "m,p,a,s")));
    }

    #[test]
    fn okhttp_warns_about_enable_push() {
        let warnings = validate("okhttp_android").unwrap();
        assert!(warnings.contains(&H2Warning::EnablePush(1)));
    }

    #[test]
    fn unknown_profile_is_unsupported() {
        assert!(matches!(
            validate("mosaic_1993").unwrap_err(),
            FingerprintError::ProfileUnsupported(_)
        ));
        assert!(matches!(
            H2Transport::for_profile("mosaic_1993").unwrap_err(),
            FingerprintError::ProfileUnsupported(_)
        ));
    }

    #[test]
    fn configurable_settings_lists_the_honorable_subset() {
        let settings = configurable_settings("chrome_120").unwrap();
        assert_eq!(settings.get("MaxHeaderListSize"), Some(&"262144".to_string()));
        assert_eq!(settings.get("ReadIdleTimeout"), Some(&"30s".to_string()));
        assert_eq!(
            settings.get("StrictMaxConcurrentStreams"),
            Some(&"true".to_string())
        );
        assert_eq!(settings.len(), 3);
    }

    #[test]
    fn safari_has_no_header_table_warning() {
        // Safari's fingerprint carries no SETTINGS_HEADER_TABLE_SIZE
        let warnings = validate("safari_17").unwrap();
        assert!(!warnings
            .iter()
            .any(|w| matches!(w, H2Warning::HeaderTableSize(_))));
    }
}
