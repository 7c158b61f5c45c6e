//! The surface an intercepting sniffer drives.
//!
//! Contract: nothing is written to the raw connection before the ClientHello,
//! and the returned session's negotiated metadata is `Option`-typed — an
//! engine may hide standard TLS state, and callers fall back to their pre-TLS
//! known values for SNI, ALPN, and cipher.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;

use crate::cache::global_cache;
use crate::dial::{self, TlsDialerConfig};
use crate::engine::TlsSession;
use crate::error::Result;
use crate::http2::transport::H2Transport;

/// Upgrade an outbound raw connection to fingerprinted TLS.
pub async fn upgrade_outbound_tls<S>(
    deadline: Instant,
    conn: S,
    config: &TlsDialerConfig,
) -> Result<TlsSession<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    dial::upgrade(deadline, conn, config, global_cache()).await
}

/// Apply a named HTTP/2 profile to a client transport.
pub fn configure_h2_transport(transport: &mut H2Transport, profile_name: &str) -> Result<()> {
    transport.apply_profile(profile_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FingerprintError;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn facade_prechecks_deadline_without_io() {
        let (client, mut server) = tokio::io::duplex(64);
        let config = TlsDialerConfig {
            browser_profile: Some("chrome_120".to_string()),
            server_name: "example.com".to_string(),
            ..Default::default()
        };
        let err = upgrade_outbound_tls(Instant::now() - Duration::from_secs(1), client, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, FingerprintError::Timeout));

        let mut buf = Vec::new();
        assert_eq!(server.read_to_end(&mut buf).await.unwrap(), 0);
    }

    #[test]
    fn facade_configures_transport() {
        let mut transport = H2Transport::default();
        configure_h2_transport(&mut transport, "firefox_120").unwrap();
        // Firefox 120 advertises no SETTINGS_MAX_HEADER_LIST_SIZE
        assert_eq!(transport.max_header_list_size, None);
        assert!(!transport.strict_max_concurrent_streams);
        assert_eq!(transport.read_idle_timeout, Duration::from_secs(30));
    }

    #[test]
    fn facade_rejects_unknown_profile() {
        let mut transport = H2Transport::default();
        assert!(matches!(
            configure_h2_transport(&mut transport, "mosaic_1993").unwrap_err(),
            FingerprintError::ProfileUnsupported(_)
        ));
    }
}
