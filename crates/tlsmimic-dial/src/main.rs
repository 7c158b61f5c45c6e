use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::Instant;
use tracing::info;

use tlsmimic_core::cache::global_cache;
use tlsmimic_core::dial::{self, TlsDialerConfig};
use tlsmimic_core::http2::{configurable_settings, validate, MimicClient, MimicClientConfig};
use tlsmimic_core::profiles;

#[derive(Parser)]
#[command(name = "tlsmimic-dial")]
#[command(about = "Dial a host with a browser TLS/HTTP2 fingerprint and report the session")]
struct Cli {
    /// Target as host:port
    target: Option<String>,

    /// Named browser profile (chrome_120, firefox_120, safari_17, ...)
    #[arg(short, long)]
    profile: Option<String>,

    /// JA3 string to build the ClientHello from
    #[arg(short, long)]
    ja3: Option<String>,

    /// Path to a JSON ClientHello descriptor (highest precedence)
    #[arg(short, long)]
    spec_file: Option<PathBuf>,

    /// Server name for SNI; the target host when omitted
    #[arg(long)]
    server_name: Option<String>,

    /// ALPN protocols, comma-separated
    #[arg(long)]
    alpn: Option<String>,

    /// Skip upstream certificate verification
    #[arg(short, long, default_value_t = false)]
    insecure: bool,

    /// Dial timeout in seconds
    #[arg(short, long, default_value_t = 15)]
    timeout: u64,

    /// Send an HTTP/2 GET / over the upgraded connection
    #[arg(long, default_value_t = false)]
    h2: bool,

    /// List available profiles and exit
    #[arg(long, default_value_t = false)]
    list_profiles: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    if cli.list_profiles {
        for name in profiles::profile_names() {
            let p = profiles::profile(name).unwrap();
            println!("{:<16} {}", name, p.name);
        }
        return Ok(());
    }

    let target = cli.target.context("a host:port target is required")?;
    let host = target
        .rsplit_once(':')
        .map(|(h, _)| h.to_string())
        .unwrap_or_else(|| target.clone());

    let config = TlsDialerConfig {
        ja3: cli.ja3,
        client_hello_spec_file: cli.spec_file,
        browser_profile: cli.profile,
        server_name: cli.server_name.unwrap_or(host),
        alpn: cli
            .alpn
            .map(|s| s.split(',').map(str::to_string).collect())
            .unwrap_or_default(),
        insecure_skip_verify: cli.insecure,
        ..Default::default()
    };

    if let Some(profile) = config.effective_http2_profile() {
        if let Ok(warnings) = validate(profile) {
            for warning in &warnings {
                info!("h2 profile limitation: {}", warning);
            }
        }
        if let Ok(settings) = configurable_settings(profile) {
            for (knob, value) in settings {
                info!("h2 knob {} = {}", knob, value);
            }
        }
    }

    info!("Dialing {} (SNI {})", target, config.server_name);

    if cli.h2 {
        let client_config = MimicClientConfig {
            tls: config,
            dial_timeout: Duration::from_secs(cli.timeout),
            request_timeout: Duration::from_secs(cli.timeout),
            ..Default::default()
        };
        let mut client = MimicClient::connect(&target, client_config).await?;
        print_session(client.session());

        let (parts, body) = client.get("/").await?;
        println!("  ──────────────────────────────────────────────────");
        println!("  Status:     {}", parts.status);
        println!("  Body:       {} bytes", body.len());
    } else {
        let deadline = Instant::now() + Duration::from_secs(cli.timeout);
        let session = dial::dial(deadline, &target, &config, global_cache()).await?;
        print_session(session.info());
    }

    let metrics = global_cache().metrics();
    info!(
        "spec cache: {} hits, {} misses, {} evictions",
        metrics.hits, metrics.misses, metrics.evictions
    );

    Ok(())
}

fn print_session(info: &tlsmimic_core::SessionInfo) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  SNI:        {}", info.server_name);
    println!("  ALPN:       {}", info.alpn.as_deref().unwrap_or("(none)"));
    match info.tls_version {
        Some(v) => println!("  TLS ver:    0x{:04x}", v),
        None => println!("  TLS ver:    (not exposed)"),
    }
    match info.cipher_suite {
        Some(c) => println!("  Cipher:     0x{:04x}", c),
        None => println!("  Cipher:     (not exposed)"),
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
