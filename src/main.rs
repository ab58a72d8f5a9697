use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use http::{HeaderValue, Method, header};
use tokio::net::TcpListener;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use interview_gateway::{ServerConfig, config::TlsConfig, routes, state::AppState};

/// Rates at or above this disable the governor entirely.
const RATE_LIMIT_DISABLED_AT: u32 = 100_000;

/// Interview Gateway - real-time voice interview server
#[derive(Parser, Debug)]
#[command(name = "interview-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before config loading so .env values are visible to it
    let _ = dotenvy::dotenv();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Upstream wss:// handshakes need a process-wide provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ServerConfig::from_file(&path).map_err(|e| anyhow!(e.to_string()))?
        }
        None => ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?,
    };

    let socket_addr: SocketAddr = config
        .address()
        .parse()
        .with_context(|| format!("Invalid server address '{}'", config.address()))?;
    let tls = config.tls.clone();
    info!(
        provider = %config.realtime_provider,
        telephony_mode = %config.telephony_mode,
        interviews = ?config.interviews_path,
        "Starting interview gateway on {socket_addr}"
    );

    let per_second = config.rate_limit_requests_per_second;
    let governor = if per_second < RATE_LIMIT_DISABLED_AT {
        let governor_config = GovernorConfigBuilder::default()
            .per_second(per_second as u64)
            .burst_size(config.rate_limit_burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("Failed to build rate limiter config"))?;
        Some(GovernorLayer::new(governor_config))
    } else {
        info!("Rate limiting disabled (rate >= {RATE_LIMIT_DISABLED_AT}/s)");
        None
    };
    let cors = cors_layer(config.cors_allowed_origins.as_deref());

    let state = AppState::new(config)
        .await
        .map_err(|e| anyhow!("Failed to initialize state: {e}"))?;

    let app = with_security_headers(
        routes::create_app(state)
            .layer(cors)
            .layer(tower::util::option_layer(governor)),
    );

    match tls {
        Some(tls) => serve_tls(app, socket_addr, &tls).await,
        None => {
            info!("Server listening on http://{socket_addr}");
            let listener = TcpListener::bind(socket_addr).await?;
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;
            Ok(())
        }
    }
}

/// CORS for the browser relay page and webhook probes.
///
/// `"*"` allows any origin without credentials; a comma-separated list allows
/// those origins with credentials; unset means same-origin only.
fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    match origins {
        Some("*") => base.allow_origin(Any).allow_credentials(false),
        Some(list) => {
            let origins: Vec<HeaderValue> = list
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            base.allow_origin(origins).allow_credentials(true)
        }
        None => {
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            base.allow_credentials(false)
        }
    }
}

fn with_security_headers(app: Router) -> Router {
    app.layer(SetResponseHeaderLayer::overriding(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    ))
    .layer(SetResponseHeaderLayer::overriding(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("DENY"),
    ))
}

async fn serve_tls(app: Router, socket_addr: SocketAddr, tls: &TlsConfig) -> anyhow::Result<()> {
    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .with_context(|| {
            format!(
                "Failed to load TLS certificates from {} and {}",
                tls.cert_path.display(),
                tls.key_path.display()
            )
        })?;

    info!("Server listening on https://{socket_addr} (TLS enabled)");
    axum_server::bind_rustls(socket_addr, rustls_config)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("TLS server error")?;
    Ok(())
}
