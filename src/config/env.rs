//! Environment variable loading.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ServerConfig, TlsConfig};
use crate::core::telephony::TelephonyMode;

/// Every environment variable the configuration reads.
pub(crate) const ALL_KEYS: &[&str] = &[
    "HOST",
    "PORT",
    "PUBLIC_BASE_URL",
    "TLS_CERT_PATH",
    "TLS_KEY_PATH",
    "REALTIME_PROVIDER",
    "OPENAI_API_KEY",
    "OPENAI_REALTIME_MODEL",
    "OPENAI_REALTIME_URL",
    "AZURE_OPENAI_API_KEY",
    "AZURE_OPENAI_ENDPOINT",
    "AZURE_OPENAI_DEPLOYMENT",
    "AZURE_OPENAI_API_VERSION",
    "REALTIME_VOICE",
    "SETUP_TIMEOUT_MS",
    "INTERVIEWS_PATH",
    "TELEPHONY_MODE",
    "TELEPHONY_LANGUAGE",
    "TELEPHONY_VOICE",
    "GATHER_TIMEOUT_SECONDS",
    "SPEECH_TIMEOUT_SECONDS",
    "CORS_ALLOWED_ORIGINS",
    "RATE_LIMIT_REQUESTS_PER_SECOND",
    "RATE_LIMIT_BURST_SIZE",
    "MAX_WEBSOCKET_CONNECTIONS",
    "MAX_CONNECTIONS_PER_IP",
];

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to defaults. The `.env` file, if any, must
    /// already have been loaded into the environment (main.rs does this).
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = super::merge::merge_config(None)?;
        super::validation::validate_config(&config)?;
        Ok(config)
    }
}

/// Read a variable, treating empty values as unset.
pub(crate) fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable into `T`, reporting the key on failure.
pub(crate) fn parse_var<T>(key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {key} value '{raw}': {e}")),
        None => Ok(None),
    }
}

/// Configuration from environment variables over defaults.
pub(crate) fn load_env_config() -> Result<ServerConfig, String> {
    let mut config = ServerConfig::default();

    if let Some(host) = var("HOST") {
        config.host = host;
    }
    if let Some(port) = parse_var::<u16>("PORT")? {
        config.port = port;
    }
    config.public_base_url = var("PUBLIC_BASE_URL");

    config.tls = match (var("TLS_CERT_PATH"), var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => {
            return Err(
                "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
            );
        }
    };

    if let Some(provider) = var("REALTIME_PROVIDER") {
        config.realtime_provider = provider;
    }
    config.openai_api_key = var("OPENAI_API_KEY");
    if let Some(model) = var("OPENAI_REALTIME_MODEL") {
        config.openai_realtime_model = model;
    }
    config.openai_realtime_url = var("OPENAI_REALTIME_URL");
    config.azure_openai_api_key = var("AZURE_OPENAI_API_KEY");
    config.azure_openai_endpoint = var("AZURE_OPENAI_ENDPOINT");
    config.azure_openai_deployment = var("AZURE_OPENAI_DEPLOYMENT");
    config.azure_openai_api_version = var("AZURE_OPENAI_API_VERSION");
    if let Some(voice) = var("REALTIME_VOICE") {
        config.realtime_voice = voice;
    }
    if let Some(timeout) = parse_var::<u64>("SETUP_TIMEOUT_MS")? {
        config.setup_timeout_ms = timeout;
    }

    config.interviews_path = var("INTERVIEWS_PATH").map(PathBuf::from);

    if let Some(mode) = var("TELEPHONY_MODE") {
        config.telephony_mode = TelephonyMode::parse(&mode)
            .ok_or_else(|| format!("Invalid TELEPHONY_MODE value '{mode}': expected stream or gather"))?;
    }
    if let Some(language) = var("TELEPHONY_LANGUAGE") {
        config.telephony_language = language;
    }
    if let Some(voice) = var("TELEPHONY_VOICE") {
        config.telephony_voice = voice;
    }
    if let Some(secs) = parse_var::<u32>("GATHER_TIMEOUT_SECONDS")? {
        config.gather_timeout_seconds = secs;
    }
    if let Some(secs) = parse_var::<u32>("SPEECH_TIMEOUT_SECONDS")? {
        config.speech_timeout_seconds = secs;
    }

    config.cors_allowed_origins = var("CORS_ALLOWED_ORIGINS");
    if let Some(rps) = parse_var::<u32>("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = parse_var::<u32>("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }
    config.max_websocket_connections = parse_var::<usize>("MAX_WEBSOCKET_CONNECTIONS")?;
    if let Some(per_ip) = parse_var::<u32>("MAX_CONNECTIONS_PER_IP")? {
        config.max_connections_per_ip = per_ip;
    }

    Ok(config)
}
