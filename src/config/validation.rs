//! Configuration validation logic.

use super::ServerConfig;
use crate::core::realtime::{RealtimeProvider, get_supported_realtime_providers};

/// Validate a merged configuration.
///
/// Missing provider credentials are not an error here: the gateway still serves
/// the webhook loop without them, and relay sessions report the problem.
pub(crate) fn validate_config(config: &ServerConfig) -> Result<(), String> {
    validate_realtime_provider(config)?;
    validate_public_base_url(config.public_base_url.as_deref())?;
    validate_tls(config)?;
    validate_limits(config)?;
    Ok(())
}

fn validate_realtime_provider(config: &ServerConfig) -> Result<(), String> {
    let provider = RealtimeProvider::parse(&config.realtime_provider).ok_or_else(|| {
        format!(
            "Unsupported realtime provider: {}. Supported providers: {}",
            config.realtime_provider,
            get_supported_realtime_providers().join(", ")
        )
    })?;

    if provider == RealtimeProvider::Azure && config.azure_openai_api_key.is_some() {
        if config.azure_openai_endpoint.is_none() {
            return Err("AZURE_OPENAI_ENDPOINT is required for the azure provider".to_string());
        }
        if config.azure_openai_deployment.is_none() {
            return Err("AZURE_OPENAI_DEPLOYMENT is required for the azure provider".to_string());
        }
    }
    Ok(())
}

fn validate_public_base_url(url: Option<&str>) -> Result<(), String> {
    let Some(raw) = url else {
        return Ok(());
    };
    let parsed =
        url::Url::parse(raw).map_err(|e| format!("Invalid PUBLIC_BASE_URL '{raw}': {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "Invalid PUBLIC_BASE_URL '{raw}': scheme must be http or https, got {other}"
        )),
    }
}

fn validate_tls(config: &ServerConfig) -> Result<(), String> {
    if let Some(tls) = &config.tls {
        if !tls.cert_path.exists() {
            return Err(format!(
                "TLS certificate file not found: {}",
                tls.cert_path.display()
            ));
        }
        if !tls.key_path.exists() {
            return Err(format!("TLS key file not found: {}", tls.key_path.display()));
        }
    }
    Ok(())
}

fn validate_limits(config: &ServerConfig) -> Result<(), String> {
    if config.rate_limit_requests_per_second == 0 {
        return Err("RATE_LIMIT_REQUESTS_PER_SECOND must be greater than 0".to_string());
    }
    if config.rate_limit_burst_size == 0 {
        return Err("RATE_LIMIT_BURST_SIZE must be greater than 0".to_string());
    }
    if config.max_connections_per_ip == 0 {
        return Err("MAX_CONNECTIONS_PER_IP must be greater than 0".to_string());
    }
    if config.setup_timeout_ms == 0 {
        return Err("SETUP_TIMEOUT_MS must be greater than 0".to_string());
    }
    if config.gather_timeout_seconds == 0 {
        return Err("GATHER_TIMEOUT_SECONDS must be greater than 0".to_string());
    }
    Ok(())
}
