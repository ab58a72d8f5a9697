//! Merging YAML values over the environment configuration.

use std::path::PathBuf;

use super::env::load_env_config;
use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig};
use crate::core::telephony::TelephonyMode;

/// Environment configuration with YAML overrides applied.
///
/// Only values present in the YAML replace the environment's.
pub(crate) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_env_config()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if server.public_base_url.is_some() {
            config.public_base_url = server.public_base_url;
        }
        if let Some(tls) = server.tls
            && tls.enabled.unwrap_or(true)
        {
            match (tls.cert_path, tls.key_path) {
                (Some(cert), Some(key)) => {
                    config.tls = Some(TlsConfig {
                        cert_path: PathBuf::from(cert),
                        key_path: PathBuf::from(key),
                    });
                }
                (None, None) => {}
                _ => return Err("server.tls requires both cert_path and key_path".into()),
            }
        }
    }

    if let Some(realtime) = yaml.realtime {
        if let Some(provider) = realtime.provider {
            config.realtime_provider = provider;
        }
        if realtime.openai_api_key.is_some() {
            config.openai_api_key = realtime.openai_api_key;
        }
        if let Some(model) = realtime.openai_model {
            config.openai_realtime_model = model;
        }
        if realtime.openai_url.is_some() {
            config.openai_realtime_url = realtime.openai_url;
        }
        if realtime.azure_api_key.is_some() {
            config.azure_openai_api_key = realtime.azure_api_key;
        }
        if realtime.azure_endpoint.is_some() {
            config.azure_openai_endpoint = realtime.azure_endpoint;
        }
        if realtime.azure_deployment.is_some() {
            config.azure_openai_deployment = realtime.azure_deployment;
        }
        if realtime.azure_api_version.is_some() {
            config.azure_openai_api_version = realtime.azure_api_version;
        }
        if let Some(voice) = realtime.voice {
            config.realtime_voice = voice;
        }
        if let Some(timeout) = realtime.setup_timeout_ms {
            config.setup_timeout_ms = timeout;
        }
    }

    if let Some(path) = yaml.interviews.and_then(|i| i.path) {
        config.interviews_path = Some(PathBuf::from(path));
    }

    if let Some(telephony) = yaml.telephony {
        if let Some(mode) = telephony.mode {
            config.telephony_mode = TelephonyMode::parse(&mode).ok_or_else(|| {
                format!("Invalid telephony.mode '{mode}': expected stream or gather")
            })?;
        }
        if let Some(language) = telephony.language {
            config.telephony_language = language;
        }
        if let Some(voice) = telephony.voice {
            config.telephony_voice = voice;
        }
        if let Some(secs) = telephony.gather_timeout_seconds {
            config.gather_timeout_seconds = secs;
        }
        if let Some(secs) = telephony.speech_timeout_seconds {
            config.speech_timeout_seconds = secs;
        }
    }

    if let Some(phrases) = yaml.phrases {
        config.phrases = phrases;
    }

    if let Some(security) = yaml.security {
        if security.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = security.cors_allowed_origins;
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
        if security.max_websocket_connections.is_some() {
            config.max_websocket_connections = security.max_websocket_connections;
        }
        if let Some(per_ip) = security.max_connections_per_ip {
            config.max_connections_per_ip = per_ip;
        }
    }

    Ok(config)
}
