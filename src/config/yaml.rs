use serde::Deserialize;
use std::path::PathBuf;

use crate::core::interview::InterviewPhrases;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   public_base_url: "https://gw.example.com"
///   tls:
///     cert_path: "/etc/gw/cert.pem"
///     key_path: "/etc/gw/key.pem"
///
/// realtime:
///   provider: "openai"            # or "azure"
///   openai_api_key: "sk-..."
///   openai_model: "gpt-4o-realtime-preview"
///   azure_api_key: "..."
///   azure_endpoint: "my-resource.openai.azure.com"
///   azure_deployment: "gpt-4o-realtime"
///   azure_api_version: "2024-10-01-preview"
///   voice: "alloy"
///   setup_timeout_ms: 15000
///
/// interviews:
///   path: "/etc/gw/interviews.yaml"
///
/// telephony:
///   mode: "stream"                # or "gather"
///   language: "fi-FI"
///   voice: "alice"
///   gather_timeout_seconds: 5
///   speech_timeout_seconds: 3
///
/// phrases:
///   opening: "Hei! Aloitetaan {title} haastattelu."
///   acknowledgment: "Kiitos vastauksesta."
///   closing: "Kiitos kaikista vastauksista! Haastattelu on valmis."
///
/// security:
///   cors_allowed_origins: "https://example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
///   max_websocket_connections: 1000
///   max_connections_per_ip: 100
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub interviews: Option<InterviewsYaml>,
    pub telephony: Option<TelephonyYaml>,
    /// Missing phrases keep their defaults
    pub phrases: Option<InterviewPhrases>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_base_url: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Realtime provider configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_url: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_deployment: Option<String>,
    pub azure_api_version: Option<String>,
    pub voice: Option<String>,
    pub setup_timeout_ms: Option<u64>,
}

/// Interview source from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct InterviewsYaml {
    pub path: Option<String>,
}

/// Telephony webhook configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TelephonyYaml {
    /// "stream" or "gather"
    pub mode: Option<String>,
    pub language: Option<String>,
    pub voice: Option<String>,
    pub gather_timeout_seconds: Option<u32>,
    pub speech_timeout_seconds: Option<u32>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
    /// Maximum concurrent WebSocket connections
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
