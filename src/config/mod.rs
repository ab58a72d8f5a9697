//! Configuration module for the interview gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use interview_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::core::interview::{InterviewPhrases, InterviewSettings};
use crate::core::realtime::{OpenAIRealtimeModel, RealtimeProviderConfig, RealtimeVoice};
use crate::core::telephony::{GatherOptions, SayOptions, TelephonyMode};

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway, including:
/// - Server settings (host, port, TLS, public URL)
/// - Realtime provider credentials (OpenAI or Azure OpenAI)
/// - Interview sources and spoken phrases
/// - Telephony webhook behaviour
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Externally reachable base URL (e.g. "https://gw.example.com"), used in
    /// TwiML callbacks and stream URLs. Derived from the request Host when unset.
    pub public_base_url: Option<String>,

    // Realtime provider settings
    /// "openai" or "azure"
    pub realtime_provider: String,
    /// OpenAI API key for the Realtime API
    pub openai_api_key: Option<String>,
    /// OpenAI realtime model
    pub openai_realtime_model: String,
    /// Override of the OpenAI realtime endpoint
    pub openai_realtime_url: Option<String>,
    /// Azure OpenAI API key
    pub azure_openai_api_key: Option<String>,
    /// Azure OpenAI resource endpoint (e.g. "my-resource.openai.azure.com")
    pub azure_openai_endpoint: Option<String>,
    /// Azure OpenAI realtime deployment name
    pub azure_openai_deployment: Option<String>,
    /// Azure OpenAI API version
    pub azure_openai_api_version: Option<String>,
    /// Agent voice
    pub realtime_voice: String,
    /// Bound on upstream connect plus configuration, in milliseconds
    pub setup_timeout_ms: u64,

    // Interview settings
    /// YAML file with the interview scripts
    pub interviews_path: Option<PathBuf>,
    /// Everything the agent says that is not a question
    pub phrases: InterviewPhrases,

    // Telephony settings
    /// Stream calls through the realtime relay or run the gather loop
    pub telephony_mode: TelephonyMode,
    /// Language of `<Say>` and speech recognition
    pub telephony_language: String,
    /// Telephony TTS voice for `<Say>`
    pub telephony_voice: String,
    /// Seconds a gather waits for the caller to start speaking
    pub gather_timeout_seconds: u32,
    /// Seconds of silence that end the caller's answer
    pub speech_timeout_seconds: u32,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    // Connection limits
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tls: None,
            public_base_url: None,
            realtime_provider: "openai".to_string(),
            openai_api_key: None,
            openai_realtime_model: OpenAIRealtimeModel::default().as_str().to_string(),
            openai_realtime_url: None,
            azure_openai_api_key: None,
            azure_openai_endpoint: None,
            azure_openai_deployment: None,
            azure_openai_api_version: None,
            realtime_voice: RealtimeVoice::default().as_str().to_string(),
            setup_timeout_ms: 15_000,
            interviews_path: None,
            phrases: InterviewPhrases::default(),
            telephony_mode: TelephonyMode::default(),
            telephony_language: "fi-FI".to_string(),
            telephony_voice: "alice".to_string(),
            gather_timeout_seconds: 5,
            speech_timeout_seconds: 3,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
/// This ensures sensitive data is cleared from memory immediately after use.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.azure_openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // Note: .env file is loaded in main.rs at application startup
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&config)?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Credentials and endpoint for the upstream realtime model.
    pub fn realtime_provider_config(&self) -> RealtimeProviderConfig {
        RealtimeProviderConfig {
            provider: self.realtime_provider.clone(),
            openai_api_key: self.openai_api_key.clone().map(Zeroizing::new),
            openai_model: OpenAIRealtimeModel::from_str_or_default(&self.openai_realtime_model),
            openai_base_url: self.openai_realtime_url.clone(),
            azure_api_key: self.azure_openai_api_key.clone().map(Zeroizing::new),
            azure_endpoint: self.azure_openai_endpoint.clone(),
            azure_deployment: self.azure_openai_deployment.clone(),
            azure_api_version: self.azure_openai_api_version.clone(),
        }
    }

    /// Agent voice and model parameters.
    pub fn interview_settings(&self) -> InterviewSettings {
        InterviewSettings::from(self)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_millis(self.setup_timeout_ms)
    }

    /// Voicing of `<Say>` in webhook responses.
    pub fn say_options(&self) -> SayOptions {
        SayOptions {
            voice: self.telephony_voice.clone(),
            language: self.telephony_language.clone(),
        }
    }

    /// Speech gather posting to `action`.
    pub fn gather_options(&self, action: impl Into<String>) -> GatherOptions {
        GatherOptions {
            action: action.into(),
            speech_timeout_secs: self.speech_timeout_seconds,
            timeout_secs: self.gather_timeout_seconds,
            language: self.telephony_language.clone(),
        }
    }

    /// Public base URL without a trailing slash.
    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }
}

impl From<&ServerConfig> for InterviewSettings {
    fn from(config: &ServerConfig) -> Self {
        InterviewSettings {
            voice: RealtimeVoice::from_str_or_default(&config.realtime_voice),
            ..InterviewSettings::default()
        }
    }
}
