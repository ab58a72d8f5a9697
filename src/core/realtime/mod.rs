//! Upstream realtime speech model.
//!
//! # Supported Providers
//!
//! - **OpenAI Realtime API** - `wss://api.openai.com/v1/realtime`
//! - **Azure OpenAI** - realtime deployments on an Azure resource
//!
//! Both speak the same event contract (see [`messages`]); only the handshake
//! differs, captured by [`RealtimeBackend`].
//!
//! # Example
//!
//! ```rust,ignore
//! use interview_gateway::core::realtime::{RealtimeProviderConfig, UpstreamConnector, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new(config);
//! let mut link = connector.connect().await?;
//! link.sender.send(ClientEvent::ResponseCreate).await?;
//! ```

mod azure;
mod base;
mod config;
mod connector;
pub mod messages;
mod openai;

pub use azure::AzureRealtimeBackend;
pub use base::{
    RealtimeBackend, RealtimeError, RealtimeResult, UpstreamConnector, UpstreamFrame,
    UpstreamLink,
};
pub use config::{
    AZURE_REALTIME_API_VERSION, OPENAI_REALTIME_URL, OpenAIRealtimeModel, RealtimeAudioFormat,
    RealtimeProviderConfig, RealtimeVoice,
};
pub use connector::{DEFAULT_CONNECT_TIMEOUT, WebSocketConnector};
pub use messages::{ClientEvent, ServerEvent};
pub use openai::OpenAIRealtimeBackend;

use zeroize::Zeroizing;

/// Supported realtime providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeProvider {
    /// OpenAI Realtime API
    OpenAI,
    /// Azure OpenAI realtime deployment
    Azure,
}

impl RealtimeProvider {
    /// Parse provider from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(RealtimeProvider::OpenAI),
            "azure" | "azure_openai" | "azure-openai" => Some(RealtimeProvider::Azure),
            _ => None,
        }
    }
}

impl std::fmt::Display for RealtimeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RealtimeProvider::OpenAI => write!(f, "openai"),
            RealtimeProvider::Azure => write!(f, "azure"),
        }
    }
}

/// Build the backend named by `config.provider`.
///
/// Fails with [`RealtimeError::InvalidConfiguration`] when the provider is
/// unknown or its credentials are missing.
pub fn create_realtime_backend(
    config: &RealtimeProviderConfig,
) -> RealtimeResult<Box<dyn RealtimeBackend>> {
    let provider = RealtimeProvider::parse(&config.provider).ok_or_else(|| {
        RealtimeError::InvalidConfiguration(format!(
            "Unsupported realtime provider: {}. Supported providers: {}",
            config.provider,
            get_supported_realtime_providers().join(", ")
        ))
    })?;

    match provider {
        RealtimeProvider::OpenAI => {
            let key = config.openai_api_key.clone().ok_or_else(|| {
                RealtimeError::InvalidConfiguration("OpenAI API key is required".to_string())
            })?;
            let mut backend = OpenAIRealtimeBackend::new(key, config.openai_model)?;
            if let Some(base_url) = &config.openai_base_url {
                backend = backend.with_base_url(base_url.clone());
            }
            Ok(Box::new(backend))
        }
        RealtimeProvider::Azure => {
            let key = config.azure_api_key.clone().unwrap_or_else(|| Zeroizing::new(String::new()));
            let backend = AzureRealtimeBackend::new(
                key,
                config.azure_endpoint.as_deref().unwrap_or_default(),
                config.azure_deployment.as_deref().unwrap_or_default(),
                config.azure_api_version.as_deref(),
            )?;
            Ok(Box::new(backend))
        }
    }
}

/// Get list of supported realtime providers.
pub fn get_supported_realtime_providers() -> Vec<&'static str> {
    vec!["openai", "azure"]
}
