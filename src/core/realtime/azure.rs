//! Azure OpenAI realtime backend.
//!
//! Same event contract as OpenAI; the deployment and API version travel in the
//! query string and the key in an `api-key` header.

use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use zeroize::Zeroizing;

use super::base::{RealtimeBackend, RealtimeError, RealtimeResult};
use super::config::AZURE_REALTIME_API_VERSION;

pub struct AzureRealtimeBackend {
    api_key: Zeroizing<String>,
    host: String,
    deployment: String,
    api_version: String,
}

impl AzureRealtimeBackend {
    /// `endpoint` may be a bare host or a full `https://host/` URL.
    pub fn new(
        api_key: Zeroizing<String>,
        endpoint: &str,
        deployment: &str,
        api_version: Option<&str>,
    ) -> RealtimeResult<Self> {
        if api_key.trim().is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "Azure OpenAI API key is required".to_string(),
            ));
        }

        let host = normalize_host(endpoint);
        if host.is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "Azure OpenAI endpoint is required".to_string(),
            ));
        }
        if deployment.trim().is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "Azure OpenAI deployment is required".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            host,
            deployment: deployment.trim().to_string(),
            api_version: api_version
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(AZURE_REALTIME_API_VERSION)
                .to_string(),
        })
    }
}

fn normalize_host(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

impl RealtimeBackend for AzureRealtimeBackend {
    fn name(&self) -> &'static str {
        "azure"
    }

    fn endpoint_url(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("api-version", &self.api_version)
            .append_pair("deployment", &self.deployment)
            .finish();
        format!("wss://{}/openai/realtime?{}", self.host, query)
    }

    fn build_request(&self) -> RealtimeResult<http::Request<()>> {
        let mut request = self
            .endpoint_url()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;

        request.headers_mut().insert(
            "api-key",
            self.api_key
                .as_str()
                .parse()
                .map_err(|_| RealtimeError::InvalidConfiguration("Invalid API key".to_string()))?,
        );

        Ok(request)
    }
}
