//! OpenAI Realtime backend.

use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use zeroize::Zeroizing;

use super::base::{RealtimeBackend, RealtimeError, RealtimeResult};
use super::config::{OPENAI_REALTIME_URL, OpenAIRealtimeModel};

/// Handshake for `wss://api.openai.com/v1/realtime?model=...`.
pub struct OpenAIRealtimeBackend {
    api_key: Zeroizing<String>,
    model: OpenAIRealtimeModel,
    base_url: String,
}

impl OpenAIRealtimeBackend {
    pub fn new(api_key: Zeroizing<String>, model: OpenAIRealtimeModel) -> RealtimeResult<Self> {
        if api_key.trim().is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "OpenAI API key is required".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            model,
            base_url: OPENAI_REALTIME_URL.to_string(),
        })
    }

    /// Point the backend at a different endpoint (used against local mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl RealtimeBackend for OpenAIRealtimeBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn endpoint_url(&self) -> String {
        format!("{}?model={}", self.base_url, self.model.as_str())
    }

    fn build_request(&self) -> RealtimeResult<http::Request<()>> {
        let mut request = self
            .endpoint_url()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;

        let auth = format!("Bearer {}", self.api_key.as_str());
        let headers = request.headers_mut();
        headers.insert(
            http::header::AUTHORIZATION,
            auth.parse()
                .map_err(|_| RealtimeError::InvalidConfiguration("Invalid API key".to_string()))?,
        );
        headers.insert("openai-beta", http::HeaderValue::from_static("realtime=v1"));

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers() {
        let backend = OpenAIRealtimeBackend::new(
            Zeroizing::new("sk-test".to_string()),
            OpenAIRealtimeModel::Gpt4oRealtimePreview,
        )
        .unwrap();

        let request = backend.build_request().unwrap();
        assert_eq!(
            request.uri().to_string(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview"
        );
        assert_eq!(request.headers()["authorization"], "Bearer sk-test");
        assert_eq!(request.headers()["openai-beta"], "realtime=v1");
        assert!(request.headers().contains_key("sec-websocket-key"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let result =
            OpenAIRealtimeBackend::new(Zeroizing::new("  ".to_string()), Default::default());
        assert!(matches!(result, Err(RealtimeError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_base_url_override() {
        let backend = OpenAIRealtimeBackend::new(
            Zeroizing::new("sk-test".to_string()),
            OpenAIRealtimeModel::Gpt4oMiniRealtimePreview,
        )
        .unwrap()
        .with_base_url("ws://127.0.0.1:9000/v1/realtime");

        assert_eq!(
            backend.endpoint_url(),
            "ws://127.0.0.1:9000/v1/realtime?model=gpt-4o-mini-realtime-preview"
        );
        assert_eq!(backend.name(), "openai");
    }
}
