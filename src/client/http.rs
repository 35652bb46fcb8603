use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::Client;
use reqwest::header::{
    ACCEPT_CHARSET, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};
use std::time::Duration;
use tracing::{error, info};

use crate::client::ErrorBody;
use crate::config::ClientConfig;
use crate::error::{Result, StreamError};
use crate::models::ChatRequest;
use crate::transport::{ChunkStream, OpenFuture, Transport};

/// Streams completions from the chat backend over a chunked HTTP POST
pub struct HttpTransport {
    client: Client,
    url: String,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        // No overall timeout: a stream may legitimately stay open for a long time
        let mut builder = Client::builder();
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            StreamError::ConfigError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            url: config.completion_url(),
            headers: build_headers(&config)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    async fn open_impl(
        client: Client,
        url: String,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<ChunkStream> {
        info!(bytes = body.len(), %url, "Sending completion request");

        let response = client
            .post(&url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Completion request failed");
                e
            })?;

        let status = response.status();
        info!(%status, "Completion endpoint responded");

        if !status.is_success() {
            let message = ErrorBody::read(response).await.message();
            error!(%status, %message, "Completion endpoint returned an error");
            return Err(StreamError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Box::pin(response.bytes_stream().map_err(StreamError::from)))
    }
}

impl Transport for HttpTransport {
    fn open(&self, request: &ChatRequest) -> OpenFuture {
        let client = self.client.clone();
        let url = self.url.clone();
        let headers = self.headers.clone();
        let body = serde_json::to_vec(request).map(Bytes::from);

        Box::pin(async move { Self::open_impl(client, url, headers, body?).await })
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn build_headers(config: &ClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = &config.auth_token {
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
    }

    // HeaderName lowercases, so these replace defaults regardless of case
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            StreamError::ConfigError(format!("Invalid header name {}: {}", name, e))
        })?;
        headers.insert(name, header_value(value)?);
    }

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| StreamError::ConfigError(format!("Invalid header value: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let transport = HttpTransport::new(ClientConfig::default()).unwrap();
        let headers = transport.headers();

        assert_eq!(headers.get(ACCEPT_CHARSET).unwrap(), "utf-8");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_auth_and_override_headers() {
        let mut config = ClientConfig {
            auth_token: Some("abc".to_string()),
            ..Default::default()
        };
        config
            .headers
            .insert("Content-Type".to_string(), "application/json; charset=utf-8".to_string());
        config.headers.insert("X-Tenant".to_string(), "acme".to_string());

        let transport = HttpTransport::new(config).unwrap();
        let headers = transport.headers();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "application/json; charset=utf-8"
        );
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(headers.get("x-tenant").unwrap(), "acme");
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let mut config = ClientConfig::default();
        config.headers.insert("bad header".to_string(), "x".to_string());
        assert!(HttpTransport::new(config).is_err());
    }

    #[test]
    fn test_url_joins_path() {
        let config = ClientConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..Default::default()
        };
        let transport = HttpTransport::new(config).unwrap();
        assert_eq!(
            transport.url(),
            "http://localhost:9000/api/rag/conversation/completion"
        );
    }
}
