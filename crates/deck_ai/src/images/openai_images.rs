//! OpenAI image transport: generation via `/v1/images/generations`, download
//! via a plain GET of the returned URL.
//!
//! Requests one image per call and relies on the response carrying a hosted
//! URL (the endpoint's default `url` response format).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Download, ImageError, ImageRequest, ImageTransport};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub struct OpenAiImageTransport {
    client: Client,
    base_url: String,
}

impl OpenAiImageTransport {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.into(), None)
    }

    /// Custom base URL (proxies, compatible gateways) and optional
    /// per-request timeout. Without a timeout the client default applies.
    pub fn with_base_url(base_url: String, timeout: Option<Duration>) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            client: builder.build().unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn generations_url(&self) -> String {
        format!("{}/images/generations", self.base_url)
    }
}

impl Default for OpenAiImageTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageTransport for OpenAiImageTransport {
    fn name(&self) -> &str {
        "OpenAI Images"
    }

    async fn generate(&self, api_key: &str, request: &ImageRequest) -> Result<String, ImageError> {
        let payload = GenerationPayload {
            model: &request.model,
            prompt: &request.prompt,
            n: request.count,
            size: &request.size,
        };

        debug!(
            model = request.model.as_str(),
            size = request.size.as_str(),
            "OpenAI image generation"
        );

        let resp = self
            .client
            .post(self.generations_url())
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ImageError::Generation(e.to_string()))?;

        parse_generation_response(resp).await
    }

    async fn download(&self, url: &str) -> Result<Download, ImageError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Ok(Download {
                status: status.as_u16(),
                bytes: Vec::new(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ImageError::Network(e.to_string()))?;

        Ok(Download {
            status: status.as_u16(),
            bytes: bytes.to_vec(),
        })
    }
}

/// First image URL out of a generation response.
async fn parse_generation_response(resp: reqwest::Response) -> Result<String, ImageError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ImageError::Generation(match status.as_u16() {
            401 => "invalid API key".into(),
            429 => "rate limited".into(),
            _ => format!("OpenAI images {status}: {body}"),
        }));
    }

    let parsed: GenerationResponse = resp
        .json()
        .await
        .map_err(|e| ImageError::Generation(format!("invalid response body: {e}")))?;

    let first = parsed
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ImageError::Generation("response contained no images".into()))?;

    if let Some(revised) = &first.revised_prompt {
        debug!(revised_prompt = revised.as_str(), "Provider revised the prompt");
    }

    first
        .url
        .ok_or_else(|| ImageError::Generation("response contained no image URL".into()))
}

// ---------------------------------------------------------------------------
// API payload
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerationPayload<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> reqwest::Response {
        let resp = http::Response::builder()
            .status(status)
            .body(body.to_string())
            .unwrap();
        reqwest::Response::from(resp)
    }

    #[test]
    fn transport_metadata() {
        let t = OpenAiImageTransport::new();
        assert_eq!(t.name(), "OpenAI Images");
        assert_eq!(t.generations_url(), "https://api.openai.com/v1/images/generations");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let t = OpenAiImageTransport::with_base_url(
            "http://localhost:8080/v1/".into(),
            Some(Duration::from_secs(5)),
        );
        assert_eq!(t.generations_url(), "http://localhost:8080/v1/images/generations");
    }

    #[test]
    fn payload_serialization() {
        let req = ImageRequest::new("a red fox");
        let payload = GenerationPayload {
            model: &req.model,
            prompt: &req.prompt,
            n: req.count,
            size: &req.size,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["model"], "dall-e-3");
        assert_eq!(json["prompt"], "a red fox");
        assert_eq!(json["n"], 1);
        assert_eq!(json["size"], "1024x1024");
    }

    #[tokio::test]
    async fn parses_first_url() {
        let body = r#"{"created": 1700000000, "data": [
            {"url": "https://images.example/1.png", "revised_prompt": "a red fox, oil painting"},
            {"url": "https://images.example/2.png"}
        ]}"#;
        let url = parse_generation_response(response(200, body)).await.unwrap();
        assert_eq!(url, "https://images.example/1.png");
    }

    #[tokio::test]
    async fn empty_data_is_generation_error() {
        let err = parse_generation_response(response(200, r#"{"data": []}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Generation(_)));
    }

    #[tokio::test]
    async fn missing_url_is_generation_error() {
        let err = parse_generation_response(response(200, r#"{"data": [{"b64_json": "AAAA"}]}"#))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no image URL"));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_invalid_key() {
        let err = parse_generation_response(response(401, r#"{"error": {}}"#))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate image: invalid API key");
    }

    #[tokio::test]
    async fn server_error_keeps_body() {
        let err = parse_generation_response(response(500, "upstream exploded"))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("500"), "unexpected: {msg}");
        assert!(msg.contains("upstream exploded"), "unexpected: {msg}");
    }

    #[tokio::test]
    async fn malformed_json_is_generation_error() {
        let err = parse_generation_response(response(200, "<html>"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Generation(_)));
    }
}
