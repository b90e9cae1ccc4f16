//! Stability AI REST client.
//!
//! Docs: https://platform.stability.ai/docs/api-reference

use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{Artifact, GenerationRequest, ImageGenerationClient, Sampler};
use crate::constants::REQUEST_TIMEOUT;
use crate::error::{CeramicsError, GenerationError};

/// Request body for POST /v1/generation/{engine_id}/text-to-image
#[derive(Serialize, Debug)]
struct TextToImageRequest<'a> {
    text_prompts: [TextPrompt<'a>; 1],
    cfg_scale: f32,
    height: u32,
    width: u32,
    samples: u32,
    steps: u32,
    seed: u32,
    sampler: Sampler,
}

#[derive(Serialize, Debug)]
struct TextPrompt<'a> {
    text: &'a str,
    weight: f32,
}

impl<'a> From<&'a GenerationRequest> for TextToImageRequest<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            text_prompts: [TextPrompt {
                text: &request.prompt,
                weight: 1.0,
            }],
            cfg_scale: request.cfg_scale,
            height: request.height,
            width: request.width,
            samples: request.samples,
            steps: request.steps,
            seed: request.seed,
            sampler: request.sampler,
        }
    }
}

#[derive(Deserialize, Debug)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<ResponseArtifact>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResponseArtifact {
    base64: String,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Error body the API returns alongside non-2xx statuses
#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the Stability AI v1 REST API.
#[derive(Clone, Debug)]
pub struct StabilityClient {
    http: reqwest::Client,
    api_key: String,
    api_host: Url,
    engine: String,
}

impl StabilityClient {
    /// Build a client for `engine` on `api_host` (eg `https://api.stability.ai`).
    pub fn new(api_key: &str, api_host: &str, engine: &str) -> Result<Self, CeramicsError> {
        let api_host = Url::parse(api_host)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| {
                CeramicsError::Connection(format!("Failed to initialize API client: {err}"))
            })?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            api_host,
            engine: engine.to_string(),
        })
    }

    /// The engine requests are sent to.
    pub fn engine(&self) -> &str {
        &self.engine
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_host.join(path)
    }

    /// Check the key against the account endpoint before starting a batch.
    pub async fn verify(&self) -> Result<(), CeramicsError> {
        let url = self.endpoint("v1/user/account")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| CeramicsError::Connection(format!("API test failed: {err}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED => Err(CeramicsError::Configuration(
                "Authentication failed. Please verify your API key is valid and you have an active subscription at platform.stability.ai".to_string(),
            )),
            StatusCode::FORBIDDEN => Err(CeramicsError::Configuration(
                "Permission denied. Please verify credits and subscription".to_string(),
            )),
            _ => Err(CeramicsError::Connection(format!(
                "API test failed with {status}: {}",
                error_message(&body)
            ))),
        }
    }

    async fn text_to_image(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<Artifact>, GenerationError> {
        let url = self
            .endpoint(&format!("v1/generation/{}/text-to-image", self.engine))
            .map_err(|err| GenerationError::Failed(format!("invalid endpoint: {err}")))?;
        let body = TextToImageRequest::from(request);

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerationError::Failed(format!("request failed: {err}")))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| GenerationError::Failed(format!("failed reading body: {err}")))?;

        if !status.is_success() {
            return Err(classify_failure(status, &String::from_utf8_lossy(&bytes)));
        }

        decode_artifacts(&bytes)
    }
}

impl ImageGenerationClient for StabilityClient {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Vec<Artifact>, GenerationError>> + Send {
        async move {
            debug!(
                "POST text-to-image engine={} {}x{} seed={}",
                self.engine, request.width, request.height, request.seed
            );
            self.text_to_image(request).await
        }
    }
}

/// Map a non-success HTTP status onto the generator's failure classes.
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    let message = format!("{status}: {}", error_message(body));
    match status {
        StatusCode::UNAUTHORIZED => GenerationError::Authentication(message),
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited(message),
        _ => GenerationError::Failed(message),
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            name: Some(name),
            message: Some(message),
        }) => format!("{name}: {message}"),
        Ok(ApiErrorBody {
            message: Some(message),
            ..
        }) => message,
        _ => body.trim().to_string(),
    }
}

/// Decode a successful response body into artifacts.
pub(crate) fn decode_artifacts(bytes: &[u8]) -> Result<Vec<Artifact>, GenerationError> {
    let parsed: TextToImageResponse = serde_json::from_slice(bytes)
        .map_err(|err| GenerationError::Failed(format!("failed to parse response: {err}")))?;

    let mut artifacts = Vec::with_capacity(parsed.artifacts.len());
    for artifact in parsed.artifacts {
        if artifact.finish_reason.as_deref() == Some("CONTENT_FILTERED") {
            warn!("Artifact was content filtered by the service");
        }
        let binary = general_purpose::STANDARD
            .decode(&artifact.base64)
            .map_err(|err| GenerationError::Failed(format!("failed to base64-decode image: {err}")))?;
        artifacts.push(Artifact {
            binary,
            seed: artifact.seed,
            finish_reason: artifact.finish_reason,
        });
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_failure_classes() {
        let auth = classify_failure(
            StatusCode::UNAUTHORIZED,
            r#"{"id":"x","name":"unauthorized","message":"missing key"}"#,
        );
        assert_eq!(
            auth,
            GenerationError::Authentication("401 Unauthorized: unauthorized: missing key".into())
        );
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            GenerationError::RateLimited(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, "{}"),
            GenerationError::Failed(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, "no credits"),
            GenerationError::Failed(_)
        ));
    }

    #[test]
    fn artifacts_are_decoded() {
        let encoded = general_purpose::STANDARD.encode(b"\x89PNG fake");
        let body = format!(
            r#"{{"artifacts":[{{"base64":"{encoded}","seed":42,"finishReason":"SUCCESS"}}]}}"#
        );
        let artifacts = decode_artifacts(body.as_bytes()).expect("decode");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].binary, b"\x89PNG fake");
        assert_eq!(artifacts[0].seed, Some(42));
        assert_eq!(artifacts[0].finish_reason.as_deref(), Some("SUCCESS"));
    }

    #[test]
    fn bad_base64_is_a_failure() {
        let body = r#"{"artifacts":[{"base64":"***"}]}"#;
        assert!(matches!(
            decode_artifacts(body.as_bytes()),
            Err(GenerationError::Failed(_))
        ));
    }

    #[test]
    fn request_body_matches_the_api() {
        let request = GenerationRequest {
            prompt: "a vessel".to_string(),
            seed: 7,
            steps: 50,
            cfg_scale: 7.5,
            width: 640,
            height: 640,
            samples: 1,
            sampler: Sampler::KDpmpp2m,
        };
        let value = serde_json::to_value(TextToImageRequest::from(&request)).expect("serialize");
        assert_eq!(value["text_prompts"][0]["text"], "a vessel");
        assert_eq!(value["sampler"], "K_DPMPP_2M");
        assert_eq!(value["seed"], 7);
        assert_eq!(value["width"], 640);
        assert_eq!(value["cfg_scale"], 7.5);
    }

    #[test]
    fn endpoints_join_onto_the_host() {
        let client = StabilityClient::new("sk-test", "https://api.stability.ai", "engine-x")
            .expect("client");
        assert_eq!(client.engine(), "engine-x");
        let url = client
            .endpoint("v1/generation/engine-x/text-to-image")
            .expect("join");
        assert_eq!(
            url.as_str(),
            "https://api.stability.ai/v1/generation/engine-x/text-to-image"
        );
        assert!(StabilityClient::new("sk-test", "not a url", "engine-x").is_err());
    }
}
