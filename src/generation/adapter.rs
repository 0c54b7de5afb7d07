use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::KioskError;
use crate::models::{CapturedFrame, Concept, GeneratedImage};

use super::prompt::build_prompt;

/// Environment variable carrying the generation service credential.
pub const CREDENTIAL_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent";

/// Port for the generative image service, so the session controller can be
/// driven with a fake in tests.
#[async_trait]
pub trait Generator: Send + Sync {
    /// One paid, rate-limited call. No retry in here; retrying is the
    /// orchestrator's decision because it must stay bounded and visible.
    async fn generate(
        &self,
        frame: &CapturedFrame,
        concept: &Concept,
        aspect_ratio: &str,
    ) -> Result<GeneratedImage, KioskError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    image_config: ImageConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// HTTP adapter for the generative image service.
///
/// Side-effect-free beyond the network call: it never touches the gallery or
/// the kiosk settings.
pub struct GenerationClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GenerationClient {
    /// Read the credential from the environment. A missing credential is a
    /// configuration defect with no guest-facing recovery; every call fails
    /// fast with `MissingCredential` until it is set.
    pub fn from_env() -> Self {
        let api_key = std::env::var(CREDENTIAL_ENV)
            .ok()
            .filter(|key| !key.is_empty());
        Self {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Generator for GenerationClient {
    async fn generate(
        &self,
        frame: &CapturedFrame,
        concept: &Concept,
        aspect_ratio: &str,
    ) -> Result<GeneratedImage, KioskError> {
        let api_key = self.api_key.as_deref().ok_or(KioskError::MissingCredential)?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: CapturedFrame::MIME.to_string(),
                            data: BASE64.encode(&frame.jpeg),
                        }),
                        text: None,
                    },
                    Part {
                        text: Some(build_prompt(&concept.prompt, aspect_ratio)),
                        inline_data: None,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: ImageConfig {
                    aspect_ratio: aspect_ratio.to_string(),
                },
            },
        };

        info!("requesting generation for concept '{}'", concept.name);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| KioskError::ServiceUnreachable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KioskError::ServiceUnreachable(format!(
                "generation service returned {status}"
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| KioskError::ServiceUnreachable(err.to_string()))?;

        first_image_candidate(body)
    }
}

/// The service answers with ordered candidates; take the first part carrying
/// image data and ignore text-only candidates. No image anywhere is its own
/// failure kind, distinct from transport trouble.
fn first_image_candidate(response: GenerateResponse) -> Result<GeneratedImage, KioskError> {
    for candidate in response.candidates {
        let Some(content) = candidate.content else {
            continue;
        };
        for part in content.parts {
            if let Some(inline) = part.inline_data {
                let bytes = BASE64
                    .decode(inline.data.as_bytes())
                    .map_err(|_| KioskError::NoImageReturned)?;
                return Ok(GeneratedImage {
                    bytes,
                    mime_type: inline.mime_type,
                });
            }
        }
    }
    Err(KioskError::NoImageReturned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> CapturedFrame {
        CapturedFrame {
            jpeg: vec![1, 2, 3],
            width: 1080,
            height: 1920,
        }
    }

    fn concept() -> Concept {
        Concept {
            id: "c1".into(),
            name: "cyberpunk portrait".into(),
            prompt: "cyberpunk portrait".into(),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn missing_credential_fails_fast() {
        let client = GenerationClient {
            http: reqwest::Client::new(),
            endpoint: "http://unused.invalid".into(),
            api_key: None,
        };
        let err = client
            .generate(&frame(), &concept(), "9:16")
            .await
            .unwrap_err();
        assert_eq!(err, KioskError::MissingCredential);
    }

    #[test]
    fn picks_first_image_bearing_candidate() {
        let body = serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": "here is your picture" } ] } },
                { "content": { "parts": [
                    { "text": "style notes" },
                    { "inlineData": { "mimeType": "image/png", "data": BASE64.encode([7u8, 8, 9]) } },
                    { "inlineData": { "mimeType": "image/png", "data": BASE64.encode([0u8]) } }
                ] } }
            ]
        });
        let response: GenerateResponse = serde_json::from_value(body).unwrap();
        let image = first_image_candidate(response).unwrap();
        assert_eq!(image.bytes, vec![7, 8, 9]);
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn zero_candidates_is_no_image_returned() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(
            first_image_candidate(response).unwrap_err(),
            KioskError::NoImageReturned
        );
    }

    #[test]
    fn text_only_candidates_are_no_image_returned() {
        let body = serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": "sorry" } ] } },
                { "content": null }
            ]
        });
        let response: GenerateResponse = serde_json::from_value(body).unwrap();
        assert_eq!(
            first_image_candidate(response).unwrap_err(),
            KioskError::NoImageReturned
        );
    }
}
