//! Image-generation relay
//!
//! Forwards a prompt to the Hugging Face Inference API for one of a fixed set of
//! text-to-image models, turns the returned image into an inline PNG data URI and
//! keeps a timestamped copy on disk.

use crate::config::ImageRelayConfig;
use crate::core;
use crate::error::RelayError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const SERVICE: &str = "Hugging Face";
const NUM_INFERENCE_STEPS: u32 = 20;
const GUIDANCE_SCALE: f64 = 7.5;
const DEFAULT_LOADING_WAIT_SECS: f64 = 30.0;
const ERROR_EXCERPT_CHARS: usize = 100;

/// A text-to-image model known to work with the inference API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageModel {
    pub name: &'static str,
    pub id: &'static str,
}

/// The fixed model catalog; request indices select into this table.
pub static IMAGE_MODELS: [ImageModel; 3] = [
    ImageModel {
        name: "Stable Diffusion XL",
        id: "stabilityai/stable-diffusion-xl-base-1.0",
    },
    ImageModel {
        name: "OpenJourney V4",
        id: "prompthero/openjourney-v4",
    },
    ImageModel {
        name: "DreamShaper",
        id: "lykon/dreamshaper-8",
    },
];

impl ImageModel {
    /// Looks up a catalog entry, rejecting negative or out-of-range indices.
    pub fn by_index(index: i64) -> Result<&'static ImageModel, RelayError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| IMAGE_MODELS.get(i))
            .ok_or(RelayError::InvalidModelSelection {
                index,
                available: IMAGE_MODELS.len(),
            })
    }
}

/// Catalog entry as exposed to the UI.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ModelInfo {
    pub name: String,
    pub id: String,
    pub value: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct GenerationRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model_index: i64,
}

/// Outcome of a generation request in the shape the web client consumes.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct GenerationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl GenerationResult {
    #[must_use]
    pub fn succeeded(image: &GeneratedImage) -> Self {
        Self {
            success: true,
            image_data: Some(image.data_uri.clone()),
            message: Some(format!("Generated in {:.1}s", image.elapsed.as_secs_f64())),
            error: None,
            timestamp: Some(core::timestamp()),
        }
    }

    #[must_use]
    pub fn failed(err: &RelayError) -> Self {
        Self {
            success: false,
            image_data: None,
            message: None,
            error: Some(err.to_string()),
            timestamp: Some(core::timestamp()),
        }
    }
}

/// A successfully generated image.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// `data:image/png;base64,...`
    pub data_uri: String,
    pub saved_path: PathBuf,
    pub model: &'static ImageModel,
    /// Time spent waiting on the upstream.
    pub elapsed: Duration,
}

#[derive(Serialize)]
struct InferencePayload<'a> {
    inputs: &'a str,
    options: InferenceOptions,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
    use_cache: bool,
}

#[derive(Serialize)]
struct InferenceParameters {
    num_inference_steps: u32,
    guidance_scale: f64,
}

impl<'a> InferencePayload<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            inputs: prompt,
            options: InferenceOptions {
                wait_for_model: true,
                use_cache: true,
            },
            parameters: InferenceParameters {
                num_inference_steps: NUM_INFERENCE_STEPS,
                guidance_scale: GUIDANCE_SCALE,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageRelay {
    client: reqwest::Client,
    config: ImageRelayConfig,
}

impl ImageRelay {
    #[must_use]
    pub fn new(config: ImageRelayConfig) -> Self {
        Self {
            client: core::http_client(),
            config,
        }
    }

    #[must_use]
    pub fn models(&self) -> Vec<ModelInfo> {
        IMAGE_MODELS
            .iter()
            .enumerate()
            .map(|(value, model)| ModelInfo {
                name: model.name.to_string(),
                id: model.id.to_string(),
                value,
            })
            .collect()
    }

    /// Generates an image and reports the outcome without ever failing.
    pub async fn generate(
        &self,
        prompt: &str,
        model_index: i64,
    ) -> GenerationResult {
        match self.try_generate(prompt, model_index).await {
            Ok(image) => GenerationResult::succeeded(&image),
            Err(e) => {
                tracing::warn!("Image generation failed: {e}");
                GenerationResult::failed(&e)
            }
        }
    }

    /// Generates an image with the model at `model_index`.
    ///
    /// Input is validated before anything goes over the wire. A cold model
    /// (HTTP 503) is reported with its estimated wait and not retried.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] describing the first failure encountered.
    pub async fn try_generate(
        &self,
        prompt: &str,
        model_index: i64,
    ) -> Result<GeneratedImage, RelayError> {
        if core::is_blank(prompt) {
            return Err(RelayError::EmptyInput("prompt"));
        }
        let model = ImageModel::by_index(model_index)?;
        let api_key = self.config.api_key.as_deref().ok_or(RelayError::MissingApiKey)?;

        let url = core::join_url(&self.config.inference_url, model.id);
        tracing::info!("Generating image with {} ({})", model.name, model.id);
        tracing::debug!("Prompt: {prompt}");

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.config.timeout)
            .json(&InferencePayload::new(prompt))
            .send()
            .await
            .map_err(|e| RelayError::from_transport(SERVICE, &e))?;

        let status = response.status().as_u16();
        tracing::info!(
            "Inference API answered {status} after {:.2}s",
            started.elapsed().as_secs_f64()
        );

        match status {
            200 => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| RelayError::from_transport(SERVICE, &e))?;
                let elapsed = started.elapsed();

                let png = transcode_to_png(bytes.to_vec()).await?;
                let saved_path = save_png(&self.config.output_dir, &png).await?;

                Ok(GeneratedImage {
                    data_uri: to_data_uri(&png),
                    saved_path,
                    model,
                    elapsed,
                })
            }
            503 => {
                let body = response.text().await.unwrap_or_default();
                Err(cold_loading_error(&body))
            }
            404 => Err(RelayError::ModelNotFound {
                model_id: model.id.to_string(),
            }),
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(RelayError::UpstreamStatus {
                    service: SERVICE,
                    status: code,
                    detail: error_detail(&body),
                })
            }
        }
    }
}

fn cold_loading_error(body: &str) -> RelayError {
    let estimated_secs = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|info| info.as_object().cloned())
        .and_then(|info| match info.get("estimated_time") {
            None => Some(DEFAULT_LOADING_WAIT_SECS),
            Some(wait) => wait.as_f64(),
        });

    RelayError::ColdLoading { estimated_secs }
}

fn error_detail(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(info) => info.get("error").map(|e| match e {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        Err(_) if body.trim().is_empty() => None,
        Err(_) => Some(core::excerpt(body, ERROR_EXCERPT_CHARS)),
    }
}

async fn transcode_to_png(bytes: Vec<u8>) -> Result<Vec<u8>, RelayError> {
    tokio::task::spawn_blocking(move || {
        let decoded = image::load_from_memory(&bytes)?;
        let mut png = Vec::new();
        decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok::<_, RelayError>(png)
    })
    .await
    .map_err(|e| RelayError::Request(format!("image transcoding task failed: {e}")))?
}

async fn save_png(
    dir: &Path,
    png: &[u8],
) -> Result<PathBuf, RelayError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("generated_{}.png", core::file_timestamp()));
    tokio::fs::write(&path, png).await?;
    tracing::info!("Saved generated image to {}", path.display());
    Ok(path)
}

fn to_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port_url, encoded_image};
    use serde_json::json;
    use wiremock::matchers::{any, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G'];

    fn relay_for(
        inference_url: String,
        output_dir: &Path,
    ) -> ImageRelay {
        ImageRelay::new(ImageRelayConfig {
            api_key: Some("test-key".to_string()),
            inference_url,
            output_dir: output_dir.to_path_buf(),
            timeout: Duration::from_secs(5),
        })
    }

    async fn mount_never_called(server: &MockServer) {
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    #[test]
    fn test_model_lookup_bounds() {
        assert_eq!(ImageModel::by_index(0).unwrap().id, "stabilityai/stable-diffusion-xl-base-1.0");
        assert_eq!(ImageModel::by_index(2).unwrap().name, "DreamShaper");
        assert!(matches!(
            ImageModel::by_index(3),
            Err(RelayError::InvalidModelSelection { index: 3, available: 3 })
        ));
        assert!(ImageModel::by_index(-1).is_err());
    }

    #[test]
    fn test_catalog_exposes_indices() {
        let dir = tempfile::tempdir().unwrap();
        let relay = relay_for("http://unused".to_string(), dir.path());
        let models = relay.models();
        assert_eq!(models.len(), 3);
        assert_eq!(models[1].value, 1);
        assert_eq!(models[1].id, "prompthero/openjourney-v4");
    }

    #[test]
    fn test_request_defaults() {
        let request: GenerationRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.prompt, "");
        assert_eq!(request.model_index, 0);
    }

    #[tokio::test]
    async fn test_blank_prompt_skips_network() {
        let server = MockServer::start().await;
        mount_never_called(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let relay = relay_for(server.uri(), dir.path());

        for prompt in ["", "   ", "\n\t"] {
            let result = relay.generate(prompt, 0).await;
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("prompt must not be empty"));
            assert!(result.image_data.is_none());
        }
    }

    #[tokio::test]
    async fn test_invalid_model_index_skips_network() {
        let server = MockServer::start().await;
        mount_never_called(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let relay = relay_for(server.uri(), dir.path());

        for index in [-1, 3, 42] {
            let result = relay.generate("a cute cat", index).await;
            assert!(!result.success);
            assert!(result.error.unwrap().starts_with("invalid model selection"));
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_network() {
        let server = MockServer::start().await;
        mount_never_called(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let relay = ImageRelay::new(ImageRelayConfig {
            api_key: None,
            inference_url: server.uri(),
            output_dir: dir.path().to_path_buf(),
            timeout: Duration::from_secs(5),
        });

        let err = relay.try_generate("a cute cat", 0).await.unwrap_err();
        assert!(matches!(err, RelayError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_success_returns_data_uri_and_saves_png() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stabilityai/stable-diffusion-xl-base-1.0"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "inputs": "a cute cat",
                "options": { "wait_for_model": true, "use_cache": true },
                "parameters": { "num_inference_steps": 20, "guidance_scale": 7.5 }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(encoded_image(ImageFormat::Png)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("static").join("generated");
        let relay = relay_for(server.uri(), &output_dir);

        let image = relay.try_generate("a cute cat", 0).await.unwrap();
        assert!(image.data_uri.starts_with("data:image/png;base64,"));
        assert_eq!(image.model.name, "Stable Diffusion XL");

        let file_name = image.saved_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("generated_"));
        assert!(file_name.ends_with(".png"));
        let saved = std::fs::read(&image.saved_path).unwrap();
        assert!(saved.starts_with(PNG_SIGNATURE));

        let result = GenerationResult::succeeded(&image);
        assert!(result.success);
        assert!(result.message.unwrap().starts_with("Generated in"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_jpeg_upstream_is_reencoded_as_png() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/lykon/dreamshaper-8"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(encoded_image(ImageFormat::Jpeg)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let relay = relay_for(server.uri(), dir.path());

        let result = relay.generate("a lighthouse at dusk", 2).await;
        assert!(result.success);
        let encoded = result
            .image_data
            .unwrap()
            .trim_start_matches("data:image/png;base64,")
            .to_string();
        let decoded = STANDARD.decode(encoded).unwrap();
        assert!(decoded.starts_with(PNG_SIGNATURE));
    }

    #[test]
    fn test_relay_debug_hides_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let rendered = format!("{:?}", relay_for("http://localhost".to_string(), dir.path()));
        assert!(!rendered.contains("test-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_cold_loading_reports_estimate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "estimated_time": 12.3 })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = relay_for(server.uri(), dir.path()).generate("a cute cat", 0).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("12"));
    }

    #[tokio::test]
    async fn test_cold_loading_without_estimate_uses_default_wait() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "error": "Model is loading" })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = relay_for(server.uri(), dir.path())
            .try_generate("a cute cat", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::ColdLoading { estimated_secs: Some(s) } if s == 30.0));
    }

    #[tokio::test]
    async fn test_cold_loading_unparseable_body_uses_fixed_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = relay_for(server.uri(), dir.path()).generate("a cute cat", 0).await;
        assert_eq!(result.error.as_deref(), Some("model is loading, please retry shortly"));
    }

    #[tokio::test]
    async fn test_cold_loading_non_numeric_estimate_uses_fixed_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "estimated_time": null })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let relay = relay_for(server.uri(), dir.path());
        let err = relay.try_generate("a cute cat", 0).await.unwrap_err();
        assert!(matches!(err, RelayError::ColdLoading { estimated_secs: None }));

        server.reset().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "estimated_time": "soon" })))
            .mount(&server)
            .await;
        let result = relay.generate("a cute cat", 0).await;
        assert_eq!(result.error.as_deref(), Some("model is loading, please retry shortly"));
    }

    #[tokio::test]
    async fn test_not_found_names_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/prompthero/openjourney-v4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = relay_for(server.uri(), dir.path()).generate("a cute cat", 1).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("prompthero/openjourney-v4"));
    }

    #[tokio::test]
    async fn test_other_status_includes_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "CUDA out of memory" })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let error = relay_for(server.uri(), dir.path())
            .generate("a cute cat", 0)
            .await
            .error
            .unwrap();
        assert_eq!(error, "Hugging Face API error: 500 - CUDA out of memory");
    }

    #[tokio::test]
    async fn test_other_status_with_text_body_is_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("x".repeat(500)))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = relay_for(server.uri(), dir.path())
            .try_generate("a cute cat", 0)
            .await
            .unwrap_err();
        match err {
            RelayError::UpstreamStatus { status, detail, .. } => {
                assert_eq!(status, 502);
                assert_eq!(detail.unwrap().len(), 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_reported_distinctly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let relay = ImageRelay::new(ImageRelayConfig {
            api_key: Some("test-key".to_string()),
            inference_url: server.uri(),
            output_dir: dir.path().to_path_buf(),
            timeout: Duration::from_millis(200),
        });

        let err = relay.try_generate("a cute cat", 0).await.unwrap_err();
        assert!(matches!(err, RelayError::Timeout { .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let err = relay_for(closed_port_url(), dir.path())
            .try_generate("a cute cat", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_garbage_image_bytes_fail_without_saving() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"definitely not an image".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");
        let result = relay_for(server.uri(), &output_dir).generate("a cute cat", 0).await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("failed to decode generated image"));
        assert!(!output_dir.exists());
    }
}
