//! Single-backend analysis: the two-stage extract-then-format protocol.
//!
//! Constraining every vision model to a strict output schema directly is
//! unreliable, so stage one asks the vision backend for an unconstrained
//! natural-language analysis and stage two hands that text to a small
//! text-only model with schema-on-the-wire enforcement. The whole two-stage
//! call sits inside the shared retry ladder; a backend that ultimately fails
//! still resolves to an error-tagged outcome instead of an `Err`.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::time::timeout;

use crate::models::{AnalysisOutcome, ImagePayload, NutritionReport, OutcomeStatus};
use crate::prompts;

use super::config::VeniceConfig;
use super::error::ApiError;
use super::normalize::{failed_report, normalize_report, repair_truncated_json};
use super::registry::{BackendConfig, FORMATTING_BACKEND};
use super::retry::{RetryAction, RetryPolicy, Sleep, TokioSleep};
use super::venice::{ChatApi, ChatRequest, ContentPart, ResponseFormat};

pub struct Analyzer {
    chat: Arc<dyn ChatApi>,
    config: VeniceConfig,
    policy: RetryPolicy,
    sleep: Arc<dyn Sleep>,
}

impl Analyzer {
    pub fn new(chat: Arc<dyn ChatApi>, config: VeniceConfig) -> Self {
        Self::with_overrides(chat, config, RetryPolicy::default(), Arc::new(TokioSleep))
    }

    /// Full constructor for tests that inject a scripted transport, a tighter
    /// retry policy, or a recording sleeper.
    pub fn with_overrides(
        chat: Arc<dyn ChatApi>,
        config: VeniceConfig,
        policy: RetryPolicy,
        sleep: Arc<dyn Sleep>,
    ) -> Self {
        Self { chat, config, policy, sleep }
    }

    pub fn config(&self) -> &VeniceConfig {
        &self.config
    }

    /// Analyze one image with one backend, retrying per policy. Elapsed time
    /// in the returned outcome covers everything including backoff sleeps.
    pub async fn analyze_with_backend(
        &self,
        backend: &BackendConfig,
        image: &ImagePayload,
        food_name: Option<&str>,
        measurement_cues: Option<&str>,
    ) -> AnalysisOutcome {
        let started = Instant::now();

        log::info!(
            "🔬 Starting analysis with {} ({}), image ~{}KB {}",
            backend.display_name,
            backend.id,
            image.approx_size_bytes() / 1024,
            image.mime_type
        );

        let result = self.analyze(backend, image, food_name, measurement_cues).await;
        let analysis_time_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(report) => {
                log::info!(
                    "✅ {} completed successfully in {}ms (confidence {})",
                    backend.display_name,
                    analysis_time_ms,
                    report.analysis.confidence
                );
                AnalysisOutcome {
                    model_id: backend.id.to_string(),
                    model_name: backend.name.to_string(),
                    display_name: backend.display_name.to_string(),
                    color: backend.color.to_string(),
                    confidence: report.analysis.confidence,
                    nutrition_report: report,
                    analysis_time_ms,
                    status: OutcomeStatus::Success,
                    error: None,
                }
            }
            Err(err) => {
                log::error!(
                    "❌ {} failed after {}ms: {}",
                    backend.display_name,
                    analysis_time_ms,
                    err
                );
                AnalysisOutcome {
                    model_id: backend.id.to_string(),
                    model_name: backend.name.to_string(),
                    display_name: backend.display_name.to_string(),
                    color: backend.color.to_string(),
                    nutrition_report: failed_report(),
                    analysis_time_ms,
                    confidence: 0,
                    status: OutcomeStatus::Error,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// The raw pipeline result, for callers that want the error (single-model
    /// analysis path).
    pub async fn analyze(
        &self,
        backend: &BackendConfig,
        image: &ImagePayload,
        food_name: Option<&str>,
        measurement_cues: Option<&str>,
    ) -> Result<NutritionReport, ApiError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let error = match self.run_pipeline(backend, image, food_name, measurement_cues).await {
                Ok(report) => return Ok(report),
                Err(error) => error,
            };

            if attempts >= self.policy.max_attempts {
                return Err(error);
            }

            match self.policy.next_action(&error, attempts) {
                RetryAction::Wait(delay) => {
                    log::warn!(
                        "🔁 {} attempt {}/{} failed ({}), retrying in {:?}",
                        backend.display_name,
                        attempts,
                        self.policy.max_attempts,
                        error,
                        delay
                    );
                    self.sleep.sleep(delay).await;
                }
                RetryAction::Fatal => return Err(error),
            }
        }
    }

    async fn run_pipeline(
        &self,
        backend: &BackendConfig,
        image: &ImagePayload,
        food_name: Option<&str>,
        measurement_cues: Option<&str>,
    ) -> Result<NutritionReport, ApiError> {
        let extracted = self.extract(backend, image, food_name, measurement_cues).await?;
        log::debug!(
            "📝 {} extraction complete ({} chars)",
            backend.display_name,
            extracted.len()
        );
        self.format_to_schema(&extracted).await
    }

    /// Stage one: unconstrained natural-language findings from the image.
    async fn extract(
        &self,
        backend: &BackendConfig,
        image: &ImagePayload,
        food_name: Option<&str>,
        measurement_cues: Option<&str>,
    ) -> Result<String, ApiError> {
        let request = ChatRequest {
            model: backend.id.to_string(),
            messages: vec![
                ChatRequest::system_message(prompts::SYSTEM_PROMPT),
                ChatRequest::user_message(vec![
                    ContentPart::text(prompts::extraction_prompt(food_name, measurement_cues)),
                    ContentPart::image_url(image.data_url()),
                ]),
            ],
            temperature: self.config.default_temperature,
            max_tokens: self.config.extraction_max_tokens,
            response_format: None,
        };

        let content = timeout(self.config.extraction_timeout, self.chat.chat_completion(request))
            .await
            .map_err(|_| ApiError::Timeout { stage: "extraction" })??;

        if content.trim().is_empty() {
            return Err(ApiError::EmptyResponse { stage: "extraction" });
        }
        Ok(content)
    }

    /// Stage two: schema-constrained formatting via the dedicated text
    /// model, then parse (with truncation repair) and normalize.
    async fn format_to_schema(&self, extracted: &str) -> Result<NutritionReport, ApiError> {
        let request = ChatRequest {
            model: FORMATTING_BACKEND.to_string(),
            messages: vec![
                ChatRequest::system_message(prompts::FORMATTING_SYSTEM_PROMPT),
                ChatRequest::user_message(vec![ContentPart::text(prompts::formatting_prompt(
                    extracted,
                ))]),
            ],
            temperature: self.config.formatting_temperature,
            max_tokens: self.config.formatting_max_tokens,
            response_format: Some(ResponseFormat::strict_schema(
                "nutritional_report",
                prompts::response_schema(),
            )),
        };

        // Structured generation is slower than free-form, hence the longer
        // timeout for this stage.
        let content = timeout(self.config.formatting_timeout, self.chat.chat_completion(request))
            .await
            .map_err(|_| ApiError::Timeout { stage: "formatting" })??;

        let json_text = content.trim();
        let data: Value = match serde_json::from_str(json_text) {
            Ok(data) => data,
            Err(parse_error) => {
                // Truncated generation leaves unbalanced braces; anything
                // else is a genuine formatting failure.
                if !json_text.ends_with('}') {
                    if let Some(fixed) = repair_truncated_json(json_text) {
                        if let Ok(data) = serde_json::from_str(&fixed) {
                            log::warn!("🩹 Repaired truncated JSON from formatting stage");
                            return Ok(normalize_report(&data));
                        }
                    }
                }
                return Err(ApiError::Parse(parse_error.to_string()));
            }
        };

        // Never trust the raw parse; required sub-fields may still be absent.
        Ok(normalize_report(&data))
    }
}
