//! Multi-model orchestration: fan one image out to several vision backends
//! concurrently and aggregate every outcome for side-by-side comparison.
//!
//! The fan-out settles all backends — a failing sibling neither cancels nor
//! starves the others. Partial failure is data, not an error; only zero
//! successes (or an unusable backend selection) is escalated to the caller.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;

use crate::models::{AggregateResult, AnalysisOutcome, ImagePayload, NutritionReport};

use super::analyzer::Analyzer;
use super::error::{AnalyzeError, BackendFailure};
use super::registry::{self, BackendConfig, Pricing, Privacy};

/// Default model for the single-backend analysis path.
const DEFAULT_SINGLE_MODEL: &str = "mistral-31-24b";

pub struct MultiModelService {
    analyzer: Arc<Analyzer>,
}

/// Listing entry for the model-picker UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    pub privacy: Privacy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_configured: Option<bool>,
}

impl MultiModelService {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        Self { analyzer }
    }

    /// Analyze one image with several backends in parallel and return every
    /// outcome. Successes sort before errors, highest confidence first
    /// within each group.
    pub async fn analyze_multi(
        &self,
        image: &ImagePayload,
        food_name: Option<&str>,
        measurement_cues: Option<&str>,
        selected_model_ids: Option<&[String]>,
    ) -> Result<AggregateResult, AnalyzeError> {
        let started = Instant::now();

        if !self.analyzer.config().is_configured() {
            return Err(AnalyzeError::NotConfigured);
        }

        let backends = resolve_backends(selected_model_ids);
        if backends.is_empty() {
            return Err(AnalyzeError::NoBackendsAvailable);
        }

        log::info!(
            "🚀 Starting parallel analysis with {} models: {}",
            backends.len(),
            backends
                .iter()
                .map(|b| b.display_name)
                .collect::<Vec<_>>()
                .join(", ")
        );

        // Issue every analysis before awaiting any of them; join_all is the
        // settle-all barrier, and analyze_with_backend never fails, so one
        // backend's trouble cannot short-circuit the rest.
        let mut results: Vec<AnalysisOutcome> = join_all(backends.iter().map(|backend| {
            self.analyzer
                .analyze_with_backend(backend, image, food_name, measurement_cues)
        }))
        .await;

        let total_time_ms = started.elapsed().as_millis() as u64;
        let success_count = results.iter().filter(|r| r.is_success()).count();
        let error_count = results.len() - success_count;

        log::info!(
            "🏁 All analyses complete in {}ms. Success: {}, Errors: {}",
            total_time_ms,
            success_count,
            error_count
        );

        // Status is the primary key: a low-confidence success still precedes
        // every error. Errors carry confidence 0 by construction.
        results.sort_by_key(|r| (Reverse(r.is_success()), Reverse(r.confidence)));

        if success_count == 0 {
            return Err(AnalyzeError::AllBackendsFailed {
                failures: results
                    .iter()
                    .map(|r| BackendFailure {
                        model_id: r.model_id.clone(),
                        error: r.error.clone().unwrap_or_else(|| "unknown error".to_string()),
                    })
                    .collect(),
            });
        }

        Ok(AggregateResult {
            results,
            total_time_ms,
            success_count,
            error_count,
        })
    }

    /// Single-backend analysis path. Unlike the multi-model run, failure here
    /// propagates directly to the caller.
    pub async fn analyze_one(
        &self,
        image: &ImagePayload,
        food_name: Option<&str>,
        measurement_cues: Option<&str>,
        model_id: Option<&str>,
    ) -> Result<NutritionReport, AnalyzeError> {
        if !self.analyzer.config().is_configured() {
            return Err(AnalyzeError::NotConfigured);
        }

        let backend = registry::backend_by_id(model_id.unwrap_or(DEFAULT_SINGLE_MODEL))
            .filter(|b| b.supports_vision)
            .ok_or(AnalyzeError::NoBackendsAvailable)?;

        self.analyzer
            .analyze(backend, image, food_name, measurement_cues)
            .await
            .map_err(|err| AnalyzeError::AllBackendsFailed {
                failures: vec![BackendFailure {
                    model_id: backend.id.to_string(),
                    error: err.to_string(),
                }],
            })
    }

    /// Vision models usable right now; empty when the API is not configured.
    pub fn available_models(&self) -> Vec<ModelInfo> {
        if !self.analyzer.config().is_configured() {
            return vec![];
        }
        registry::vision_backends()
            .into_iter()
            .map(|b| model_info(b, None))
            .collect()
    }

    /// Every supported vision model, each flagged with configuration state.
    pub fn all_supported_models(&self) -> Vec<ModelInfo> {
        let is_configured = self.analyzer.config().is_configured();
        registry::vision_backends()
            .into_iter()
            .map(|b| model_info(b, Some(is_configured)))
            .collect()
    }
}

/// Explicit non-empty selection wins (unknown ids dropped); otherwise the
/// default comparison set. An empty explicit list means "no preference",
/// not "nothing".
fn resolve_backends(selected: Option<&[String]>) -> Vec<&'static BackendConfig> {
    match selected {
        Some(ids) if !ids.is_empty() => ids
            .iter()
            .filter_map(|id| registry::backend_by_id(id))
            .filter(|b| b.supports_vision)
            .collect(),
        _ => registry::default_comparison_backends(),
    }
}

fn model_info(backend: &'static BackendConfig, is_configured: Option<bool>) -> ModelInfo {
    ModelInfo {
        id: backend.id,
        name: backend.name,
        display_name: backend.display_name,
        description: backend.description,
        color: backend.color,
        privacy: backend.privacy,
        pricing: backend.pricing,
        is_configured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutcomeStatus;
    use crate::services::config::VeniceConfig;
    use crate::services::error::ApiError;
    use crate::services::retry::test_support::RecordingSleep;
    use crate::services::retry::RetryPolicy;
    use crate::services::venice::{ChatApi, ChatRequest, ContentPart};
    use serde_json::json;
    use std::collections::{HashMap, HashSet};

    fn test_image() -> ImagePayload {
        ImagePayload {
            data: "aGVsbG8=".to_string(),
            mime_type: "image/jpeg".to_string(),
        }
    }

    /// Scripted transport: extraction echoes the vision model id into the
    /// extracted text, and the formatting stage reads it back out of the
    /// prompt, so per-backend behavior stays controllable even though all
    /// formatting calls share one model.
    struct ScriptedChat {
        fail_extraction_for: HashSet<&'static str>,
        confidence_by_model: HashMap<&'static str, u8>,
    }

    impl ScriptedChat {
        fn marker(model_id: &str) -> String {
            format!("extracted::{}", model_id)
        }
    }

    #[async_trait::async_trait]
    impl ChatApi for ScriptedChat {
        async fn chat_completion(&self, request: ChatRequest) -> Result<String, ApiError> {
            if request.response_format.is_none() {
                // Extraction stage: keyed by the vision model.
                if self.fail_extraction_for.contains(request.model.as_str()) {
                    return Err(ApiError::Status {
                        status: 500,
                        retry_after: None,
                        message: format!("{} exploded", request.model),
                    });
                }
                return Ok(Self::marker(&request.model));
            }

            // Formatting stage: recover the originating model from the
            // prompt text.
            let prompt = request
                .messages
                .iter()
                .flat_map(|m| m.content.iter())
                .filter_map(|part| match part {
                    ContentPart::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");

            let confidence = self
                .confidence_by_model
                .iter()
                .find(|(model, _)| prompt.contains(&Self::marker(model)))
                .map(|(_, c)| *c)
                .unwrap_or(50);

            Ok(json!({
                "dishName": "Test Dish",
                "totalCalories": 400,
                "analysis": {"confidence": confidence}
            })
            .to_string())
        }
    }

    fn service_with(chat: ScriptedChat) -> MultiModelService {
        let analyzer = Analyzer::with_overrides(
            Arc::new(chat),
            VeniceConfig::default().with_api_key("test-key"),
            RetryPolicy::default(),
            Arc::new(RecordingSleep::default()),
        );
        MultiModelService::new(Arc::new(analyzer))
    }

    fn all_ok(confidences: &[(&'static str, u8)]) -> ScriptedChat {
        ScriptedChat {
            fail_extraction_for: HashSet::new(),
            confidence_by_model: confidences.iter().copied().collect(),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_returns_mixed_outcomes() {
        let service = service_with(ScriptedChat {
            fail_extraction_for: ["mistral-31-24b", "grok-41-fast"].into_iter().collect(),
            confidence_by_model: [("google-gemma-3-27b-it", 85), ("gemini-3-flash-preview", 60)]
                .into_iter()
                .collect(),
        });

        let result = service
            .analyze_multi(&test_image(), None, None, None)
            .await
            .unwrap();

        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 2);
        assert_eq!(result.results.len(), 4);

        // Successes first, descending confidence; then the errors.
        assert_eq!(result.results[0].status, OutcomeStatus::Success);
        assert_eq!(result.results[0].confidence, 85);
        assert_eq!(result.results[1].status, OutcomeStatus::Success);
        assert_eq!(result.results[1].confidence, 60);
        assert_eq!(result.results[2].status, OutcomeStatus::Error);
        assert_eq!(result.results[3].status, OutcomeStatus::Error);
        assert!(result.results[2].error.is_some());
    }

    #[tokio::test]
    async fn test_all_backends_failing_raises_named_error() {
        let service = service_with(ScriptedChat {
            fail_extraction_for: [
                "mistral-31-24b",
                "google-gemma-3-27b-it",
                "grok-41-fast",
                "gemini-3-flash-preview",
            ]
            .into_iter()
            .collect(),
            confidence_by_model: HashMap::new(),
        });

        let err = service
            .analyze_multi(&test_image(), None, None, None)
            .await
            .unwrap_err();

        match err {
            AnalyzeError::AllBackendsFailed { failures } => {
                assert_eq!(failures.len(), 4);
                assert!(failures.iter().all(|f| f.error.contains("HTTP 500")));
            }
            other => panic!("expected AllBackendsFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_selection_falls_back_to_default_set() {
        let service = service_with(all_ok(&[
            ("mistral-31-24b", 80),
            ("google-gemma-3-27b-it", 80),
            ("grok-41-fast", 80),
            ("gemini-3-flash-preview", 80),
        ]));

        let result = service
            .analyze_multi(&test_image(), None, None, Some(&[]))
            .await
            .unwrap();

        let mut ids: Vec<&str> = result.results.iter().map(|r| r.model_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(
            ids,
            vec![
                "gemini-3-flash-preview",
                "google-gemma-3-27b-it",
                "grok-41-fast",
                "mistral-31-24b",
            ]
        );
    }

    #[tokio::test]
    async fn test_explicit_selection_is_honored_and_unknown_ids_dropped() {
        let service = service_with(all_ok(&[("minimax-m21", 77)]));

        let selection = vec!["minimax-m21".to_string(), "does-not-exist".to_string()];
        let result = service
            .analyze_multi(&test_image(), None, None, Some(&selection))
            .await
            .unwrap();

        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].model_id, "minimax-m21");
        assert_eq!(result.success_count, 1);
    }

    #[tokio::test]
    async fn test_only_unknown_ids_raises_no_backends_available() {
        let service = service_with(all_ok(&[]));

        let selection = vec!["does-not-exist".to_string()];
        let err = service
            .analyze_multi(&test_image(), None, None, Some(&selection))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyzeError::NoBackendsAvailable));
    }

    #[tokio::test]
    async fn test_formatting_model_cannot_be_selected_for_vision() {
        let service = service_with(all_ok(&[]));

        let selection = vec![crate::services::registry::FORMATTING_BACKEND.to_string()];
        let err = service
            .analyze_multi(&test_image(), None, None, Some(&selection))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyzeError::NoBackendsAvailable));
    }

    #[tokio::test]
    async fn test_missing_credential_raises_not_configured() {
        let analyzer = Analyzer::with_overrides(
            Arc::new(all_ok(&[])),
            VeniceConfig::default(),
            RetryPolicy::default(),
            Arc::new(RecordingSleep::default()),
        );
        let service = MultiModelService::new(Arc::new(analyzer));

        let err = service
            .analyze_multi(&test_image(), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::NotConfigured));

        assert!(service.available_models().is_empty());
        assert!(service
            .all_supported_models()
            .iter()
            .all(|m| m.is_configured == Some(false)));
    }

    #[tokio::test]
    async fn test_analyze_one_uses_default_model_and_propagates_failure() {
        let service = service_with(all_ok(&[("mistral-31-24b", 91)]));

        let report = service
            .analyze_one(&test_image(), Some("menemen"), None, None)
            .await
            .unwrap();
        assert_eq!(report.dish_name, "Test Dish");
        assert_eq!(report.analysis.confidence, 91);

        let failing = service_with(ScriptedChat {
            fail_extraction_for: ["mistral-31-24b"].into_iter().collect(),
            confidence_by_model: HashMap::new(),
        });
        let err = failing
            .analyze_one(&test_image(), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::AllBackendsFailed { .. }));
    }

    #[tokio::test]
    async fn test_model_listings_cover_all_vision_backends() {
        let service = service_with(all_ok(&[]));
        assert_eq!(service.available_models().len(), 5);
        assert!(service
            .all_supported_models()
            .iter()
            .all(|m| m.is_configured == Some(true)));
    }
}
