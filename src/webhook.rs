//! HTTP API for the analysis pipeline and the food log.
//!
//! Transport only: request validation, calling the services, and mapping
//! orchestration-fatal errors to one actionable JSON message (with
//! per-backend detail for debugging, never a stack trace).

use serde::Deserialize;

use crate::models::ImagePayload;

/// Body of POST /api/analyze.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image: Option<ImagePayload>,
    pub food_name: Option<String>,
    pub model_id: Option<String>,
    pub user_cues: Option<String>,
}

/// Body of POST /api/analyze-multi.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAnalyzeRequest {
    pub image: Option<ImagePayload>,
    pub food_name: Option<String>,
    pub user_cues: Option<String>,
    pub selected_models: Option<Vec<String>>,
}

/// Body of POST /api/logs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveLogRequest {
    pub date: chrono::NaiveDate,
    pub report: serde_json::Value,
}

/// Reject images that are missing, not base64, or empty before any backend
/// gets involved.
pub fn validate_image(image: &Option<ImagePayload>) -> Result<ImagePayload, &'static str> {
    use base64::{engine::general_purpose, Engine};

    let image = image
        .as_ref()
        .filter(|i| !i.data.is_empty() && !i.mime_type.is_empty())
        .ok_or("Invalid request. Image data and mimeType are required.")?;

    general_purpose::STANDARD
        .decode(&image.data)
        .map_err(|_| "Invalid request. Image data must be base64 encoded.")?;

    Ok(image.clone())
}

// Axum integration (optional - requires axum dependency)
#[cfg(feature = "webhook-server")]
pub mod server {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        routing::{delete, get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::sync::Arc;

    use crate::services::{AnalyzeError, Database, MultiModelService};

    pub struct AppState {
        pub multi_model: Arc<MultiModelService>,
        pub database: Arc<Database>,
    }

    pub fn create_api_router(
        multi_model: Arc<MultiModelService>,
        database: Arc<Database>,
    ) -> Router {
        let state = Arc::new(AppState { multi_model, database });

        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_check))
            .route("/api/analyze", post(analyze_handler))
            .route("/api/analyze-multi", post(analyze_multi_handler))
            .route("/api/analyze-multi/models", get(models_handler))
            .route("/api/logs", get(logs_for_date_handler).post(save_log_handler))
            .route("/api/logs/:id", delete(delete_log_handler))
            .with_state(state)
    }

    async fn analyze_handler(
        State(state): State<Arc<AppState>>,
        Json(request): Json<AnalyzeRequest>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let image = match validate_image(&request.image) {
            Ok(image) => image,
            Err(message) => return bad_request(message),
        };

        log::info!(
            "📥 Analysis request: foodName={}, modelId={}",
            request.food_name.as_deref().unwrap_or("none"),
            request.model_id.as_deref().unwrap_or("default")
        );

        match state
            .multi_model
            .analyze_one(
                &image,
                request.food_name.as_deref(),
                request.user_cues.as_deref(),
                request.model_id.as_deref(),
            )
            .await
        {
            Ok(report) => (StatusCode::OK, Json(json!(report))),
            Err(err) => analyze_error_response(err),
        }
    }

    async fn analyze_multi_handler(
        State(state): State<Arc<AppState>>,
        Json(request): Json<MultiAnalyzeRequest>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let image = match validate_image(&request.image) {
            Ok(image) => image,
            Err(message) => return bad_request(message),
        };

        log::info!(
            "📥 Multi-model analysis request: foodName={}, selectedModels={:?}",
            request.food_name.as_deref().unwrap_or("none"),
            request.selected_models
        );

        match state
            .multi_model
            .analyze_multi(
                &image,
                request.food_name.as_deref(),
                request.user_cues.as_deref(),
                request.selected_models.as_deref(),
            )
            .await
        {
            Ok(result) => (StatusCode::OK, Json(json!(result))),
            Err(err) => analyze_error_response(err),
        }
    }

    async fn models_handler(
        State(state): State<Arc<AppState>>,
    ) -> Json<serde_json::Value> {
        let available = state.multi_model.available_models();
        let all = state.multi_model.all_supported_models();
        Json(json!({
            "available": available,
            "all": all,
            "count": available.len(),
        }))
    }

    async fn save_log_handler(
        State(state): State<Arc<AppState>>,
        Json(request): Json<SaveLogRequest>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        // Normalize before storing: the client may hand back a report it
        // edited or reshaped.
        let report = crate::services::normalize::normalize_report(&request.report);

        match state.database.save_report(request.date, &report).await {
            Ok(id) => (StatusCode::CREATED, Json(json!({"id": id}))),
            Err(err) => {
                log::error!("❌ Failed to save food log: {}", err);
                internal_error("Failed to save food log")
            }
        }
    }

    #[derive(Debug, serde::Deserialize)]
    pub struct LogsQuery {
        date: chrono::NaiveDate,
    }

    async fn logs_for_date_handler(
        State(state): State<Arc<AppState>>,
        axum::extract::Query(query): axum::extract::Query<LogsQuery>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        match state.database.reports_for_date(query.date).await {
            Ok(entries) => (StatusCode::OK, Json(json!(entries))),
            Err(err) => {
                log::error!("❌ Failed to load food logs: {}", err);
                internal_error("Failed to load food logs")
            }
        }
    }

    async fn delete_log_handler(
        State(state): State<Arc<AppState>>,
        Path(id): Path<i64>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        match state.database.delete_report(id).await {
            Ok(true) => (StatusCode::OK, Json(json!({"deleted": true}))),
            Ok(false) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Food log not found"})),
            ),
            Err(err) => {
                log::error!("❌ Failed to delete food log: {}", err);
                internal_error("Failed to delete food log")
            }
        }
    }

    async fn root_handler() -> &'static str {
        "NutriLens analysis server - POST /api/analyze-multi to analyze a meal photo"
    }

    async fn health_check() -> &'static str {
        "OK"
    }

    fn analyze_error_response(err: AnalyzeError) -> (StatusCode, Json<serde_json::Value>) {
        match err {
            AnalyzeError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": err.to_string()})),
            ),
            AnalyzeError::NoBackendsAvailable => bad_request(&err.to_string()),
            AnalyzeError::AllBackendsFailed { ref failures } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": err.to_string(),
                    "message": "Please try again or use a different image",
                    "details": failures,
                })),
            ),
        }
    }

    fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
        (StatusCode::BAD_REQUEST, Json(json!({"error": message})))
    }

    fn internal_error(message: &str) -> (StatusCode, Json<serde_json::Value>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": message})),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_request_deserialization() {
        let json = r#"{
            "image": {"data": "aGVsbG8=", "mimeType": "image/jpeg"},
            "foodName": "Menemen",
            "userCues": "standard fork for scale",
            "selectedModels": ["mistral-31-24b", "minimax-m21"]
        }"#;

        let request: MultiAnalyzeRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.food_name.as_deref(), Some("Menemen"));
        assert_eq!(
            request.selected_models.as_deref(),
            Some(&["mistral-31-24b".to_string(), "minimax-m21".to_string()][..])
        );
        assert!(validate_image(&request.image).is_ok());
    }

    #[test]
    fn test_validate_image_rejects_missing_and_invalid_payloads() {
        assert!(validate_image(&None).is_err());

        let empty = Some(ImagePayload {
            data: String::new(),
            mime_type: "image/png".to_string(),
        });
        assert!(validate_image(&empty).is_err());

        let not_base64 = Some(ImagePayload {
            data: "not base64!!".to_string(),
            mime_type: "image/png".to_string(),
        });
        assert!(validate_image(&not_base64).is_err());
    }
}
