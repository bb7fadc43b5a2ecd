use std::time::Duration;
use thiserror::Error;

/// Backend-scoped transport/protocol errors. Classified by the retry policy;
/// never escapes the orchestrator as an `Err`, only as an error-tagged
/// outcome.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        /// Server-advertised Retry-After, when present on a 429.
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("request failed: {0}")]
    Network(String),

    #[error("{stage} stage timed out")]
    Timeout { stage: &'static str },

    #[error("no content returned from {stage} stage")]
    EmptyResponse { stage: &'static str },

    #[error("failed to parse formatted JSON: {0}")]
    Parse(String),
}

/// Orchestration-fatal errors. These are the only failures a caller of the
/// multi-model service ever sees as `Err`; per-backend trouble stays inside
/// the aggregate as data.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Venice API is not configured. Please set the VENICE_API_KEY environment variable.")]
    NotConfigured,

    #[error("No valid vision models selected for analysis.")]
    NoBackendsAvailable,

    #[error("All {} AI models failed to analyze the image", failures.len())]
    AllBackendsFailed { failures: Vec<BackendFailure> },
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendFailure {
    pub model_id: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_includes_status() {
        let err = ApiError::Status {
            status: 503,
            retry_after: None,
            message: "upstream busy".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: upstream busy");
    }

    #[test]
    fn test_all_backends_failed_message_counts_failures() {
        let err = AnalyzeError::AllBackendsFailed {
            failures: vec![
                BackendFailure {
                    model_id: "a".to_string(),
                    error: "boom".to_string(),
                },
                BackendFailure {
                    model_id: "b".to_string(),
                    error: "boom".to_string(),
                },
            ],
        };
        assert!(err.to_string().contains("All 2"));
    }
}
