use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Canonical nutritional report. Every backend response is normalized into
/// this shape before it leaves the analysis pipeline; all numeric fields are
/// non-negative integers. Field names serialize to the camelCase wire keys
/// the dashboard expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionReport {
    pub dish_name: String,
    pub total_calories: u32,
    pub macro_nutrients: MacroNutrients,
    pub micro_nutrients: MicroNutrients,
    pub items: Vec<FoodItem>,
    pub notes: Vec<String>,
    pub analysis: Analysis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroNutrients {
    pub protein: u32,
    pub carbohydrates: Carbohydrates,
    pub fat: Fat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carbohydrates {
    pub total: u32,
    pub fiber: u32,
    pub sugars: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fat {
    pub total: u32,
    pub saturated: u32,
    pub unsaturated: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroNutrients {
    pub vitamins: String,
    pub minerals: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub name: String,
    pub calories: u32,
    pub weight_grams: u32,
    pub macronutrients: MacroNutrients,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub visual_observations: String,
    pub portion_estimate: String,
    /// Confidence score 0-100.
    pub confidence: u8,
    pub confidence_narrative: String,
    pub cautions: Vec<String>,
}

/// Base64-encoded image as received from the client. Not retained after the
/// analysis pipeline completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub data: String,
    pub mime_type: String,
}

impl ImagePayload {
    /// Data URL form expected by the chat-completions image_url content part.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Approximate decoded size in bytes, for logging.
    pub fn approx_size_bytes(&self) -> usize {
        self.data.len() / 4 * 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// One backend's result in a multi-model run. Errors carry a zeroed
/// placeholder report so consumers never have to special-case absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub model_id: String,
    pub model_name: String,
    pub display_name: String,
    pub color: String,
    pub nutrition_report: NutritionReport,
    pub analysis_time_ms: u64,
    pub confidence: u8,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Every backend outcome from one orchestration run, plus summary counters.
/// `total_time_ms` is wall-clock time across the whole fan-out, not the sum
/// of per-backend times.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub results: Vec<AnalysisOutcome>,
    pub total_time_ms: u64,
    pub success_count: usize,
    pub error_count: usize,
}

/// A report the user chose to keep, pinned to a calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodLogEntry {
    pub id: Option<i64>,
    pub log_date: NaiveDate,
    pub report: NutritionReport,
    pub created_at: DateTime<Utc>,
}
