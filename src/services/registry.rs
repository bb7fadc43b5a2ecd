//! Static registry of the AI backends reachable through the Venice API.
//!
//! The table is fixed at compile time and read-only for the life of the
//! process. Vision analysis must only ever see entries with
//! `supports_vision = true`; the text-only formatting model lives in the same
//! table but is filtered out of every vision-facing listing.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Private,
    Anonymized,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pricing {
    /// USD per million input tokens.
    pub input: f64,
    /// USD per million output tokens.
    pub output: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    /// UI color hint for the comparison dashboard.
    pub color: &'static str,
    pub supports_vision: bool,
    pub privacy: Privacy,
    pub pricing: Option<Pricing>,
}

/// Text-only model used for the schema-constrained formatting stage.
pub const FORMATTING_BACKEND: &str = "qwen3-4b";

const BACKENDS: &[BackendConfig] = &[
    BackendConfig {
        id: "mistral-31-24b",
        name: "mistral-31-24b",
        display_name: "Venice Medium",
        description: "Balanced blend of speed and capability with image analysis",
        color: "#FF6B6B",
        supports_vision: true,
        privacy: Privacy::Private,
        pricing: Some(Pricing { input: 0.5, output: 2.0 }),
    },
    BackendConfig {
        id: "google-gemma-3-27b-it",
        name: "google-gemma-3-27b-it",
        display_name: "Gemma 3 27B",
        description: "Google's multimodal model with vision-language support",
        color: "#4285F4",
        supports_vision: true,
        privacy: Privacy::Private,
        pricing: Some(Pricing { input: 0.12, output: 0.2 }),
    },
    BackendConfig {
        id: "grok-41-fast",
        name: "grok-41-fast",
        display_name: "Grok 4.1 Fast",
        description: "xAI's agentic tool-calling model with image analysis",
        color: "#1DA1F2",
        supports_vision: true,
        privacy: Privacy::Anonymized,
        pricing: Some(Pricing { input: 0.5, output: 1.25 }),
    },
    BackendConfig {
        id: "gemini-3-flash-preview",
        name: "gemini-3-flash-preview",
        display_name: "Gemini 3 Flash",
        description: "High speed thinking model for agentic workflows",
        color: "#34A853",
        supports_vision: true,
        privacy: Privacy::Anonymized,
        pricing: Some(Pricing { input: 0.7, output: 3.75 }),
    },
    BackendConfig {
        id: "minimax-m21",
        name: "minimax-m21",
        display_name: "MiniMax M2.1",
        description: "Lightweight state-of-the-art model with vision",
        color: "#8B5CF6",
        supports_vision: true,
        privacy: Privacy::Anonymized,
        pricing: Some(Pricing { input: 0.4, output: 1.6 }),
    },
    BackendConfig {
        id: FORMATTING_BACKEND,
        name: FORMATTING_BACKEND,
        display_name: "Qwen 3 4B",
        description: "Small text-only model dedicated to JSON formatting",
        color: "#AAAAAA",
        supports_vision: false,
        privacy: Privacy::Private,
        pricing: None,
    },
];

/// Most cost-effective subset used when the caller does not pick models.
const DEFAULT_COMPARISON_IDS: &[&str] = &[
    "mistral-31-24b",
    "google-gemma-3-27b-it",
    "grok-41-fast",
    "gemini-3-flash-preview",
];

/// All vision-capable backends, in registry order.
pub fn vision_backends() -> Vec<&'static BackendConfig> {
    BACKENDS.iter().filter(|b| b.supports_vision).collect()
}

/// Default subset for multi-model comparison, in registry order.
pub fn default_comparison_backends() -> Vec<&'static BackendConfig> {
    BACKENDS
        .iter()
        .filter(|b| b.supports_vision && DEFAULT_COMPARISON_IDS.contains(&b.id))
        .collect()
}

pub fn backend_by_id(id: &str) -> Option<&'static BackendConfig> {
    BACKENDS.iter().find(|b| b.id == id)
}
