use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.venice.ai/api/v1";

/// Venice API settings, built once at startup and passed into the services.
/// Business logic never reads the environment directly.
#[derive(Debug, Clone)]
pub struct VeniceConfig {
    pub base_url: String,
    /// Absence means the backend family is not configured; analysis requests
    /// fail with a caller-visible error instead of panicking at startup.
    pub api_key: Option<String>,
    pub extraction_timeout: Duration,
    pub formatting_timeout: Duration,
    pub default_temperature: f32,
    pub formatting_temperature: f32,
    pub extraction_max_tokens: u32,
    pub formatting_max_tokens: u32,
}

impl Default for VeniceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            extraction_timeout: Duration::from_secs(120),
            formatting_timeout: Duration::from_secs(180),
            default_temperature: 0.3,
            formatting_temperature: 0.1,
            extraction_max_tokens: 4000,
            formatting_max_tokens: 16000,
        }
    }
}

impl VeniceConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.api_key = env::var("VENICE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        if let Ok(url) = env::var("VENICE_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = env_secs("VENICE_EXTRACTION_TIMEOUT_SECS") {
            config.extraction_timeout = secs;
        }
        if let Some(secs) = env_secs("VENICE_FORMATTING_TIMEOUT_SECS") {
            config.formatting_timeout = secs;
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let config = VeniceConfig::default();
        assert_eq!(config.extraction_timeout, Duration::from_secs(120));
        assert_eq!(config.formatting_timeout, Duration::from_secs(180));
        assert!(!config.is_configured());
    }

    #[test]
    fn test_with_api_key_marks_configured() {
        let config = VeniceConfig::default().with_api_key("test-key");
        assert!(config.is_configured());
    }
}
