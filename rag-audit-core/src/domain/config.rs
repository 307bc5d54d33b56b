use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

// ===== Judge Configuration =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterStrategy {
    /// Deterministic delays.
    #[default]
    None,
    /// Random value between 0 and the computed delay.
    Full,
    /// Half the computed delay plus a random half.
    Equal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_backoff_bounds"))]
#[serde(default)]
pub struct BackoffConfig {
    #[validate(range(min = 1))]
    pub initial_delay_ms: u64,
    #[validate(range(min = 1))]
    pub max_delay_ms: u64,
    #[validate(range(min = 1.0))]
    pub multiplier: f64,
    pub jitter: JitterStrategy,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter: JitterStrategy::None,
        }
    }
}

impl BackoffConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn validate_backoff_bounds(config: &BackoffConfig) -> Result<(), ValidationError> {
    if config.max_delay_ms < config.initial_delay_ms {
        return Err(ValidationError::new("max_delay_below_initial_delay"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JudgeConfig {
    #[validate(length(min = 1, max = 255))]
    pub primary_model: String,
    #[validate(length(min = 1, max = 255))]
    pub fallback_model: Option<String>,
    #[validate(length(min = 1))]
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    #[validate(nested)]
    pub backoff: BackoffConfig,
    /// Extra attempts allowed after an unparseable judge reply.
    pub max_malformed_retries: u32,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            primary_model: "gpt-4o".to_string(),
            fallback_model: Some("gpt-4o-mini".to_string()),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            request_timeout_secs: 60,
            backoff: BackoffConfig::default(),
            max_malformed_retries: 2,
        }
    }
}

impl JudgeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ===== Pricing Configuration =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ModelPrice {
    /// Matched as a case-insensitive prefix of the turn's model name.
    #[validate(length(min = 1))]
    pub model: String,
    #[validate(range(min = 0.0))]
    pub usd_per_1k_tokens: f64,
}

impl ModelPrice {
    pub fn new(model: impl Into<String>, usd_per_1k_tokens: f64) -> Self {
        Self {
            model: model.into(),
            usd_per_1k_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PricingConfig {
    #[validate(nested)]
    pub models: Vec<ModelPrice>,
    /// Applied to unknown or missing model names.
    #[validate(range(min = 0.0))]
    pub fallback_usd_per_1k_tokens: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            models: vec![
                ModelPrice::new("gpt-4o-mini", 0.000_6),
                ModelPrice::new("gpt-4o", 0.01),
                ModelPrice::new("gpt-4-turbo", 0.03),
                ModelPrice::new("gpt-4", 0.06),
                ModelPrice::new("gpt-3.5-turbo", 0.002),
                ModelPrice::new("claude-3-5-sonnet", 0.015),
                ModelPrice::new("claude-3-haiku", 0.001_25),
                ModelPrice::new("claude-3-opus", 0.075),
                ModelPrice::new("gemini-1.5-pro", 0.005),
                ModelPrice::new("gemini-1.5-flash", 0.000_3),
            ],
            fallback_usd_per_1k_tokens: 0.002,
        }
    }
}

// ===== Pipeline Configuration =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    /// 1 evaluates records strictly one after another.
    #[validate(range(min = 1, max = 256))]
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_concurrency: 1 }
    }
}

// ===== Logging Configuration =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    #[validate(length(min = 1))]
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// ===== Top-level =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuditConfig {
    #[validate(nested)]
    pub judge: JudgeConfig,
    #[validate(nested)]
    pub pricing: PricingConfig,
    #[validate(nested)]
    pub pipeline: PipelineConfig,
    #[validate(nested)]
    pub logging: LoggingConfig,
}
