use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Response minus request time; `None` when either timestamp is missing.
    pub latency_ms: Option<u64>,
    pub cost_usd: f64,
    /// Set when the token count was unavailable and `cost_usd` is a placeholder.
    #[serde(default)]
    pub cost_estimated: bool,
}

impl PerformanceMetrics {
    pub fn new(latency_ms: Option<u64>, cost_usd: f64, cost_estimated: bool) -> Self {
        Self {
            latency_ms,
            cost_usd,
            cost_estimated,
        }
    }
}
