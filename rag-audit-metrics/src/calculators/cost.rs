use rag_audit_core::{ConversationTurn, MetricCalculator, PricingConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

const TOKENS_PER_PRICE_UNIT: f64 = 1_000.0;

/// Read-only per-model price lookup.
///
/// Model names are matched case-insensitively against configured prefixes,
/// the longest matching prefix winning, so `gpt-4o-mini-2024-07-18` resolves
/// to the `gpt-4o-mini` entry rather than `gpt-4o`. A `provider/` qualifier
/// is ignored. Anything unmatched gets the fallback price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    /// Lowercased prefix and USD per token, longest prefix first.
    entries: Vec<(String, f64)>,
    fallback_per_token: f64,
}

impl PriceTable {
    pub fn from_config(config: &PricingConfig) -> Self {
        let mut entries: Vec<(String, f64)> = config
            .models
            .iter()
            .map(|p| {
                (
                    p.model.trim().to_lowercase(),
                    p.usd_per_1k_tokens / TOKENS_PER_PRICE_UNIT,
                )
            })
            .filter(|(prefix, _)| !prefix.is_empty())
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            entries,
            fallback_per_token: config.fallback_usd_per_1k_tokens / TOKENS_PER_PRICE_UNIT,
        }
    }

    /// USD per token for `model`.
    pub fn unit_price(&self, model: Option<&str>) -> f64 {
        let Some(model) = model else {
            return self.fallback_per_token;
        };

        let normalized = model.trim().to_lowercase();
        let name = normalized.rsplit('/').next().unwrap_or(&normalized);

        match self.entries.iter().find(|(prefix, _)| name.starts_with(prefix.as_str())) {
            Some((_, price)) => *price,
            None => {
                debug!(model, "No price configured for model, using fallback");
                self.fallback_per_token
            }
        }
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub cost_usd: f64,
    /// No token count was available; `cost_usd` is zero.
    pub estimated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CostCalculator {
    prices: PriceTable,
}

impl CostCalculator {
    pub fn new(prices: PriceTable) -> Self {
        Self { prices }
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }
}

impl MetricCalculator for CostCalculator {
    type Input = ConversationTurn;
    type Output = CostEstimate;

    fn calculate(&self, turn: &ConversationTurn) -> CostEstimate {
        match turn.token_count() {
            Some(tokens) => CostEstimate {
                cost_usd: tokens as f64 * self.prices.unit_price(turn.model_name()),
                estimated: false,
            },
            None => CostEstimate {
                cost_usd: 0.0,
                estimated: true,
            },
        }
    }
}
