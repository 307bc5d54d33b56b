use rag_audit_core::{ConversationTurn, MetricCalculator, PerformanceMetrics, PricingConfig};

use super::{CostCalculator, LatencyCalculator, PriceTable};

/// Latency and cost for one turn. Never fails: a missing input gates its
/// dimension to a sentinel.
#[derive(Debug, Clone, Default)]
pub struct PerformanceCalculator {
    latency: LatencyCalculator,
    cost: CostCalculator,
}

impl PerformanceCalculator {
    pub fn new(pricing: &PricingConfig) -> Self {
        Self::with_prices(PriceTable::from_config(pricing))
    }

    pub fn with_prices(prices: PriceTable) -> Self {
        Self {
            latency: LatencyCalculator::new(),
            cost: CostCalculator::new(prices),
        }
    }

    pub fn compute(&self, turn: &ConversationTurn) -> PerformanceMetrics {
        self.calculate(turn)
    }
}

impl MetricCalculator for PerformanceCalculator {
    type Input = ConversationTurn;
    type Output = PerformanceMetrics;

    fn calculate(&self, turn: &ConversationTurn) -> PerformanceMetrics {
        let cost = self.cost.calculate(turn);
        PerformanceMetrics::new(self.latency.calculate(turn), cost.cost_usd, cost.estimated)
    }
}
