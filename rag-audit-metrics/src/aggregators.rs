use rag_audit_core::{EvaluationResult, QualityScores, ReportSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub count: usize,
    pub sum: f64,
}

pub struct MetricAggregator;

impl MetricAggregator {
    /// `None` for an empty sample.
    pub fn aggregate(values: &[f64]) -> Option<AggregatedMetrics> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let sum: f64 = values.iter().sum();

        Some(AggregatedMetrics {
            mean: sum / values.len() as f64,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p50: Self::percentile(&sorted, 50.0),
            p95: Self::percentile(&sorted, 95.0),
            count: values.len(),
            sum,
        })
    }

    pub fn mean(values: &[f64]) -> Option<f64> {
        Self::aggregate(values).map(|a| a.mean)
    }

    /// Nearest-rank percentile over an ascending sample.
    pub fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
        if sorted_values.is_empty() {
            return 0.0;
        }
        let index = (percentile / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
        sorted_values[index.min(sorted_values.len() - 1)]
    }

    /// Run-level summary. Latency statistics cover results with a known
    /// latency; score means cover scored results only.
    pub fn summarize(results: &[EvaluationResult]) -> ReportSummary {
        let metrics: Vec<_> = results.iter().filter_map(|r| r.performance_metrics).collect();

        let latencies: Vec<f64> = metrics
            .iter()
            .filter_map(|m| m.latency_ms)
            .map(|ms| ms as f64)
            .collect();
        let latency = Self::aggregate(&latencies);

        let scores: Vec<_> = results.iter().filter_map(|r| r.quality_scores.as_ref()).collect();
        let dimension_mean = |pick: fn(&QualityScores) -> u8| -> Option<f64> {
            let values: Vec<f64> = scores.iter().map(|s| f64::from(pick(s))).collect();
            Self::mean(&values)
        };

        ReportSummary {
            mean_latency_ms: latency.as_ref().map(|a| a.mean),
            p50_latency_ms: latency.as_ref().map(|a| a.p50),
            p95_latency_ms: latency.as_ref().map(|a| a.p95),
            total_cost_usd: metrics.iter().map(|m| m.cost_usd).sum(),
            estimated_cost_count: metrics.iter().filter(|m| m.cost_estimated).count(),
            mean_relevance: dimension_mean(|s| s.relevance_score),
            mean_completeness: dimension_mean(|s| s.completeness_score),
            mean_factual_accuracy: dimension_mean(|s| s.factual_accuracy_score),
        }
    }
}
