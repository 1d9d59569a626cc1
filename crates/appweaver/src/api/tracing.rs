//! Run correlation ids and token/cost accounting.
//!
//! Every generation run gets a `trace_id` that prefixes its log lines, and
//! a [`CostTracker`] that sums token usage across rounds and converts it to
//! an approximate USD figure for the project's usage record.

use crate::UsageInfo;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Generate a unique trace id for a generation run.
pub fn generate_trace_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let ts = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("gen-{ts:x}-{count:04x}")
}

/// USD per one million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    pub fn estimate_cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (completion_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self::new(3.0, 15.0)
    }
}

/// Name fragments checked in order; first match wins.
const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    ("opus", ModelPricing::new(15.0, 75.0)),
    ("sonnet", ModelPricing::new(3.0, 15.0)),
    ("haiku", ModelPricing::new(0.80, 4.0)),
    ("4o-mini", ModelPricing::new(0.15, 0.60)),
    ("gpt-4o", ModelPricing::new(2.50, 10.0)),
    ("gpt-4.1", ModelPricing::new(2.0, 8.0)),
    ("flash", ModelPricing::new(0.30, 2.50)),
    ("gemini", ModelPricing::new(1.25, 10.0)),
    ("deepseek", ModelPricing::new(0.27, 1.10)),
];

/// Approximate pricing for an OpenRouter model id.
///
/// Only the segment after the last `/` is matched, so an org prefix such as
/// `acme-sonnet-labs/` cannot select the wrong row.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    let name = model.rsplit('/').next().unwrap_or(model).to_lowercase();
    PRICING_TABLE
        .iter()
        .find(|(fragment, _)| name.contains(fragment))
        .map(|(_, pricing)| *pricing)
        .unwrap_or_default()
}

/// Cumulative token usage and estimated spend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostTracker {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub estimated_cost_usd: f64,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, prompt_tokens: u64, completion_tokens: u64, pricing: &ModelPricing) {
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
        self.estimated_cost_usd += pricing.estimate_cost(prompt_tokens, completion_tokens);
    }

    /// Record a response's usage block. Missing counts are treated as zero.
    pub fn record_usage(&mut self, usage: &UsageInfo, pricing: &ModelPricing) {
        self.record(
            u64::from(usage.prompt_tokens.unwrap_or(0)),
            u64::from(usage.completion_tokens.unwrap_or(0)),
            pricing,
        );
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn summary(&self) -> String {
        format!(
            "tokens: {} prompt + {} completion = {} total, est. cost: ${:.4}",
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens(),
            self.estimated_cost_usd,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_ids_are_unique() {
        let a = generate_trace_id();
        let b = generate_trace_id();
        assert_ne!(a, b);
        assert!(a.starts_with("gen-"));
    }

    #[test]
    fn cost_estimation() {
        let cost = ModelPricing::new(3.0, 15.0).estimate_cost(1_000_000, 100_000);
        assert!((cost - 4.5).abs() < 1e-9);
    }

    #[test]
    fn pricing_matches_model_segment() {
        assert_eq!(pricing_for_model("anthropic/claude-opus-4").input_per_million, 15.0);
        assert_eq!(pricing_for_model("openai/gpt-4o-mini").input_per_million, 0.15);
        assert_eq!(
            pricing_for_model("acme-opus-labs/custom-model"),
            ModelPricing::default()
        );
    }

    #[test]
    fn tracker_accumulates_usage() {
        let mut tracker = CostTracker::new();
        let pricing = ModelPricing::default();
        tracker.record_usage(
            &UsageInfo {
                prompt_tokens: Some(1000),
                completion_tokens: Some(500),
                total_tokens: Some(1500),
            },
            &pricing,
        );
        tracker.record_usage(&UsageInfo::default(), &pricing);
        tracker.record(2000, 1000, &pricing);
        assert_eq!(tracker.prompt_tokens, 3000);
        assert_eq!(tracker.completion_tokens, 1500);
        assert_eq!(tracker.total_tokens(), 4500);
        assert!(tracker.estimated_cost_usd > 0.0);
        assert!(tracker.summary().contains("4500 total"));
    }
}
