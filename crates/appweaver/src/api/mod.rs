//! Support code between the [`Harness`](crate::agent::Harness) loop and the
//! OpenRouter API.
//!
//! - [`retry`]: exponential backoff for transient upstream failures (timeouts,
//!   429, 5xx). Never retries client errors.
//! - [`tracing`]: per-run trace ids, per-model pricing and the cumulative
//!   [`CostTracker`].

pub mod retry;
pub mod tracing;

pub use retry::{RetryConfig, retry_api_call};
pub use tracing::{CostTracker, ModelPricing, generate_trace_id, pricing_for_model};
