//! Configuration for the [`Harness`](super::harness::Harness).
//!
//! ```ignore
//! let config = HarnessConfig::new("anthropic/claude-sonnet-4")
//!     .with_max_rounds(10)
//!     .with_max_tokens(16_000)
//!     .with_retries(2);
//! ```

use crate::DEFAULT_MODEL;
use crate::api::retry::RetryConfig;

/// Default turn budget for one generation run.
pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Default response token budget for create-mode runs.
pub const DEFAULT_CREATE_MAX_TOKENS: u32 = 8192;

/// Default response token budget for update-mode runs, which must be able
/// to re-emit whole files.
pub const DEFAULT_UPDATE_MAX_TOKENS: u32 = 16_000;

/// Settings for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// OpenRouter model id.
    pub model: String,
    /// Maximum model round trips before the loop gives up.
    pub max_rounds: u32,
    /// Response token budget per request.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Backoff policy for transient upstream failures.
    pub retry: RetryConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl HarnessConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_tokens: DEFAULT_CREATE_MAX_TOKENS,
            temperature: 0.7,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Shorthand for `RetryConfig::with_retries(n)`.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retry = RetryConfig::with_retries(retries);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
