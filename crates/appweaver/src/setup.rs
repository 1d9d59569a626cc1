//! Shared start-up for the `appweaver` and `appweaver-web` binaries:
//! logging, generation flags, and generator selection.

use crate::generator::{GenerationConfig, Generator, LlmGenerator, TemplateGenerator};
use crate::{ApiError, DEFAULT_MODEL, OpenRouterClient};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the OpenRouter API key.
pub const API_KEY_ENV: &str = "OPENROUTER_KEY";

/// Generation flags common to both binaries.
#[derive(Args, Debug, Clone)]
pub struct GeneratorArgs {
    /// OpenRouter model id.
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Maximum model round trips per generation.
    #[arg(
        long,
        default_value_t = crate::agent::config::DEFAULT_MAX_ROUNDS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_rounds: u32,

    /// Response token budget for new projects.
    #[arg(long, default_value_t = crate::agent::config::DEFAULT_CREATE_MAX_TOKENS)]
    pub create_max_tokens: u32,

    /// Response token budget for iterations.
    #[arg(long, default_value_t = crate::agent::config::DEFAULT_UPDATE_MAX_TOKENS)]
    pub update_max_tokens: u32,

    /// Per-request timeout for LLM calls, in seconds.
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Retries for transient LLM failures (timeouts, 429, 5xx).
    #[arg(long, default_value_t = 2)]
    pub retries: u32,
}

impl GeneratorArgs {
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::default()
            .with_model(self.model.clone())
            .with_max_rounds(self.max_rounds)
            .with_create_max_tokens(self.create_max_tokens)
            .with_update_max_tokens(self.update_max_tokens)
            .with_retries(self.retries)
    }

    /// An [`LlmGenerator`] when `api_key` is set, otherwise the offline
    /// [`TemplateGenerator`].
    pub fn build_generator(&self, api_key: Option<String>) -> Result<Arc<dyn Generator>, ApiError> {
        match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                let client = OpenRouterClient::with_options(
                    key,
                    "https://github.com/appweaver/appweaver",
                    "appweaver",
                    Duration::from_secs(self.timeout_secs),
                )?;
                info!("Using LLM generator with model {}", self.model);
                Ok(Arc::new(LlmGenerator::new(
                    Arc::new(client),
                    self.generation_config(),
                )))
            }
            None => {
                warn!("{API_KEY_ENV} is not set; falling back to the static template generator");
                Ok(Arc::new(TemplateGenerator))
            }
        }
    }
}

/// Read the API key from [`API_KEY_ENV`].
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV).ok()
}

/// Install a `fmt` subscriber on stderr filtered by `RUST_LOG` (default
/// `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        generation: GeneratorArgs,
    }

    #[test]
    fn defaults_match_library_defaults() {
        let cli = TestCli::parse_from(["test"]);
        let config = cli.generation.generation_config();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.create_max_tokens, 8192);
        assert_eq!(config.update_max_tokens, 16_000);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(cli.generation.timeout_secs, 120);
    }

    #[test]
    fn flags_override() {
        let cli = TestCli::parse_from([
            "test",
            "--model",
            "openai/gpt-4o",
            "--max-rounds",
            "3",
            "--retries",
            "0",
        ]);
        let config = cli.generation.generation_config();
        assert_eq!(config.model, "openai/gpt-4o");
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.retry.max_retries, 0);
    }

    #[test]
    fn zero_rounds_is_rejected() {
        assert!(TestCli::try_parse_from(["test", "--max-rounds", "0"]).is_err());
        assert!(TestCli::try_parse_from(["test", "--max-rounds", "1"]).is_ok());
    }

    #[test]
    fn missing_or_blank_key_selects_template() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.generation.build_generator(None).unwrap().name(), "template");
        assert_eq!(
            cli.generation
                .build_generator(Some("  ".into()))
                .unwrap()
                .name(),
            "template"
        );
        assert_eq!(
            cli.generation
                .build_generator(Some("sk-test".into()))
                .unwrap()
                .name(),
            "llm"
        );
    }
}
