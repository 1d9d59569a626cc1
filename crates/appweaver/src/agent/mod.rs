//! The generation loop and the pieces it is configured with.
//!
//! - [`harness`]: the [`Harness`] tool-use loop.
//! - [`config`]: [`HarnessConfig`] (model, turn budget, token budget, retry).
//! - [`events`]: [`HarnessEvent`], [`EventHandler`] and [`HarnessResult`].
//! - [`prompt`]: the create/update system prompts and [`SystemPromptBuilder`].

pub mod config;
pub mod events;
pub(crate) mod execution;
pub mod harness;
pub mod prompt;

pub use config::HarnessConfig;
pub use events::{
    CompositeEventHandler, EventHandler, HarnessEvent, HarnessResult, LoggingHandler, NoopHandler,
};
pub use harness::Harness;
pub use prompt::SystemPromptBuilder;
