//! Optional LLM advisory for model recommendations.
//!
//! # Feature Flag
//!
//! The [`AdvisoryProvider`] trait and the prompt/reply helpers are always
//! available. The HTTP provider needs the `ai` feature (on by default):
//!
//! ```toml
//! modelpick-engine = { version = "0.1", default-features = false }
//! ```
//!
//! # Providers
//!
//! - [`ChatCompletionsProvider`] - OpenAI-compatible chat completions
//!   (requires `ai` feature)

mod advisory;
mod provider;

pub use advisory::{Advisory, DataSummary, build_prompt, parse_advisory};
pub use provider::AdvisoryProvider;

#[cfg(feature = "ai")]
mod chat_completions;

#[cfg(feature = "ai")]
pub use chat_completions::{
    API_KEY_ENV, ChatCompletionsConfig, ChatCompletionsConfigBuilder, ChatCompletionsProvider,
};
