//! Advisory provider trait for natural-language model recommendations.
//!
//! An [`AdvisoryProvider`] turns a [`DataSummary`] into an [`Advisory`]
//! by asking an external LLM. The Suggestion Engine treats every error from
//! a provider as "no advisory" and falls back to the performance ranking.
//!
//! # Implementing a New Provider
//!
//! 1. Create a new file in `src/ai/`
//! 2. Implement [`AdvisoryProvider`], typically with [`build_prompt`] and
//!    [`parse_advisory`] around the provider's HTTP call
//! 3. Export the provider in `src/ai/mod.rs`
//!
//! [`build_prompt`]: super::build_prompt
//! [`parse_advisory`]: super::parse_advisory

use super::advisory::{Advisory, DataSummary};
use anyhow::Result;

/// Trait for services that recommend models from a dataset summary.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the Suggestion Engine calls
/// [`recommend`](Self::recommend) from a worker thread.
pub trait AdvisoryProvider: Send + Sync {
    /// Ask for recommendations for the dataset described by `summary`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply cannot be parsed into
    /// at least one registered model name.
    fn recommend(&self, summary: &DataSummary) -> Result<Advisory>;

    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Model used by this provider, if it exposes one.
    fn model(&self) -> Option<&str> {
        None
    }
}
