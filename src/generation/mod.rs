/*!
 * The text generation port.
 *
 * Everything the alignment engine knows about language models is the
 * [`TextGenerator`] trait: a prompt goes in, text comes out. Failures are not
 * raised through the port; they come back as text starting with
 * [`GENERATION_ERROR_PREFIX`], so a session always runs to completion.
 *
 * - `adapter`: [`ProviderGenerator`], which puts a fallible provider behind
 *   the port and tracks token usage
 * - `retry`: [`RetryingProvider`], an exponential backoff decorator for
 *   providers
 */

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::sync::Arc;

pub mod adapter;
pub mod retry;

pub use adapter::{ProviderGenerator, TokenUsageStats};
pub use retry::RetryingProvider;

/// Prefix of the text returned in place of a failed generation
pub const GENERATION_ERROR_PREFIX: &str = "Error: ";

/// Abstract `generate(prompt) -> text` capability.
///
/// Implementations must be safe to call from several sessions at once.
/// They must not fail: a failure is reported as marker text (see
/// [`generation_failure_marker`]).
#[async_trait]
pub trait TextGenerator: Send + Sync + Debug {
    /// Generate text for a prompt
    async fn generate(&self, prompt: &str) -> String;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, prompt: &str) -> String {
        (**self).generate(prompt).await
    }
}

/// Marker text for a failed generation
pub fn generation_failure_marker(error: impl Display) -> String {
    format!("{}{}", GENERATION_ERROR_PREFIX, error)
}

/// Whether a generated text is a failure marker.
///
/// The engine never calls this; drivers use it to report degraded results.
pub fn is_generation_failure(text: &str) -> bool {
    text.starts_with(GENERATION_ERROR_PREFIX)
}
