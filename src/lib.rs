/*!
 * # IBUT - Iterative Bilingual Understanding Translation
 *
 * A Rust library that translates sentences with a language model by first
 * aligning how the model understands them in both languages.
 *
 * ## Features
 *
 * - Source-side and target-side contextual understanding of each sentence
 * - Iterative judgment and refinement until both understandings agree
 * - Translation conditioned on the aligned understandings
 * - Works against any text generator; bundled clients for:
 *   - Ollama (local LLM)
 *   - OpenAI-compatible APIs (DeepSeek, OpenAI, LM Studio)
 *   - Anthropic API
 * - Batch translation of JSONL or plain-text sentence files
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `engine`: The alignment protocol:
 *   - `engine::prompts`: Prompt construction
 *   - `engine::verdict`: Reading judgment responses
 *   - `engine::session`: Per-sentence session state
 * - `generation`: The `TextGenerator` port, the provider adapter and retries
 * - `providers`: Client implementations for various LLM providers:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::openai`: OpenAI-compatible API client
 *   - `providers::anthropic`: Anthropic API client
 *   - `providers::mock`: Scriptable provider for tests
 * - `batch`: File-level batch translation
 * - `app_config`: Configuration management
 * - `language_utils`: ISO language code utilities and language pairs
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod batch;
pub mod engine;
pub mod errors;
pub mod generation;
pub mod language_utils;
pub mod providers;

// Re-export main types for easier usage
pub use app_config::Config;
pub use batch::{BatchSummary, BatchTranslator, InputFormat};
pub use engine::{AlignmentEngine, AlignmentVerdict, TranslationOutcome, UnderstandingPair};
pub use errors::{AppError, BatchError, LanguageError, ProviderError};
pub use generation::{is_generation_failure, ProviderGenerator, RetryingProvider, TextGenerator};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t, LanguagePair, LanguageSide};
