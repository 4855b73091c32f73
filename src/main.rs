// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ibut::app_config::{self, Config, TranslationProvider};
use ibut::batch::{BatchTranslator, InputFormat};
use ibut::engine::{AlignmentEngine, AlignmentVerdict, TranslationOutcome};
use ibut::generation::{is_generation_failure, ProviderGenerator, RetryingProvider};
use ibut::language_utils::{LanguagePair, LanguageSide};
use ibut::providers::{self, Provider};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for InputFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliInputFormat {
    Jsonl,
    Lines,
}

impl From<CliInputFormat> for InputFormat {
    fn from(format: CliInputFormat) -> Self {
        match format {
            CliInputFormat::Jsonl => InputFormat::Jsonl,
            CliInputFormat::Lines => InputFormat::Lines,
        }
    }
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Configuration file path
    #[arg(short, long = "config", global = true, default_value = "conf.json")]
    config_path: PathBuf,

    /// Translation provider to use
    #[arg(short, long, global = true, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API key for the selected provider
    #[arg(long, global = true, env = "IBUT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug, Clone)]
struct LanguageArgs {
    /// Translation direction, e.g. 'zh-en'
    #[arg(short, long, conflicts_with_all = ["source_language", "target_language"])]
    direction: Option<String>,

    /// Source language code (e.g., 'zh', 'de', 'fre')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'ger')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Maximum judgment/refinement rounds
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a single sentence
    Translate {
        /// The sentence to translate
        #[arg(value_name = "SENTENCE")]
        sentence: String,

        #[command(flatten)]
        languages: LanguageArgs,

        /// Print the understandings and judgments of every phase
        #[arg(long)]
        trace: bool,
    },

    /// Translate a file of sentences
    Batch {
        /// JSONL file with a `src` field per line, or plain text with one sentence per line
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// JSONL file the results are appended to
        #[arg(short, long)]
        output: PathBuf,

        /// Reference translations, one per line of a plain-text INPUT
        #[arg(short, long, value_name = "FILE")]
        reference: Option<PathBuf>,

        /// Input format (detected from the file extension by default)
        #[arg(short, long, value_enum)]
        format: Option<CliInputFormat>,

        /// Number of sentences translated at the same time
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        #[command(flatten)]
        languages: LanguageArgs,
    },

    /// Test the connection to the configured provider
    Check,

    /// Generate shell completions for ibut
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// IBUT - Iterative Bilingual Understanding Translation
///
/// Translates sentences with a language model after aligning the model's
/// source-side and target-side understanding of them.
#[derive(Parser, Debug)]
#[command(name = "ibut")]
#[command(version)]
#[command(about = "Iterative bilingual understanding translation")]
#[command(long_about = "IBUT translates a sentence in four phases: it asks the model to explain the
sentence in the source and in the target language, checks whether both explanations
agree, refines them until they do, and finally translates with both in context.

EXAMPLES:
    ibut translate '气候变化是当今人类面临的最严峻挑战之一。'   # zh-en from the default config
    ibut translate -d de-fr 'Das ist ein Test.'            # explicit direction
    ibut translate -n 1 --trace '人工智能正在迅速发展。'       # show every phase
    ibut batch data/test.jsonl -o result/hyp.jsonl         # batch with references
    ibut batch data/common.zh -r data/common.en -o hyp.jsonl  # parallel text files
    ibut -p ollama -m qwen2.5:7b check                     # test a local model
    ibut completions bash > ibut.bash                      # generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. The API key can also be supplied through the
    IBUT_API_KEY environment variable.

SUPPORTED PROVIDERS:
    openai    - OpenAI-compatible API (default: DeepSeek, requires API key)
    anthropic - Anthropic Claude API (requires API key)
    ollama    - Local Ollama server
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace lets set_max_level raise the level after the config is read
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "ibut", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.global.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.global.config_path)?;
    apply_global_overrides(&mut config, &cli.global);

    match cli.command {
        Commands::Translate { sentence, languages, trace } => {
            apply_language_overrides(&mut config, &languages)?;
            let (config, pair) = finish_config(config, &cli.global)?;
            run_translate(&config, &pair, &sentence, trace).await
        }
        Commands::Batch { input, output, reference, format, concurrency, languages } => {
            apply_language_overrides(&mut config, &languages)?;
            if let Some(sessions) = concurrency {
                config.batch.concurrent_sessions = sessions;
            }
            let (config, pair) = finish_config(config, &cli.global)?;
            let format = format.map(InputFormat::from).unwrap_or_else(|| InputFormat::detect(&input));
            run_batch(&config, &pair, &input, reference.as_deref(), &output, format).await
        }
        Commands::Check => {
            let (config, _) = finish_config(config, &cli.global)?;
            run_check(&config).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

// @modifies: Provider, model and API key from command line
fn apply_global_overrides(config: &mut Config, global: &GlobalArgs) {
    if let Some(provider) = &global.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &global.model {
        config.translation.set_model(model.clone());
    }

    // --api-key also picks up IBUT_API_KEY through clap
    match &global.api_key {
        Some(key) if !key.is_empty() => config.translation.set_api_key(key.clone()),
        _ => config.apply_env_api_key(),
    }

    if let Some(level) = &global.log_level {
        config.log_level = level.clone().into();
    }
}

// @modifies: Language pair and iteration bound from command line
fn apply_language_overrides(config: &mut Config, languages: &LanguageArgs) -> Result<()> {
    if let Some(direction) = &languages.direction {
        let pair = LanguagePair::parse_direction(direction)?;
        config.source_language = pair.source_code().to_string();
        config.target_language = pair.target_code().to_string();
    }

    if let Some(source) = &languages.source_language {
        config.source_language = source.clone();
    }

    if let Some(target) = &languages.target_language {
        config.target_language = target.clone();
    }

    if let Some(max_iterations) = languages.max_iterations {
        config.max_iterations = max_iterations;
    }

    Ok(())
}

// @returns: Validated config and its language pair
fn finish_config(config: Config, global: &GlobalArgs) -> Result<(Config, LanguagePair)> {
    config.validate().context("Configuration validation failed")?;

    if global.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let pair = config.language_pair()?;
    Ok((config, pair))
}

// @returns: Provider stack with retries behind the generation port
fn build_generator(config: &Config) -> Result<Arc<ProviderGenerator>> {
    let provider = providers::create_provider(&config.translation)?;
    let common = &config.translation.common;
    let retrying: Arc<dyn Provider> = Arc::new(RetryingProvider::new(
        provider,
        common.retry_count,
        common.retry_backoff_ms,
    ));

    info!(
        "Using {} with model {}",
        config.translation.provider.display_name(),
        config.translation.get_model()
    );
    Ok(Arc::new(ProviderGenerator::new(retrying)))
}

async fn run_translate(config: &Config, pair: &LanguagePair, sentence: &str, trace: bool) -> Result<()> {
    let generator = build_generator(config)?;
    let engine = AlignmentEngine::new(generator.clone(), config.max_iterations);

    info!(
        "Translating {} -> {} with at most {} iteration(s)",
        pair.source_name(),
        pair.target_name(),
        config.max_iterations
    );
    let outcome = engine.translate_with_trace(sentence, pair).await;

    if trace {
        print_trace(&outcome, pair);
    }
    println!("{}", outcome.translation);

    if is_generation_failure(&outcome.translation) {
        warn!("The translation is a generation failure marker, check the provider settings");
    }
    info!("{}", generator.usage().summary());
    Ok(())
}

async fn run_batch(
    config: &Config,
    pair: &LanguagePair,
    input: &Path,
    reference: Option<&Path>,
    output: &Path,
    format: InputFormat,
) -> Result<()> {
    let generator = build_generator(config)?;
    let engine = AlignmentEngine::new(generator.clone(), config.max_iterations);
    let translator = BatchTranslator::new(engine, pair.clone())
        .with_concurrency(config.batch.concurrent_sessions);

    let progress_bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sentences ({percent}%) {eta}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("#>-"));

    let summary = translator
        .translate_file(input, reference, output, format, |done, total| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(done as u64);
        })
        .await
        .with_context(|| format!("Batch translation of {} failed", input.display()))?;
    progress_bar.finish_and_clear();

    if summary.failed_generations > 0 {
        warn!("{} of {} sentence(s) ended in a generation failure", summary.failed_generations, summary.total);
    }
    info!("{}", generator.usage().summary());
    Ok(())
}

async fn run_check(config: &Config) -> Result<()> {
    let generator = build_generator(config)?;
    let provider = generator.provider();
    provider
        .test_connection()
        .await
        .with_context(|| format!("Could not reach {} at {}", provider.name(), config.translation.get_endpoint()))?;
    info!("{} is reachable at {}", provider.name(), config.translation.get_endpoint());
    Ok(())
}

fn print_trace(outcome: &TranslationOutcome, pair: &LanguagePair) {
    println!("=== Initial understanding ===");
    for side in LanguageSide::BOTH {
        println!("[{}]\n{}\n", pair.name(side), outcome.initial.get(side));
    }

    for round in &outcome.rounds {
        let label = if round.judgment.verdict.is_aligned() { "aligned" } else { "misaligned" };
        println!("=== Round {}: {} ===", round.iteration, label);
        println!("{}\n", round.judgment.response);

        if let AlignmentVerdict::Misaligned { source_feedback, target_feedback } = &round.judgment.verdict {
            println!("[{} feedback]\n{}\n", pair.name(LanguageSide::Source), source_feedback);
            println!("[{} feedback]\n{}\n", pair.name(LanguageSide::Target), target_feedback);
        }
        if let Some(refined) = &round.refined {
            for side in LanguageSide::BOTH {
                println!("[{} refined]\n{}\n", pair.name(side), refined.get(side));
            }
        }
    }

    println!("=== Translation ===");
}
