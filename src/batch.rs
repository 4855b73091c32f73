/*!
 * Batch translation of sentence files.
 *
 * Input is either JSONL with a `src` field and an optional `tgt` reference
 * per line, or plain text with one sentence per line, optionally paired
 * line by line with a reference file (`common.zh` / `common.en`). Every translated
 * record is appended to the output as `{"src", "tgt", "hyp"}` and flushed
 * right away, so an interrupted run keeps what it finished.
 */

use futures::stream::{self, StreamExt};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::engine::AlignmentEngine;
use crate::errors::BatchError;
use crate::generation::is_generation_failure;
use crate::language_utils::LanguagePair;

/// Layout of a batch input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// One JSON object per line
    Jsonl,
    /// One sentence per line
    Lines,
}

impl InputFormat {
    /// `.jsonl` files are read as JSONL, everything else as lines
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") => Self::Jsonl,
            _ => Self::Lines,
        }
    }
}

impl FromStr for InputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(Self::Jsonl),
            "lines" | "text" | "txt" => Ok(Self::Lines),
            _ => Err(anyhow::anyhow!("Invalid input format: {}", s)),
        }
    }
}

#[derive(Deserialize)]
struct RawRecord {
    src: String,
    #[serde(default)]
    tgt: String,
}

/// One sentence to translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// 1-based line number in the input
    pub line: usize,
    pub src: String,
    /// Reference translation, empty when the input has none
    pub tgt: String,
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    src: &'a str,
    tgt: &'a str,
    hyp: &'a str,
}

/// Totals for one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub translated: usize,
    /// Records whose hypothesis is a generation failure marker
    pub failed_generations: usize,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.translated + self.failed_generations
    }
}

/// Parse batch input. Blank and malformed lines are skipped.
pub fn parse_records(content: &str, format: InputFormat) -> Vec<SourceRecord> {
    let mut records = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = index + 1;
        let text = raw_line.trim();
        if text.is_empty() {
            continue;
        }

        match format {
            InputFormat::Lines => records.push(SourceRecord {
                line,
                src: text.to_string(),
                tgt: String::new(),
            }),
            InputFormat::Jsonl => match serde_json::from_str::<RawRecord>(text) {
                Ok(raw) => records.push(SourceRecord {
                    line,
                    src: raw.src,
                    tgt: raw.tgt,
                }),
                Err(e) => warn!("Skipping malformed record at line {}: {}", line, e),
            },
        }
    }

    records
}

/// Pair source lines with reference lines.
///
/// Pairs where either side is blank are skipped. Extra lines in the longer
/// text are dropped with a warning.
pub fn parse_parallel(source: &str, reference: &str) -> Vec<SourceRecord> {
    let source_lines = source.lines().count();
    let reference_lines = reference.lines().count();
    if source_lines != reference_lines {
        warn!(
            "Source has {} line(s) but reference has {}; extra lines are ignored",
            source_lines, reference_lines
        );
    }

    source
        .lines()
        .zip(reference.lines())
        .enumerate()
        .filter_map(|(index, (src, tgt))| {
            let (src, tgt) = (src.trim(), tgt.trim());
            if src.is_empty() || tgt.is_empty() {
                return None;
            }
            Some(SourceRecord {
                line: index + 1,
                src: src.to_string(),
                tgt: tgt.to_string(),
            })
        })
        .collect()
}

/// Read and parse a batch input file, with an optional line-aligned reference file
pub fn read_records(
    path: &Path,
    format: InputFormat,
    reference: Option<&Path>,
) -> Result<Vec<SourceRecord>, BatchError> {
    let content = std::fs::read_to_string(path)?;
    match (reference, format) {
        (None, _) => Ok(parse_records(&content, format)),
        (Some(_), InputFormat::Jsonl) => Err(BatchError::ReferenceWithJsonl),
        (Some(reference), InputFormat::Lines) => {
            let reference = std::fs::read_to_string(reference)?;
            Ok(parse_parallel(&content, &reference))
        }
    }
}

/// Runs the alignment engine over many sentences
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    engine: AlignmentEngine,
    pair: LanguagePair,
    concurrent_sessions: usize,
}

impl BatchTranslator {
    pub fn new(engine: AlignmentEngine, pair: LanguagePair) -> Self {
        Self {
            engine,
            pair,
            concurrent_sessions: 1,
        }
    }

    /// Translate up to `sessions` sentences at the same time
    pub fn with_concurrency(mut self, sessions: usize) -> Self {
        self.concurrent_sessions = sessions.max(1);
        self
    }

    /// Translate `records` and write one JSON line per record to `writer`, in input order.
    ///
    /// `progress` is called with `(processed, total)` after each record.
    pub async fn translate_records<W, F>(
        &self,
        records: &[SourceRecord],
        writer: &mut W,
        progress: F,
    ) -> Result<BatchSummary, BatchError>
    where
        W: Write,
        F: Fn(usize, usize),
    {
        let mut summary = BatchSummary {
            total: records.len(),
            ..Default::default()
        };

        let results = stream::iter(records)
            .map(|record| async move {
                let hyp = self.engine.translate(&record.src, &self.pair).await;
                (record, hyp)
            })
            .buffered(self.concurrent_sessions);
        let mut results = std::pin::pin!(results);

        while let Some((record, hyp)) = results.next().await {
            if is_generation_failure(&hyp) {
                warn!("Line {}: generation failed: {}", record.line, hyp);
                summary.failed_generations += 1;
            } else {
                summary.translated += 1;
            }

            let output = OutputRecord {
                src: &record.src,
                tgt: &record.tgt,
                hyp: &hyp,
            };
            let json = serde_json::to_string(&output).map_err(|e| BatchError::InvalidRecord {
                line: record.line,
                message: e.to_string(),
            })?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;

            progress(summary.processed(), summary.total);
        }

        Ok(summary)
    }

    /// Translate an input file, appending results to `output`.
    ///
    /// `reference` supplies the `tgt` of each line of a line-format input.
    pub async fn translate_file<F>(
        &self,
        input: &Path,
        reference: Option<&Path>,
        output: &Path,
        format: InputFormat,
        progress: F,
    ) -> Result<BatchSummary, BatchError>
    where
        F: Fn(usize, usize),
    {
        let records = read_records(input, format, reference)?;
        info!(
            "Translating {} sentence(s) from {} ({})",
            records.len(),
            input.display(),
            self.pair
        );

        let file = OpenOptions::new().create(true).append(true).open(output)?;
        let mut writer = BufWriter::new(file);
        let summary = self.translate_records(&records, &mut writer, progress).await?;

        info!(
            "Batch finished: {} translated, {} failed, results appended to {}",
            summary.translated,
            summary.failed_generations,
            output.display()
        );
        Ok(summary)
    }
}
