/*!
 * Tests for batch translation of sentence files
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ibut::batch::{BatchTranslator, InputFormat};
use ibut::engine::AlignmentEngine;

use crate::common::mock_generators::{ScriptedGenerator, Step};
use crate::common::{self, zh_en};

fn translator(generator: ScriptedGenerator, max_iterations: usize) -> (BatchTranslator, Arc<ScriptedGenerator>) {
    common::init_test_logging();
    let generator = Arc::new(generator);
    let engine = AlignmentEngine::new(generator.clone(), max_iterations);
    (BatchTranslator::new(engine, zh_en()), generator)
}

fn read_output(path: &std::path::Path) -> Result<Vec<serde_json::Value>> {
    let mut records = Vec::new();
    for line in fs::read_to_string(path)?.lines() {
        records.push(serde_json::from_str(line)?);
    }
    Ok(records)
}

#[tokio::test]
async fn test_translateFile_withJsonl_shouldWriteSrcTgtHyp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "test.jsonl",
        "{\"src\": \"人工智能技术正在迅速发展。\", \"tgt\": \"AI is developing rapidly.\"}\n\
         \n\
         this line is not json\n\
         {\"src\": \"远程教育得到了广泛应用。\"}\n",
    )?;
    let output = temp_dir.path().join("hyp.jsonl");
    let (translator, _) = translator(ScriptedGenerator::new(zh_en()), 1);

    let summary = translator
        .translate_file(&input, None, &output, InputFormat::detect(&input), |_, _| {})
        .await?;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.translated, 2);
    assert_eq!(summary.failed_generations, 0);

    let records = read_output(&output)?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["src"], "人工智能技术正在迅速发展。");
    assert_eq!(records[0]["tgt"], "AI is developing rapidly.");
    assert_eq!(records[0]["hyp"], "EN:人工智能技术正在迅速发展。");
    assert_eq!(records[1]["tgt"], "");
    Ok(())
}

#[tokio::test]
async fn test_translateFile_shouldAppendToExistingOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "common.zh", "第一句。\n第二句。\n")?;
    let output = common::create_test_file(temp_dir.path(), "hyp.jsonl", "{\"src\":\"earlier\",\"tgt\":\"\",\"hyp\":\"run\"}\n")?;
    let (translator, _) = translator(ScriptedGenerator::new(zh_en()), 0);

    translator.translate_file(&input, None, &output, InputFormat::Lines, |_, _| {}).await?;

    let records = read_output(&output)?;
    let sources: Vec<_> = records.iter().map(|r| r["src"].as_str().unwrap_or_default().to_string()).collect();
    assert_eq!(sources, vec!["earlier", "第一句。", "第二句。"]);
    Ok(())
}

#[tokio::test]
async fn test_translateRecords_withConcurrency_shouldKeepInputOrder() -> Result<()> {
    let records = ibut::batch::parse_records("s1\ns2\ns3\ns4\n", InputFormat::Lines);
    // Earlier sentences take longer, so they finish last
    let generator = ScriptedGenerator::new(zh_en()).with_translation_delay(|sentence| match sentence {
        "s1" => Duration::from_millis(40),
        "s2" => Duration::from_millis(20),
        _ => Duration::from_millis(1),
    });
    let (translator, generator) = translator(generator, 0);
    let translator = translator.with_concurrency(4);

    let mut buffer = Vec::new();
    let progress_calls = AtomicUsize::new(0);
    let summary = translator
        .translate_records(&records, &mut buffer, |done, total| {
            assert_eq!(total, 4);
            assert_eq!(done, progress_calls.fetch_add(1, Ordering::SeqCst) + 1);
        })
        .await?;

    assert_eq!(summary.processed(), 4);
    assert_eq!(progress_calls.load(Ordering::SeqCst), 4);
    assert!(generator.max_in_flight() > 1);

    let hyps: Vec<String> = String::from_utf8(buffer)?
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).map(|v| v["hyp"].as_str().unwrap_or_default().to_string()))
        .collect::<Result<_, _>>()?;
    assert_eq!(hyps, vec!["EN:s1", "EN:s2", "EN:s3", "EN:s4"]);
    Ok(())
}

#[tokio::test]
async fn test_translateRecords_withFailingTranslation_shouldCountFailures() -> Result<()> {
    let records = ibut::batch::parse_records("{\"src\": \"一\"}\n{\"src\": \"二\"}\n", InputFormat::Jsonl);
    let (translator, generator) = translator(ScriptedGenerator::new(zh_en()).failing_at(Step::Translation), 1);

    let mut buffer = Vec::new();
    let summary = translator.translate_records(&records, &mut buffer, |_, _| {}).await?;

    assert_eq!(summary.translated, 0);
    assert_eq!(summary.failed_generations, 2);
    assert_eq!(generator.count(Step::Translation), 2);

    // Failed records are still written, with the marker as hypothesis
    let output = String::from_utf8(buffer)?;
    assert_eq!(output.lines().count(), 2);
    assert!(output.contains("Error: simulated failure at Translation"));
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (translator, _) = translator(ScriptedGenerator::new(zh_en()), 0);

    let result = translator
        .translate_file(&temp_dir.path().join("missing.jsonl"), None, &temp_dir.path().join("out.jsonl"), InputFormat::Jsonl, |_, _| {})
        .await;

    assert!(matches!(result, Err(ibut::errors::BatchError::Io(_))));
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withReferenceFile_shouldFillTgt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "common.zh", "人工智能正在发展。\n\n远程教育很普遍。\n第三句。\n")?;
    let reference = common::create_test_file(temp_dir.path(), "common.en", "AI is developing.\nOrphan line.\nRemote learning is common.\n")?;
    let output = temp_dir.path().join("hyp.jsonl");
    let (translator, _) = translator(ScriptedGenerator::new(zh_en()), 0);

    let summary = translator
        .translate_file(&input, Some(&reference), &output, InputFormat::Lines, |_, _| {})
        .await?;

    // Line 2 has a blank source and line 4 has no reference
    assert_eq!(summary.total, 2);
    let records = read_output(&output)?;
    assert_eq!(records[0]["src"], "人工智能正在发展。");
    assert_eq!(records[0]["tgt"], "AI is developing.");
    assert_eq!(records[0]["hyp"], "EN:人工智能正在发展。");
    assert_eq!(records[1]["tgt"], "Remote learning is common.");
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withReferenceAndJsonl_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "test.jsonl", "{\"src\": \"一\"}\n")?;
    let reference = common::create_test_file(temp_dir.path(), "common.en", "one\n")?;
    let (translator, generator) = translator(ScriptedGenerator::new(zh_en()), 0);

    let result = translator
        .translate_file(&input, Some(&reference), &temp_dir.path().join("out.jsonl"), InputFormat::Jsonl, |_, _| {})
        .await;

    assert!(matches!(result, Err(ibut::errors::BatchError::ReferenceWithJsonl)));
    assert_eq!(generator.call_count(), 0);
    Ok(())
}
