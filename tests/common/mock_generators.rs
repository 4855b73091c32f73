/*!
 * Scripted text generators for testing
 *
 * `ScriptedGenerator` recognises which protocol step a prompt belongs to,
 * answers with a predictable token and records every call:
 *
 * - understandings: `SU0` / `TU0`
 * - judgments: taken from a script, then a default (`False`)
 * - feedback after judgment `r`: `FS{r}` / `FT{r}`
 * - refinement after judgment `r`: `SU{r}` / `TU{r}`
 * - translation: `EN:{sentence}`
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ibut::generation::TextGenerator;
use ibut::language_utils::LanguagePair;

/// Protocol step a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SourceUnderstanding,
    TargetUnderstanding,
    Judgment,
    SourceFeedback,
    TargetFeedback,
    SourceRefinement,
    TargetRefinement,
    Translation,
    Unknown,
}

/// One call seen by the generator
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub step: Step,
    pub prompt: String,
    pub response: String,
}

/// Work out which step produced `prompt`
pub fn classify(prompt: &str, pair: &LanguagePair) -> Step {
    let source = pair.source_name();
    let target = pair.target_name();

    if prompt.starts_with("Please fully understand") {
        if prompt.contains(&format!("describe, in {},", source)) {
            Step::SourceUnderstanding
        } else {
            Step::TargetUnderstanding
        }
    } else if prompt.starts_with("If you are a linguist proficient in both") {
        if prompt.contains(&format!("current {} contextual understanding", source)) {
            Step::SourceRefinement
        } else {
            Step::TargetRefinement
        }
    } else if prompt.contains("linguist, determine whether") {
        Step::Judgment
    } else if prompt.starts_with("Based on the contextual understandings") {
        Step::Translation
    } else if prompt.starts_with(&format!("If you are a {} linguist, based on", source)) {
        Step::SourceFeedback
    } else if prompt.starts_with(&format!("If you are a {} linguist, based on", target)) {
        Step::TargetFeedback
    } else {
        Step::Unknown
    }
}

/// The sentence a prompt was built for
pub fn sentence_of(prompt: &str) -> &str {
    prompt
        .rsplit("source_sentence: ")
        .next()
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
}

/// Deterministic generator that follows the protocol
#[derive(Debug)]
pub struct ScriptedGenerator {
    pair: LanguagePair,
    scripted_judgments: Mutex<VecDeque<String>>,
    default_judgment: String,
    fail_at: Option<Step>,
    translation_delay: Option<fn(&str) -> Duration>,
    judgments: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    /// Generator whose judgments all report alignment
    pub fn new(pair: LanguagePair) -> Self {
        Self {
            pair,
            scripted_judgments: Mutex::new(VecDeque::new()),
            default_judgment: "False".to_string(),
            fail_at: None,
            translation_delay: None,
            judgments: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer judgments from `responses` first, in order
    pub fn with_judgments<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripted_judgments
            .lock()
            .extend(responses.into_iter().map(Into::into));
        self
    }

    /// Answer unscripted judgments with `response`
    pub fn with_default_judgment(mut self, response: impl Into<String>) -> Self {
        self.default_judgment = response.into();
        self
    }

    /// Every judgment reports misalignment
    pub fn always_misaligned(self) -> Self {
        self.with_default_judgment("True")
    }

    /// Answer every prompt of `step` with a failure marker
    pub fn failing_at(mut self, step: Step) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// Delay translation calls by a per-sentence amount
    pub fn with_translation_delay(mut self, delay: fn(&str) -> Duration) -> Self {
        self.translation_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.calls.lock().iter().map(|c| c.step).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count(&self, step: Step) -> usize {
        self.calls.lock().iter().filter(|c| c.step == step).count()
    }

    /// Prompts sent for `step`, in call order
    pub fn prompts_for(&self, step: Step) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.step == step)
            .map(|c| c.prompt.clone())
            .collect()
    }

    /// Highest number of calls that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, step: Step, prompt: &str) -> String {
        if self.fail_at == Some(step) {
            return format!("Error: simulated failure at {:?}", step);
        }

        let round = self.judgments.load(Ordering::SeqCst);
        match step {
            Step::SourceUnderstanding => "SU0".to_string(),
            Step::TargetUnderstanding => "TU0".to_string(),
            Step::Judgment => {
                self.judgments.fetch_add(1, Ordering::SeqCst);
                self.scripted_judgments
                    .lock()
                    .pop_front()
                    .unwrap_or_else(|| self.default_judgment.clone())
            }
            Step::SourceFeedback => format!("FS{}", round),
            Step::TargetFeedback => format!("FT{}", round),
            Step::SourceRefinement => format!("SU{}", round),
            Step::TargetRefinement => format!("TU{}", round),
            Step::Translation => format!("EN:{}", sentence_of(prompt)),
            Step::Unknown => "UNKNOWN".to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> String {
        let step = classify(prompt, &self.pair);

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if step == Step::Translation {
            if let Some(delay) = self.translation_delay {
                tokio::time::sleep(delay(sentence_of(prompt))).await;
            }
        } else {
            tokio::task::yield_now().await;
        }

        let response = self.respond(step, prompt);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.calls.lock().push(RecordedCall {
            step,
            prompt: prompt.to_string(),
            response: response.clone(),
        });
        response
    }
}
