/*!
 * Iterative bilingual understanding alignment.
 *
 * For one sentence the engine runs four phases against a [`TextGenerator`]:
 *
 * 1. Understanding: a source-language and a target-language description of
 *    the sentence's key concepts, requested concurrently.
 * 2. Judgment: ask whether the two understandings diverge. On divergence,
 *    request corrective feedback for each side.
 * 3. Refinement: rewrite each understanding from its feedback. Phases 2 and 3
 *    repeat until a judgment reports alignment or `max_iterations` judgments
 *    have been issued.
 * 4. Translation: translate the sentence conditioned on both understandings.
 *
 * The engine holds no per-sentence state; every call to [`AlignmentEngine::translate`]
 * runs its own [`TranslationSession`], so one engine can serve many
 * sentences at once. Generation failures are ordinary text here and flow
 * into the next prompt unchanged.
 */

use log::{debug, info, warn};
use std::sync::Arc;

use crate::errors::LanguageError;
use crate::generation::TextGenerator;
use crate::language_utils::{LanguagePair, LanguageSide};

pub mod prompts;
pub mod session;
pub mod verdict;

pub use prompts::{build_prompt, PromptKind, PromptRequest};
pub use session::{RefinementRound, SessionPhase, TranslationOutcome, TranslationSession, UnderstandingPair};
pub use verdict::{AlignmentVerdict, Judgment, MisalignmentDetector, SentinelDetector};

/// Default bound on judgment rounds per sentence
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

/// Drives translation sessions against a text generator
#[derive(Debug, Clone)]
pub struct AlignmentEngine {
    generator: Arc<dyn TextGenerator>,
    max_iterations: usize,
    detector: Arc<dyn MisalignmentDetector>,
}

impl AlignmentEngine {
    /// Create an engine with the default misalignment rule
    pub fn new(generator: Arc<dyn TextGenerator>, max_iterations: usize) -> Self {
        Self {
            generator,
            max_iterations,
            detector: Arc::new(SentinelDetector),
        }
    }

    /// Replace the rule that reads judgment responses
    pub fn with_detector(mut self, detector: Arc<dyn MisalignmentDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    async fn generate(&self, request: PromptRequest<'_>) -> String {
        let prompt = build_prompt(&request);
        debug!("Requesting {} ({} chars)", request.kind(), prompt.len());
        self.generator.generate(&prompt).await
    }

    /// Phase 1: source-side and target-side understanding of `sentence`
    pub async fn generate_understanding(&self, sentence: &str, pair: &LanguagePair) -> UnderstandingPair {
        let (source, target) = tokio::join!(
            self.generate(PromptRequest::Understanding { side: LanguageSide::Source, sentence, pair }),
            self.generate(PromptRequest::Understanding { side: LanguageSide::Target, sentence, pair }),
        );
        UnderstandingPair { source, target }
    }

    /// Phase 2: judge whether the understandings diverge, with feedback for both sides if they do
    pub async fn judge_alignment(
        &self,
        sentence: &str,
        understandings: &UnderstandingPair,
        pair: &LanguagePair,
    ) -> Judgment {
        let response = self
            .generate(PromptRequest::Judgment { sentence, pair, understandings })
            .await;

        if !self.detector.indicates_misalignment(&response) {
            return Judgment {
                response,
                verdict: AlignmentVerdict::Aligned,
            };
        }

        let (source_feedback, target_feedback) = tokio::join!(
            self.generate(PromptRequest::Feedback {
                side: LanguageSide::Source,
                sentence,
                pair,
                judgment: &response,
                understanding: &understandings.source,
            }),
            self.generate(PromptRequest::Feedback {
                side: LanguageSide::Target,
                sentence,
                pair,
                judgment: &response,
                understanding: &understandings.target,
            }),
        );

        Judgment {
            response,
            verdict: AlignmentVerdict::Misaligned {
                source_feedback,
                target_feedback,
            },
        }
    }

    /// Phase 3 for one side: the revised understanding, returned whole
    pub async fn refine_understanding(
        &self,
        sentence: &str,
        current: &str,
        feedback: &str,
        pair: &LanguagePair,
        side: LanguageSide,
    ) -> String {
        self.generate(PromptRequest::Refinement {
            side,
            sentence,
            pair,
            understanding: current,
            feedback,
        })
        .await
    }

    /// Phases 2 and 3 until aligned or out of iterations
    pub async fn iterative_refinement(
        &self,
        sentence: &str,
        initial: UnderstandingPair,
        pair: &LanguagePair,
    ) -> UnderstandingPair {
        let mut session = TranslationSession::with_understandings(sentence, pair.clone(), initial);
        self.drive(&mut session, SessionPhase::Translating).await;
        session.current_understandings().clone()
    }

    /// Phase 4: translation conditioned on both understandings
    pub async fn translate_with_understanding(
        &self,
        sentence: &str,
        understandings: &UnderstandingPair,
        pair: &LanguagePair,
    ) -> String {
        self.generate(PromptRequest::Translation { sentence, pair, understandings })
            .await
    }

    /// Like [`AlignmentEngine::translate`] for a direction string such as `"zh-en"`
    pub async fn translate_direction(&self, sentence: &str, direction: &str) -> Result<String, LanguageError> {
        let pair = LanguagePair::parse_direction(direction)?;
        Ok(self.translate(sentence, &pair).await)
    }

    /// Run all four phases and return the translation text
    pub async fn translate(&self, sentence: &str, pair: &LanguagePair) -> String {
        self.translate_with_trace(sentence, pair).await.translation
    }

    /// Run all four phases and return the translation with every intermediate result
    pub async fn translate_with_trace(&self, sentence: &str, pair: &LanguagePair) -> TranslationOutcome {
        let mut session = TranslationSession::new(sentence, pair.clone());
        self.run(&mut session).await;
        session.finish()
    }

    /// Drive `session` to completion
    pub async fn run(&self, session: &mut TranslationSession) {
        self.drive(session, SessionPhase::Done).await;
    }

    async fn drive(&self, session: &mut TranslationSession, until: SessionPhase) {
        while session.phase() < until {
            self.step(session).await;
        }
    }

    /// Perform the model calls of the session's current phase and advance it
    async fn step(&self, session: &mut TranslationSession) {
        let id = session.short_id();
        match session.phase() {
            SessionPhase::GeneratingUnderstanding => {
                let understandings = self.generate_understanding(session.sentence(), session.pair()).await;
                debug!("[{}] Source understanding: {}", id, understandings.source);
                debug!("[{}] Target understanding: {}", id, understandings.target);
                info!("[{}] Understanding generation completed", id);
                session.record_understandings(understandings);
            }
            SessionPhase::JudgingAndRefining => {
                if session.iteration() >= self.max_iterations {
                    if self.max_iterations > 0 {
                        warn!("[{}] Stopping refinement after {} iteration(s) without alignment", id, session.iteration());
                    }
                    session.stop_refining();
                    return;
                }

                let current = session.current_understandings().clone();
                let judgment = self.judge_alignment(session.sentence(), &current, session.pair()).await;
                debug!("[{}] Judgment {}: {}", id, session.iteration() + 1, judgment.response);

                match &judgment.verdict {
                    AlignmentVerdict::Aligned => {
                        info!("[{}] Understandings aligned after {} iteration(s)", id, session.iteration());
                        session.record_aligned(judgment);
                    }
                    AlignmentVerdict::Misaligned { source_feedback, target_feedback } => {
                        let (source, target) = tokio::join!(
                            self.refine_understanding(
                                session.sentence(),
                                &current.source,
                                source_feedback,
                                session.pair(),
                                LanguageSide::Source,
                            ),
                            self.refine_understanding(
                                session.sentence(),
                                &current.target,
                                target_feedback,
                                session.pair(),
                                LanguageSide::Target,
                            ),
                        );
                        info!("[{}] Iteration {}: understandings refined", id, session.iteration() + 1);
                        session.record_refinement(judgment, UnderstandingPair { source, target });
                    }
                }
            }
            SessionPhase::Translating => {
                let current = session.current_understandings().clone();
                let translation = self
                    .translate_with_understanding(session.sentence(), &current, session.pair())
                    .await;
                info!("[{}] Translation completed", id);
                session.record_translation(translation);
            }
            SessionPhase::Done => {}
        }
    }
}
