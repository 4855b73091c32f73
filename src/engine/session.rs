/*!
 * Per-sentence translation session.
 *
 * A session owns the state of one run of the protocol and only moves
 * forward through its phases:
 *
 * ```text
 * GeneratingUnderstanding -> JudgingAndRefining -> Translating -> Done
 * ```
 *
 * The engine performs the model calls and feeds their results back through
 * the `pub(crate)` transition methods below.
 */

use std::fmt;
use uuid::Uuid;

use crate::engine::verdict::Judgment;
use crate::language_utils::{LanguagePair, LanguageSide};

/// Source-side and target-side contextual understanding of one sentence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnderstandingPair {
    /// Written in the source language
    pub source: String,
    /// Written in the target language
    pub target: String,
}

impl UnderstandingPair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn get(&self, side: LanguageSide) -> &str {
        match side {
            LanguageSide::Source => &self.source,
            LanguageSide::Target => &self.target,
        }
    }
}

/// Where a session is in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    GeneratingUnderstanding,
    JudgingAndRefining,
    Translating,
    Done,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GeneratingUnderstanding => "generating understanding",
            Self::JudgingAndRefining => "judging and refining",
            Self::Translating => "translating",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// One judgment, plus the refinement it triggered if any
#[derive(Debug, Clone)]
pub struct RefinementRound {
    /// 1-based round number
    pub iteration: usize,
    /// The judgment issued at the start of the round
    pub judgment: Judgment,
    /// Understandings after refinement; `None` when the round found them aligned
    pub refined: Option<UnderstandingPair>,
}

/// Everything a finished session produced
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub session_id: Uuid,
    /// Final translation, or a generation failure marker
    pub translation: String,
    /// Understandings from phase 1
    pub initial: UnderstandingPair,
    /// Understandings the translation was conditioned on
    pub final_understandings: UnderstandingPair,
    pub rounds: Vec<RefinementRound>,
    /// Whether the loop stopped on an aligned verdict rather than the iteration bound
    pub converged: bool,
}

impl TranslationOutcome {
    /// Number of judgment calls issued
    pub fn judgment_calls(&self) -> usize {
        self.rounds.len()
    }

    /// Number of rounds that refined both understandings
    pub fn refinement_rounds(&self) -> usize {
        self.rounds.iter().filter(|r| r.refined.is_some()).count()
    }
}

/// State of one sentence's run through the protocol
#[derive(Debug, Clone)]
pub struct TranslationSession {
    id: Uuid,
    sentence: String,
    pair: LanguagePair,
    phase: SessionPhase,
    initial: UnderstandingPair,
    current: UnderstandingPair,
    rounds: Vec<RefinementRound>,
    converged: bool,
    translation: String,
}

impl TranslationSession {
    /// Start a session at phase 1
    pub fn new(sentence: impl Into<String>, pair: LanguagePair) -> Self {
        Self {
            id: Uuid::new_v4(),
            sentence: sentence.into(),
            pair,
            phase: SessionPhase::GeneratingUnderstanding,
            initial: UnderstandingPair::default(),
            current: UnderstandingPair::default(),
            rounds: Vec::new(),
            converged: false,
            translation: String::new(),
        }
    }

    /// Start a session whose understandings were produced elsewhere
    pub fn with_understandings(
        sentence: impl Into<String>,
        pair: LanguagePair,
        understandings: UnderstandingPair,
    ) -> Self {
        let mut session = Self::new(sentence, pair);
        session.record_understandings(understandings);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// First eight hex digits of the id, for log lines
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    pub fn sentence(&self) -> &str {
        &self.sentence
    }

    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current understandings, once phase 1 has run
    pub fn understandings(&self) -> Option<&UnderstandingPair> {
        (self.phase > SessionPhase::GeneratingUnderstanding).then_some(&self.current)
    }

    pub(crate) fn current_understandings(&self) -> &UnderstandingPair {
        &self.current
    }

    pub fn rounds(&self) -> &[RefinementRound] {
        &self.rounds
    }

    /// Judgments issued so far
    pub fn iteration(&self) -> usize {
        self.rounds.len()
    }

    pub fn translation(&self) -> Option<&str> {
        (self.phase == SessionPhase::Done).then_some(self.translation.as_str())
    }

    pub(crate) fn record_understandings(&mut self, understandings: UnderstandingPair) {
        debug_assert_eq!(self.phase, SessionPhase::GeneratingUnderstanding);
        self.initial = understandings.clone();
        self.current = understandings;
        self.phase = SessionPhase::JudgingAndRefining;
    }

    /// Record an aligned judgment and move on to translation
    pub(crate) fn record_aligned(&mut self, judgment: Judgment) {
        debug_assert_eq!(self.phase, SessionPhase::JudgingAndRefining);
        self.rounds.push(RefinementRound {
            iteration: self.rounds.len() + 1,
            judgment,
            refined: None,
        });
        self.converged = true;
        self.phase = SessionPhase::Translating;
    }

    /// Record a misaligned judgment and the understandings it produced
    pub(crate) fn record_refinement(&mut self, judgment: Judgment, refined: UnderstandingPair) {
        debug_assert_eq!(self.phase, SessionPhase::JudgingAndRefining);
        self.rounds.push(RefinementRound {
            iteration: self.rounds.len() + 1,
            judgment,
            refined: Some(refined.clone()),
        });
        self.current = refined;
    }

    /// Stop refining without an aligned verdict
    pub(crate) fn stop_refining(&mut self) {
        debug_assert_eq!(self.phase, SessionPhase::JudgingAndRefining);
        self.phase = SessionPhase::Translating;
    }

    pub(crate) fn record_translation(&mut self, translation: String) {
        debug_assert_eq!(self.phase, SessionPhase::Translating);
        self.translation = translation;
        self.phase = SessionPhase::Done;
    }

    /// Consume the session. Returns `None` unless it reached [`SessionPhase::Done`].
    pub fn into_outcome(self) -> Option<TranslationOutcome> {
        (self.phase == SessionPhase::Done).then(|| self.finish())
    }

    pub(crate) fn finish(self) -> TranslationOutcome {
        TranslationOutcome {
            session_id: self.id,
            translation: self.translation,
            initial: self.initial,
            final_understandings: self.current,
            rounds: self.rounds,
            converged: self.converged,
        }
    }
}
