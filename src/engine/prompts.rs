/*!
 * Prompt construction for the alignment protocol.
 *
 * Every prompt the engine sends is built here by [`build_prompt`], a pure
 * function over a closed set of request kinds. The wording is cosmetic; what
 * each prompt carries is not:
 *
 * | kind                | sentence | languages      | embedded text                      |
 * |---------------------|----------|----------------|------------------------------------|
 * | SourceUnderstanding | yes      | source         | -                                  |
 * | TargetUnderstanding | yes      | target         | -                                  |
 * | Judgment            | yes      | both           | both understandings                |
 * | SourceFeedback      | yes      | source         | judgment, source understanding     |
 * | TargetFeedback      | yes      | target         | judgment, target understanding     |
 * | Refinement          | yes      | both + side    | current understanding, feedback    |
 * | Translation         | yes      | target         | both understandings                |
 */

use std::fmt;

use crate::engine::session::UnderstandingPair;
use crate::language_utils::{LanguagePair, LanguageSide};

/// The closed set of prompt shapes used by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    SourceUnderstanding,
    TargetUnderstanding,
    Judgment,
    SourceFeedback,
    TargetFeedback,
    Refinement,
    Translation,
}

impl PromptKind {
    /// Every kind, in protocol order
    pub const ALL: [PromptKind; 7] = [
        Self::SourceUnderstanding,
        Self::TargetUnderstanding,
        Self::Judgment,
        Self::SourceFeedback,
        Self::TargetFeedback,
        Self::Refinement,
        Self::Translation,
    ];

    /// The template this kind is rendered from
    pub fn template(self) -> &'static str {
        match self {
            Self::SourceUnderstanding | Self::TargetUnderstanding => UNDERSTANDING_TEMPLATE,
            Self::Judgment => JUDGMENT_TEMPLATE,
            Self::SourceFeedback | Self::TargetFeedback => FEEDBACK_TEMPLATE,
            Self::Refinement => REFINEMENT_TEMPLATE,
            Self::Translation => TRANSLATION_TEMPLATE,
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SourceUnderstanding => "source understanding",
            Self::TargetUnderstanding => "target understanding",
            Self::Judgment => "alignment judgment",
            Self::SourceFeedback => "source feedback",
            Self::TargetFeedback => "target feedback",
            Self::Refinement => "refinement",
            Self::Translation => "translation",
        };
        f.write_str(name)
    }
}

/// Contextual understanding, issued once per side with that side's language.
pub const UNDERSTANDING_TEMPLATE: &str = "\
Please fully understand the meaning of the following text and describe, in {language}, \
your understanding of the key concepts, definitions, examples, and explanations of specific \
terms related to translating it.

source_sentence: {sentence}";

/// Alignment judgment; the model answers `True` when the understandings diverge.
pub const JUDGMENT_TEMPLATE: &str = "\
If you are a {source_language} and {target_language} linguist, determine whether the provided \
source contextual understanding and target contextual understanding, based on the source \
sentence, convey different key concepts, definitions, examples, and explanations of specific \
terms related to the translation task. If so, provide a \"True\" response; otherwise, give a \
\"False\" response.

source_sentence: {sentence}

Source contextual understanding ({source_language}):
{source_understanding}

Target contextual understanding ({target_language}):
{target_understanding}";

/// Corrective feedback for one side, written in that side's language.
pub const FEEDBACK_TEMPLATE: &str = "\
If you are a {language} linguist, based on the core meaning of the source sentence, analyze \
the alignment judgment below. Generate verbal feedback in {language} to correct any current \
errors in the contextual understanding.

source_sentence: {sentence}

Alignment judgment:
{judgment}

Contextual understanding:
{understanding}";

/// Wholesale revision of one side's understanding.
pub const REFINEMENT_TEMPLATE: &str = "\
If you are a linguist proficient in both {source_language} and {target_language}, revise the \
current {side_language} contextual understanding based on the core meaning of the source \
sentence and the feedback below. Return the complete revised understanding in {side_language}, \
not only the changes.

source_sentence: {sentence}

Feedback:
{feedback}

Current contextual understanding:
{understanding}";

/// Final translation conditioned on both understandings.
pub const TRANSLATION_TEMPLATE: &str = "\
Based on the contextual understandings below, translate the following text into \
{target_language} without any explanation.

Source contextual understanding:
{source_understanding}

Target contextual understanding:
{target_understanding}

source_sentence: {sentence}";

/// The fields one prompt is built from
#[derive(Debug, Clone, Copy)]
pub enum PromptRequest<'a> {
    /// Phase 1, one per side
    Understanding {
        side: LanguageSide,
        sentence: &'a str,
        pair: &'a LanguagePair,
    },
    /// Phase 2 judgment
    Judgment {
        sentence: &'a str,
        pair: &'a LanguagePair,
        understandings: &'a UnderstandingPair,
    },
    /// Phase 2 feedback, one per side
    Feedback {
        side: LanguageSide,
        sentence: &'a str,
        pair: &'a LanguagePair,
        judgment: &'a str,
        understanding: &'a str,
    },
    /// Phase 3 refinement, one per side
    Refinement {
        side: LanguageSide,
        sentence: &'a str,
        pair: &'a LanguagePair,
        understanding: &'a str,
        feedback: &'a str,
    },
    /// Phase 4
    Translation {
        sentence: &'a str,
        pair: &'a LanguagePair,
        understandings: &'a UnderstandingPair,
    },
}

impl PromptRequest<'_> {
    /// The kind of prompt this request renders to
    pub fn kind(&self) -> PromptKind {
        match self {
            Self::Understanding { side: LanguageSide::Source, .. } => PromptKind::SourceUnderstanding,
            Self::Understanding { side: LanguageSide::Target, .. } => PromptKind::TargetUnderstanding,
            Self::Judgment { .. } => PromptKind::Judgment,
            Self::Feedback { side: LanguageSide::Source, .. } => PromptKind::SourceFeedback,
            Self::Feedback { side: LanguageSide::Target, .. } => PromptKind::TargetFeedback,
            Self::Refinement { .. } => PromptKind::Refinement,
            Self::Translation { .. } => PromptKind::Translation,
        }
    }
}

/// Render a prompt.
pub fn build_prompt(request: &PromptRequest<'_>) -> String {
    let template = request.kind().template();
    match *request {
        PromptRequest::Understanding { side, sentence, pair } => render(
            template,
            &[("language", pair.name(side)), ("sentence", sentence)],
        ),
        PromptRequest::Judgment { sentence, pair, understandings } => render(
            template,
            &[
                ("source_language", pair.source_name()),
                ("target_language", pair.target_name()),
                ("sentence", sentence),
                ("source_understanding", understandings.source.as_str()),
                ("target_understanding", understandings.target.as_str()),
            ],
        ),
        PromptRequest::Feedback { side, sentence, pair, judgment, understanding } => render(
            template,
            &[
                ("language", pair.name(side)),
                ("sentence", sentence),
                ("judgment", judgment),
                ("understanding", understanding),
            ],
        ),
        PromptRequest::Refinement { side, sentence, pair, understanding, feedback } => render(
            template,
            &[
                ("source_language", pair.source_name()),
                ("target_language", pair.target_name()),
                ("side_language", pair.name(side)),
                ("sentence", sentence),
                ("feedback", feedback),
                ("understanding", understanding),
            ],
        ),
        PromptRequest::Translation { sentence, pair, understandings } => render(
            template,
            &[
                ("target_language", pair.target_name()),
                ("source_understanding", understandings.source.as_str()),
                ("target_understanding", understandings.target.as_str()),
                ("sentence", sentence),
            ],
        ),
    }
}

/// Substitute `{key}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so model output containing
/// braces is embedded verbatim. Unknown placeholders are left as is.
fn render(template: &str, fields: &[(&str, &str)]) -> String {
    let extra: usize = fields.iter().map(|(_, value)| value.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match fields.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[open..open + close + 2]),
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
