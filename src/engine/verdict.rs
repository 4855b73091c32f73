/*!
 * Alignment judgments.
 *
 * A judgment response is free text. The default [`SentinelDetector`] reads
 * any occurrence of `True` as "the understandings diverge"; everything else,
 * including an empty response or a generation failure marker, counts as
 * aligned. Stricter parsing can be plugged in through
 * [`MisalignmentDetector`].
 */

use std::fmt::Debug;

/// Substring that marks a judgment response as misaligned
pub const MISALIGNMENT_SENTINEL: &str = "True";

/// Decides whether a judgment response reports misalignment
pub trait MisalignmentDetector: Send + Sync + Debug {
    fn indicates_misalignment(&self, response: &str) -> bool;
}

/// Case-sensitive substring test for [`MISALIGNMENT_SENTINEL`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SentinelDetector;

impl MisalignmentDetector for SentinelDetector {
    fn indicates_misalignment(&self, response: &str) -> bool {
        indicates_misalignment(response)
    }
}

/// The default misalignment rule
pub fn indicates_misalignment(response: &str) -> bool {
    response.contains(MISALIGNMENT_SENTINEL)
}

/// Outcome of the judgment phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlignmentVerdict {
    Aligned,
    /// Carries corrective feedback for each side
    Misaligned {
        source_feedback: String,
        target_feedback: String,
    },
}

impl AlignmentVerdict {
    pub fn is_aligned(&self) -> bool {
        matches!(self, Self::Aligned)
    }

    /// Feedback for the source understanding, empty when aligned
    pub fn source_feedback(&self) -> &str {
        match self {
            Self::Aligned => "",
            Self::Misaligned { source_feedback, .. } => source_feedback,
        }
    }

    /// Feedback for the target understanding, empty when aligned
    pub fn target_feedback(&self) -> &str {
        match self {
            Self::Aligned => "",
            Self::Misaligned { target_feedback, .. } => target_feedback,
        }
    }
}

/// A verdict together with the raw judgment response it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgment {
    pub response: String,
    pub verdict: AlignmentVerdict,
}
