/*!
 * Language code utilities.
 *
 * Resolves ISO 639-1 (2-letter) and ISO 639-2 (3-letter, T or B form) codes
 * to display names, and parses translation directions such as `zh-en` into
 * a [`LanguagePair`]. The alignment engine only ever sees resolved pairs.
 */

use std::fmt;
use std::str::FromStr;

use isolang::Language;

use crate::errors::LanguageError;

/// ISO 639-2/B codes that differ from their 639-2/T counterpart, as (B, T)
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

fn lookup(code: &str) -> Option<(Language, LanguageCodeType)> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized).map(|lang| (lang, LanguageCodeType::Part1)),
        3 => {
            if let Some(lang) = Language::from_639_3(&normalized) {
                return Some((lang, LanguageCodeType::Part2T));
            }
            bibliographic_to_terminology(&normalized)
                .and_then(Language::from_639_3)
                .map(|lang| (lang, LanguageCodeType::Part2B))
        }
        _ => None,
    }
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType, LanguageError> {
    lookup(code)
        .map(|(_, kind)| kind)
        .ok_or_else(|| LanguageError::InvalidCode(code.to_string()))
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String, LanguageError> {
    lookup(code)
        .map(|(lang, _)| lang.to_639_3().to_string())
        .ok_or_else(|| LanguageError::InvalidCode(code.to_string()))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English display name for a code, e.g. `zh` -> `Chinese`
pub fn get_language_name(code: &str) -> Result<String, LanguageError> {
    lookup(code)
        .map(|(lang, _)| lang.to_name().to_string())
        .ok_or_else(|| LanguageError::InvalidCode(code.to_string()))
}

/// Which side of a language pair an understanding or prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageSide {
    /// The language the sentence is written in
    Source,
    /// The language the sentence is translated into
    Target,
}

impl LanguageSide {
    /// Both sides, source first
    pub const BOTH: [LanguageSide; 2] = [LanguageSide::Source, LanguageSide::Target];
}

impl fmt::Display for LanguageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// An ordered (source, target) language pair with resolved display names.
///
/// Immutable once built; prompts only ever use the display names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    source_code: String,
    source_name: String,
    target_code: String,
    target_name: String,
}

impl LanguagePair {
    /// Resolve both codes through the ISO tables
    pub fn new(source_code: &str, target_code: &str) -> Result<Self, LanguageError> {
        let source_name = get_language_name(source_code)?;
        let target_name = get_language_name(target_code)?;
        Ok(Self {
            source_code: source_code.trim().to_lowercase(),
            source_name,
            target_code: target_code.trim().to_lowercase(),
            target_name,
        })
    }

    /// Build a pair whose display names were resolved elsewhere
    pub fn with_display_names(
        source_code: impl Into<String>,
        source_name: impl Into<String>,
        target_code: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            source_code: source_code.into(),
            source_name: source_name.into(),
            target_code: target_code.into(),
            target_name: target_name.into(),
        }
    }

    /// Parse a direction of the form `src-tgt`
    pub fn parse_direction(direction: &str) -> Result<Self, LanguageError> {
        let mut parts = direction.trim().split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(src), Some(tgt), None) if !src.trim().is_empty() && !tgt.trim().is_empty() => {
                Self::new(src, tgt)
            }
            _ => Err(LanguageError::MalformedDirection(direction.to_string())),
        }
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn target_code(&self) -> &str {
        &self.target_code
    }

    /// Display name of the source language
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Display name of the target language
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Display name for one side of the pair
    pub fn name(&self, side: LanguageSide) -> &str {
        match side {
            LanguageSide::Source => &self.source_name,
            LanguageSide::Target => &self.target_name,
        }
    }

    /// Whether both sides name the same language
    pub fn is_same_language(&self) -> bool {
        language_codes_match(&self.source_code, &self.target_code)
            || self.source_name == self.target_name
    }
}

impl FromStr for LanguagePair {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_direction(s)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source_code, self.target_code)
    }
}
