
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use tracing::warn;

use crate::{IngestError, Result};

/// Runs of capitalized words made of letters and hyphens. Letters are Unicode
/// letters, so eponyms like `Sjögren` qualify. Every word has to end on a
/// letter and the run must not continue into a digit or hyphen, so gene
/// symbols such as `BRCA1` are left to the pattern pass.
static CAPITALIZED_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\p{Lu}[\p{L}-]*\p{L}(?:\s+\p{Lu}[\p{L}-]*\p{L})*(?![\w-])")
        .expect("valid regex")
});

/// Default term patterns, applied in order
pub const DEFAULT_TERM_PATTERNS: &[&str] = &[
    r"\b\p{Lu}[\p{L}0-9-]+ (?i:syndrome|disease|disorder|cancer|tumor)\b",
    r"\b\p{Lu}[\p{L}-]+-[0-9]+\b",
    r"\b\p{Lu}[\p{L}0-9-]+ (?i:cell|receptor|protein|gene)\b",
    r"\b\p{Lu}[\p{Lu}0-9-]*[0-9][\p{Lu}0-9-]*\b",
];

/// Capitalized function words that are never terms on their own
pub const DEFAULT_STOPWORDS: &[&str] = &["The", "A", "An", "In", "On", "Of", "For", "And", "Or", "But"];

pub const DEFAULT_MIN_PHRASE_LENGTH: usize = 3;

/// Filtering applied to candidates of the capitalized-phrase pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseFilter {
    /// Drop stopwords and candidates shorter than the minimum phrase length
    #[default]
    Stopwords,
    /// Keep every capitalized run
    Unfiltered,
}

impl std::fmt::Display for PhraseFilter {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            PhraseFilter::Stopwords => write!(f, "stopwords"),
            PhraseFilter::Unfiltered => write!(f, "unfiltered"),
        }
    }
}

/// Extracts candidate domain terms with a pattern pass and a capitalized-phrase pass
#[derive(Debug, Clone)]
pub struct TermExtractor {
    patterns: Vec<Regex>,
    stopwords: HashSet<String>,
    phrase_filter: PhraseFilter,
    min_phrase_length: usize,
}

impl TermExtractor {
    #[inline]
    pub fn new(
        patterns: &[String],
        stopwords: &[String],
        phrase_filter: PhraseFilter,
        min_phrase_length: usize,
    ) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| compile_term_pattern(pattern))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            stopwords: stopwords.iter().cloned().collect(),
            phrase_filter,
            min_phrase_length,
        })
    }

    /// Collect every term found in `text`.
    ///
    /// All results are verbatim substrings of `text`; matching is case
    /// sensitive and the set is deduplicated.
    #[inline]
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        let mut terms = BTreeSet::new();
        if text.is_empty() {
            return terms;
        }

        self.collect_pattern_terms(text, &mut terms);
        self.collect_capitalized_phrases(text, &mut terms);

        terms
    }

    fn collect_pattern_terms(&self, text: &str, terms: &mut BTreeSet<String>) {
        for pattern in &self.patterns {
            for found in pattern.find_iter(text) {
                match found {
                    Ok(m) => {
                        terms.insert(m.as_str().to_string());
                    }
                    Err(e) => {
                        warn!("Term pattern '{}' failed to match: {}", pattern.as_str(), e);
                        break;
                    }
                }
            }
        }
    }

    fn collect_capitalized_phrases(&self, text: &str, terms: &mut BTreeSet<String>) {
        for segment in phrase_segments(text) {
            for found in CAPITALIZED_PHRASE.find_iter(segment) {
                match found {
                    Ok(m) if self.keep_phrase(m.as_str()) => {
                        terms.insert(m.as_str().to_string());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            "Capitalized phrase scan skipped a {} byte segment: {}",
                            segment.len(),
                            e
                        );
                        break;
                    }
                }
            }
        }
    }

    fn keep_phrase(&self, candidate: &str) -> bool {
        match self.phrase_filter {
            PhraseFilter::Unfiltered => true,
            PhraseFilter::Stopwords => {
                !self.stopwords.contains(candidate)
                    && candidate.chars().count() >= self.min_phrase_length
            }
        }
    }
}

/// Split `text` wherever whitespace is followed by a character that cannot
/// start a capitalized word. No phrase can span such a break, so scanning the
/// pieces separately yields the same matches while keeping each backtracking
/// search short.
fn phrase_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if !ch.is_whitespace() {
            continue;
        }
        let Some(&(next_index, next)) = chars.peek() else {
            break;
        };
        if next.is_whitespace() || next.is_uppercase() {
            continue;
        }
        if let Some(segment) = text.get(start..index) {
            segments.push(segment);
        }
        start = next_index;
    }

    if let Some(rest) = text.get(start..) {
        segments.push(rest);
    }
    segments
}

/// Compile a user supplied term pattern
#[inline]
pub fn compile_term_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| IngestError::Config(format!("Invalid term pattern '{}': {}", pattern, e)))
}
