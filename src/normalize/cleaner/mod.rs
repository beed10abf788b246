
use fancy_regex::Regex;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Anything that is not a word character, whitespace, a parenthesis or a hyphen
static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s()-]").expect("valid regex"));

static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Tokens at or below this many characters (parentheses excluded) may be acronyms
const ACRONYM_MAX_CHARS: usize = 5;

/// Case normalization policy applied after punctuation and whitespace cleanup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFolding {
    /// Leave the casing of the input untouched
    #[default]
    Preserve,
    /// Lowercase ordinary words but keep short all-uppercase tokens such as `BRCA1` or `(HER2)`
    AcronymAware,
}

impl std::fmt::Display for CaseFolding {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            CaseFolding::Preserve => write!(f, "preserve"),
            CaseFolding::AcronymAware => write!(f, "acronym_aware"),
        }
    }
}

/// Normalize free text for embedding and term matching.
///
/// Characters outside `[\w\s()-]` become spaces, whitespace runs collapse to a
/// single space and the result is trimmed. Hyphens and parentheses survive so
/// that names like `TGF-beta-1` and `(BRCA1)` stay intact.
#[inline]
pub fn clean_text(text: &str, case_folding: CaseFolding) -> String {
    if text.is_empty() {
        return String::new();
    }

    let replaced = DISALLOWED_CHARS.replace_all(text, " ");
    let collapsed = WHITESPACE_RUNS.replace_all(&replaced, " ");
    let trimmed = collapsed.trim();

    match case_folding {
        CaseFolding::Preserve => trimmed.to_string(),
        CaseFolding::AcronymAware => fold_case_keeping_acronyms(trimmed),
    }
}

fn fold_case_keeping_acronyms(text: &str) -> String {
    text.split(' ')
        .map(|token| {
            if is_acronym(token) {
                token.to_string()
            } else {
                token.to_lowercase()
            }
        })
        .join(" ")
}

fn is_acronym(token: &str) -> bool {
    let core = token.trim_matches(['(', ')']);

    core.chars().count() <= ACRONYM_MAX_CHARS
        && core.chars().any(char::is_alphabetic)
        && !core.chars().any(char::is_lowercase)
}
