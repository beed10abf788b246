// Normalization module
// Turns validated article records into cleaned text plus candidate domain terms

pub mod cleaner;
pub mod terms;

#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::iter;

use crate::Result;
use crate::article::{AbstractSection, ArticleRecord};

pub use cleaner::{CaseFolding, clean_text};
pub use terms::{
    DEFAULT_MIN_PHRASE_LENGTH, DEFAULT_STOPWORDS, DEFAULT_TERM_PATTERNS, PhraseFilter,
    TermExtractor,
};

pub const DEFAULT_TITLE_REPETITIONS: u8 = 1;

/// Static policy for the normalizer, injected once at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Case policy applied by the text cleaner
    pub case_folding: CaseFolding,
    /// How many times the cleaned title precedes the abstract in the embedded text
    pub title_repetitions: u8,
    /// Filtering applied to capitalized phrases
    pub phrase_filter: PhraseFilter,
    /// Capitalized phrases shorter than this many characters are dropped
    pub min_phrase_length: usize,
    /// Ordered regular expressions for the pattern pass
    pub term_patterns: Vec<String>,
    /// Single-word capitalized phrases that are never terms
    pub stopwords: Vec<String>,
}

impl Default for NormalizationConfig {
    #[inline]
    fn default() -> Self {
        Self {
            case_folding: CaseFolding::default(),
            title_repetitions: DEFAULT_TITLE_REPETITIONS,
            phrase_filter: PhraseFilter::default(),
            min_phrase_length: DEFAULT_MIN_PHRASE_LENGTH,
            term_patterns: DEFAULT_TERM_PATTERNS.iter().map(|p| p.to_string()).collect(),
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Output of the normalizer for one article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedArticle {
    /// Combined title and abstract text used for embedding
    pub processed_text: String,
    /// Candidate domain terms found in `processed_text`
    pub medical_terms: BTreeSet<String>,
    pub title: String,
    pub abstract_text: String,
    pub pmid: String,
    pub publication_year: String,
    pub journal: String,
}

impl NormalizedArticle {
    /// Text handed to the embedding model: the processed text followed by the terms
    #[inline]
    pub fn embedding_text(&self) -> String {
        iter::once(self.processed_text.as_str())
            .chain(self.medical_terms.iter().map(String::as_str))
            .filter(|part| !part.is_empty())
            .join(" ")
    }
}

/// Pure, reusable normalizer and term extractor
#[derive(Debug, Clone)]
pub struct TextProcessor {
    case_folding: CaseFolding,
    title_repetitions: usize,
    extractor: TermExtractor,
}

impl TextProcessor {
    #[inline]
    pub fn new(config: &NormalizationConfig) -> Result<Self> {
        let extractor = TermExtractor::new(
            &config.term_patterns,
            &config.stopwords,
            config.phrase_filter,
            config.min_phrase_length,
        )?;

        Ok(Self {
            case_folding: config.case_folding,
            title_repetitions: usize::from(config.title_repetitions.max(1)),
            extractor,
        })
    }

    #[inline]
    pub fn clean_text(&self, text: &str) -> String {
        clean_text(text, self.case_folding)
    }

    #[inline]
    pub fn process_title(&self, title: &str) -> String {
        self.clean_text(title)
    }

    /// Join the present, non-empty section texts in order and clean the result
    #[inline]
    pub fn process_abstract(&self, sections: &[AbstractSection]) -> String {
        let full_abstract = sections
            .iter()
            .filter_map(|section| section.text.as_deref())
            .filter(|text| !text.is_empty())
            .join(" ");

        self.clean_text(&full_abstract)
    }

    /// Repeat the title `title_repetitions` times ahead of the abstract
    #[inline]
    pub fn combine_text(&self, title: &str, abstract_text: &str) -> String {
        iter::repeat_n(title, self.title_repetitions)
            .chain(iter::once(abstract_text))
            .filter(|part| !part.is_empty())
            .join(" ")
    }

    #[inline]
    pub fn extract_medical_terms(&self, text: &str) -> BTreeSet<String> {
        self.extractor.extract(text)
    }

    #[inline]
    pub fn process_article(&self, article: &ArticleRecord) -> NormalizedArticle {
        let title = self.process_title(&article.content.title);
        let abstract_text = self.process_abstract(&article.content.abstract_sections);
        let processed_text = self.combine_text(&title, &abstract_text);
        let medical_terms = self.extract_medical_terms(&processed_text);

        NormalizedArticle {
            processed_text,
            medical_terms,
            title,
            abstract_text,
            pmid: article.basic_info.pmid.clone(),
            publication_year: article.basic_info.publication_date.year.clone(),
            journal: article.basic_info.journal.title.clone(),
        }
    }
}
