use super::*;
use crate::article::{BasicInfo, Content, JournalInfo, Metadata, PublicationDate};
use chrono::NaiveDate;

fn processor(config: &NormalizationConfig) -> TextProcessor {
    TextProcessor::new(config).expect("default configuration is valid")
}

fn section(text: Option<&str>) -> AbstractSection {
    AbstractSection {
        text: text.map(str::to_string),
        ..AbstractSection::default()
    }
}

fn article(title: &str, sections: Vec<AbstractSection>) -> ArticleRecord {
    ArticleRecord {
        basic_info: BasicInfo {
            pmid: "38012345".to_string(),
            publication_date: PublicationDate {
                year: "2023".to_string(),
                month: Some("Nov".to_string()),
                day: None,
            },
            journal: JournalInfo {
                title: "Breast Cancer Research".to_string(),
                issn: "1465-542X".to_string(),
                issue: None,
                volume: None,
            },
        },
        content: Content {
            title: title.to_string(),
            abstract_sections: sections,
            authors: Vec::new(),
            keywords: Vec::new(),
        },
        metadata: Metadata::default(),
        extracted_at: NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid timestamp"),
    }
}

fn terms(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|t| t.to_string()).collect()
}

#[test]
fn abstract_sections_without_text_are_skipped() {
    let processor = processor(&NormalizationConfig::default());
    let sections = vec![section(Some("A")), section(None), section(Some("B"))];

    assert_eq!(processor.process_abstract(&sections), "A B");
}

#[test]
fn empty_section_text_is_skipped() {
    let processor = processor(&NormalizationConfig::default());
    let sections = vec![section(Some("")), section(Some("Only")), section(Some(""))];

    assert_eq!(processor.process_abstract(&sections), "Only");
}

#[test]
fn no_sections_gives_empty_abstract() {
    let processor = processor(&NormalizationConfig::default());
    assert_eq!(processor.process_abstract(&[]), "");
}

#[test]
fn sections_are_cleaned_after_joining() {
    let processor = processor(&NormalizationConfig::default());
    let sections = vec![
        section(Some("BACKGROUND: Tamoxifen...")),
        section(Some("  RESULTS: HR=0.61; (95% CI)  ")),
    ];

    assert_eq!(
        processor.process_abstract(&sections),
        "BACKGROUND Tamoxifen RESULTS HR 0 61 (95 CI)"
    );
}

#[test]
fn single_title_combination() {
    let processor = processor(&NormalizationConfig::default());

    assert_eq!(
        processor.combine_text("Breast Cancer Treatment", "Tamoxifen reduces recurrence"),
        "Breast Cancer Treatment Tamoxifen reduces recurrence"
    );
}

#[test]
fn double_title_combination() {
    let config = NormalizationConfig {
        title_repetitions: 2,
        ..NormalizationConfig::default()
    };
    let processor = processor(&config);

    assert_eq!(
        processor.combine_text("Breast Cancer Treatment", "Tamoxifen reduces recurrence"),
        "Breast Cancer Treatment Breast Cancer Treatment Tamoxifen reduces recurrence"
    );
}

#[test]
fn combination_skips_empty_parts() {
    let processor = processor(&NormalizationConfig::default());

    assert_eq!(processor.combine_text("", "Abstract only"), "Abstract only");
    assert_eq!(processor.combine_text("Title only", ""), "Title only");
    assert_eq!(processor.combine_text("", ""), "");
}

#[test]
fn end_to_end_default_policy() {
    let processor = processor(&NormalizationConfig::default());
    let record = article(
        "Breast Cancer Treatment",
        vec![section(Some(
            "Tamoxifen reduces ER-positive breast cancer recurrence.",
        ))],
    );

    let output = processor.process_article(&record);

    assert_eq!(output.title, "Breast Cancer Treatment");
    assert_eq!(
        output.abstract_text,
        "Tamoxifen reduces ER-positive breast cancer recurrence"
    );
    assert_eq!(
        output.processed_text,
        "Breast Cancer Treatment Tamoxifen reduces ER-positive breast cancer recurrence"
    );
    assert_eq!(
        output.medical_terms,
        terms(&[
            "Breast Cancer",
            "Breast Cancer Treatment Tamoxifen",
            "ER-positive"
        ])
    );
    assert_eq!(output.pmid, "38012345");
    assert_eq!(output.publication_year, "2023");
    assert_eq!(output.journal, "Breast Cancer Research");
}

#[test]
fn end_to_end_acronym_aware_policy() {
    let config = NormalizationConfig {
        case_folding: CaseFolding::AcronymAware,
        ..NormalizationConfig::default()
    };
    let processor = processor(&config);
    let record = article(
        "BRCA1 Carriers",
        vec![section(Some("Risk of Ovarian Cancer in BRCA1 carriers."))],
    );

    let output = processor.process_article(&record);

    assert_eq!(
        output.processed_text,
        "BRCA1 carriers risk of ovarian cancer in BRCA1 carriers"
    );
    assert_eq!(output.medical_terms, terms(&["BRCA1"]));
}

#[test]
fn processed_text_depends_only_on_title_and_abstract() {
    let processor = processor(&NormalizationConfig::default());
    let first = article("Same Title", vec![section(Some("Same abstract."))]);
    let mut second = first.clone();
    second.basic_info.pmid = "999".to_string();
    second.content.keywords = vec!["unrelated".to_string()];
    second.metadata.doi = Some("10.1/xyz".to_string());

    assert_eq!(
        processor.process_article(&first).processed_text,
        processor.process_article(&second).processed_text
    );
}

#[test]
fn terms_are_substrings_of_processed_text() {
    let config = NormalizationConfig {
        title_repetitions: 2,
        ..NormalizationConfig::default()
    };
    let processor = processor(&config);
    let record = article(
        "Li-Fraumeni Syndrome and TP53 (p53) Germline Variants",
        vec![
            section(Some("OBJECTIVE: Characterize HER2-positive Breast Tumor cohorts.")),
            section(None),
            section(Some("TGF-beta-1 signalling in Reed-Sternberg cell lines; IL-6 receptor.")),
        ],
    );

    let output = processor.process_article(&record);

    assert!(!output.medical_terms.is_empty());
    for term in &output.medical_terms {
        assert!(
            output.processed_text.contains(term.as_str()),
            "{} is not part of the processed text",
            term
        );
    }
}

#[test]
fn processing_is_deterministic() {
    let processor = processor(&NormalizationConfig::default());
    let record = article(
        "Breast Cancer Treatment",
        vec![section(Some("Tamoxifen reduces ER-positive breast cancer recurrence."))],
    );

    assert_eq!(
        processor.process_article(&record),
        processor.process_article(&record)
    );
}

#[test]
fn embedding_text_appends_terms() {
    let processor = processor(&NormalizationConfig::default());
    let record = article("The BRCA1 gene", Vec::new());

    let output = processor.process_article(&record);

    assert_eq!(output.processed_text, "The BRCA1 gene");
    assert_eq!(output.embedding_text(), "The BRCA1 gene BRCA1 BRCA1 gene");
}

#[test]
fn embedding_text_without_terms() {
    let processor = processor(&NormalizationConfig::default());
    let record = article("lowercase only", Vec::new());

    assert_eq!(processor.process_article(&record).embedding_text(), "lowercase only");
}

#[test]
fn invalid_pattern_fails_construction() {
    let config = NormalizationConfig {
        term_patterns: vec!["[unterminated".to_string()],
        ..NormalizationConfig::default()
    };

    assert!(TextProcessor::new(&config).is_err());
}

#[test]
fn processor_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TextProcessor>();
}
