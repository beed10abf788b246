use super::*;

const VALID_ARTICLE: &str = r#"{
    "basic_info": {
        "pmid": "38012345",
        "publication_date": { "year": "2023", "month": "Nov", "day": null },
        "journal": {
            "title": "Breast Cancer Research",
            "issn": "1465-542X",
            "issue": "1",
            "volume": "25"
        }
    },
    "content": {
        "title": "Breast Cancer Treatment",
        "abstract": [
            {
                "label": "BACKGROUND",
                "nlm_category": "BACKGROUND",
                "text": "Tamoxifen reduces ER-positive breast cancer recurrence."
            },
            { "label": null, "nlm_category": null, "text": null }
        ],
        "authors": [
            { "last_name": "Smith", "fore_name": "Jane", "affiliations": ["Oncology Institute"] }
        ],
        "keywords": ["tamoxifen", "recurrence"]
    },
    "metadata": {
        "doi": "10.1186/s13058-023-01234-5",
        "references": []
    },
    "extracted_at": "2024-03-01T12:30:45.123456"
}"#;

#[test]
fn parses_valid_article() {
    let article = ArticleRecord::from_json(VALID_ARTICLE).expect("article should parse");

    assert_eq!(article.basic_info.pmid, "38012345");
    assert_eq!(article.basic_info.publication_date.year, "2023");
    assert_eq!(article.basic_info.publication_date.day, None);
    assert_eq!(article.basic_info.journal.title, "Breast Cancer Research");
    assert_eq!(article.content.title, "Breast Cancer Treatment");
    assert_eq!(article.content.abstract_sections.len(), 2);
    assert_eq!(article.content.abstract_sections[1].text, None);
    assert_eq!(article.content.authors[0].affiliations.len(), 1);
    assert_eq!(
        article.metadata.doi.as_deref(),
        Some("10.1186/s13058-023-01234-5")
    );
    assert_eq!(
        article.extracted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        "2024-03-01 12:30:45"
    );
}

#[test]
fn optional_collections_default_to_empty() {
    let json = r#"{
        "basic_info": {
            "pmid": "1",
            "publication_date": { "year": "2020" },
            "journal": { "title": "J", "issn": "0000-0000" }
        },
        "content": { "title": "Only a title" },
        "extracted_at": "2024-01-01T00:00:00Z"
    }"#;

    let article = ArticleRecord::from_json(json).expect("article should parse");

    assert!(article.content.abstract_sections.is_empty());
    assert!(article.content.authors.is_empty());
    assert!(article.content.keywords.is_empty());
    assert_eq!(article.metadata, Metadata::default());
}

#[test]
fn rfc3339_timestamps_are_normalized_to_utc() {
    let json = VALID_ARTICLE.replace("2024-03-01T12:30:45.123456", "2024-03-01T14:30:45+02:00");
    let article = ArticleRecord::from_json(&json).expect("article should parse");

    assert_eq!(
        article.extracted_at.format("%H:%M:%S").to_string(),
        "12:30:45"
    );
}

#[test]
fn space_separated_timestamps_are_accepted() {
    let json = VALID_ARTICLE.replace("2024-03-01T12:30:45.123456", "2024-03-01 12:30:45");
    assert!(ArticleRecord::from_json(&json).is_ok());
}

#[test]
fn non_string_title_is_invalid_input() {
    let json = VALID_ARTICLE.replace(
        r#""title": "Breast Cancer Treatment""#,
        r#""title": 42"#,
    );

    let result = ArticleRecord::from_json(&json);
    assert!(
        matches!(result, Err(IngestError::InvalidInput(_))),
        "expected InvalidInput, got {:?}",
        result
    );
}

#[test]
fn non_string_section_text_is_invalid_input() {
    let json = VALID_ARTICLE.replace(
        r#""text": "Tamoxifen reduces ER-positive breast cancer recurrence.""#,
        r#""text": ["not", "a", "string"]"#,
    );

    let result = ArticleRecord::from_json(&json);
    assert!(matches!(result, Err(IngestError::InvalidInput(_))));
}

#[test]
fn missing_required_field_is_invalid_input() {
    let json = VALID_ARTICLE.replace(r#""pmid": "38012345","#, "");

    let result = ArticleRecord::from_json(&json);
    assert!(matches!(result, Err(IngestError::InvalidInput(_))));
}

#[test]
fn bad_timestamp_is_invalid_input() {
    let json = VALID_ARTICLE.replace("2024-03-01T12:30:45.123456", "yesterday");

    let result = ArticleRecord::from_json(&json);
    assert!(matches!(result, Err(IngestError::InvalidInput(_))));
}

#[test]
fn malformed_json_is_a_json_error() {
    let result = ArticleRecord::from_json(r#"{"basic_info": {"pmid": "1""#);
    assert!(matches!(result, Err(IngestError::Json(_))));

    let result = ArticleRecord::from_json("not json");
    assert!(matches!(result, Err(IngestError::Json(_))));
}

#[test]
fn reads_article_from_path() {
    let temp_dir = tempfile::TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("38012345.json");
    fs::write(&path, VALID_ARTICLE).expect("should write article");

    let article = ArticleRecord::from_path(&path).expect("article should load");
    assert_eq!(article.basic_info.pmid, "38012345");

    let missing = ArticleRecord::from_path(temp_dir.path().join("missing.json"));
    assert!(matches!(missing, Err(IngestError::Io(_))));
}
