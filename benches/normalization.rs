use criterion::{Criterion, criterion_group, criterion_main};
use med_ingest::article::ArticleRecord;
use med_ingest::normalize::{NormalizationConfig, TextProcessor};
use std::fs;
use std::hint::black_box;
use std::path::Path;

pub fn criterion_benchmark(c: &mut Criterion) {
    let article_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("benches/article_brca1.json");
    let article_json = fs::read_to_string(article_path).expect("can read test file");
    let article = ArticleRecord::from_json(&article_json).expect("test file is a valid article");
    let processor =
        TextProcessor::new(&NormalizationConfig::default()).expect("default config is valid");
    let text = processor.combine_text(
        &processor.process_title(&article.content.title),
        &processor.process_abstract(&article.content.abstract_sections),
    );

    c.bench_function("parse_article", |b| {
        b.iter(|| ArticleRecord::from_json(black_box(&article_json)))
    });
    c.bench_function("extract_medical_terms", |b| {
        b.iter(|| processor.extract_medical_terms(black_box(&text)))
    });
    c.bench_function("process_article", |b| {
        b.iter(|| processor.process_article(black_box(&article)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
