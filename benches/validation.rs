use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quote_portal::models::QuoteForm;
use quote_portal::services::validation::{validate_quote, validate_quote_all};

fn form_with_details(len: usize) -> QuoteForm {
    QuoteForm {
        name: "  Jane Doe ".into(),
        email: "jane@x.com".into(),
        phone: "555-0100".into(),
        business_name: "Jane's Cafe".into(),
        service_type: "business".into(),
        budget: "1k-2k".into(),
        project_details: "x".repeat(len),
        timeline: "Next month".into(),
    }
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_quote");

    for len in [20usize, 1_000, 5_000] {
        let form = form_with_details(len);
        group.bench_with_input(BenchmarkId::new("valid", len), &form, |b, form| {
            b.iter(|| validate_quote(black_box(form)))
        });
    }

    let invalid = QuoteForm::default();
    group.bench_function("all_errors", |b| {
        b.iter(|| validate_quote_all(black_box(&invalid)))
    });

    group.finish();
}

criterion_group!(benches, bench_validation);
criterion_main!(benches);
