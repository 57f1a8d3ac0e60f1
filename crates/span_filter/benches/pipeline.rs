use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rum_session::SessionManager;
use span_filter::{
    int_key, string_key, FilteringExporter, NullExporter, Span, SpanBatch, SpanExporter,
    SpanFilterBuilder, SpanKind,
};

const BATCH_SIZE: usize = 1000;

fn make_batch() -> SpanBatch {
    (0..BATCH_SIZE)
        .map(|i| {
            let name = if i % 10 == 0 { "healthcheck" } else { "GET /api/feed" };
            let mut span = Span::new(i as u128, i as u64, 0, name, SpanKind::Client);
            span.set_attribute("http.url", "https://shop.example.com/api/feed?token=abc");
            span.set_attribute("http.status_code", if i % 7 == 0 { 304i64 } else { 200 });
            span.set_attribute("user.email", "jane@example.com");
            span
        })
        .collect()
}

fn exporter_with_rules(rewrite: bool) -> FilteringExporter<NullExporter> {
    let mut builder = SpanFilterBuilder::new()
        .reject_spans_by_name(|name| name == "healthcheck")
        .reject_spans_by_attribute_value(&int_key("http.status_code"), |code| *code == 304);
    if rewrite {
        builder = builder
            .remove_span_attribute(&string_key("user.email"))
            .replace_span_attribute(&string_key("http.url"), |url| {
                Some(url.split('?').next().unwrap_or(url).to_owned())
            });
    }
    builder.build().apply(NullExporter::new())
}

fn bench_filter_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_batch");
    group.throughput(Throughput::Elements(BATCH_SIZE as u64));

    let batch = make_batch();
    for (label, exporter) in [
        ("empty", SpanFilterBuilder::new().build().apply(NullExporter::new())),
        ("reject_only", exporter_with_rules(false)),
        ("reject_and_rewrite", exporter_with_rules(true)),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &batch, |b, batch| {
            b.iter(|| black_box(exporter.filter_batch(batch.clone())));
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let exporter = exporter_with_rules(true);
    let batch = make_batch();

    let mut group = c.benchmark_group("export");
    group.throughput(Throughput::Elements(BATCH_SIZE as u64));
    group.bench_function("null_sink", |b| {
        b.to_async(&runtime)
            .iter(|| async { exporter.export(batch.clone()).await.unwrap() });
    });
    group.finish();
}

fn bench_session_current(c: &mut Criterion) {
    let sessions = SessionManager::default();
    c.bench_function("session_current", |b| b.iter(|| black_box(sessions.current())));
}

criterion_group!(benches, bench_filter_batch, bench_export, bench_session_current);
criterion_main!(benches);
