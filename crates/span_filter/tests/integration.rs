use rum_session::{InactivityPolicy, ManualClock, SessionConfig, SessionManager};
use span_filter::{
    int_key, session_id_key, stamp_session, string_key, Attributes, ExportError,
    FilteringExporter, InMemoryExporter, Span, SpanBatch, SpanExporter, SpanExporterBoxed,
    SpanFilterBuilder, SpanKind,
};
use std::sync::Arc;
use std::time::Duration;

fn span(name: &str) -> Span {
    Span::new(1, 1, 0, name, SpanKind::Internal)
}

fn names(spans: &[Span]) -> Vec<String> {
    spans.iter().map(|s| s.name.clone()).collect()
}

#[tokio::test]
async fn test_rejects_spans_by_attribute_value() {
    let attribute = string_key("attribute");
    let long_attribute = int_key("long_attribute");
    let exporter = SpanFilterBuilder::new()
        .reject_spans_by_attribute_value(&attribute, |v| v == "test")
        .reject_spans_by_attribute_value(&attribute, |v| v == "rejected!")
        .reject_spans_by_attribute_value(&long_attribute, |v| *v > 100)
        .build()
        .apply(InMemoryExporter::new());

    let with = |name: &str, attrs: Attributes| span(name).with_attributes(attrs);
    let mut different_key = Attributes::new();
    different_key.insert("other_attribute", "test");
    different_key.insert("long_attribute", 42i64);
    let mut yet_another = Attributes::new();
    yet_another.insert("attribute", "pass");
    yet_another.insert("long_attribute", 123i64);

    let batch = SpanBatch::with_spans(vec![
        with("rejected", [("attribute", "test")].into_iter().collect()),
        with("different_key", different_key.clone()),
        with("another_rejected", [("attribute", "rejected!")].into_iter().collect()),
        with("different_value", [("attribute", "not really test")].into_iter().collect()),
        with("yet_another_rejected", yet_another),
    ]);
    exporter.export(batch).await.unwrap();

    let out = exporter.inner().spans();
    assert_eq!(names(&out), ["different_key", "different_value"]);
    assert_eq!(*out[0].attributes, different_key);
}

#[tokio::test]
async fn test_removes_span_attributes_by_type() {
    let exporter = SpanFilterBuilder::new()
        .remove_span_attribute_if(&string_key("attribute"), |v| v == "test")
        // same text as an integer attribute below; must not touch it
        .remove_span_attribute(&string_key("long_attribute"))
        .build()
        .apply(InMemoryExporter::new());

    let mut first = Attributes::new();
    first.insert("attribute", "test");
    first.insert("long_attribute", 42i64);
    let mut second = Attributes::new();
    second.insert("attribute", "not test");
    second.insert("other_attribute", "test");

    exporter
        .export(SpanBatch::with_spans(vec![
            span("first").with_attributes(first),
            span("second").with_attributes(second.clone()),
        ]))
        .await
        .unwrap();

    let out = exporter.inner().spans();
    let expected_first: Attributes = [("long_attribute", 42i64)].into_iter().collect();
    assert_eq!(*out[0].attributes, expected_first);
    assert_eq!(*out[1].attributes, second);
}

#[tokio::test]
async fn test_replaces_span_attributes() {
    let exporter = SpanFilterBuilder::new()
        .replace_span_attribute(&string_key("attribute"), |v| Some(format!("{v}!!!")))
        .replace_span_attribute(&int_key("long_attribute"), |v| Some(v + 1))
        .replace_span_attribute(&string_key("other_attribute"), |_| None)
        .build()
        .apply(InMemoryExporter::new());

    let mut attrs = Attributes::new();
    attrs.insert("attribute", "test");
    attrs.insert("other_attribute", "gone");
    attrs.insert("long_attribute", 42i64);

    exporter
        .export(SpanBatch::with_spans(vec![span("s").with_attributes(attrs)]))
        .await
        .unwrap();

    let out = exporter.inner().spans();
    let expected: Attributes = {
        let mut a = Attributes::new();
        a.insert("attribute", "test!!!");
        a.insert("long_attribute", 43i64);
        a
    };
    assert_eq!(*out[0].attributes, expected);
}

#[tokio::test]
async fn test_builder_snapshot_isolation() {
    let builder = SpanFilterBuilder::new().reject_spans_by_name(|n| n == "a");
    let before = builder.build().apply(InMemoryExporter::new());
    let builder = builder
        .reject_spans_by_name(|n| n == "b")
        .replace_span_attribute(&string_key("k"), |_| None);
    let after = builder.build().apply(InMemoryExporter::new());

    let make = || {
        let mut b = span("b");
        b.set_attribute("k", "v");
        SpanBatch::with_spans(vec![span("a"), b])
    };
    before.export(make()).await.unwrap();
    after.export(make()).await.unwrap();

    let kept = before.inner().spans();
    assert_eq!(names(&kept), ["b"]);
    assert_eq!(kept[0].attributes.len(), 1);
    assert!(after.inner().spans().is_empty());
}

#[tokio::test]
async fn test_one_filter_wraps_many_exporters_concurrently() {
    let filter = SpanFilterBuilder::new()
        .reject_spans_by_name(|n| n.ends_with("-odd"))
        .build();
    let exporters: Vec<Arc<FilteringExporter<InMemoryExporter>>> =
        (0..4).map(|_| Arc::new(filter.apply(InMemoryExporter::new()))).collect();

    let mut tasks = tokio::task::JoinSet::new();
    for exporter in &exporters {
        let exporter = Arc::clone(exporter);
        tasks.spawn(async move {
            for round in 0..25u64 {
                let batch: SpanBatch = (0..10u64)
                    .map(|i| {
                        let suffix = if i % 2 == 1 { "odd" } else { "even" };
                        Span::new(round as u128, i, 0, format!("{i}-{suffix}"), SpanKind::Client)
                    })
                    .collect();
                exporter.export(batch).await?;
            }
            Ok::<(), ExportError>(())
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    for exporter in &exporters {
        assert_eq!(exporter.inner().exported_count(), 25 * 5);
        assert!(exporter.inner().spans().iter().all(|s| s.name.ends_with("-even")));
    }
}

#[tokio::test]
async fn test_session_attribution_survives_filtering() {
    let config = SessionConfig::default()
        .with_inactivity_policy(InactivityPolicy::BumpOnAccess)
        .with_inactivity_timeout(Duration::from_secs(60));
    let sessions = SessionManager::with_clock(config, ManualClock::new());

    let exporter = SpanFilterBuilder::new()
        .remove_span_attribute(&string_key("user.email"))
        .build()
        .apply(InMemoryExporter::new());

    let mut batch = SpanBatch::new();
    for i in 0..3 {
        let mut s = span(&format!("op-{i}"));
        s.set_attribute("user.email", "someone@example.com");
        stamp_session(&mut s, &sessions);
        batch.add(s);
    }
    sessions.clock().advance(Duration::from_secs(60));
    let mut late = span("late");
    let rotated = stamp_session(&mut late, &sessions);
    batch.add(late);

    exporter.export(batch).await.unwrap();
    let out = exporter.inner().spans();

    let ids: Vec<_> = out
        .iter()
        .map(|s| s.attributes.value(&session_id_key()).map(str::to_owned))
        .collect();
    assert_eq!(ids[0], ids[1]);
    assert_eq!(ids[1], ids[2]);
    assert_ne!(ids[2], ids[3]);
    assert_eq!(ids[3].as_deref(), Some(rotated.to_string().as_str()));
    assert!(out.iter().all(|s| s.attributes.value(&string_key("user.email")).is_none()));
}

#[tokio::test]
async fn test_filtering_exporter_as_trait_object() {
    let exporter: Box<dyn SpanExporterBoxed> = Box::new(
        SpanFilterBuilder::new()
            .reject_spans_by_name(|_| true)
            .build()
            .apply(InMemoryExporter::new()),
    );
    assert!(exporter.export_boxed(SpanBatch::with_spans(vec![span("x")])).await.is_ok());
    assert!(exporter.shutdown_boxed().await.is_ok());
    assert_eq!(
        exporter.export_boxed(SpanBatch::new()).await,
        Err(ExportError::ShutDown)
    );
    assert_eq!(exporter.name(), "in_memory");
}
