//! # Session + Span Filter Demo
//!
//! End-to-end walk through the export path of a mobile RUM agent:
//!
//! 1. A `SessionManager` with a short inactivity timeout hands out session ids;
//!    a change listener logs every rotation.
//! 2. Simulated instrumentation produces spans with realistic attributes and
//!    stamps each with `session.id`.
//! 3. A `SpanFilter` drops health checks and 304 responses, strips
//!    `user.email`, and cuts query strings off `http.url`.
//! 4. The filtered batches go to a `StdoutExporter`.
//!
//! ## Running
//!
//! ```bash
//! cargo run -p span_filter --bin demo
//!
//! # See rotation and per-batch filter logs
//! RUST_LOG=debug,span_filter=trace cargo run -p span_filter --bin demo
//! ```

use rand::Rng;
use rum_session::{SessionConfig, SessionManager};
use span_filter::{
    int_key, stamp_session, string_key, FilterStats, Span, SpanBatch, SpanExporter,
    SpanFilterBuilder, SpanKind, SpanStatus, StdoutExporter,
};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const BATCHES: usize = 4;
const SPANS_PER_BATCH: usize = 6;

const OPERATIONS: [(&str, SpanKind); 5] = [
    ("GET /api/feed", SpanKind::Client),
    ("healthcheck", SpanKind::Internal),
    ("ActivityResumed", SpanKind::Internal),
    ("POST /api/login", SpanKind::Client),
    ("db.query", SpanKind::Internal),
];

/// Generate a random span with RUM-style attributes.
fn generate_span<R: Rng>(rng: &mut R) -> Span {
    let (name, kind) = OPERATIONS[rng.gen_range(0..OPERATIONS.len())];
    let mut span = Span::new(rng.gen(), rng.gen(), 0, name, kind);

    span.set_attribute("service.name", "shop-android");
    span.set_attribute("user.email", "jane@example.com");
    if kind == SpanKind::Client {
        let status: i64 = [200, 200, 201, 304, 500][rng.gen_range(0..5)];
        let path = name.split_once(' ').map_or(name, |(_, path)| path);
        span.set_attribute("http.url", format!("https://shop.example.com{path}?token=abc123"));
        span.set_attribute("http.status_code", status);
        span.finish(if status >= 500 { SpanStatus::Error } else { SpanStatus::Ok });
    } else {
        span.set_attribute("thread.name", "main");
        span.finish(SpanStatus::Ok);
    }
    span
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let sessions = SessionManager::new(
        SessionConfig::default().with_inactivity_timeout(Duration::from_millis(150)),
    );
    sessions.set_change_listener(|old, new| {
        info!(%old, %new, "session changed");
    });

    let exporter = SpanFilterBuilder::new()
        .reject_spans_by_name(|name| name == "healthcheck")
        .reject_spans_by_attribute_value(&int_key("http.status_code"), |code| *code == 304)
        .remove_span_attribute(&string_key("user.email"))
        .replace_span_attribute(&string_key("http.url"), |url| {
            Some(url.split('?').next().unwrap_or(url).to_owned())
        })
        .build()
        .apply(StdoutExporter::new(true));

    let mut totals = FilterStats::default();
    let mut rng = rand::thread_rng();

    for batch_no in 0..BATCHES {
        let mut batch = SpanBatch::new();
        for _ in 0..SPANS_PER_BATCH {
            let mut span = generate_span(&mut rng);
            stamp_session(&mut span, &sessions);
            batch.add(span);
        }

        // Filtered once here; the stats feed the summary.
        let (filtered, stats) = exporter.filter_batch(batch);
        info!(
            batch = batch_no,
            received = stats.received,
            forwarded = stats.forwarded,
            rewritten = stats.rewritten,
            "filtered batch"
        );
        totals.received += stats.received;
        totals.forwarded += stats.forwarded;
        totals.rejected_by_name += stats.rejected_by_name;
        totals.rejected_by_attribute += stats.rejected_by_attribute;
        totals.rewritten += stats.rewritten;

        exporter.inner().export(filtered).await?;

        // Idle long enough on odd batches for the session to time out.
        let pause = if batch_no % 2 == 1 { 200 } else { 20 };
        tokio::time::sleep(Duration::from_millis(pause)).await;
    }

    exporter.flush().await?;
    exporter.shutdown().await?;

    println!("=== Summary ===");
    println!("Spans received:           {}", totals.received);
    println!("Spans forwarded:          {}", totals.forwarded);
    println!("Rejected by name:         {}", totals.rejected_by_name);
    println!("Rejected by attribute:    {}", totals.rejected_by_attribute);
    println!("Rewritten:                {}", totals.rewritten);
    println!("Final session id:         {}", sessions.peek());

    Ok(())
}
