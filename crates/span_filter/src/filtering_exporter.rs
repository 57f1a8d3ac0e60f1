//! Filtering Exporter Decorator
//!
//! [`FilteringExporter`] wraps any [`SpanExporter`] and runs each batch through
//! a [`SpanFilter`] before delegating. It is a pure synchronous transform done
//! inline: no buffering, no extra synchronization, and the inner exporter's
//! result is returned exactly as produced, for `export` as well as `flush` and
//! `shutdown`.
//!
//! ```text
//! batch ──► reject by name ──► reject by attribute ──► rewrite attributes ──► inner.export()
//!               │                     │
//!               └──── dropped ◄───────┘
//! ```

use crate::exporter::{ExportError, SpanExporter};
use crate::filter::{Rejection, SpanFilter};
use crate::span::SpanBatch;
use tracing::{debug, trace};

/// Per-batch counters produced by [`FilteringExporter::filter_batch`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    /// Spans in the incoming batch
    pub received: usize,
    /// Spans dropped by a name predicate
    pub rejected_by_name: usize,
    /// Spans dropped by an attribute predicate
    pub rejected_by_attribute: usize,
    /// Forwarded spans whose attribute set was rebuilt
    pub rewritten: usize,
    /// Spans handed to the inner exporter
    pub forwarded: usize,
}

impl FilterStats {
    pub fn rejected(&self) -> usize {
        self.rejected_by_name + self.rejected_by_attribute
    }
}

/// An exporter wrapper that filters and rewrites spans before export.
///
/// # Example
///
/// ```ignore
/// let filter = SpanFilterBuilder::new()
///     .reject_spans_by_name(|name| name.starts_with("internal."))
///     .build();
/// let exporter = filter.apply(StdoutExporter::new(true));
///
/// // Spans named "internal.*" never reach stdout
/// exporter.export(batch).await?;
/// ```
pub struct FilteringExporter<E: SpanExporter> {
    inner: E,
    filter: SpanFilter,
}

impl<E: SpanExporter> FilteringExporter<E> {
    pub fn new(inner: E, filter: SpanFilter) -> Self {
        Self { inner, filter }
    }

    /// Applies the filter to `batch` without exporting it.
    ///
    /// Surviving spans keep their relative order and the batch keeps its
    /// timestamp.
    pub fn filter_batch(&self, batch: SpanBatch) -> (SpanBatch, FilterStats) {
        let mut stats = FilterStats {
            received: batch.spans.len(),
            ..FilterStats::default()
        };
        let mut spans = Vec::with_capacity(batch.spans.len());

        for span in batch.spans {
            match self.filter.rejection(&span) {
                Some(Rejection::Name) => stats.rejected_by_name += 1,
                Some(Rejection::Attribute) => stats.rejected_by_attribute += 1,
                None => {
                    let (span, rewritten) = self.filter.rewrite(span);
                    if rewritten {
                        stats.rewritten += 1;
                    }
                    spans.push(span);
                }
            }
        }

        stats.forwarded = spans.len();
        debug_assert_eq!(stats.forwarded + stats.rejected(), stats.received);
        (
            SpanBatch {
                spans,
                timestamp: batch.timestamp,
            },
            stats,
        )
    }

    pub fn filter(&self) -> &SpanFilter {
        &self.filter
    }

    /// The wrapped exporter.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: SpanExporter> SpanExporter for FilteringExporter<E> {
    async fn export(&self, batch: SpanBatch) -> Result<(), ExportError> {
        let (batch, stats) = self.filter_batch(batch);
        trace!(
            exporter = self.inner.name(),
            received = stats.received,
            forwarded = stats.forwarded,
            rejected = stats.rejected(),
            rewritten = stats.rewritten,
            "filtered span batch"
        );
        self.inner.export(batch).await
    }

    async fn flush(&self) -> Result<(), ExportError> {
        debug!(exporter = self.inner.name(), "flushing");
        self.inner.flush().await
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        debug!(exporter = self.inner.name(), "shutting down");
        self.inner.shutdown().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// =============================================================================
// TESTS
// =============================================================================
