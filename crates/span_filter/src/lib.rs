//! Span Filter Pipeline
//!
//! Filters and rewrites finished spans before they reach an exporter. Rules
//! are registered on a [`SpanFilterBuilder`], snapshotted by `build()` into an
//! immutable [`SpanFilter`], and applied to any [`SpanExporter`] as a
//! decorating [`FilteringExporter`]:
//!
//! ```rust,ignore
//! use span_filter::{string_key, SpanFilterBuilder, StdoutExporter};
//!
//! let exporter = SpanFilterBuilder::new()
//!     .reject_spans_by_name(|name| name == "healthcheck")
//!     .remove_span_attribute(&string_key("user.email"))
//!     .build()
//!     .apply(StdoutExporter::new(true));
//!
//! exporter.export(batch).await?;
//! exporter.shutdown().await?;
//! ```
//!
//! Attribute rules are keyed by (name, declared type): a rule on the string
//! attribute `"k"` never touches an integer attribute `"k"`.
//!
//! Exporters use native async fn in traits (no `#[async_trait]` macro).

pub mod attributes;
pub mod exporter;
pub mod filter;
pub mod filtering_exporter;
pub mod session;
pub mod span;

// Re-export main types
pub use attributes::{
    bool_array_key, bool_key, float_array_key, float_key, int_array_key, int_key,
    string_array_key, string_key, Attribute, AttributeKey, AttributeKind, AttributeType,
    AttributeValue, Attributes, TypedKey,
};
pub use exporter::{
    ExportError, InMemoryExporter, JsonFileExporter, NullExporter, SpanExporter,
    SpanExporterBoxed, StdoutExporter,
};
pub use filter::{Rejection, SpanFilter, SpanFilterBuilder};
pub use filtering_exporter::{FilterStats, FilteringExporter};
pub use session::{session_id_key, stamp_session, SESSION_ID_ATTRIBUTE};
pub use span::{Span, SpanBatch, SpanKind, SpanStatus};
