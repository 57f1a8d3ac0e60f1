use crate::span::{Span, SpanBatch};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Error types for span export operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// Transport-layer error (network, gRPC, HTTP, file system)
    #[error("transport error: {0}")]
    Transport(String),
    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Export operation timed out
    #[error("export operation timed out")]
    Timeout,
    /// The exporter was shut down and accepts no more spans
    #[error("exporter has been shut down")]
    ShutDown,
}

/// Trait for exporting span batches to various backends.
///
/// Uses native async fn in traits instead of `#[async_trait]`.
///
/// # Note on Object Safety
///
/// This trait uses `impl Future` return types which are not object-safe.
/// For dynamic dispatch, use `Box<dyn SpanExporterBoxed>`.
pub trait SpanExporter: Send + Sync {
    /// Exports a batch of spans.
    fn export(&self, batch: SpanBatch) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Pushes out anything the exporter buffers internally.
    fn flush(&self) -> impl Future<Output = Result<(), ExportError>> + Send {
        async { Ok(()) }
    }

    /// Releases the exporter's resources. Further exports may fail.
    fn shutdown(&self) -> impl Future<Output = Result<(), ExportError>> + Send {
        async { Ok(()) }
    }

    /// Returns the exporter name for debugging.
    fn name(&self) -> &str;
}

type BoxedResult<'a> =
    std::pin::Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + 'a>>;

/// Object-safe version of SpanExporter for dynamic dispatch.
pub trait SpanExporterBoxed: Send + Sync {
    /// Exports a batch of spans (boxed future for object safety).
    fn export_boxed(&self, batch: SpanBatch) -> BoxedResult<'_>;

    fn flush_boxed(&self) -> BoxedResult<'_>;

    fn shutdown_boxed(&self) -> BoxedResult<'_>;

    /// Returns the exporter name for debugging.
    fn name(&self) -> &str;
}

/// Blanket implementation: any SpanExporter can be used as SpanExporterBoxed
impl<T: SpanExporter> SpanExporterBoxed for T {
    fn export_boxed(&self, batch: SpanBatch) -> BoxedResult<'_> {
        Box::pin(self.export(batch))
    }

    fn flush_boxed(&self) -> BoxedResult<'_> {
        Box::pin(self.flush())
    }

    fn shutdown_boxed(&self) -> BoxedResult<'_> {
        Box::pin(self.shutdown())
    }

    fn name(&self) -> &str {
        SpanExporter::name(self)
    }
}

/// Stdout exporter for testing and debugging
pub struct StdoutExporter {
    verbose: bool,
}

impl StdoutExporter {
    /// Creates a new stdout exporter
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl SpanExporter for StdoutExporter {
    async fn export(&self, batch: SpanBatch) -> Result<(), ExportError> {
        if self.verbose {
            println!("=== Exporting {} spans ===", batch.spans.len());
            for span in &batch.spans {
                println!(
                    "Span: trace_id={:032x} span_id={:016x} name={} duration={}ns status={:?}",
                    span.trace_id,
                    span.span_id,
                    span.name,
                    span.duration_nanos(),
                    span.status
                );
                for attribute in span.attributes.iter() {
                    println!(
                        "    {} ({}) = {}",
                        attribute.name,
                        attribute.attribute_type(),
                        attribute.value
                    );
                }
            }
            println!("=== Export complete ===\n");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// JSON file exporter for local development.
///
/// Each batch replaces the file's contents with a pretty-printed JSON array.
pub struct JsonFileExporter {
    file_path: String,
}

impl JsonFileExporter {
    /// Creates a new JSON file exporter
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

impl SpanExporter for JsonFileExporter {
    async fn export(&self, batch: SpanBatch) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(&batch.spans)
            .map_err(|e| ExportError::Serialization(e.to_string()))?;

        tokio::fs::write(&self.file_path, json)
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        debug!(path = %self.file_path, spans = batch.spans.len(), "wrote span batch");
        Ok(())
    }

    fn name(&self) -> &str {
        "json_file"
    }
}

/// Null exporter that discards all spans (for benchmarking)
pub struct NullExporter;

impl NullExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanExporter for NullExporter {
    async fn export(&self, _batch: SpanBatch) -> Result<(), ExportError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Exporter that keeps everything it receives, for verification.
///
/// Records each batch separately so tests can check what a decorator forwarded
/// per call, including empty batches. Refuses exports after `shutdown()`.
#[derive(Default)]
pub struct InMemoryExporter {
    batches: Mutex<Vec<Vec<Span>>>,
    flushes: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All exported spans, flattened in export order.
    pub fn spans(&self) -> Vec<Span> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    /// Each received batch, in order.
    pub fn batches(&self) -> Vec<Vec<Span>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn exported_count(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_count() > 0
    }
}

impl SpanExporter for InMemoryExporter {
    async fn export(&self, batch: SpanBatch) -> Result<(), ExportError> {
        if self.is_shut_down() {
            return Err(ExportError::ShutDown);
        }
        self.batches.lock().unwrap().push(batch.spans);
        Ok(())
    }

    async fn flush(&self) -> Result<(), ExportError> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.shutdowns.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
