use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_summarized: AtomicU64,
    chunks_dispatched: AtomicU64,
    capability_calls: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a summarized document with its chunk and capability call counts.
    pub fn record_document(&self, chunk_count: u64, call_count: u64) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_dispatched
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.capability_calls
            .fetch_add(call_count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            chunks_dispatched: self.chunks_dispatched.load(Ordering::Relaxed),
            capability_calls: self.capability_calls.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents summarized since startup.
    pub documents_summarized: u64,
    /// Total chunk count dispatched across all documents.
    pub chunks_dispatched: u64,
    /// Chat completion calls issued, synthesis included.
    pub capability_calls: u64,
}
