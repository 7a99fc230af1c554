use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing analysis activity.
#[derive(Default)]
pub struct AnalysisMetrics {
    documents_analyzed: AtomicU64,
    chunks_indexed: AtomicU64,
    questions_answered: AtomicU64,
    analysis_failures: AtomicU64,
}

impl AnalysisMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an analyzed document and the number of chunks indexed for it.
    pub fn record_document(&self, chunk_count: u64) {
        self.documents_analyzed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record an answered question.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an upload whose analysis did not complete.
    pub fn record_failure(&self) {
        self.analysis_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_analyzed: self.documents_analyzed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            analysis_failures: self.analysis_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents analyzed since startup.
    pub documents_analyzed: u64,
    /// Chunks written to the vector index since startup.
    pub chunks_indexed: u64,
    /// Questions answered since startup.
    pub questions_answered: u64,
    /// Uploads rejected or failed during analysis.
    pub analysis_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = AnalysisMetrics::new();
        metrics.record_document(2);
        metrics.record_document(3);
        metrics.record_question();
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_analyzed, 2);
        assert_eq!(snapshot.chunks_indexed, 5);
        assert_eq!(snapshot.questions_answered, 1);
        assert_eq!(snapshot.analysis_failures, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        let snapshot = AnalysisMetrics::new().snapshot();
        assert_eq!(snapshot.documents_analyzed, 0);
        assert_eq!(snapshot.chunks_indexed, 0);
    }
}
