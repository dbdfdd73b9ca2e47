//! Export discovery: the export/download model and the `ExportApi` seam
//! between the pipeline and the export service.

use crate::error::AggError;
use std::io::BufRead;

/// The time slice one download covers. Documentation and ordering only;
/// slices are non-overlapping by contract and correctness never depends
/// on them (the counts are a plain sum).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

/// One CSV file belonging to an export. Read-only during processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub export_id: String,
    pub id: String,
    /// Payload size in bytes when the service reports it; used only to
    /// schedule the largest downloads first and to size progress bars.
    pub size_hint: Option<u64>,
    pub range: Option<TimeRange>,
}

/// A named collection of downloads, immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub id: String,
    pub downloads: Vec<Download>,
}

/// Lookup and fetch operations against the export service. The shipped
/// implementation is HTTP (`HttpExportApi`); tests substitute in-memory
/// doubles.
pub trait ExportApi: Sync {
    /// Resolve an export id to its ordered set of downloads. Unknown ids
    /// yield `ExportNotFound`; a reachable service returning zero downloads
    /// is a valid empty export, not an error.
    fn lookup(&self, export_id: &str) -> Result<Export, AggError>;

    /// Open one download's CSV payload as a buffered byte stream, decoded
    /// lazily. Re-opening after a transient failure restarts the payload
    /// from the beginning.
    fn open(&self, download: &Download) -> Result<Box<dyn BufRead + Send>, AggError>;
}
