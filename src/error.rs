use thiserror::Error;

/// All errors produced by the aggregation core.
///
/// The variants carry the retry classification the orchestrator needs:
/// transient errors are absorbed by backoff, terminal ones propagate to the
/// caller unchanged.
#[derive(Error, Debug)]
pub enum AggError {
    /// The export id is not known to the discovery service. Terminal.
    #[error("unknown export id: {0}")]
    ExportNotFound(String),

    /// The discovery service could not be reached. Retryable with backoff.
    #[error("export lookup unavailable: {0}")]
    DiscoveryUnavailable(String),

    /// Transient I/O failure while opening or streaming one download.
    /// Safe to retry by re-opening the stream from the start, since no
    /// partial counts from that download have been merged yet.
    #[error("download {download}: {message}")]
    DownloadIo { download: String, message: String },

    /// A download's retry budget is exhausted. Fails the whole run; the
    /// required output is a complete aggregation across all downloads.
    #[error("download {download} failed after {attempts} attempts: {message}")]
    DownloadFailed {
        download: String,
        attempts: usize,
        message: String,
    },

    /// Processing was abandoned because another download failed permanently.
    #[error("processing cancelled")]
    Cancelled,
}

impl AggError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AggError::DiscoveryUnavailable(_) | AggError::DownloadIo { .. }
        )
    }
}
