//! Streaming primitives: fold one download's CSV lines into a fresh
//! accumulator with a single reused line buffer, so memory stays flat no
//! matter how large the payload is.

use crate::counting::EventCounts;
use crate::discovery::{Download, ExportApi};
use crate::error::AggError;
use crate::row::{parse_row, RowParseError};
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicBool, Ordering};

/// Row-level diagnostics for one processing attempt. Skips never appear in
/// the aggregated result; they surface through logging only.
#[derive(Debug, Default, Clone, Copy)]
pub struct RowStats {
    pub rows: u64,
    pub skipped: u64,
}

/// Stream one download exactly once: consume the header line, then parse and
/// fold every data line into a fresh `EventCounts`. Rows are observed in
/// file order, but the final counts do not depend on it.
///
/// I/O failures mid-stream come back as transient `DownloadIo`; the caller
/// may re-open and re-stream from the beginning, since nothing from this
/// attempt has been merged into the final result.
pub fn process_download(
    api: &dyn ExportApi,
    download: &Download,
    cancel: &AtomicBool,
    pb: Option<&ProgressBar>,
) -> Result<(EventCounts, RowStats), AggError> {
    let mut reader = api.open(download)?;
    let mut counts = EventCounts::new();
    let mut stats = RowStats::default();
    let mut buf = String::with_capacity(16 * 1024);
    let mut header_seen = false;
    let mut attempt_bytes: u64 = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(AggError::Cancelled);
        }
        buf.clear();
        let n = match reader.read_line(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                // A retry re-reads the payload from the start, so back this
                // attempt's bytes out of the bar.
                if let Some(pb) = pb {
                    pb.set_position(pb.position().saturating_sub(attempt_bytes));
                }
                return Err(AggError::DownloadIo {
                    download: download.id.clone(),
                    message: e.to_string(),
                });
            }
        };
        if n == 0 {
            break;
        }
        if let Some(pb) = pb {
            pb.inc(n as u64);
            attempt_bytes += n as u64;
        }
        if buf.ends_with('\n') {
            let _ = buf.pop();
            if buf.ends_with('\r') {
                let _ = buf.pop();
            }
        }

        if !header_seen {
            // First line is the fixed column header, never a data row.
            header_seen = true;
            continue;
        }

        match parse_row(&buf) {
            Ok(row) => {
                counts.update(&row);
                stats.rows += 1;
            }
            Err(RowParseError::Blank) => {}
            Err(e) => {
                stats.skipped += 1;
                tracing::debug!(download = %download.id, line = %buf, error = %e, "skipping malformed row");
            }
        }
    }

    tracing::debug!(
        download = %download.id,
        rows = stats.rows,
        skipped = stats.skipped,
        "download streamed"
    );
    Ok((counts, stats))
}
