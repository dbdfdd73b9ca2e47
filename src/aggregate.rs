//! The aggregation orchestrator: resolve an export, stream its downloads in
//! bounded parallel, and merge the per-download counts at a single ownership
//! point.

use crate::config::AggOptions;
use crate::counting::EventCounts;
use crate::discovery::{Download, ExportApi};
use crate::error::AggError;
use crate::progress::make_progress_bar_labeled;
use crate::streaming::{process_download, RowStats};
use crate::util::with_retries;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of one full run: the aggregated counts plus shell-facing
/// diagnostics that never appear in the serialized result.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counts: EventCounts,
    pub downloads: usize,
    pub rows: u64,
    pub skipped: u64,
}

/// The aggregation entry point, builder-chained over `AggOptions`.
#[derive(Clone, Default)]
pub struct ExportAggregator {
    opts: AggOptions,
}

impl ExportAggregator {
    pub fn new() -> Self {
        Self {
            opts: AggOptions::default(),
        }
    }

    // -------- Builder methods --------
    pub fn download_concurrency(mut self, n: usize) -> Self { self.opts = self.opts.with_download_concurrency(n); self }
    pub fn retry_tries(mut self, tries: usize) -> Self { self.opts = self.opts.with_retry_tries(tries); self }
    pub fn retry_delay_ms(mut self, ms: u64) -> Self { self.opts = self.opts.with_retry_delay_ms(ms); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }

    /// Resolve `export_id` and aggregate every one of its downloads.
    ///
    /// A single download failing permanently fails the whole run: the
    /// contract is a complete aggregation across all downloads, so partial
    /// results are never reported as complete. An export with zero
    /// downloads is a successful empty result.
    pub fn run(&self, api: &dyn ExportApi, export_id: &str) -> Result<RunSummary, AggError> {
        if let Some(n) = self.opts.parallelism {
            if n > 0 {
                rayon::ThreadPoolBuilder::new().num_threads(n).build_global().ok();
            }
        }

        tracing::debug!(export_id, "resolving export");
        let export = with_retries(self.opts.retry_tries, self.opts.retry_delay_ms, || {
            api.lookup(export_id)
        })?;

        let mut downloads = export.downloads;
        // Largest payloads first, so the big ones never tail the run.
        downloads.sort_by(|a, b| b.size_hint.unwrap_or(0).cmp(&a.size_hint.unwrap_or(0)));

        if downloads.is_empty() {
            tracing::info!(export_id, "export has no downloads; result is empty");
            return Ok(RunSummary {
                counts: EventCounts::new(),
                downloads: 0,
                rows: 0,
                skipped: 0,
            });
        }
        tracing::info!(export_id, downloads = downloads.len(), "processing export");

        let total_bytes: u64 = downloads.iter().map(|d| d.size_hint.unwrap_or(0)).sum();
        let pb = if self.opts.progress {
            Some(make_progress_bar_labeled(
                total_bytes,
                self.opts.progress_label.as_deref(),
            ))
        } else {
            None
        };

        let cancel = AtomicBool::new(false);
        let limit = self.opts.download_concurrency.max(1);

        let mut summary = RunSummary {
            counts: EventCounts::new(),
            downloads: downloads.len(),
            rows: 0,
            skipped: 0,
        };
        let mut failure: Option<AggError> = None;

        for chunk in downloads.chunks(limit) {
            let results: Vec<Result<(EventCounts, RowStats), AggError>> = chunk
                .par_iter()
                .map(|dl| {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(AggError::Cancelled);
                    }
                    let out = self.process_with_retries(api, dl, &cancel, pb.as_ref());
                    if out.is_err() {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    out
                })
                .collect();

            for res in results {
                match res {
                    Ok((counts, stats)) => {
                        summary.counts.merge(counts);
                        summary.rows += stats.rows;
                        summary.skipped += stats.skipped;
                    }
                    Err(e) => {
                        // Prefer the real failure over cancellation echoes
                        // from sibling workers.
                        let replace = match &failure {
                            None => true,
                            Some(AggError::Cancelled) => !matches!(e, AggError::Cancelled),
                            Some(_) => false,
                        };
                        if replace {
                            failure = Some(e);
                        }
                    }
                }
            }
            if failure.is_some() {
                break;
            }
        }

        if let Some(e) = failure {
            if let Some(pb) = pb {
                pb.abandon_with_message("failed");
            }
            tracing::error!(export_id, error = %e, "aggregation failed");
            return Err(e);
        }
        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }

        tracing::info!(
            export_id,
            patients = summary.counts.patients.len(),
            events = summary.counts.total_events(),
            skipped = summary.skipped,
            "aggregation complete"
        );
        Ok(summary)
    }

    /// One download through the retry loop. Transient errors are absorbed by
    /// re-opening the stream from the start; an exhausted budget escalates to
    /// a permanent failure naming the download.
    fn process_with_retries(
        &self,
        api: &dyn ExportApi,
        download: &Download,
        cancel: &AtomicBool,
        pb: Option<&ProgressBar>,
    ) -> Result<(EventCounts, RowStats), AggError> {
        let tries = self.opts.retry_tries.max(1);
        match with_retries(tries, self.opts.retry_delay_ms, || {
            process_download(api, download, cancel, pb)
        }) {
            Err(e) if e.is_transient() => Err(AggError::DownloadFailed {
                download: download.id.clone(),
                attempts: tries,
                message: e.to_string(),
            }),
            other => other,
        }
    }
}
