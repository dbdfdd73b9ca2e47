use medtally::{AggError, Download, Export, ExportApi, EventCounts, Row, CSV_HEADER};
use std::collections::BTreeMap;
use std::io::{BufRead, Cursor};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Build a CSV payload: the fixed header plus one line per row.
pub fn csv(rows: &[&str]) -> String {
    let mut s = String::from(CSV_HEADER);
    s.push('\n');
    for r in rows {
        s.push_str(r);
        s.push('\n');
    }
    s
}

/// Parse a data line that is known to be well-formed.
pub fn row(patient: &str, event_type: &str) -> Row {
    medtally::parse_row(&format!("{patient},2024-01-01T00:00:00,{event_type},1.0")).unwrap()
}

/// Check the accumulator invariant: every total equals the sum of that
/// event type's per-patient counts.
pub fn assert_totals_invariant(counts: &EventCounts) {
    let mut derived: BTreeMap<&str, u64> = BTreeMap::new();
    for by_type in counts.patients.values() {
        for (event_type, n) in by_type {
            *derived.entry(event_type.as_str()).or_insert(0) += n;
        }
    }
    let totals: BTreeMap<&str, u64> = counts
        .totals
        .iter()
        .map(|(t, n)| (t.as_str(), *n))
        .collect();
    assert_eq!(derived, totals);
}

/// In-memory export service double: export ids mapped to named CSV payloads.
pub struct MemoryApi {
    exports: BTreeMap<String, Vec<(Download, String)>>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self {
            exports: BTreeMap::new(),
        }
    }

    pub fn with_export(mut self, export_id: &str, downloads: Vec<(&str, String)>) -> Self {
        let entries = downloads
            .into_iter()
            .map(|(id, body)| {
                (
                    Download {
                        export_id: export_id.to_string(),
                        id: id.to_string(),
                        size_hint: Some(body.len() as u64),
                        range: None,
                    },
                    body,
                )
            })
            .collect();
        self.exports.insert(export_id.to_string(), entries);
        self
    }
}

impl ExportApi for MemoryApi {
    fn lookup(&self, export_id: &str) -> Result<Export, AggError> {
        match self.exports.get(export_id) {
            Some(entries) => Ok(Export {
                id: export_id.to_string(),
                downloads: entries.iter().map(|(d, _)| d.clone()).collect(),
            }),
            None => Err(AggError::ExportNotFound(export_id.to_string())),
        }
    }

    fn open(&self, download: &Download) -> Result<Box<dyn BufRead + Send>, AggError> {
        let entries =
            self.exports
                .get(&download.export_id)
                .ok_or_else(|| AggError::DownloadIo {
                    download: download.id.clone(),
                    message: "unknown export".to_string(),
                })?;
        let body = entries
            .iter()
            .find(|(d, _)| d.id == download.id)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| AggError::DownloadIo {
                download: download.id.clone(),
                message: "unknown download".to_string(),
            })?;
        Ok(Box::new(Cursor::new(body.into_bytes())))
    }
}

/// Wrapper that fails the first `failures` open() calls with a transient
/// error, to exercise the re-open retry path.
pub struct FlakyApi {
    inner: MemoryApi,
    remaining: AtomicUsize,
    pub opens: AtomicUsize,
}

impl FlakyApi {
    pub fn new(inner: MemoryApi, failures: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(failures),
            opens: AtomicUsize::new(0),
        }
    }
}

impl ExportApi for FlakyApi {
    fn lookup(&self, export_id: &str) -> Result<Export, AggError> {
        self.inner.lookup(export_id)
    }

    fn open(&self, download: &Download) -> Result<Box<dyn BufRead + Send>, AggError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AggError::DownloadIo {
                download: download.id.clone(),
                message: "injected transient failure".to_string(),
            });
        }
        self.inner.open(download)
    }
}

/// Wrapper that fails the first `failures` lookup() calls with a transient
/// discovery error.
pub struct FlakyDiscovery {
    inner: MemoryApi,
    remaining: AtomicUsize,
}

impl FlakyDiscovery {
    pub fn new(inner: MemoryApi, failures: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(failures),
        }
    }
}

impl ExportApi for FlakyDiscovery {
    fn lookup(&self, export_id: &str) -> Result<Export, AggError> {
        let injected = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AggError::DiscoveryUnavailable(
                "injected outage".to_string(),
            ));
        }
        self.inner.lookup(export_id)
    }

    fn open(&self, download: &Download) -> Result<Box<dyn BufRead + Send>, AggError> {
        self.inner.open(download)
    }
}
