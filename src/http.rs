//! HTTP implementation of `ExportApi` against the local export service.

use crate::discovery::{Download, Export, ExportApi, TimeRange};
use crate::error::AggError;
use anyhow::Result;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Service responses wrap their payload in a `data` envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Per-download metadata; everything beyond the id is optional.
#[derive(Deserialize)]
struct DownloadDetail {
    id: String,
    #[serde(default)]
    size_bytes: Option<u64>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

#[derive(Deserialize)]
struct ExportDetail {
    #[serde(default)]
    download_ids: Vec<String>,
    /// Richer descriptors, when the service provides them; takes precedence
    /// over the bare `download_ids` list.
    #[serde(default)]
    downloads: Vec<DownloadDetail>,
}

pub struct HttpExportApi {
    base_url: String,
    client: reqwest::blocking::Client,
    read_buffer_bytes: usize,
}

impl HttpExportApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            read_buffer_bytes: 256 * 1024,
        })
    }

    pub fn read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }

    fn export_url(&self, export_id: &str) -> String {
        format!("{}/export/{}", self.base_url, export_id)
    }

    fn data_url(&self, download: &Download) -> String {
        format!(
            "{}/export/{}/{}/data",
            self.base_url, download.export_id, download.id
        )
    }
}

impl ExportApi for HttpExportApi {
    fn lookup(&self, export_id: &str) -> Result<Export, AggError> {
        let url = self.export_url(export_id);
        tracing::debug!(%url, "fetching export details");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AggError::DiscoveryUnavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AggError::ExportNotFound(export_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(AggError::DiscoveryUnavailable(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }

        let envelope: Envelope<ExportDetail> = resp.json().map_err(|e| {
            AggError::DiscoveryUnavailable(format!("invalid discovery response: {e}"))
        })?;
        let detail = envelope.data;

        let downloads: Vec<Download> = if !detail.downloads.is_empty() {
            detail
                .downloads
                .into_iter()
                .map(|d| Download {
                    export_id: export_id.to_string(),
                    id: d.id,
                    size_hint: d.size_bytes,
                    range: match (d.start, d.end) {
                        (Some(start), Some(end)) => Some(TimeRange { start, end }),
                        _ => None,
                    },
                })
                .collect()
        } else {
            detail
                .download_ids
                .into_iter()
                .map(|id| Download {
                    export_id: export_id.to_string(),
                    id,
                    size_hint: None,
                    range: None,
                })
                .collect()
        };

        tracing::debug!(export_id, downloads = downloads.len(), "export resolved");
        Ok(Export {
            id: export_id.to_string(),
            downloads,
        })
    }

    fn open(&self, download: &Download) -> Result<Box<dyn BufRead + Send>, AggError> {
        let url = self.data_url(download);
        tracing::debug!(%url, "opening download stream");

        let resp = self.client.get(&url).send().map_err(|e| AggError::DownloadIo {
            download: download.id.clone(),
            message: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(AggError::DownloadIo {
                download: download.id.clone(),
                message: format!("{} returned {}", url, resp.status()),
            });
        }

        Ok(Box::new(BufReader::with_capacity(
            self.read_buffer_bytes,
            resp,
        )))
    }
}
