mod aggregate;
mod config;
mod counting;
mod discovery;
mod error;
mod http;
mod progress;
mod row;
mod streaming;
mod util;

pub use crate::aggregate::{ExportAggregator, RunSummary};
pub use crate::config::AggOptions;
pub use crate::counting::EventCounts;
pub use crate::discovery::{Download, Export, ExportApi, TimeRange};
pub use crate::error::AggError;
pub use crate::http::{HttpExportApi, DEFAULT_BASE_URL};
pub use crate::row::{parse_row, Row, RowParseError, CSV_HEADER};
pub use crate::streaming::{process_download, RowStats};

// Expose progress helper so binaries can label their own bars.
pub use crate::progress::make_progress_bar_labeled;

// Expose tracing init and the retry helper for application code.
pub use crate::util::{init_tracing_once, with_retries};
