use anyhow::Result;
use clap::{Parser, ValueEnum};
use medtally::{ExportAggregator, HttpExportApi, DEFAULT_BASE_URL};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

/// Aggregate a healthcare export's event CSVs into per-patient and total
/// counts by event type, printed as JSON.
#[derive(Parser, Debug)]
#[command(name = "medtally", version, about)]
struct Cli {
    /// Export to process.
    #[arg(short = 'e', long, value_enum, default_value_t = ExportId::Demo)]
    export_id: ExportId,

    /// Write the JSON result to this file in addition to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short = 'd', long)]
    verbose: bool,

    /// Log total execution time.
    #[arg(short = 't', long)]
    time: bool,

    /// Base URL of the export service.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Maximum downloads streamed concurrently.
    #[arg(short = 'c', long, default_value_t = 4)]
    concurrency: usize,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExportId {
    Demo,
    Small,
    Large,
}

impl ExportId {
    fn as_str(self) -> &'static str {
        match self {
            ExportId::Demo => "demo",
            ExportId::Small => "small",
            ExportId::Large => "large",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    medtally::init_tracing_once(if cli.verbose { "debug" } else { "info" });

    let start = Instant::now();

    let api = HttpExportApi::new(&cli.base_url)?;
    let summary = ExportAggregator::new()
        .download_concurrency(cli.concurrency)
        .progress(cli.progress)
        .run(&api, cli.export_id.as_str())?;

    tracing::debug!(
        downloads = summary.downloads,
        rows = summary.rows,
        skipped = summary.skipped,
        "preparing output JSON"
    );

    let json = serde_json::to_string_pretty(&summary.counts)?;
    println!("{json}");
    if let Some(path) = &cli.output {
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(json.as_bytes())?;
        w.write_all(b"\n")?;
        w.flush()?;
        tracing::debug!(path = %path.display(), "wrote output file");
    }

    if cli.time {
        tracing::info!(elapsed = ?start.elapsed(), "completed");
    }
    Ok(())
}
