/// User-facing options with sensible defaults and builder chaining. The core
/// takes every knob explicitly; it never reads ambient global state.
#[derive(Clone, Debug)]
pub struct AggOptions {
    pub download_concurrency: usize, // max downloads streamed at once
    pub retry_tries: usize,          // attempts per download / discovery call
    pub retry_delay_ms: u64,         // base backoff delay; grows linearly per attempt
    pub parallelism: Option<usize>,  // Some(N) to set rayon threads, None to use default
    pub progress: bool,              // show progress bar
    pub progress_label: Option<String>,
}

impl Default for AggOptions {
    fn default() -> Self {
        Self {
            // Bounded so an export with many downloads cannot open unbounded
            // network handles at once.
            download_concurrency: 4,
            retry_tries: 3,
            retry_delay_ms: 250,
            parallelism: None,
            progress: false,
            progress_label: None,
        }
    }
}

impl AggOptions {
    pub fn with_download_concurrency(mut self, n: usize) -> Self {
        self.download_concurrency = n.max(1);
        self
    }
    pub fn with_retry_tries(mut self, tries: usize) -> Self {
        self.retry_tries = tries.max(1);
        self
    }
    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
}
