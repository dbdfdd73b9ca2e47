use crate::error::AggError;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
/// Install the global tracing subscriber once; `RUST_LOG` overrides
/// `default_filter`. Called by the shell only, never by the core.
pub fn init_tracing_once(default_filter: &str) {
    INIT_ONCE.call_once(|| {
        let env_filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// Run `f` up to `tries` times, sleeping `delay_ms * attempt` between
/// attempts. Only transient errors are retried; terminal errors return
/// immediately.
pub fn with_retries<T>(
    tries: usize,
    delay_ms: u64,
    mut f: impl FnMut() -> Result<T, AggError>,
) -> Result<T, AggError> {
    let tries = tries.max(1);
    let mut last_err: Option<AggError> = None;
    for attempt in 1..=tries {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() => {
                tracing::warn!(attempt, tries, error = %e, "transient failure");
                last_err = Some(e);
                if attempt < tries {
                    sleep(Duration::from_millis(delay_ms.saturating_mul(attempt as u64)));
                }
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err
        .unwrap_or_else(|| AggError::DiscoveryUnavailable("retry budget exhausted".to_string())))
}
