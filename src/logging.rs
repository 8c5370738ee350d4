//! Logging and observability setup.
//!
//! Structured logging with `tracing`; the host process calls
//! [`init_tracing`] once at startup. Spans carry `report_id` and `source`
//! fields so one report's fan-out can be followed across workers.

use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise verbose mode enables debug for the
/// worker's own crates and info elsewhere.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("reporter=debug,info")
            } else {
                EnvFilter::try_new("reporter=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()?;
    Ok(())
}

/// Span covering one report's pipeline run.
pub fn report_span(report_id: &str) -> tracing::Span {
    span!(Level::INFO, "report_pipeline", report_id = %report_id)
}
