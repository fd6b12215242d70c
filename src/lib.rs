pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod track;
pub mod transport;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the diagnostic channel (tracing)
///
/// This is the crate's own plumbing for reporting transport failures and
/// lifecycle events; it is separate from the log shipping pipeline, which
/// carries the host service's structured events to the ingestion endpoint.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
