//! Tracing setup for the meter binary.

use std::io;
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Install a stderr subscriber once; stdout stays free for the bar display.
pub fn init(verbose: bool) {
    let _ = TRACING_INIT.get_or_init(|| {
        let level = if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        };
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
