//! Subscriber setup.
//!
//! `RUST_LOG` wins when set. Otherwise `-v` raises the level, and the
//! config file's `logging.level` is the fallback. Records from crates
//! logging through `log` are bridged into the same subscriber.

use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is unset.
pub fn filter_directive(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.trim().to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber, writing to stderr.
pub fn init(configured: &str, verbose: u8) {
    let directive = filter_directive(configured, verbose);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("logging already initialized: {e}");
    }
}
