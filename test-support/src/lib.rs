pub mod fake_smtp;

use simplelog::{Config, LevelFilter, SimpleLogger};

/// Routes `log` records (and `tracing` events, through its `log` feature) to stderr. Safe to call
/// from every test; only the first call installs the logger.
pub fn setup_logging() {
    let _ = SimpleLogger::init(LevelFilter::Debug, Config::default());
}
