use crate::config::Config;
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber at `config.log_level`. `RUST_LOG`
/// overrides it. Calling it again after a subscriber is set is a no-op.
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
