use tracing_subscriber::EnvFilter;

/// Installs the process-wide fmt subscriber for the host application.
///
/// Honors `RUST_LOG`; falls back to `info` when it is unset or invalid.
/// Calling it twice is harmless: the second install attempt is ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already installed");
    }
}
