use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_ENV: &str = "DOCSIGNER_LOG";
const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. Filter comes from `DOCSIGNER_LOG`, then
/// `RUST_LOG`, then `info`. Output goes to stderr so stdout stays clean for
/// the CLI's result line. Calling this twice is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
