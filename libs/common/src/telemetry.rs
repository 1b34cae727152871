//! Tracing setup shared by the binaries

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence; otherwise everything at `default_level` and
/// above is logged. Output goes to stderr so that stdout stays free for
/// command results.
pub fn init_tracing(default_level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
