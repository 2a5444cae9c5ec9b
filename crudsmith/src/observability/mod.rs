//! Observability (logging)
//!
//! Structured logging through `tracing`. The generator logs every section it
//! emits at `debug` and every metadata fallback at `warn`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging stack
///
/// Sets up:
/// - Pretty formatting in debug builds, JSON formatting in release builds
/// - Environment-based log level filtering via `RUST_LOG`
///
/// `verbose` raises the default filter when `RUST_LOG` is not set.
///
/// # Example
///
/// ```rust,no_run
/// use crudsmith::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init(false)?;
/// tracing::info!("Generator started");
/// # Ok(())
/// # }
/// ```
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    #[cfg(debug_assertions)]
    {
        // Pretty formatting for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    #[cfg(not(debug_assertions))]
    {
        // JSON formatting for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose || cfg!(debug_assertions) {
        EnvFilter::new("info,crudsmith=debug")
    } else {
        EnvFilter::new("warn")
    }
}
