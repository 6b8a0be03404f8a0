//! Structured logging
//!
//! The router, composer and coordinator emit `tracing` events carrying the
//! page id, entity type and operation. [`init`] installs a subscriber that
//! prints them.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilitySettings};

/// Initialize logging with default settings
///
/// Pretty output in debug builds, JSON in release builds. `RUST_LOG`
/// overrides the default filter.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// use acton_pages::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("Application started");
/// # Ok(())
/// # }
/// ```
pub fn init() -> anyhow::Result<()> {
    init_from(&ObservabilitySettings::default())
}

/// Initialize logging from configuration
///
/// # Errors
///
/// Returns an error if the filter directives are invalid or a global
/// subscriber is already installed.
pub fn init_from(settings: &ObservabilitySettings) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.filter)?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if use_json(settings.log_format) {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).try_init()?;
    }

    tracing::debug!(format = ?settings.log_format, "Logging initialized");
    Ok(())
}

const fn use_json(format: LogFormat) -> bool {
    match format {
        LogFormat::Auto => !cfg!(debug_assertions),
        LogFormat::Pretty => false,
        LogFormat::Json => true,
    }
}
