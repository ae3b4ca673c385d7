//! Process-wide log sink
//!
//! The coordination core only emits `tracing` events. Installing the
//! subscriber is the caller's job and happens once, through [`init_tracing`].

use crate::config::LoggingConfig;
use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber (only once)
///
/// `RUST_LOG` wins over the configured filter. Later calls are no-ops, so a
/// library consumer that already installed its own subscriber keeps it.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.filter.clone());
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(filter))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(config.ansi)
                    .with_target(true),
            )
            .try_init();
    });
}

/// Whether [`init_tracing`] has run
pub fn is_initialized() -> bool {
    TRACING_INIT.is_completed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        init_tracing(&config);
        init_tracing(&config);
        assert!(is_initialized());
        tracing::info!("tracing initialised twice without panicking");
    }
}
