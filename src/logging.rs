//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Environment variable holding per-module log directives, e.g.
/// `REPOGRAPH_LOG=repograph::resolver=debug`.
pub const LOG_ENV: &str = "REPOGRAPH_LOG";

/// Directive used when `REPOGRAPH_LOG` is unset or invalid.
fn fallback_directive(quiet: bool) -> &'static str {
    if quiet { "warn" } else { "repograph=info" }
}

/// Install the stderr subscriber. Safe to call more than once; only the
/// first call has an effect.
pub fn init_tracing(quiet: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(fallback_directive(quiet)));

        // Another subscriber may already be installed by an embedding program.
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_lowers_fallback_level() {
        assert_eq!(fallback_directive(true), "warn");
        assert_eq!(fallback_directive(false), "repograph=info");
    }

    #[test]
    fn init_is_idempotent() {
        init_tracing(true);
        init_tracing(false);
    }
}
