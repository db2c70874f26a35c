//! Diagnostic logging for governance commands.
//!
//! Reports go to stdout; tracing output always goes to stderr so reports stay machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive variable, e.g. `GOVERNANCE_LOG=doc_governance=debug`.
pub const LOG_ENV: &str = "GOVERNANCE_LOG";
/// Set to `1` for JSON log lines.
pub const LOG_JSON_ENV: &str = "GOVERNANCE_LOG_JSON";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json_enabled(std::env::var(LOG_JSON_ENV).ok().as_deref()) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn json_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_toggle_accepts_common_spellings() {
        assert!(json_enabled(Some("1")));
        assert!(json_enabled(Some("json")));
        assert!(!json_enabled(Some("0")));
        assert!(!json_enabled(None));
    }

    #[test]
    fn init_twice_does_not_panic() {
        init();
        init();
    }
}
