//! Tracing subscriber setup for hosts embedding the engine.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter for `level`, unless `RUST_LOG` carries directives of its own
fn build_filter(level: &str, env: Option<&str>) -> anyhow::Result<EnvFilter> {
    match env.filter(|e| !e.trim().is_empty()) {
        Some(directives) => Ok(EnvFilter::try_new(directives)?),
        None => Ok(EnvFilter::try_new(format!("carvex={}", level))?),
    }
}

/// Install a compact fmt subscriber filtered at `level` for this crate.
///
/// `RUST_LOG` directives take precedence over `level`. Fails instead of
/// panicking when a global subscriber is already installed.
pub fn init_tracing(level: &str) -> anyhow::Result<()> {
    // Validate the configured level even when the environment overrides it.
    let _: tracing_subscriber::filter::LevelFilter = level.parse()?;
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, env.as_deref())?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    fn debug_enabled(filter: EnvFilter) -> bool {
        let subscriber = tracing_subscriber::registry().with(filter);
        tracing::subscriber::with_default(subscriber, || {
            tracing::enabled!(target: "carvex::carve", Level::DEBUG)
        })
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(init_tracing("loud").is_err());
    }

    #[test]
    fn env_directives_override_configured_level() {
        let filter = build_filter("warn", Some("carvex=debug")).unwrap();
        assert!(debug_enabled(filter));
    }

    #[test]
    fn configured_level_applies_without_env() {
        assert!(!debug_enabled(build_filter("warn", None).unwrap()));
        assert!(!debug_enabled(build_filter("warn", Some("  ")).unwrap()));
        assert!(debug_enabled(build_filter("debug", None).unwrap()));
    }

    #[test]
    fn second_init_fails_without_panic() {
        let _ = init_tracing("debug");
        assert!(init_tracing("info").is_err());
    }
}
