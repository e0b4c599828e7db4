//! Logging setup shared by the binaries

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Map a `--verbosity` value to a filter directive (unknown values give "info")
pub fn verbosity_directive(verbosity: &str) -> &'static str {
    match verbosity.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Filter for `verbosity`, ignoring `RUST_LOG`
pub fn verbosity_filter(verbosity: &str) -> EnvFilter {
    EnvFilter::new(verbosity_directive(verbosity))
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `verbosity`.
pub fn setup_logging(verbosity: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| verbosity_filter(verbosity));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_verbosity_directive() {
        assert_eq!(verbosity_directive("DEBUG"), "debug");
        assert_eq!(verbosity_directive("warn"), "warn");
        assert_eq!(verbosity_directive("loud"), "info");
    }

    #[test]
    fn test_verbosity_filter_level() {
        assert_eq!(verbosity_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(verbosity_filter("error").max_level_hint(), Some(LevelFilter::ERROR));
        assert_eq!(verbosity_filter("nonsense").max_level_hint(), Some(LevelFilter::INFO));
    }
}
