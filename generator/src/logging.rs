//! Diagnostic logging setup.
//!
//! Library code only emits records through the `log` facade. The binary
//! installs a `tracing-subscriber` formatter on stderr once at startup; it
//! picks up `log` records too, filtered by `-v`/`-q` unless
//! [`LOG_ENV_VAR`] holds explicit directives.

use log::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable whose filter directives override `-v`/`-q`.
pub const LOG_ENV_VAR: &str = "FLATPAK_PIP_GENERATOR_LOG";

/// Map verbosity flags to a level filter.
///
/// Warnings are shown by default, `-v` adds progress, `-vv` debug output and
/// `-vvv` everything. `-q` limits output to errors.
///
/// # Examples
///
/// ```
/// use flatpak_pip_generator::logging::level_filter;
/// use log::LevelFilter;
///
/// assert_eq!(level_filter(0, false), LevelFilter::Warn);
/// assert_eq!(level_filter(1, false), LevelFilter::Info);
/// assert_eq!(level_filter(2, true), LevelFilter::Error);
/// ```
#[must_use]
pub fn level_filter(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Filter directive selecting `level` for every target.
#[must_use]
pub fn directive(level: LevelFilter) -> String {
    level.as_str().to_ascii_lowercase()
}

/// Build the event filter: [`LOG_ENV_VAR`] when it parses, `level` otherwise.
#[must_use]
pub fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(directive(level)))
}

/// Install the stderr subscriber at `level`.
///
/// Returns `false` when a subscriber or `log` logger is already installed;
/// the existing one is left in place.
pub fn init(level: LevelFilter) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::quiet_wins(3, true, LevelFilter::Error)]
    #[case::default(0, false, LevelFilter::Warn)]
    #[case::verbose(1, false, LevelFilter::Info)]
    #[case::debug(2, false, LevelFilter::Debug)]
    #[case::trace(5, false, LevelFilter::Trace)]
    fn verbosity_maps_to_level(
        #[case] verbose: u8,
        #[case] quiet: bool,
        #[case] expected: LevelFilter,
    ) {
        assert_eq!(level_filter(verbose, quiet), expected);
    }

    #[rstest]
    #[case(LevelFilter::Error, "error")]
    #[case(LevelFilter::Warn, "warn")]
    #[case(LevelFilter::Trace, "trace")]
    #[case(LevelFilter::Off, "off")]
    fn directives_are_lowercase_level_names(#[case] level: LevelFilter, #[case] expected: &str) {
        assert_eq!(directive(level), expected);
    }

    #[test]
    fn level_directive_builds_matching_filter() {
        let filter = EnvFilter::new(directive(LevelFilter::Info));
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn second_install_is_refused() {
        init(LevelFilter::Warn);
        assert!(!init(LevelFilter::Debug));
        log::warn!("still routed through the first subscriber");
    }
}
