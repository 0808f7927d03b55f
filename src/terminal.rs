//! Terminal capability checks and tracing setup.

use std::ffi::OsStr;

/// Whether log output must be plain: `--no-color`, a non-empty `NO_COLOR`,
/// or `TERM=dumb`.
pub(crate) fn plain_output(no_color_flag: bool) -> bool {
    no_color_flag
        || env_wants_plain(
            std::env::var_os("NO_COLOR").as_deref(),
            std::env::var_os("TERM").as_deref(),
        )
}

/// `TERM=dumb` terminals get neither colors nor a progress bar.
pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var_os("TERM").is_some_and(|term| term.eq_ignore_ascii_case("dumb"))
}

fn env_wants_plain(no_color: Option<&OsStr>, term: Option<&OsStr>) -> bool {
    no_color.is_some_and(|value| !value.is_empty())
        || term.is_some_and(|term| term.eq_ignore_ascii_case("dumb"))
}

pub(crate) fn should_use_progress_bar(
    stderr_is_terminal: bool,
    quiet: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `default_level`.
pub(crate) fn init_tracing(default_level: &str, no_color: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}
