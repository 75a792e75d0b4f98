//! Process-wide tracing setup.

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"info"` or `"qk_runtime=debug,info"`).
///
/// Only the first call in a process installs anything; later calls return
/// `false` and leave the existing subscriber in place.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        // Whichever call wins, the loser must report false without panicking.
        let first = init_tracing("warn");
        let second = init_tracing("debug");
        assert!(!second || !first);
        assert!(!init_tracing("info"));
    }
}
