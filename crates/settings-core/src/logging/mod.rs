//! Log output for binaries and tests
//!
//! The library only emits `tracing` events. Embedding applications usually
//! install their own subscriber; [`init`] is a ready-made one.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber on stderr
///
/// `RUST_LOG` takes precedence over `default_filter` (e.g. `"settings_core=info"`).
/// Returns false when a global subscriber was already installed, in which case
/// nothing changes.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init("settings_core=debug");
        assert!(!init("settings_core=debug"));
    }
}
