//! Tracing subscriber setup for binaries embedding the game.

use tracing_subscriber::EnvFilter;

use kokuhaku_core::config::GeneralConfig;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` overrides `config.log_level` when set. Returns `false` if a
/// global subscriber was already installed, which leaves it in place.
pub fn init_tracing(config: &GeneralConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_reports_false() {
        let config = GeneralConfig::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
