//! Logger setup

use crate::config::SyncConfig;

/// Install `env_logger` with the configured level as default.
///
/// `RUST_LOG` still wins when set. Returns false if a logger was already
/// installed.
pub fn init(config: &SyncConfig) -> bool {
    builder(config).try_init().is_ok()
}

fn builder(config: &SyncConfig) -> env_logger::Builder {
    let env = env_logger::Env::default().default_filter_or(config.log_level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_timestamp_millis();
    builder
}
