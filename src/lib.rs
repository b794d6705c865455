pub mod cli;
pub mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mc_lang_sync=debug")),
        )
        .with_writer(std::io::stderr)
        .init();
}
