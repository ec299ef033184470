//! Structured tracing setup, shared by every subcommand.

use tracing_subscriber::EnvFilter;

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,thinksuit_engine=debug")),
        )
        .json()
        .init();
}
