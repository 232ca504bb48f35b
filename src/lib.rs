use tracing_subscriber::{EnvFilter, fmt};

pub mod account;
pub mod aggregate;
pub mod auth;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod display;
pub mod error;
pub mod gesture;
pub mod import;
pub mod manager;
pub mod models;
pub mod schedule;
pub mod schema;
pub mod server;

pub use crate::error::{AppError, AppResult};

/// Installs the global `tracing` subscriber, writing to stderr. `RUST_LOG` takes precedence over
/// `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
