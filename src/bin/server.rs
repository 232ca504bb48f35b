//! Serves the account deletion endpoint.

use anyhow::Result;
use attendance_tracker::{config::Settings, server};

#[tokio::main]
async fn main() -> Result<()> {
    attendance_tracker::init_tracing("info");

    let settings = Settings::load()?;
    server::start_server(settings).await
}
