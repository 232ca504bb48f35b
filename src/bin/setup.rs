//! Creates the attendance database, if it does not exist yet, and brings its schema up to date.

use anyhow::Result;
use attendance_tracker::{config::Settings, db::Database};
use tracing::info;

pub fn main() -> Result<()> {
    attendance_tracker::init_tracing("info");

    let settings = Settings::load()?;
    Database::open(&settings.database_url)?;

    info!("Database ready at {}", settings.database_url);
    Ok(())
}
