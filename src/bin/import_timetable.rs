//! Loads the shared timetable and the institution-wide holiday calendar from CSV files.
//!
//! Each file given replaces what is currently stored for it. Personal holidays are never touched.

use anyhow::{Context, Result};
use attendance_tracker::{config::Settings, db::Database, import};
use clap::Parser;
use std::{fs::File, path::PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Import the timetable and institution holidays")]
struct Args {
    /// CSV with columns subject,start_time,end_time,room,day,batch,is_batch_wide.
    #[arg(long)]
    timetable: Option<PathBuf>,

    /// CSV with columns date,name,type.
    #[arg(long)]
    holidays: Option<PathBuf>,
}

pub fn main() -> Result<()> {
    attendance_tracker::init_tracing("info");

    let args = Args::parse();
    if args.timetable.is_none() && args.holidays.is_none() {
        anyhow::bail!("Nothing to import, pass --timetable and/or --holidays");
    }

    let settings = Settings::load()?;
    let db = Database::open(&settings.database_url)?;
    let mut conn = db.connection()?;

    if let Some(path) = &args.timetable {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let classes = import::read_timetable(file)
            .with_context(|| format!("reading {}", path.display()))?;

        let inserted = import::replace_timetable(&mut conn, &classes)?;
        info!("Imported {inserted} class(es) from {}", path.display());
    }

    if let Some(path) = &args.holidays {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let holidays = import::read_holidays(file)
            .with_context(|| format!("reading {}", path.display()))?;

        let inserted = import::replace_institution_holidays(&mut conn, &holidays)?;
        info!("Imported {inserted} holiday(s) from {}", path.display());
    }

    Ok(())
}
