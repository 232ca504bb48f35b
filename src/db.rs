//! Connection handling for the SQLite database that backs every table.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::manager::AttendanceManager;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Pragmas applied to every pooled connection. Foreign keys are off by default in SQLite, and the
/// account deletion order relies on them.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// A pool of connections to the attendance database.
///
/// Cloning is cheap; every clone shares the same pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Database {
    /// Opens (creating if needed) the database at `database_url` and runs any pending migrations.
    pub fn open(database_url: &str) -> AppResult<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .connection_customizer(Box::new(SqlitePragmas))
            .build(manager)?;

        let db = Self { pool };

        let mut conn = db.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| AppError::Migration(e.to_string()))?;

        if applied.is_empty() {
            debug!("Database {database_url} is up to date");
        } else {
            info!("Applied {} migration(s) to {database_url}", applied.len());
        }

        Ok(db)
    }

    /// Checks a connection out of the pool.
    pub fn connection(&self) -> AppResult<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Returns a data handle scoped to a single user. Every read and write it performs is
    /// filtered by `user_id`.
    pub fn manager(&self, user_id: &str) -> AppResult<AttendanceManager> {
        Ok(AttendanceManager::new(self.connection()?, user_id))
    }
}
