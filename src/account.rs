//! Deleting an account and everything that hangs off it.
//!
//! The deletion runs as five bulk deletes, one per table, in dependency order: the user's
//! attendance records, calendar entries, and role assignments go first, then their profile, and
//! finally the identity itself. Steps run strictly one after another. The first failure stops the
//! sequence; whatever was already deleted stays deleted.

use diesel::prelude::*;
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

use crate::auth::IdentityProvider;
use crate::error::AppError;
use crate::schema;

/// One table-level delete in the account deletion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionStep {
    Attendance,
    Calendar,
    Roles,
    Profile,
    Identity,
}

impl DeletionStep {
    /// The order the steps must run in.
    pub const ORDER: [DeletionStep; 5] = [
        DeletionStep::Attendance,
        DeletionStep::Calendar,
        DeletionStep::Roles,
        DeletionStep::Profile,
        DeletionStep::Identity,
    ];

    /// The message reported when this step fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            DeletionStep::Attendance => "Failed to delete attendance records",
            DeletionStep::Calendar => "Failed to delete calendar entries",
            DeletionStep::Roles => "Failed to delete user roles",
            DeletionStep::Profile => "Failed to delete profile",
            DeletionStep::Identity => "Failed to delete user account",
        }
    }
}

impl fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeletionStep::Attendance => "attendance records",
            DeletionStep::Calendar => "calendar entries",
            DeletionStep::Roles => "user roles",
            DeletionStep::Profile => "profile",
            DeletionStep::Identity => "identity",
        };
        f.write_str(name)
    }
}

/// A deletion step failed. Steps before it have already been committed.
#[derive(Debug, Error)]
#[error("{}", .step.failure_message())]
pub struct DeletionError {
    pub step: DeletionStep,
    pub completed: Vec<DeletionStep>,
    #[source]
    pub source: AppError,
}

/// Row counts removed by a completed deletion, in step order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub deleted: Vec<(DeletionStep, usize)>,
}

/// A store able to perform each deletion step for a user.
pub trait AccountStore {
    /// Deletes every row belonging to `user_id` for one step, returning how many rows went.
    fn delete(&mut self, step: DeletionStep, user_id: &str) -> Result<usize, AppError>;
}

/// Runs the deletion sequence against `store`.
pub fn delete_account<S: AccountStore + ?Sized>(
    store: &mut S,
    user_id: &str,
) -> Result<DeletionReport, DeletionError> {
    let mut report = DeletionReport::default();

    for step in DeletionStep::ORDER {
        match store.delete(step, user_id) {
            Ok(count) => {
                info!("Deleted {count} row(s) of {step} for {user_id}");
                report.deleted.push((step, count));
            }
            Err(source) => {
                error!("Error deleting {step} for {user_id}: {source}");
                return Err(DeletionError {
                    step,
                    completed: report.deleted.iter().map(|(s, _)| *s).collect(),
                    source,
                });
            }
        }
    }

    Ok(report)
}

/// The SQLite-backed [`AccountStore`]. Each step is a single unscoped delete, so this is only
/// handed out after the caller's token has been checked.
pub struct SqliteAccountStore<'a> {
    conn: &'a mut SqliteConnection,
}

impl<'a> SqliteAccountStore<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        Self { conn }
    }
}

impl AccountStore for SqliteAccountStore<'_> {
    fn delete(&mut self, step: DeletionStep, user_id: &str) -> Result<usize, AppError> {
        let conn = &mut *self.conn;

        let count = match step {
            DeletionStep::Attendance => diesel::delete(
                schema::attendance_record::table
                    .filter(schema::attendance_record::userid.eq(user_id)),
            )
            .execute(conn)?,
            DeletionStep::Calendar => diesel::delete(
                schema::calendar::table
                    .filter(schema::calendar::userid.assume_not_null().eq(user_id)),
            )
            .execute(conn)?,
            DeletionStep::Roles => diesel::delete(
                schema::user_roles::table.filter(schema::user_roles::userid.eq(user_id)),
            )
            .execute(conn)?,
            DeletionStep::Profile => {
                diesel::delete(schema::profiles::table.filter(schema::profiles::id.eq(user_id)))
                    .execute(conn)?
            }
            // Sessions go with the identity through their cascading foreign key.
            DeletionStep::Identity => {
                diesel::delete(schema::users::table.filter(schema::users::id.eq(user_id)))
                    .execute(conn)?
            }
        };

        Ok(count)
    }
}

/// Why a token-authorized deletion did not go through.
#[derive(Debug, Error)]
pub enum DeleteAccountError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Deletion(#[from] DeletionError),

    #[error("Failed to delete account")]
    Backend(#[source] AppError),
}

/// Deletes the account that owns `token`.
pub fn delete_account_for_token(
    identity: &IdentityProvider,
    token: &str,
) -> Result<DeletionReport, DeleteAccountError> {
    let user = match identity.authenticate(token) {
        Ok(user) => user,
        Err(AppError::Unauthenticated) => return Err(DeleteAccountError::Unauthorized),
        Err(e) => return Err(DeleteAccountError::Backend(e)),
    };

    let mut conn = identity
        .database()
        .connection()
        .map_err(DeleteAccountError::Backend)?;

    let report = delete_account(&mut SqliteAccountStore::new(&mut conn), &user.id)?;
    info!("Deleted account {}", user.email);

    Ok(report)
}
