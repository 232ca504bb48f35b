mod test_support;

use attendance_tracker::account::{
    AccountStore, DeleteAccountError, DeletionStep, SqliteAccountStore, delete_account,
    delete_account_for_token,
};
use attendance_tracker::auth::IdentityProvider;
use attendance_tracker::db::Database;
use attendance_tracker::models::Status;
use attendance_tracker::schema;
use attendance_tracker::{AppError, AppResult};
use diesel::prelude::*;
use test_support::{load_timetable, monday, sign_up, temp_db};

fn count_rows(db: &Database, user_id: &str) -> AppResult<[i64; 5]> {
    let conn = &mut db.connection()?;

    Ok([
        schema::attendance_record::table
            .filter(schema::attendance_record::userid.eq(user_id))
            .count()
            .get_result(conn)?,
        schema::calendar::table
            .filter(schema::calendar::userid.assume_not_null().eq(user_id))
            .count()
            .get_result(conn)?,
        schema::user_roles::table
            .filter(schema::user_roles::userid.eq(user_id))
            .count()
            .get_result(conn)?,
        schema::profiles::table
            .filter(schema::profiles::id.eq(user_id))
            .count()
            .get_result(conn)?,
        schema::users::table
            .filter(schema::users::id.eq(user_id))
            .count()
            .get_result(conn)?,
    ])
}

/// Signs up a user with attendance and a personal holiday, returning their token and id.
fn populated_user(db: &Database, email: &str) -> (String, String) {
    let session = sign_up(db, email, "A1");
    let mut manager = db.manager(&session.user.id).unwrap();
    manager.mark(monday(), "Physics", Status::Present, None).unwrap();
    manager.mark(monday(), "Mathematics", Status::Absent, None).unwrap();
    manager.add_holiday(monday(), "Day off").unwrap();

    (session.token, session.user.id)
}

#[test]
fn deleting_an_account_removes_every_row() {
    let (_dir, db) = temp_db();
    load_timetable(&db);
    let (token, user_id) = populated_user(&db, "asha@example.edu");
    let (_, other_id) = populated_user(&db, "ravi@example.edu");

    assert_eq!(count_rows(&db, &user_id).unwrap(), [2, 1, 1, 1, 1]);

    let identity = IdentityProvider::new(db.clone());
    let report = delete_account_for_token(&identity, &token).unwrap();

    let steps: Vec<DeletionStep> = report.deleted.iter().map(|(step, _)| *step).collect();
    assert_eq!(steps, DeletionStep::ORDER);
    assert_eq!(report.deleted[0], (DeletionStep::Attendance, 2));

    assert_eq!(count_rows(&db, &user_id).unwrap(), [0; 5]);
    assert!(matches!(
        identity.authenticate(&token),
        Err(AppError::Unauthenticated)
    ));

    // Nobody else is affected, and the shared timetable stays.
    assert_eq!(count_rows(&db, &other_id).unwrap(), [2, 1, 1, 1, 1]);
    let mut conn = db.connection().unwrap();
    let classes: i64 = schema::timetable::table.count().get_result(&mut conn).unwrap();
    assert_eq!(classes, 6);
}

#[test]
fn deleting_with_an_unknown_token_is_unauthorized() {
    let (_dir, db) = temp_db();
    let (_, user_id) = populated_user(&db, "asha@example.edu");

    let identity = IdentityProvider::new(db.clone());
    let err = delete_account_for_token(&identity, "not-a-token").unwrap_err();

    assert!(matches!(err, DeleteAccountError::Unauthorized));
    assert_eq!(count_rows(&db, &user_id).unwrap(), [2, 1, 1, 1, 1]);
}

/// Passes steps through to SQLite, except for one that always fails.
struct FailingAt<'a> {
    inner: SqliteAccountStore<'a>,
    step: DeletionStep,
}

impl AccountStore for FailingAt<'_> {
    fn delete(&mut self, step: DeletionStep, user_id: &str) -> Result<usize, AppError> {
        if step == self.step {
            return Err(AppError::validation("injected failure"));
        }
        self.inner.delete(step, user_id)
    }
}

#[test]
fn a_failed_step_stops_the_sequence_without_rollback() {
    let (_dir, db) = temp_db();
    let (_, user_id) = populated_user(&db, "asha@example.edu");

    let mut conn = db.connection().unwrap();
    let mut store = FailingAt {
        inner: SqliteAccountStore::new(&mut conn),
        step: DeletionStep::Roles,
    };

    let err = delete_account(&mut store, &user_id).unwrap_err();
    assert_eq!(err.step, DeletionStep::Roles);
    assert_eq!(err.to_string(), "Failed to delete user roles");
    assert_eq!(
        err.completed,
        [DeletionStep::Attendance, DeletionStep::Calendar]
    );
    drop(store);
    drop(conn);

    // Attendance and calendar are gone for good; roles, profile, and identity remain.
    assert_eq!(count_rows(&db, &user_id).unwrap(), [0, 0, 1, 1, 1]);
}
