#![allow(dead_code)]

use attendance_tracker::auth::{IdentityProvider, Session, SignUp};
use attendance_tracker::db::Database;
use attendance_tracker::import;
use chrono::NaiveDate;
use tempfile::TempDir;

/// A fresh database in its own temporary directory. Keep the [`TempDir`] alive for as long as the
/// database is used.
pub fn temp_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("attendance.sqlite");
    let db = Database::open(path.to_str().expect("utf-8 path")).expect("open database");
    (dir, db)
}

/// Monday, January 13, 2025.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 13).unwrap()
}

pub fn sign_up_form(email: &str, batch: &str) -> SignUp {
    SignUp {
        email: email.to_string(),
        password: "hunter22".to_string(),
        name: "Asha Verma".to_string(),
        roll_number: "21CS042".to_string(),
        branch: "CSE".to_string(),
        batch: batch.to_string(),
    }
}

pub fn sign_up(db: &Database, email: &str, batch: &str) -> Session {
    IdentityProvider::new(db.clone())
        .sign_up(&sign_up_form(email, batch))
        .expect("sign up")
}

/// A Monday with a duplicated A1 row, a batch-wide class, another batch's class, and a Tuesday.
pub const TIMETABLE_CSV: &str = "\
subject,start_time,end_time,room,day,batch,is_batch_wide
Physics,11:00,12:00,LT-2,Monday,A1,false
Mathematics,09:00,10:00,LT-1,Monday,A1,false
Mathematics,09:00,10:00,LT-1,Monday,A,false
Seminar,14:00,15:00,,Monday,ALL,true
Chemistry,10:00,11:00,LT-3,Monday,B1,false
Electronics,09:00,10:00,LT-4,Tuesday,A1,false
";

pub fn load_timetable(db: &Database) {
    let classes = import::read_timetable(TIMETABLE_CSV.as_bytes()).expect("parse timetable");
    let mut conn = db.connection().expect("connection");
    import::replace_timetable(&mut conn, &classes).expect("replace timetable");
}
