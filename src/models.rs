use crate::schema::{attendance_record, calendar, profiles, sessions, timetable, user_roles, users};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The attendance status of a single class on a single day.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
    clap::ValueEnum,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Present,
    Absent,
    Cancelled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Absent => "absent",
            Status::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Present => "Present",
            Status::Absent => "Absent",
            Status::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
#[error("unknown attendance status '{0}'")]
pub struct ParseStatusError(String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Status::Present),
            "absent" => Ok(Status::Absent),
            "cancelled" => Ok(Status::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl ToSql<Text, Sqlite> for Status {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for Status {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(text.parse()?)
    }
}

/// One row of `attendance_record`, keyed by `(userid, date, subject)`.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = attendance_record)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AttendanceRecord {
    pub userid: String,
    pub date: NaiveDate,
    pub subject: String,
    pub status: Status,
    pub swapped_to: Option<String>,
}

impl AttendanceRecord {
    /// The subject this record counts towards: the substituted subject if the class was swapped.
    pub fn effective_subject(&self) -> &str {
        self.swapped_to.as_deref().unwrap_or(&self.subject)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub branch: String,
    pub batch: String,
    pub roll_number: String,
}

impl Profile {
    /// The name used in greetings.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("Student")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = timetable)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TimetableClass {
    pub id: i32,
    pub subject: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub day: String,
    pub batch: String,
    pub is_batch_wide: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = timetable)]
pub struct NewTimetableClass {
    pub subject: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub day: String,
    pub batch: String,
    pub is_batch_wide: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = calendar)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HolidayEntry {
    pub id: i32,
    pub date: NaiveDate,
    pub name: String,
    pub kind: String,
    pub is_institution_wide: bool,
    pub userid: Option<String>,
}

impl HolidayEntry {
    /// Whether this holiday cancels classes for the given user.
    pub fn applies_to(&self, user_id: &str) -> bool {
        self.is_institution_wide || self.userid.as_deref() == Some(user_id)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = calendar)]
pub struct NewHolidayEntry {
    pub date: NaiveDate,
    pub name: String,
    pub kind: String,
    pub is_institution_wide: bool,
    pub userid: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub iterations: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub token: &'a str,
    pub userid: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_roles)]
pub struct NewUserRole<'a> {
    pub userid: &'a str,
    pub role: &'a str,
}
