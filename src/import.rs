//! Loading reference data from CSV exports.
//!
//! The timetable file has the header `subject,start_time,end_time,room,day,batch,is_batch_wide`
//! and the holiday file `date,name,type`. Times may be written `HH:MM` or `HH:MM:SS`.

use chrono::{NaiveDate, NaiveTime};
use diesel::prelude::*;
use serde::Deserialize;
use std::io::Read;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{NewHolidayEntry, NewTimetableClass};
use crate::schedule::{day_name, parse_day_name};
use crate::schema;

#[derive(Debug, Deserialize)]
struct TimetableRow {
    subject: String,
    start_time: String,
    end_time: String,
    #[serde(default)]
    room: Option<String>,
    day: String,
    batch: String,
    #[serde(default)]
    is_batch_wide: bool,
}

#[derive(Debug, Deserialize)]
struct HolidayRow {
    date: NaiveDate,
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

fn parse_time(value: &str, line: usize) -> AppResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| AppError::validation(format!("Line {line}: invalid time '{value}'")))
}

/// Parses a timetable CSV into rows ready to insert.
pub fn read_timetable<R: Read>(reader: R) -> AppResult<Vec<NewTimetableClass>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    rdr.deserialize::<TimetableRow>()
        .enumerate()
        .map(|(i, row)| {
            // Header is line 1.
            let line = i + 2;
            let row = row?;

            let weekday = parse_day_name(&row.day)
                .ok_or_else(|| AppError::validation(format!("Line {line}: unknown day '{}'", row.day)))?;
            let start_time = parse_time(&row.start_time, line)?;
            let end_time = parse_time(&row.end_time, line)?;
            if end_time <= start_time {
                return Err(AppError::validation(format!(
                    "Line {line}: class ends before it starts"
                )));
            }

            Ok(NewTimetableClass {
                subject: row.subject,
                start_time,
                end_time,
                room: row.room.filter(|room| !room.is_empty()),
                day: day_name(weekday).to_string(),
                batch: row.batch,
                is_batch_wide: row.is_batch_wide,
            })
        })
        .collect()
}

/// Parses an institution-wide holiday CSV into rows ready to insert.
pub fn read_holidays<R: Read>(reader: R) -> AppResult<Vec<NewHolidayEntry>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    rdr.deserialize::<HolidayRow>()
        .map(|row| {
            let row = row?;
            Ok(NewHolidayEntry {
                date: row.date,
                name: row.name,
                kind: row
                    .kind
                    .filter(|kind| !kind.is_empty())
                    .unwrap_or_else(|| "holiday".to_string()),
                is_institution_wide: true,
                userid: None,
            })
        })
        .collect()
}

/// Replaces the whole timetable with `classes`.
pub fn replace_timetable(
    conn: &mut SqliteConnection,
    classes: &[NewTimetableClass],
) -> AppResult<usize> {
    conn.transaction::<_, AppError, _>(|conn| {
        let removed = diesel::delete(schema::timetable::table).execute(conn)?;
        let inserted = diesel::insert_into(schema::timetable::table)
            .values(classes)
            .execute(conn)?;

        info!("Replaced {removed} timetable row(s) with {inserted}");
        Ok(inserted)
    })
}

/// Replaces every institution-wide holiday with `holidays`. Personal holidays are kept.
pub fn replace_institution_holidays(
    conn: &mut SqliteConnection,
    holidays: &[NewHolidayEntry],
) -> AppResult<usize> {
    conn.transaction::<_, AppError, _>(|conn| {
        let removed = diesel::delete(
            schema::calendar::table.filter(schema::calendar::is_institution_wide.eq(true)),
        )
        .execute(conn)?;
        let inserted = diesel::insert_into(schema::calendar::table)
            .values(holidays)
            .execute(conn)?;

        info!("Replaced {removed} institution holiday(s) with {inserted}");
        Ok(inserted)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_timetable_rows() {
        let data = "\
subject,start_time,end_time,room,day,batch,is_batch_wide
Physics,09:00,10:00,LT-1,monday,A1,false
Assembly,08:00:00,08:30:00,,Monday,ALL,true
";
        let classes = read_timetable(data.as_bytes()).unwrap();

        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].day, "Monday");
        assert_eq!(classes[0].room.as_deref(), Some("LT-1"));
        assert_eq!(classes[0].start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(classes[1].room, None);
        assert!(classes[1].is_batch_wide);
    }

    #[test]
    fn rejects_unknown_days_and_bad_times() {
        let bad_day = "\
subject,start_time,end_time,room,day,batch,is_batch_wide
Physics,09:00,10:00,LT-1,Someday,A1,false
";
        let err = read_timetable(bad_day.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "Line 2: unknown day 'Someday'");

        let backwards = "\
subject,start_time,end_time,room,day,batch,is_batch_wide
Physics,10:00,09:00,LT-1,Monday,A1,false
";
        assert!(read_timetable(backwards.as_bytes()).is_err());
    }

    #[test]
    fn reads_institution_holidays() {
        let data = "\
date,name,type
2025-01-26,Republic Day,national
2025-03-14,Holi,
";
        let holidays = read_holidays(data.as_bytes()).unwrap();

        assert_eq!(holidays.len(), 2);
        assert!(holidays.iter().all(|h| h.is_institution_wide && h.userid.is_none()));
        assert_eq!(holidays[0].kind, "national");
        assert_eq!(holidays[1].kind, "holiday");
        assert_eq!(holidays[0].date, NaiveDate::from_ymd_opt(2025, 1, 26).unwrap());
    }
}
