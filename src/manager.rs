use crate::aggregate::AttendanceSummary;
use crate::db::DbConnection;
use crate::error::{AppError, AppResult};
use crate::models::{AttendanceRecord, HolidayEntry, NewHolidayEntry, Profile, Status, TimetableClass};
use crate::schedule::{self, DailySchedule, WeekSchedule};
use crate::schema;
use chrono::{Datelike, Days, NaiveDate};
use diesel::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// The kind recorded for holidays a student adds to their own calendar.
pub const PERSONAL_HOLIDAY_KIND: &str = "holiday";

/// The manager for recording, modifying, and retrieving one user's attendance data.
///
/// A manager is bound to a single user id: every query it issues is filtered by that id, so holding
/// a manager is the authorization to touch that user's rows.
pub struct AttendanceManager {
    db: DbConnection,
    user_id: String,
}

impl AttendanceManager {
    pub(crate) fn new(db: DbConnection, user_id: &str) -> Self {
        Self {
            db,
            user_id: user_id.to_string(),
        }
    }

    fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.db
    }

    /// The id of the user this manager is scoped to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Retrieves the user's profile.
    pub fn profile(&mut self) -> AppResult<Profile> {
        use schema::profiles::dsl::*;

        let user_id = self.user_id.clone();
        profiles
            .filter(id.eq(&user_id))
            .select(Profile::as_select())
            .first(self.conn())
            .optional()?
            .ok_or(AppError::NotFound("Profile"))
    }

    /// Retrieves every attendance record the user has ever written.
    pub fn records(&mut self) -> AppResult<Vec<AttendanceRecord>> {
        use schema::attendance_record::dsl::*;

        let user_id = self.user_id.clone();
        Ok(attendance_record
            .filter(userid.eq(&user_id))
            .order((date.asc(), subject.asc()))
            .select(AttendanceRecord::as_select())
            .load(self.conn())?)
    }

    /// Retrieves the user's attendance records for a single day.
    pub fn records_on(&mut self, day: NaiveDate) -> AppResult<Vec<AttendanceRecord>> {
        use schema::attendance_record::dsl::*;

        let user_id = self.user_id.clone();
        Ok(attendance_record
            .filter(userid.eq(&user_id))
            .filter(date.eq(day))
            .select(AttendanceRecord::as_select())
            .load(self.conn())?)
    }

    /// Folds all of the user's records into per-subject and overall attendance.
    pub fn summary(&mut self) -> AppResult<AttendanceSummary> {
        Ok(AttendanceSummary::from_records(&self.records()?))
    }

    /// Retrieves every holiday that applies to the user, institution-wide or personal, ordered by
    /// date.
    pub fn holidays(&mut self) -> AppResult<Vec<HolidayEntry>> {
        use schema::calendar::dsl::*;

        let user_id = self.user_id.clone();
        Ok(calendar
            .filter(
                is_institution_wide
                    .eq(true)
                    .or(userid.assume_not_null().eq(&user_id)),
            )
            .order((date.asc(), id.asc()))
            .select(HolidayEntry::as_select())
            .load(self.conn())?)
    }

    /// Retrieves the holidays applying to the user on a given day.
    pub fn holidays_on(&mut self, day: NaiveDate) -> AppResult<Vec<HolidayEntry>> {
        use schema::calendar::dsl::*;

        let user_id = self.user_id.clone();
        let entries = calendar
            .filter(date.eq(day))
            .select(HolidayEntry::as_select())
            .load(self.conn())?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.applies_to(&user_id))
            .collect())
    }

    /// Adds a personal holiday to the user's calendar.
    pub fn add_holiday(&mut self, day: NaiveDate, holiday_name: &str) -> AppResult<HolidayEntry> {
        let holiday_name = holiday_name.trim();
        if holiday_name.is_empty() {
            return Err(AppError::validation("Holiday name cannot be empty"));
        }

        let entry = NewHolidayEntry {
            date: day,
            name: holiday_name.to_string(),
            kind: PERSONAL_HOLIDAY_KIND.to_string(),
            is_institution_wide: false,
            userid: Some(self.user_id.clone()),
        };

        let created = diesel::insert_into(schema::calendar::table)
            .values(&entry)
            .returning(HolidayEntry::as_returning())
            .get_result(self.conn())?;

        info!("Added personal holiday '{}' on {day}", created.name);

        Ok(created)
    }

    /// Retrieves the raw timetable rows for a weekday, across every batch.
    fn timetable_rows(&mut self, weekday: Option<&str>) -> AppResult<Vec<TimetableClass>> {
        use schema::timetable::dsl::*;

        let mut query = timetable.select(TimetableClass::as_select()).into_boxed();
        if let Some(name) = weekday {
            query = query.filter(day.eq(name.to_string()));
        }

        Ok(query
            .order((start_time.asc(), end_time.asc(), id.asc()))
            .load(self.conn())?)
    }

    /// Resolves the classes the user has on `today`, each paired with the status already recorded
    /// for it. A holiday that applies to the user empties the list.
    pub fn daily_classes(&mut self, today: NaiveDate) -> AppResult<DailySchedule> {
        let profile = self.profile()?;

        let holidays = self.holidays_on(today)?;
        if !holidays.is_empty() {
            debug!("{today} is a holiday for {}", self.user_id);
            return Ok(DailySchedule::holiday(today, holidays));
        }

        let rows = self.timetable_rows(Some(schedule::day_name(today.weekday())))?;
        let classes = schedule::resolve_classes(rows, &profile.batch);
        let records = self.records_on(today)?;

        Ok(DailySchedule::new(today, schedule::attach_status(classes, &records)))
    }

    /// Retrieves the user's whole week of classes, grouped by day.
    pub fn week_timetable(&mut self) -> AppResult<WeekSchedule> {
        let profile = self.profile()?;
        let rows = self.timetable_rows(None)?;

        Ok(schedule::group_week(rows, &profile.batch))
    }

    /// Subjects the user's batch has on the timetable, for choosing what a class was swapped to.
    pub fn swap_candidates(&mut self, original: &str) -> AppResult<Vec<String>> {
        let profile = self.profile()?;
        let rows = self.timetable_rows(None)?;

        Ok(schedule::swap_candidates(&rows, &profile.batch, original))
    }

    /// Marks a class on `day` with the given [`Status`]. If a record for that class and day
    /// already exists, this overwrites it.
    pub fn mark(
        &mut self,
        day: NaiveDate,
        class_subject: &str,
        new_status: Status,
        swapped: Option<&str>,
    ) -> AppResult<AttendanceRecord> {
        let class_subject = class_subject.trim();
        if class_subject.is_empty() {
            return Err(AppError::validation("Subject cannot be empty"));
        }

        let record = AttendanceRecord {
            userid: self.user_id.clone(),
            date: day,
            subject: class_subject.to_string(),
            status: new_status,
            swapped_to: swapped
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };

        diesel::replace_into(schema::attendance_record::table)
            .values(&record)
            .execute(self.conn())?;

        debug!(
            "Marked {} on {day} as {}",
            record.subject,
            record.status.as_str()
        );

        Ok(record)
    }

    /// Overwrites the user's attendance for a subject so that it reads `attended` out of `total`.
    ///
    /// This is a full rewrite: every existing record counting towards the subject is deleted and
    /// `total` synthetic records are written, one per day going backwards from `today`. The first
    /// `attended` of them are present and the rest absent. Days still holding a class of this
    /// subject that was swapped to another one are skipped, so that record keeps counting for the
    /// subject it was swapped to.
    pub fn edit_counts(
        &mut self,
        edited_subject: &str,
        attended: i64,
        total: i64,
        today: NaiveDate,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let (attended, total) = validate_counts(attended, total)?;
        let user_id = self.user_id.clone();

        let inserted = self.conn().transaction::<_, AppError, _>(|conn| {
            use schema::attendance_record::dsl::*;

            let deleted = diesel::delete(
                attendance_record
                    .filter(userid.eq(&user_id))
                    .filter(
                        swapped_to
                            .assume_not_null()
                            .eq(edited_subject)
                            .or(subject.eq(edited_subject).and(swapped_to.is_null())),
                    ),
            )
            .execute(conn)?;

            debug!("Deleted {deleted} record(s) for {edited_subject}");

            // Whatever is still keyed by this subject was swapped away from it.
            let swapped_away: BTreeSet<NaiveDate> = attendance_record
                .filter(userid.eq(&user_id))
                .filter(subject.eq(edited_subject))
                .select(date)
                .load::<NaiveDate>(conn)?
                .into_iter()
                .collect();

            let records = synthesize_records(
                &user_id,
                edited_subject,
                attended,
                total,
                today,
                &swapped_away,
            )?;
            if !records.is_empty() {
                diesel::insert_into(attendance_record)
                    .values(&records)
                    .execute(conn)?;
            }

            Ok(records)
        })?;

        info!(
            "Rewrote {edited_subject} attendance as {attended}/{total} for {}",
            self.user_id
        );

        Ok(inserted)
    }
}

/// Checks a manually entered `attended`/`total` pair before anything is written.
pub fn validate_counts(attended: i64, total: i64) -> AppResult<(u32, u32)> {
    if attended > total {
        return Err(AppError::validation(
            "Attended classes cannot exceed total classes",
        ));
    }
    if attended < 0 || total < 0 {
        return Err(AppError::validation("Values cannot be negative"));
    }

    let attended =
        u32::try_from(attended).map_err(|_| AppError::validation("Attended count is too large"))?;
    let total = u32::try_from(total).map_err(|_| AppError::validation("Total count is too large"))?;

    Ok((attended, total))
}

/// Builds `total` daily records walking back from `today`, skipping the days in `taken`. The
/// `i`-th record is present when `i < attended`. With nothing taken, record `i` is dated
/// `today - i`.
pub fn synthesize_records(
    user_id: &str,
    subject: &str,
    attended: u32,
    total: u32,
    today: NaiveDate,
    taken: &BTreeSet<NaiveDate>,
) -> AppResult<Vec<AttendanceRecord>> {
    let mut records = Vec::with_capacity(total as usize);
    let mut day = today;

    while records.len() < total as usize {
        if !taken.contains(&day) {
            let status = if records.len() < attended as usize {
                Status::Present
            } else {
                Status::Absent
            };
            records.push(AttendanceRecord {
                userid: user_id.to_string(),
                date: day,
                subject: subject.to_string(),
                status,
                swapped_to: None,
            });
        }

        day = day
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| AppError::validation("Total count reaches before the calendar"))?;
    }

    Ok(records)
}
