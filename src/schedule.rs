//! Working out which timetable entries a student actually has on a given day.

use crate::models::{AttendanceRecord, HolidayEntry, Status, TimetableClass};
use chrono::{NaiveDate, NaiveTime, Weekday};
use std::collections::{BTreeSet, HashSet};

/// The days classes can be scheduled on, in display order.
pub const WEEK_DAYS: [Weekday; 6] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// The name a weekday is stored under in the `timetable.day` column.
pub fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parses a stored day name, accepting any capitalisation.
pub fn parse_day_name(name: &str) -> Option<Weekday> {
    let name = name.trim();
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
    .into_iter()
    .find(|&weekday| day_name(weekday).eq_ignore_ascii_case(name))
}

/// Whether a timetable entry is taught to `batch`: either the entry is flagged batch-wide, or the
/// student's batch starts with the entry's batch (`A1` entries reach `A1`, `A` entries reach `A1`
/// and `A2`).
pub fn applies_to_batch(entry: &TimetableClass, batch: &str) -> bool {
    entry.is_batch_wide || (!entry.batch.is_empty() && batch.starts_with(entry.batch.as_str()))
}

type ClassKey<'a> = (&'a str, &'a str, NaiveTime, NaiveTime);

fn class_key(entry: &TimetableClass) -> ClassKey<'_> {
    (
        entry.day.as_str(),
        entry.subject.as_str(),
        entry.start_time,
        entry.end_time,
    )
}

/// Filters timetable rows down to those taught to `batch`, drops duplicates sharing the same day,
/// subject, and time slot, and orders the rest by start time.
pub fn resolve_classes(entries: Vec<TimetableClass>, batch: &str) -> Vec<TimetableClass> {
    let mut applicable: Vec<TimetableClass> = entries
        .into_iter()
        .filter(|entry| applies_to_batch(entry, batch))
        .collect();

    // Entries naming the batch exactly win over batch-wide or prefix entries for the same slot.
    applicable.sort_by_key(|entry| entry.batch != batch);

    let mut seen = HashSet::new();
    let mut unique: Vec<TimetableClass> = Vec::with_capacity(applicable.len());
    for entry in applicable {
        let key = (
            entry.day.clone(),
            entry.subject.clone(),
            entry.start_time,
            entry.end_time,
        );
        if seen.insert(key) {
            unique.push(entry);
        }
    }

    unique.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| class_key(a).cmp(&class_key(b)))
    });
    unique
}

/// A class on the day's schedule, along with whatever has been recorded for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledClass {
    pub class: TimetableClass,
    pub record: Option<AttendanceRecord>,
}

impl ScheduledClass {
    /// The subject to show: what was actually taught if the class was swapped.
    pub fn display_subject(&self) -> &str {
        self.record
            .as_ref()
            .and_then(|r| r.swapped_to.as_deref())
            .unwrap_or(&self.class.subject)
    }

    pub fn status(&self) -> Option<Status> {
        self.record.as_ref().map(|r| r.status)
    }

    pub fn is_marked(&self) -> bool {
        self.record.is_some()
    }
}

/// Pairs each class with the day's record for its original subject. Records are matched on the
/// scheduled subject, never the swapped one.
pub fn attach_status(
    classes: Vec<TimetableClass>,
    records: &[AttendanceRecord],
) -> Vec<ScheduledClass> {
    classes
        .into_iter()
        .map(|class| {
            let record = records.iter().find(|r| r.subject == class.subject).cloned();
            ScheduledClass { class, record }
        })
        .collect()
}

/// The resolved schedule for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    pub date: NaiveDate,
    pub holidays: Vec<HolidayEntry>,
    pub classes: Vec<ScheduledClass>,
}

impl DailySchedule {
    pub fn new(date: NaiveDate, classes: Vec<ScheduledClass>) -> Self {
        Self {
            date,
            holidays: Vec::new(),
            classes,
        }
    }

    /// A day off: no classes regardless of what the timetable says.
    pub fn holiday(date: NaiveDate, holidays: Vec<HolidayEntry>) -> Self {
        Self {
            date,
            holidays,
            classes: Vec::new(),
        }
    }

    pub fn empty(date: NaiveDate) -> Self {
        Self::new(date, Vec::new())
    }

    pub fn is_holiday(&self) -> bool {
        !self.holidays.is_empty()
    }

    /// Finds today's class for a subject, by scheduled or swapped subject name.
    pub fn find(&self, subject: &str) -> Option<&ScheduledClass> {
        self.classes
            .iter()
            .find(|c| c.class.subject == subject)
            .or_else(|| self.classes.iter().find(|c| c.display_subject() == subject))
    }
}

/// A batch's classes for each teaching day of the week.
pub type WeekSchedule = Vec<(Weekday, Vec<TimetableClass>)>;

/// Groups every timetable row taught to `batch` by day, Monday through Saturday.
pub fn group_week(entries: Vec<TimetableClass>, batch: &str) -> WeekSchedule {
    let mut by_day: Vec<(Weekday, Vec<TimetableClass>)> =
        WEEK_DAYS.iter().map(|&day| (day, Vec::new())).collect();

    for entry in entries {
        let Some(weekday) = parse_day_name(&entry.day) else {
            continue;
        };
        if let Some((_, classes)) = by_day.iter_mut().find(|(day, _)| *day == weekday) {
            classes.push(entry);
        }
    }

    by_day
        .into_iter()
        .map(|(day, classes)| (day, resolve_classes(classes, batch)))
        .collect()
}

/// The subjects a class of `original` could have been swapped to: every other subject on the
/// batch's timetable, alphabetically.
pub fn swap_candidates(entries: &[TimetableClass], batch: &str, original: &str) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| applies_to_batch(entry, batch) && entry.subject != original)
        .map(|entry| entry.subject.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
