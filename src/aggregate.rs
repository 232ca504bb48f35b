//! Folding raw attendance records into per-subject and overall percentages.

use crate::models::{AttendanceRecord, Status};
use std::collections::BTreeMap;

/// Percentage at or above which attendance is in good standing.
pub const GOOD_THRESHOLD: f64 = 75.0;

/// Percentage at or above which attendance is a warning rather than critical.
pub const WARNING_THRESHOLD: f64 = 65.0;

/// Attended and total counts for a single subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAttendance {
    pub subject: String,
    pub attended: u32,
    pub total: u32,
}

impl SubjectAttendance {
    pub fn percentage(&self) -> f64 {
        percentage(self.attended, self.total)
    }

    pub fn standing(&self) -> Standing {
        Standing::from_percentage(self.percentage())
    }
}

/// How worrying an attendance percentage is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Good,
    Warning,
    Critical,
}

impl Standing {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= GOOD_THRESHOLD {
            Standing::Good
        } else if percentage >= WARNING_THRESHOLD {
            Standing::Warning
        } else {
            Standing::Critical
        }
    }
}

/// `attended / total * 100`, or `0` when nothing has been held.
pub fn percentage(attended: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(attended) / f64::from(total) * 100.0
    }
}

/// A user's attendance, broken down by subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceSummary {
    subjects: Vec<SubjectAttendance>,
}

impl AttendanceSummary {
    /// Scans the records once. Cancelled classes are skipped entirely; every other record adds to
    /// the total of its effective subject, and present records add to attended as well.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        let mut counts: BTreeMap<&str, (u32, u32)> = BTreeMap::new();

        for record in records {
            if record.status == Status::Cancelled {
                continue;
            }

            let (attended, total) = counts.entry(record.effective_subject()).or_default();
            *total += 1;
            if record.status == Status::Present {
                *attended += 1;
            }
        }

        let subjects = counts
            .into_iter()
            .map(|(subject, (attended, total))| SubjectAttendance {
                subject: subject.to_string(),
                attended,
                total,
            })
            .collect();

        Self { subjects }
    }

    pub fn subjects(&self) -> &[SubjectAttendance] {
        &self.subjects
    }

    pub fn subject(&self, name: &str) -> Option<&SubjectAttendance> {
        self.subjects.iter().find(|s| s.subject == name)
    }

    pub fn total_attended(&self) -> u32 {
        self.subjects.iter().map(|s| s.attended).sum()
    }

    pub fn total_classes(&self) -> u32 {
        self.subjects.iter().map(|s| s.total).sum()
    }

    /// Overall attendance rounded to the nearest whole percent, `0` with no counted classes.
    pub fn overall_percentage(&self) -> u32 {
        percentage(self.total_attended(), self.total_classes()).round() as u32
    }

    pub fn overall_standing(&self) -> Standing {
        Standing::from_percentage(f64::from(self.overall_percentage()))
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32, subject: &str, status: Status, swapped_to: Option<&str>) -> AttendanceRecord {
        AttendanceRecord {
            userid: "u1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 2, day).unwrap(),
            subject: subject.to_string(),
            status,
            swapped_to: swapped_to.map(str::to_string),
        }
    }

    #[test]
    fn no_records_means_zero_percent() {
        let summary = AttendanceSummary::from_records(&Vec::<AttendanceRecord>::new());
        assert!(summary.is_empty());
        assert_eq!(summary.overall_percentage(), 0);
        assert_eq!(summary.overall_standing(), Standing::Critical);
    }

    #[test]
    fn cancelled_classes_never_count() {
        let records = vec![
            record(1, "Physics", Status::Present, None),
            record(2, "Physics", Status::Cancelled, None),
            record(3, "Physics", Status::Absent, None),
            record(4, "Chemistry", Status::Cancelled, None),
        ];

        let summary = AttendanceSummary::from_records(&records);
        let physics = summary.subject("Physics").unwrap();
        assert_eq!((physics.attended, physics.total), (1, 2));
        assert_eq!(physics.percentage(), 50.0);
        assert!(summary.subject("Chemistry").is_none());
    }

    #[test]
    fn swapped_classes_count_towards_the_substitute() {
        let records = vec![
            record(1, "Physics", Status::Present, Some("Mathematics")),
            record(2, "Physics", Status::Absent, None),
        ];

        let summary = AttendanceSummary::from_records(&records);
        assert_eq!(summary.subject("Mathematics").unwrap().attended, 1);
        assert_eq!(summary.subject("Physics").unwrap().attended, 0);
        assert_eq!(summary.subject("Physics").unwrap().total, 1);
    }

    #[test]
    fn totals_match_record_counts() {
        let statuses = [
            Status::Present,
            Status::Absent,
            Status::Cancelled,
            Status::Present,
            Status::Present,
            Status::Absent,
            Status::Cancelled,
        ];
        let subjects = ["Physics", "Chemistry", "Programming"];
        let records: Vec<_> = statuses
            .iter()
            .enumerate()
            .map(|(i, &status)| record(i as u32 + 1, subjects[i % 3], status, None))
            .collect();

        let summary = AttendanceSummary::from_records(&records);
        let non_cancelled = records.iter().filter(|r| r.status != Status::Cancelled).count();
        let present = records.iter().filter(|r| r.status == Status::Present).count();

        assert_eq!(summary.total_classes() as usize, non_cancelled);
        assert_eq!(summary.total_attended() as usize, present);
    }

    #[test]
    fn overall_percentage_rounds_to_nearest() {
        // 2 of 3 is 66.67%.
        let records = vec![
            record(1, "Physics", Status::Present, None),
            record(2, "Physics", Status::Present, None),
            record(3, "Chemistry", Status::Absent, None),
        ];

        let summary = AttendanceSummary::from_records(&records);
        assert_eq!(summary.overall_percentage(), 67);
        assert_eq!(summary.overall_standing(), Standing::Warning);
    }

    #[test]
    fn standing_cutoffs() {
        assert_eq!(Standing::from_percentage(100.0), Standing::Good);
        assert_eq!(Standing::from_percentage(75.0), Standing::Good);
        assert_eq!(Standing::from_percentage(74.9), Standing::Warning);
        assert_eq!(Standing::from_percentage(65.0), Standing::Warning);
        assert_eq!(Standing::from_percentage(64.9), Standing::Critical);
        assert_eq!(Standing::from_percentage(0.0), Standing::Critical);
    }
}
