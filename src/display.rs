//! Rendering views as terminal tables.

use crate::aggregate::{AttendanceSummary, GOOD_THRESHOLD, Standing};
use crate::dashboard::Dashboard;
use crate::models::{HolidayEntry, Profile, TimetableClass};
use crate::schedule::{DailySchedule, ScheduledClass, WeekSchedule, day_name};
use std::fmt::Write;
use tabled::{Table, Tabled, settings::Style};

fn standing_label(standing: Standing) -> &'static str {
    match standing {
        Standing::Good => "good",
        Standing::Warning => "warning",
        Standing::Critical => "critical",
    }
}

fn time_range(class: &TimetableClass) -> String {
    format!(
        "{} - {}",
        class.start_time.format("%H:%M"),
        class.end_time.format("%H:%M")
    )
}

/// Per-subject attendance.
pub fn summary_table(summary: &AttendanceSummary) -> String {
    if summary.is_empty() {
        return "No attendance data yet".to_string();
    }

    #[derive(Tabled)]
    struct SubjectRow {
        #[tabled(rename = "Subject")]
        subject: String,
        #[tabled(rename = "Classes")]
        classes: String,
        #[tabled(rename = "%")]
        percentage: String,
        #[tabled(rename = "Standing")]
        standing: &'static str,
    }

    let rows = summary.subjects().iter().map(|s| SubjectRow {
        subject: s.subject.clone(),
        classes: format!("{}/{}", s.attended, s.total),
        percentage: format!("{:.0}%", s.percentage().round()),
        standing: standing_label(s.standing()),
    });

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// The overall percentage line, with a warning when it is below the good threshold.
pub fn overall_line(summary: &AttendanceSummary) -> String {
    let percentage = summary.overall_percentage();
    let mut line = format!(
        "Overall attendance: {percentage}% ({})",
        standing_label(summary.overall_standing())
    );

    if summary.overall_standing() != Standing::Good {
        let _ = write!(
            line,
            "\nYour attendance is below {GOOD_THRESHOLD}%. Please attend more classes!"
        );
    }

    line
}

fn status_cell(class: &ScheduledClass) -> String {
    match &class.record {
        None => "-".to_string(),
        Some(record) => match &record.swapped_to {
            Some(to) => format!("{} (-> {to})", record.status),
            None => record.status.to_string(),
        },
    }
}

/// One day's classes with their recorded status.
pub fn schedule_table(schedule: &DailySchedule) -> String {
    if schedule.is_holiday() {
        let names: Vec<&str> = schedule.holidays.iter().map(|h| h.name.as_str()).collect();
        return format!("No classes today, it's a holiday: {}", names.join(", "));
    }
    if schedule.classes.is_empty() {
        return "No classes today or it's a holiday!".to_string();
    }

    #[derive(Tabled)]
    struct ClassRow {
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Subject")]
        subject: String,
        #[tabled(rename = "Room")]
        room: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let rows = schedule.classes.iter().map(|c| ClassRow {
        time: time_range(&c.class),
        subject: if c.display_subject() == c.class.subject {
            c.class.subject.clone()
        } else {
            format!("{} (original: {})", c.display_subject(), c.class.subject)
        },
        room: c.class.room.clone().unwrap_or_default(),
        status: status_cell(c),
    });

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// The landing page.
pub fn dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();

    match &dashboard.profile {
        Some(profile) => {
            let _ = writeln!(out, "Hello, {}!", profile.first_name());
            let _ = writeln!(out, "{} • {}", profile.batch, profile.branch);
        }
        None => {
            let _ = writeln!(out, "Hello, Student!");
        }
    }

    let _ = writeln!(out, "\n{}", overall_line(&dashboard.summary));
    let _ = writeln!(out, "\nSubject attendance:\n{}", summary_table(&dashboard.summary));
    let _ = write!(
        out,
        "\nToday's classes - {}:\n{}",
        dashboard.today.date.format("%B %-d, %Y"),
        schedule_table(&dashboard.today)
    );

    out
}

/// The whole week, one table per day.
pub fn week_table(week: &WeekSchedule) -> String {
    #[derive(Tabled)]
    struct SlotRow {
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Subject")]
        subject: String,
        #[tabled(rename = "Room")]
        room: String,
    }

    let mut out = String::new();
    for (day, classes) in week {
        let _ = writeln!(out, "{}", day_name(*day));
        if classes.is_empty() {
            let _ = writeln!(out, "  No classes scheduled\n");
            continue;
        }

        let rows = classes.iter().map(|c| SlotRow {
            time: time_range(c),
            subject: c.subject.clone(),
            room: c.room.clone().unwrap_or_default(),
        });
        let mut table = Table::new(rows);
        table.with(Style::modern());
        let _ = writeln!(out, "{table}\n");
    }

    out
}

/// A list of holidays.
pub fn holiday_table(holidays: &[HolidayEntry]) -> String {
    if holidays.is_empty() {
        return "No holidays scheduled".to_string();
    }

    #[derive(Tabled)]
    struct HolidayRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Holiday")]
        name: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Scope")]
        scope: &'static str,
    }

    let rows = holidays.iter().map(|h| HolidayRow {
        date: h.date.format("%B %-d, %Y").to_string(),
        name: h.name.clone(),
        kind: h.kind.clone(),
        scope: if h.is_institution_wide {
            "Institution-wide"
        } else {
            "Personal"
        },
    });

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// The profile page.
pub fn profile(profile: &Profile) -> String {
    #[derive(Tabled)]
    struct Field {
        #[tabled(rename = "Field")]
        field: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows = [
        Field {
            field: "Name",
            value: profile.name.clone(),
        },
        Field {
            field: "Email",
            value: profile.email.clone(),
        },
        Field {
            field: "Roll number",
            value: profile.roll_number.clone(),
        },
        Field {
            field: "Branch",
            value: profile.branch.clone(),
        },
        Field {
            field: "Batch",
            value: profile.batch.clone(),
        },
    ];

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}
