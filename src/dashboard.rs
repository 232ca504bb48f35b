use chrono::NaiveDate;
use std::thread;
use tracing::warn;

use crate::aggregate::AttendanceSummary;
use crate::db::Database;
use crate::error::AppResult;
use crate::models::Profile;
use crate::schedule::DailySchedule;

/// Everything shown on the landing page for a signed-in user.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub profile: Option<Profile>,
    pub today: DailySchedule,
    pub summary: AttendanceSummary,
}

/// Unwraps a page-load read, logging the failure and showing nothing in its place.
fn or_empty<T>(what: &str, result: AppResult<T>) -> Option<T> {
    result
        .map_err(|e| warn!("Failed to load {what}: {e}"))
        .ok()
}

impl Dashboard {
    /// Loads the profile, today's classes, and the attendance summary. The three reads are
    /// independent, so each runs on its own pooled connection in parallel. A read that fails
    /// leaves its part of the page empty rather than failing the whole page.
    pub fn load(db: &Database, user_id: &str, today: NaiveDate) -> Self {
        let (profile, schedule, summary) = thread::scope(|s| {
            let profile = s.spawn(|| db.manager(user_id)?.profile());
            let schedule = s.spawn(|| db.manager(user_id)?.daily_classes(today));
            let summary = s.spawn(|| db.manager(user_id)?.summary());

            (profile.join(), schedule.join(), summary.join())
        });

        let profile = profile
            .map_err(|_| warn!("Profile loader panicked"))
            .ok()
            .and_then(|result| or_empty("profile", result));
        let today = schedule
            .map_err(|_| warn!("Schedule loader panicked"))
            .ok()
            .and_then(|result| or_empty("today's classes", result))
            .unwrap_or_else(|| DailySchedule::empty(today));
        let summary = summary
            .map_err(|_| warn!("Attendance loader panicked"))
            .ok()
            .and_then(|result| or_empty("attendance", result))
            .unwrap_or_default();

        Self {
            profile,
            today,
            summary,
        }
    }
}
