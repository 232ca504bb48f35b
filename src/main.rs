use anyhow::{Context, Result, bail};
use attendance_tracker::account::delete_account_for_token;
use attendance_tracker::auth::{AuthContext, AuthState, IdentityProvider, SignUp};
use attendance_tracker::cli::{Cli, Command};
use attendance_tracker::config::Settings;
use attendance_tracker::dashboard::Dashboard;
use attendance_tracker::db::Database;
use attendance_tracker::display;
use attendance_tracker::gesture::{DialogChoice, GestureAction, MarkRequest, gesture_action};
use attendance_tracker::manager::AttendanceManager;
use attendance_tracker::schedule::ScheduledClass;
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

fn main() -> Result<()> {
    attendance_tracker::init_tracing("warn");

    let cli = Cli::parse();
    let settings = Settings::load().context("loading configuration")?;
    let db = Database::open(&settings.database_url)?;
    let today = cli.date.unwrap_or_else(|| Local::now().date_naive());

    let auth = AuthContext::new(IdentityProvider::new(db.clone()));
    let mut auth_changes = auth.subscribe();
    if let Some(token) = read_token(&settings.session_file)? {
        auth.restore(&token)?;
    }

    let outcome = run(cli.command, &auth, &db, today);

    // Persist whatever the command did to the session, even if it failed afterwards.
    if auth_changes.has_changed().unwrap_or(false) {
        let state = auth_changes.borrow_and_update().clone();
        persist_session(&settings.session_file, &state)?;
    }

    outcome
}

fn run(command: Command, auth: &AuthContext, db: &Database, today: NaiveDate) -> Result<()> {
    match command {
        Command::SignUp {
            email,
            password,
            name,
            roll_number,
            branch,
            batch,
        } => {
            let session = auth.sign_up(&SignUp {
                email,
                password,
                name,
                roll_number,
                branch,
                batch,
            })?;
            println!("Account created! Logged in as {}", session.user.email);
        }

        Command::Login { email, password } => {
            let session = auth.sign_in(&email, &password)?;
            println!("Logged in successfully as {}", session.user.email);
        }

        Command::Logout => {
            auth.sign_out()?;
            println!("Logged out successfully");
        }

        Command::Today => {
            let session = auth.require_session()?;
            let dashboard = Dashboard::load(db, &session.user.id, today);
            println!("{}", display::dashboard(&dashboard));
        }

        Command::Mark { subject, status } => {
            let mut manager = signed_in_manager(auth, db)?;
            let class = todays_class(&mut manager, today, &subject)?;
            record(&mut manager, today, &class, MarkRequest::new(status))?;
        }

        Command::Gesture { subject, gesture } => {
            let mut manager = signed_in_manager(auth, db)?;
            let class = todays_class(&mut manager, today, &subject)?;

            match gesture_action(gesture, class.status()) {
                GestureAction::Mark(status) => {
                    record(&mut manager, today, &class, MarkRequest::new(status))?;
                }
                GestureAction::OpenDialog { editing } => {
                    show_dialog(&mut manager, &class, editing)?;
                }
                GestureAction::Ignore => {
                    println!(
                        "{} is already marked {}; tap to edit it",
                        class.class.subject,
                        class.status().map(|s| s.as_str()).unwrap_or_default()
                    );
                }
            }
        }

        Command::Swap {
            subject,
            swapped_to,
            status,
        } => {
            let mut manager = signed_in_manager(auth, db)?;
            let class = todays_class(&mut manager, today, &subject)?;
            let request = MarkRequest::try_from(DialogChoice::Swapped {
                subject: Some(swapped_to),
                status: Some(status),
            })?;
            record(&mut manager, today, &class, request)?;
        }

        Command::Edit {
            subject,
            attended,
            total,
        } => {
            let mut manager = signed_in_manager(auth, db)?;
            manager.edit_counts(&subject, attended, total, today)?;
            println!("Attendance for {subject} updated");

            let summary = manager.summary()?;
            if let Some(stats) = summary.subject(&subject) {
                println!("{subject}: {}/{} classes", stats.attended, stats.total);
            }
        }

        Command::Stats => {
            let mut manager = signed_in_manager(auth, db)?;
            let summary = manager.summary()?;
            println!("{}", display::overall_line(&summary));
            println!("{}", display::summary_table(&summary));
        }

        Command::Timetable => {
            let mut manager = signed_in_manager(auth, db)?;
            print!("{}", display::week_table(&manager.week_timetable()?));
        }

        Command::Holidays { on, all } => {
            let mut manager = signed_in_manager(auth, db)?;
            let holidays = match on {
                Some(day) => manager.holidays_on(day)?,
                None if all => manager.holidays()?,
                None => manager
                    .holidays()?
                    .into_iter()
                    .filter(|h| h.date >= today)
                    .take(5)
                    .collect(),
            };
            println!("{}", display::holiday_table(&holidays));
        }

        Command::AddHoliday { date, name } => {
            let mut manager = signed_in_manager(auth, db)?;
            let holiday = manager.add_holiday(date, &name)?;
            println!("Added {} on {}", holiday.name, holiday.date.format("%B %-d, %Y"));
        }

        Command::Profile => {
            let mut manager = signed_in_manager(auth, db)?;
            println!("{}", display::profile(&manager.profile()?));
        }

        Command::DeleteAccount { yes } => {
            let session = auth.require_session()?;

            if !yes {
                println!(
                    "This will permanently delete your account and all of your data, including \
                     attendance records and calendar events."
                );
                print!("Proceed? y/[N]: ");
                io::stdout().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;
                if input.trim().to_lowercase() != "y" {
                    println!("Account deletion canceled");
                    return Ok(());
                }
            }

            delete_account_for_token(auth.provider(), &session.token)?;
            auth.sign_out()?;
            println!("Account deleted successfully");
        }
    }

    Ok(())
}

/// The auth gate for commands that need a signed-in user.
fn signed_in_manager(auth: &AuthContext, db: &Database) -> Result<AttendanceManager> {
    let session = auth.require_session()?;
    Ok(db.manager(&session.user.id)?)
}

fn todays_class(
    manager: &mut AttendanceManager,
    today: NaiveDate,
    subject: &str,
) -> Result<ScheduledClass> {
    let schedule = manager.daily_classes(today)?;
    if schedule.is_holiday() {
        bail!("No classes on {today}, it's a holiday");
    }

    match schedule.find(subject) {
        Some(class) => Ok(class.clone()),
        None => bail!("No {subject} class on {today}"),
    }
}

/// Writes a status for a class, then re-reads the day so the shown status is what was stored.
fn record(
    manager: &mut AttendanceManager,
    today: NaiveDate,
    class: &ScheduledClass,
    request: MarkRequest,
) -> Result<()> {
    manager.mark(
        today,
        &class.class.subject,
        request.status,
        request.swapped_to.as_deref(),
    )?;
    println!("{}", request.confirmation());

    println!("{}", display::schedule_table(&manager.daily_classes(today)?));
    Ok(())
}

fn show_dialog(
    manager: &mut AttendanceManager,
    class: &ScheduledClass,
    editing: bool,
) -> Result<()> {
    println!("{}", class.class.subject);
    if editing {
        println!("Edit your attendance for this class");
    } else {
        println!("Mark your attendance for this class");
    }
    for label in DialogChoice::LABELS {
        println!("  - {label}");
    }

    let candidates = manager.swap_candidates(&class.class.subject)?;
    if !candidates.is_empty() {
        println!("Subjects it could have been swapped to: {}", candidates.join(", "));
    }

    Ok(())
}

fn read_token(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let token = fs::read_to_string(path)
        .with_context(|| format!("reading session file {}", path.display()))?;
    let token = token.trim();

    Ok((!token.is_empty()).then(|| token.to_string()))
}

fn persist_session(path: &Path, state: &AuthState) -> Result<()> {
    match state.session() {
        Some(session) => fs::write(path, &session.token)
            .with_context(|| format!("writing session file {}", path.display()))?,
        None if path.exists() => fs::remove_file(path)
            .with_context(|| format!("removing session file {}", path.display()))?,
        None => {}
    }

    Ok(())
}
