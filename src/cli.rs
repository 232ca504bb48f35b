//! This module contains the command-line interface [`Cli`] parser for tracking a student's class
//! attendance.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::gesture::Gesture;
use crate::models::Status;

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(version, about = "Track your class attendance")]
pub struct Cli {
    /// Act as if today were this date (YYYY-MM-DD).
    #[arg(long, global = true)]
    pub date: Option<NaiveDate>,

    /// The different commands available for tracking attendance.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account and sign in.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        roll_number: String,
        /// One of CSE, CSE-AIML, IT, CS-DS.
        #[arg(long)]
        branch: String,
        #[arg(long)]
        batch: String,
    },

    /// Sign in with an email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign out of the current session.
    Logout,

    /// Show overall and per-subject attendance along with today's classes.
    Today,

    /// Mark today's class for a subject.
    Mark {
        subject: String,
        #[arg(value_enum)]
        status: Status,
    },

    /// Swipe or tap a class card for today's class of a subject.
    Gesture {
        subject: String,
        #[arg(value_enum)]
        gesture: Gesture,
    },

    /// Record that another subject was taught in a class's slot today.
    Swap {
        /// The scheduled subject.
        subject: String,
        /// The subject that was actually taught.
        #[arg(long = "to")]
        swapped_to: String,
        /// Whether you attended: present or absent.
        #[arg(long, value_enum)]
        status: Status,
    },

    /// Overwrite a subject's attendance with new attended/total counts.
    ///
    /// This replaces every existing record for the subject with one synthetic record per day.
    Edit {
        subject: String,
        #[arg(long, allow_negative_numbers = true)]
        attended: i64,
        #[arg(long, allow_negative_numbers = true)]
        total: i64,
    },

    /// Show per-subject attendance.
    Stats,

    /// Show the week's timetable for your batch.
    Timetable,

    /// List upcoming holidays, or the holidays on a given day.
    Holidays {
        #[arg(long)]
        on: Option<NaiveDate>,
        /// List every holiday, past ones included.
        #[arg(long)]
        all: bool,
    },

    /// Add a personal holiday.
    AddHoliday { date: NaiveDate, name: String },

    /// Show your profile.
    Profile,

    /// Permanently delete your account and all of your data.
    DeleteAccount {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}
