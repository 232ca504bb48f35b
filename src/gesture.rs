//! Turning interactions with a class card into attendance writes.
//!
//! An unmarked card can be swiped right to mark it present, swiped left to mark it absent, or
//! tapped to open the full set of choices. Once a card has a status, swipes are ignored and a tap
//! opens the same choices for editing.

use crate::error::{AppError, AppResult};
use crate::models::Status;

/// An interaction with a class card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Gesture {
    Tap,
    SwipeLeft,
    SwipeRight,
}

/// What a gesture asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    /// Write this status straight away.
    Mark(Status),
    /// Show the attendance choices; `editing` when the class already has a status.
    OpenDialog { editing: bool },
    /// Nothing happens.
    Ignore,
}

/// Maps a gesture on a card to an action, given the status already recorded for the class.
pub fn gesture_action(gesture: Gesture, current: Option<Status>) -> GestureAction {
    match (gesture, current) {
        (Gesture::SwipeRight, None) => GestureAction::Mark(Status::Present),
        (Gesture::SwipeLeft, None) => GestureAction::Mark(Status::Absent),
        (Gesture::SwipeLeft | Gesture::SwipeRight, Some(_)) => GestureAction::Ignore,
        (Gesture::Tap, current) => GestureAction::OpenDialog {
            editing: current.is_some(),
        },
    }
}

/// An option picked from the attendance dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogChoice {
    Present,
    Absent,
    Cancelled,
    /// Another subject was taught in this slot. Both fields must be filled in before confirming.
    Swapped {
        subject: Option<String>,
        status: Option<Status>,
    },
}

impl DialogChoice {
    /// The labels the dialog offers, in order.
    pub const LABELS: [&'static str; 4] = [
        "Mark Present",
        "Mark Absent",
        "Class Swapped",
        "Class Cancelled",
    ];
}

/// A validated attendance write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkRequest {
    pub status: Status,
    pub swapped_to: Option<String>,
}

impl MarkRequest {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            swapped_to: None,
        }
    }

    /// The message shown once the write succeeds.
    pub fn confirmation(&self) -> String {
        let status_text = match self.status {
            Status::Cancelled => "marked as cancelled",
            Status::Present => "marked present",
            Status::Absent => "marked absent",
        };

        match &self.swapped_to {
            Some(subject) => format!("Class {status_text} (swapped to {subject})"),
            None => format!("Class {status_text}"),
        }
    }
}

impl TryFrom<DialogChoice> for MarkRequest {
    type Error = AppError;

    fn try_from(choice: DialogChoice) -> AppResult<Self> {
        match choice {
            DialogChoice::Present => Ok(MarkRequest::new(Status::Present)),
            DialogChoice::Absent => Ok(MarkRequest::new(Status::Absent)),
            DialogChoice::Cancelled => Ok(MarkRequest::new(Status::Cancelled)),
            DialogChoice::Swapped { subject, status } => {
                let subject = subject
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());

                match (subject, status) {
                    (Some(subject), Some(status @ (Status::Present | Status::Absent))) => {
                        Ok(MarkRequest {
                            status,
                            swapped_to: Some(subject),
                        })
                    }
                    _ => Err(AppError::validation(
                        "Please select subject and attendance",
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swipes_mark_unmarked_classes() {
        assert_eq!(
            gesture_action(Gesture::SwipeRight, None),
            GestureAction::Mark(Status::Present)
        );
        assert_eq!(
            gesture_action(Gesture::SwipeLeft, None),
            GestureAction::Mark(Status::Absent)
        );
    }

    #[test]
    fn swipes_are_ignored_once_marked() {
        for status in [Status::Present, Status::Absent, Status::Cancelled] {
            assert_eq!(
                gesture_action(Gesture::SwipeRight, Some(status)),
                GestureAction::Ignore
            );
            assert_eq!(
                gesture_action(Gesture::SwipeLeft, Some(status)),
                GestureAction::Ignore
            );
        }
    }

    #[test]
    fn tap_opens_the_dialog() {
        assert_eq!(
            gesture_action(Gesture::Tap, None),
            GestureAction::OpenDialog { editing: false }
        );
        assert_eq!(
            gesture_action(Gesture::Tap, Some(Status::Absent)),
            GestureAction::OpenDialog { editing: true }
        );
    }

    #[test]
    fn swap_needs_subject_and_attendance() {
        let missing_status = DialogChoice::Swapped {
            subject: Some("Physics".to_string()),
            status: None,
        };
        let blank_subject = DialogChoice::Swapped {
            subject: Some("  ".to_string()),
            status: Some(Status::Present),
        };
        let cancelled = DialogChoice::Swapped {
            subject: Some("Physics".to_string()),
            status: Some(Status::Cancelled),
        };

        for choice in [missing_status, blank_subject, cancelled] {
            let err = MarkRequest::try_from(choice).unwrap_err();
            assert_eq!(err.to_string(), "Please select subject and attendance");
        }
    }

    #[test]
    fn swap_carries_the_substitute_subject() {
        let request = MarkRequest::try_from(DialogChoice::Swapped {
            subject: Some("Physics".to_string()),
            status: Some(Status::Absent),
        })
        .unwrap();

        assert_eq!(request.status, Status::Absent);
        assert_eq!(request.swapped_to.as_deref(), Some("Physics"));
        assert_eq!(
            request.confirmation(),
            "Class marked absent (swapped to Physics)"
        );
    }

    #[test]
    fn plain_choices_confirm() {
        let request = MarkRequest::try_from(DialogChoice::Cancelled).unwrap();
        assert_eq!(request.confirmation(), "Class marked as cancelled");
    }
}
