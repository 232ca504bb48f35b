use thiserror::Error;

/// Errors surfaced by the attendance tracker.
///
/// Validation failures are always raised before anything is written. Everything else is reported
/// to the caller as-is; nothing in the crate retries.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Not signed in, run `login` or `sign-up` first")]
    Unauthenticated,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("A user with email {0} is already registered")]
    EmailTaken(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
