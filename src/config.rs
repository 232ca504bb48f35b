use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Runtime configuration.
///
/// Values are layered: built-in defaults, then an optional `config.toml` in the working
/// directory, then `ATTENDANCE__*` environment variables (`ATTENDANCE__SERVER__PORT=9000`).
/// `DATABASE_URL`, from the environment or a `.env` file, overrides `database_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    /// Where the CLI keeps the bearer token between invocations.
    pub session_file: PathBuf,
    pub server: ServerSettings,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .set_default("database_url", "attendance.sqlite")?
            .set_default("session_file", ".attendance-session")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("ATTENDANCE")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database_url", env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
