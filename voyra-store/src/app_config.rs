use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub booking_rules: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Operational knobs of the booking engine.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    #[serde(default = "default_code_prefix")]
    pub reservation_code_prefix: String,
    #[serde(default = "default_code_length")]
    pub reservation_code_length: u32,
    /// Retry budget for reservation-code collisions.
    #[serde(default = "default_code_attempts")]
    pub reservation_code_attempts: u32,
}

fn default_code_prefix() -> String {
    "VYR".to_string()
}

fn default_code_length() -> u32 {
    8
}

fn default_code_attempts() -> u32 {
    8
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Layer the environment-specific file on top (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // A local file that shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Finally environment overrides, e.g. `VOYRA__SERVER__PORT=9090`
            .add_source(config::Environment::with_prefix("VOYRA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
