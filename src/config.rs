use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use rocket::serde::{Deserialize, Serialize};

use crate::error::app_error::AppError;

/// Application configuration, layered from built-in defaults, then
/// `Drivetime.toml`, then `DRIVETIME_`-prefixed environment variables
/// (nested keys separated with a double underscore, e.g.
/// `DRIVETIME_SCHEDULER__TIMEZONE`).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SchedulerConfig {
    /// Seconds between status sweeps.
    pub sweep_interval_secs: u64,
    /// Timezone used for calendar-day and week boundaries and for the
    /// timestamps rendered into notifications.
    pub timezone: chrono_tz::Tz,
    /// Seats assigned to a theory session created without a capacity.
    pub default_theory_capacity: u32,
    /// Fixes the smart-booking tiebreak jitter; unset means seeded from the OS.
    pub score_jitter_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                address: "0.0.0.0".to_string(),
                port: 8000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:5173".to_string()],
                allow_credentials: true,
            },
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            timezone: chrono_tz::UTC,
            default_theory_capacity: 10,
            score_jitter_seed: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("Drivetime.toml"))
            .merge(Env::prefixed("DRIVETIME_").split("__"))
            .extract()?;
        Ok(config)
    }
}
