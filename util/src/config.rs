//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.
//!
//! Values that are missing or fail to parse fall back to their defaults.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock, RwLockReadGuard};

pub const DEFAULT_CLASSROOM_LAT: f64 = 28.6139;
pub const DEFAULT_CLASSROOM_LNG: f64 = 77.2090;
pub const DEFAULT_CLASSROOM_RADIUS_METERS: f64 = 100.0;
pub const DEFAULT_TOKEN_VALIDITY_MINUTES: i64 = 30;
pub const DEFAULT_GEOLOCATION_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_QR_WIDTH: u32 = 256;

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub classroom_lat: f64,
    pub classroom_lng: f64,
    pub classroom_radius_meters: f64,
    pub token_validity_minutes: i64,
    pub geolocation_timeout_ms: u64,
    pub qr_width: u32,
    pub qr_dark_color: String,
    pub qr_light_color: String,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "eduflow"),
            log_level: var_or("LOG_LEVEL", "info"),
            log_file: var_or("LOG_FILE", "logs/eduflow.log"),
            log_to_stdout: var_or("LOG_TO_STDOUT", "false") == "true",
            database_path: var_or("DATABASE_PATH", "data/eduflow.db"),
            classroom_lat: parsed_or("CLASSROOM_LAT", DEFAULT_CLASSROOM_LAT),
            classroom_lng: parsed_or("CLASSROOM_LNG", DEFAULT_CLASSROOM_LNG),
            classroom_radius_meters: parsed_or(
                "CLASSROOM_RADIUS_METERS",
                DEFAULT_CLASSROOM_RADIUS_METERS,
            ),
            token_validity_minutes: parsed_or(
                "TOKEN_VALIDITY_MINUTES",
                DEFAULT_TOKEN_VALIDITY_MINUTES,
            ),
            geolocation_timeout_ms: parsed_or(
                "GEOLOCATION_TIMEOUT_MS",
                DEFAULT_GEOLOCATION_TIMEOUT_MS,
            ),
            qr_width: parsed_or("QR_WIDTH", DEFAULT_QR_WIDTH),
            qr_dark_color: var_or("QR_DARK_COLOR", "#0ea5e9"),
            qr_light_color: var_or("QR_LIGHT_COLOR", "#ffffff"),
        }
    }

    fn lock() -> &'static RwLock<AppConfig> {
        CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()))
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// A poisoned lock is recovered rather than propagated; the config holds
    /// plain values only.
    pub fn global() -> RwLockReadGuard<'static, AppConfig> {
        Self::lock()
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        AppConfig::set_field(|cfg| *cfg = AppConfig::from_env());
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = Self::lock()
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_classroom(lat: f64, lng: f64) {
        AppConfig::set_field(|cfg| {
            cfg.classroom_lat = lat;
            cfg.classroom_lng = lng;
        });
    }

    pub fn set_classroom_radius_meters(value: f64) {
        AppConfig::set_field(|cfg| cfg.classroom_radius_meters = value);
    }

    pub fn set_token_validity_minutes(value: i64) {
        AppConfig::set_field(|cfg| cfg.token_validity_minutes = value);
    }

    pub fn set_geolocation_timeout_ms(value: u64) {
        AppConfig::set_field(|cfg| cfg.geolocation_timeout_ms = value);
    }

    pub fn set_qr_width(value: u32) {
        AppConfig::set_field(|cfg| cfg.qr_width = value);
    }
}

// --- Free accessors, read through the global instance ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn classroom_lat() -> f64 {
    AppConfig::global().classroom_lat
}

pub fn classroom_lng() -> f64 {
    AppConfig::global().classroom_lng
}

pub fn classroom_radius_meters() -> f64 {
    AppConfig::global().classroom_radius_meters
}

pub fn token_validity_minutes() -> i64 {
    AppConfig::global().token_validity_minutes
}

pub fn geolocation_timeout_ms() -> u64 {
    AppConfig::global().geolocation_timeout_ms
}

pub fn qr_width() -> u32 {
    AppConfig::global().qr_width
}

pub fn qr_dark_color() -> String {
    AppConfig::global().qr_dark_color.clone()
}

pub fn qr_light_color() -> String {
    AppConfig::global().qr_light_color.clone()
}
