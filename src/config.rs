use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub cache: CacheSettings,
    pub simulation: SimulationSettings,
    pub application: ApplicationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub pool_size: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "mysql".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: "medassist".to_string(),
            name: "medassist".to_string(),
            pool_size: 10,
            connect_timeout_secs: 5,
        }
    }
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "redis".to_string(),
            port: 6379,
            timeout_secs: 5,
        }
    }
}

impl RedisSettings {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    pub doctors_key: String,
    pub doctors_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            doctors_key: "doctors".to_string(),
            doctors_ttl_secs: 60,
        }
    }
}

/// Inclusive latency window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn none() -> Self {
        Self::new(0, 0)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    pub payment_failure_rate: f64,
    pub doctors_latency: LatencyRange,
    pub consultations_latency: LatencyRange,
    pub payment_latency: LatencyRange,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            payment_failure_rate: 0.05,
            doctors_latency: LatencyRange::new(50, 300),
            consultations_latency: LatencyRange::new(100, 400),
            payment_latency: LatencyRange::new(100, 500),
            seed: None,
        }
    }
}

impl SimulationSettings {
    /// Settings with every artificial delay disabled.
    pub fn without_latency() -> Self {
        Self {
            doctors_latency: LatencyRange::none(),
            consultations_latency: LatencyRange::none(),
            payment_latency: LatencyRange::none(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

/// Flat environment variables honoured for compatibility with existing deployments.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("MYSQL_HOST", "database.host"),
    ("MYSQL_PORT", "database.port"),
    ("MYSQL_USER", "database.user"),
    ("MYSQL_PASSWORD", "database.password"),
    ("MYSQL_DATABASE", "database.name"),
    ("REDIS_HOST", "redis.host"),
    ("REDIS_PORT", "redis.port"),
    ("PORT", "application.port"),
];

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("MEDASSIST").separator("__"));

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let rate = self.simulation.payment_failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(config::ConfigError::Message(format!(
                "simulation.payment_failure_rate must be within [0, 1], got {}",
                rate
            )));
        }

        let ranges = [
            ("doctors_latency", self.simulation.doctors_latency),
            ("consultations_latency", self.simulation.consultations_latency),
            ("payment_latency", self.simulation.payment_latency),
        ];
        for (name, range) in ranges {
            if range.min_ms > range.max_ms {
                return Err(config::ConfigError::Message(format!(
                    "simulation.{}: min_ms ({}) exceeds max_ms ({})",
                    name, range.min_ms, range.max_ms
                )));
            }
        }

        Ok(())
    }
}
