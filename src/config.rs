use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Runtime configuration, constructed once and passed to every consumer.
/// There is no global instance: embedders build a `Config` (from the
/// environment or `Default`) and hand it to [`crate::AppState::build`].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppSection,
    pub engine: EngineSection,
    pub subscriptions: SubscriptionSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Outbox delivery attempts per operation before it is parked.
    pub outbox_max_attempts: usize,
    /// Base backoff between outbox retries; grows linearly per attempt.
    pub outbox_base_backoff_ms: u64,
    /// Whether an empty remote collection falls back to the bundled seed
    /// data at startup. An intentionally emptied collection is otherwise
    /// indistinguishable from one that was never populated.
    pub seed_on_empty_remote: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionSection {
    /// Length of the default trial window granted at first login.
    pub trial_days: i64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let environment_str =
            env::var("EXAMPREP_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let environment = match environment_str.to_lowercase().as_str() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };

        let name = env::var("EXAMPREP_APP_NAME").unwrap_or_else(|_| "ExamPrep Core".to_string());

        let outbox_max_attempts = match env::var("EXAMPREP_OUTBOX_MAX_ATTEMPTS") {
            Ok(val) => val
                .parse()
                .context("Failed to parse EXAMPREP_OUTBOX_MAX_ATTEMPTS")?,
            Err(_) => 4,
        };
        let outbox_base_backoff_ms = match env::var("EXAMPREP_OUTBOX_BASE_BACKOFF_MS") {
            Ok(val) => val
                .parse()
                .context("Failed to parse EXAMPREP_OUTBOX_BASE_BACKOFF_MS")?,
            Err(_) => 120,
        };
        let seed_on_empty_remote = match env::var("EXAMPREP_SEED_ON_EMPTY_REMOTE") {
            Ok(val) => val
                .parse()
                .context("Failed to parse EXAMPREP_SEED_ON_EMPTY_REMOTE")?,
            Err(_) => true,
        };

        let trial_days = match env::var("EXAMPREP_TRIAL_DAYS") {
            Ok(val) => val.parse().context("Failed to parse EXAMPREP_TRIAL_DAYS")?,
            Err(_) => 60,
        };

        Ok(Config {
            app: AppSection { name, environment },
            engine: EngineSection {
                outbox_max_attempts,
                outbox_base_backoff_ms,
                seed_on_empty_remote,
            },
            subscriptions: SubscriptionSection { trial_days },
        })
    }

    #[allow(unused)]
    pub fn is_production(&self) -> bool {
        self.app.environment == Environment::Production
    }

    #[allow(unused)]
    pub fn is_development(&self) -> bool {
        self.app.environment == Environment::Development
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppSection {
                name: "ExamPrep Core".to_string(),
                environment: Environment::Development,
            },
            engine: EngineSection {
                outbox_max_attempts: 4,
                outbox_base_backoff_ms: 120,
                seed_on_empty_remote: true,
            },
            subscriptions: SubscriptionSection { trial_days: 60 },
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}
