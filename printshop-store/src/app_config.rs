use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub printful: PrintfulConfig,
    pub stripe: StripeConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PrintfulConfig {
    pub api_url: String,
    pub api_key: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StripeConfig {
    pub api_url: String,
    pub secret_key: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
    pub success_url: String,
    pub cancel_url: String,
}

fn default_http_timeout() -> u64 { 15 }

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Public base URL the design exports are served from
    pub public_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconciliationConfig {
    /// Upper bound on any single provider call made by the gateways
    pub gateway_timeout_seconds: u64,
    pub retry_interval_seconds: u64,
    /// Attempts after which the retry worker leaves an order to operators
    pub max_attempts: i32,
    pub batch_size: i64,
    pub lock_ttl_seconds: u64,
    /// Work under an order lock is abandoned after this; must stay below the TTL
    pub lock_deadline_seconds: u64,
}

impl ReconciliationConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_seconds)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }

    pub fn lock_deadline(&self) -> Duration {
        Duration::from_secs(self.lock_deadline_seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `PRINTSHOP__STRIPE__SECRET_KEY=sk_live_...`
            .add_source(config::Environment::with_prefix("PRINTSHOP").separator("__"))
            .build()?;

        let config: Config = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject timeout combinations under which an order lock could expire
    /// while its holder is still talking to a provider.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let rec = &self.reconciliation;
        if rec.lock_deadline_seconds == 0 || rec.lock_deadline_seconds >= rec.lock_ttl_seconds {
            return Err(config::ConfigError::Message(format!(
                "reconciliation.lock_deadline_seconds ({}) must be positive and below lock_ttl_seconds ({})",
                rec.lock_deadline_seconds, rec.lock_ttl_seconds
            )));
        }
        for (name, seconds) in [
            ("printful.timeout_seconds", self.printful.timeout_seconds),
            ("stripe.timeout_seconds", self.stripe.timeout_seconds),
        ] {
            if seconds > rec.gateway_timeout_seconds {
                return Err(config::ConfigError::Message(format!(
                    "{} ({}) must not exceed reconciliation.gateway_timeout_seconds ({})",
                    name, seconds, rec.gateway_timeout_seconds
                )));
            }
        }
        Ok(())
    }
}
