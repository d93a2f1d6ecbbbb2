use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Requested guest cookie/session lifetime. Browser platforms may clamp
    /// the effective cookie expiry; treat this as a request, not a guarantee.
    #[serde(default = "default_guest_session_ttl_days")]
    pub guest_session_ttl_days: i64,
    #[serde(default = "default_currency")]
    pub payment_currency: String,
}

fn default_guest_session_ttl_days() -> i64 {
    3650
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `MATCHBOOK__SERVER__PORT=8080` overrides `server.port`
            .add_source(config::Environment::with_prefix("MATCHBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
