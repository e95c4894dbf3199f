use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub scorer_callback_secret: Option<String>,
    pub notification_webhook_url: Option<String>,
    pub notification_signing_secret: Option<String>,
    pub notification_timeout: Duration,
    pub notification_max_attempts: i32,
    pub calendar_namespace: String,
    pub scheduling_lock_timeout: Duration,
    pub enqueue_timeout: Duration,
    pub object_store_root: String,
    pub api_rps: u32,
    pub public_rps: u32,
    pub log_json: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let notification_webhook_url = get_env_opt("NOTIFICATION_WEBHOOK_URL")
            .map(|raw| parse_webhook_url(&raw))
            .transpose()?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            scorer_callback_secret: get_env_opt("SCORER_CALLBACK_SECRET"),
            notification_webhook_url,
            notification_signing_secret: get_env_opt("NOTIFICATION_SIGNING_SECRET"),
            notification_timeout: Duration::from_secs(get_env_parse_or(
                "NOTIFICATION_TIMEOUT_SECS",
                10,
            )?),
            notification_max_attempts: get_env_parse_or("NOTIFICATION_MAX_ATTEMPTS", 5)?,
            calendar_namespace: get_env_opt("CALENDAR_NAMESPACE")
                .unwrap_or_else(|| "default".to_string()),
            scheduling_lock_timeout: Duration::from_millis(get_env_parse_or(
                "SCHEDULING_LOCK_TIMEOUT_MS",
                5000,
            )?),
            enqueue_timeout: Duration::from_millis(get_env_parse_or("ENQUEUE_TIMEOUT_MS", 2000)?),
            object_store_root: get_env_opt("OBJECT_STORE_ROOT")
                .unwrap_or_else(|| "./uploads".to_string()),
            api_rps: get_env_parse_or("API_RPS", 50)?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 20)?,
            log_json: get_env_opt("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

/// Unset and blank variables are both treated as absent.
fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn parse_webhook_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| {
        Error::Config(format!("Invalid value for NOTIFICATION_WEBHOOK_URL: {}", e))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        other => Err(Error::Config(format!(
            "NOTIFICATION_WEBHOOK_URL must use http or https, got {}",
            other
        ))),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_url_must_be_http() {
        assert!(parse_webhook_url("https://hooks.example.com/interviews").is_ok());
        assert!(parse_webhook_url("ftp://hooks.example.com").is_err());
        assert!(parse_webhook_url("not a url").is_err());
    }

    #[test]
    fn parse_value_reports_variable_name() {
        let err = parse_value::<u32>("API_RPS", "fast").unwrap_err();
        assert!(err.to_string().contains("API_RPS"));
        assert_eq!(parse_value::<u64>("X", " 250 ").unwrap(), 250);
    }
}
