use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub storage: Storage,
    pub captcha: Captcha,
    pub auth: Auth,
    pub reset: Reset,
    pub mail: Mail,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub tls: Option<Tls>,
}

#[derive(Debug, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub backend: String, // "mysql" or "memory"
    pub mysql_url: Option<String>,
    pub redis_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Captcha {
    pub backend: String, // "fake" or "real"
    pub hmac_key: String,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub session_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Reset {
    /// The token is appended to this as a query parameter.
    pub base_url: String,
    pub token_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Mail {
    pub backend: String, // "log"
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
