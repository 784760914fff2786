// src/config.rs
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::notify::{CrmSettings, RetryPolicy, SmtpSettings};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_photo_bytes: usize,
    pub session_ttl: Duration,
    pub outbox_capacity: usize,
    pub retry: RetryPolicy,
    pub smtp: Option<SmtpSettings>,
    pub crm: Option<CrmSettings>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        fn parse<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
            match raw {
                Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
                None => Ok(default),
            }
        }

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let smtp = match (get("SMTP_HOST"), get("SMTP_FROM"), get("TEAM_INBOX")) {
            (Some(host), Some(from), Some(team_inbox)) => Some(SmtpSettings {
                host,
                port: parse("SMTP_PORT", get("SMTP_PORT"), 587)?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
                from,
                team_inbox,
            }),
            _ => None,
        };

        let crm = match (
            get("CRM_TOKEN_URL"),
            get("CRM_LEADS_URL"),
            get("CRM_CLIENT_ID"),
            get("CRM_CLIENT_SECRET"),
            get("CRM_REFRESH_TOKEN"),
        ) {
            (Some(token_url), Some(leads_url), Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Some(CrmSettings { token_url, leads_url, client_id, client_secret, refresh_token })
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            host: parse("HOST", get("HOST"), IpAddr::from([127, 0, 0, 1]))?,
            port: parse("PORT", get("PORT"), 3000)?,
            upload_dir: PathBuf::from(get("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string())),
            max_photo_bytes: parse("MAX_PHOTO_BYTES", get("MAX_PHOTO_BYTES"), 10 * 1024 * 1024)?,
            session_ttl: Duration::from_secs(parse("WIZARD_SESSION_TTL_SECS", get("WIZARD_SESSION_TTL_SECS"), 2 * 60 * 60)?),
            outbox_capacity: parse("OUTBOX_CAPACITY", get("OUTBOX_CAPACITY"), 256)?,
            retry: RetryPolicy {
                max_attempts: parse("NOTIFY_MAX_ATTEMPTS", get("NOTIFY_MAX_ATTEMPTS"), 3)?,
                base_delay: Duration::from_millis(parse("NOTIFY_BASE_DELAY_MS", get("NOTIFY_BASE_DELAY_MS"), 2000)?),
            },
            smtp,
            crm,
        })
    }
}
