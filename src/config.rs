// src/config.rs

use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    Smtp,
    Log,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    /// Public storefront origin used in email links.
    pub site_url: String,

    pub s3_bucket: String,
    pub s3_endpoint: Option<String>,
    pub s3_public_base_url: String,

    pub mail_transport: MailTransport,
    pub mail_from: String,
    pub mail_from_name: String,
    pub smtp: Option<SmtpConfig>,

    pub gateway_base_url: String,
    pub gateway_key_id: String,
    pub gateway_key_secret: String,
    pub gateway_webhook_secret: String,

    pub youtube_api_key: Option<String>,
    pub certificate_font_path: Option<String>,
    pub revenue_chart_max_points: usize,
}

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.razorpay.com";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let s3_bucket = required("S3_BUCKET")?;
        let s3_public_base_url = optional("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", s3_bucket));

        let mail_transport = match optional("MAIL_TRANSPORT").as_deref() {
            None | Some("smtp") => MailTransport::Smtp,
            Some("log") => MailTransport::Log,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "MAIL_TRANSPORT",
                    value: other.to_string(),
                })
            }
        };

        let smtp = if mail_transport == MailTransport::Smtp {
            Some(SmtpConfig {
                host: required("SMTP_HOST")?,
                port: parsed_or("SMTP_PORT", 587)?,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
            })
        } else {
            None
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed_or("PORT", 8065)?,
            site_url: optional("SITE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            s3_bucket,
            s3_endpoint: optional("S3_ENDPOINT"),
            s3_public_base_url,
            mail_transport,
            mail_from: required("MAIL_FROM")?,
            mail_from_name: optional("MAIL_FROM_NAME").unwrap_or_else(|| "Music Academy".to_string()),
            smtp,
            gateway_base_url: optional("GATEWAY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GATEWAY_BASE_URL.to_string()),
            gateway_key_id: required("GATEWAY_KEY_ID")?,
            gateway_key_secret: required("GATEWAY_KEY_SECRET")?,
            gateway_webhook_secret: required("GATEWAY_WEBHOOK_SECRET")?,
            youtube_api_key: optional("YOUTUBE_API_KEY"),
            certificate_font_path: optional("CERTIFICATE_FONT_PATH"),
            revenue_chart_max_points: parsed_or("REVENUE_CHART_MAX_POINTS", 30)?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// Empty values are treated as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(raw) => parse_value(name, &raw),
    }
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_reports_variable_name() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert_eq!(err.to_string(), "PORT has invalid value \"eighty\"");
    }

    #[test]
    fn parse_value_accepts_numbers() {
        let port: u16 = parse_value("PORT", "8080").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn missing_message_names_variable() {
        assert_eq!(
            ConfigError::Missing("DATABASE_URL").to_string(),
            "DATABASE_URL must be set"
        );
    }
}
