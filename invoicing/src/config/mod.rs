//! Configuration module for the invoicing service.

use invoicing_core::config::{self as core_config, env_opt, env_or};
use invoicing_core::error::AppError;
use secrecy::SecretString;
use std::env;

#[derive(Debug, Clone)]
pub struct InvoicingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub currency: CurrencyConfig,
    pub preview: PreviewConfig,
    /// `None` when SMTP is not configured; mail is then logged instead of sent.
    pub mail: Option<MailConfig>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    pub code: String,
    pub symbol: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: "USD".to_string(),
            symbol: "$".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub secret: SecretString,
    /// Base of the links mailed to clients, e.g. `https://billing.example.com`.
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_user: String,
    pub smtp_password: SecretString,
    pub from: String,
}

impl InvoicingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "invoicing".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env_opt("OTLP_ENDPOINT"),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", 2),
            },
            currency: CurrencyConfig {
                code: env::var("CURRENCY_CODE").unwrap_or_else(|_| "USD".to_string()),
                symbol: env::var("CURRENCY_SYMBOL").unwrap_or_else(|_| "$".to_string()),
            },
            preview: PreviewConfig {
                secret: env_opt("PREVIEW_SECRET").map(SecretString::new).ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!("PREVIEW_SECRET is required"))
                })?,
                base_url: env::var("PREVIEW_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            },
            mail: mail_from_env(),
        })
    }
}

/// SMTP settings; all four variables must be present.
fn mail_from_env() -> Option<MailConfig> {
    Some(MailConfig {
        smtp_host: env_opt("SMTP_HOST")?,
        smtp_user: env_opt("SMTP_USER")?,
        smtp_password: SecretString::new(env_opt("SMTP_PASSWORD")?),
        from: env_opt("MAIL_FROM")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    fn set_required() {
        env::set_var("DATABASE_URL", "postgres://localhost/invoicing");
        env::set_var("PREVIEW_SECRET", "preview-secret");
    }

    #[test]
    #[serial]
    fn test_defaults() {
        set_required();
        for key in [
            "DATABASE_MAX_CONNECTIONS",
            "CURRENCY_CODE",
            "CURRENCY_SYMBOL",
            "SMTP_HOST",
        ] {
            env::remove_var(key);
        }

        let config = InvoicingConfig::from_env().unwrap();
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.currency.code, "USD");
        assert_eq!(config.currency.symbol, "$");
        assert_eq!(config.preview.secret.expose_secret(), "preview-secret");
        assert!(config.mail.is_none());
    }

    #[test]
    #[serial]
    fn test_preview_secret_is_required() {
        set_required();
        env::remove_var("PREVIEW_SECRET");

        let err = InvoicingConfig::from_env().unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    #[serial]
    fn test_mail_needs_every_setting() {
        set_required();
        env::set_var("SMTP_HOST", "smtp.example.com");
        env::set_var("SMTP_USER", "billing");
        env::set_var("SMTP_PASSWORD", "hunter2");
        env::remove_var("MAIL_FROM");
        assert!(InvoicingConfig::from_env().unwrap().mail.is_none());

        env::set_var("MAIL_FROM", "billing@example.com");
        let mail = InvoicingConfig::from_env().unwrap().mail.unwrap();
        assert_eq!(mail.smtp_host, "smtp.example.com");

        for key in ["SMTP_HOST", "SMTP_USER", "SMTP_PASSWORD", "MAIL_FROM"] {
            env::remove_var(key);
        }
    }
}
