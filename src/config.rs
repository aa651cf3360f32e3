use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_days: i64,
}

/// SMTP settings; present only when SMTP_HOST is set.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub token: TokenConfig,
    pub mail: Option<MailConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let token = TokenConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            ttl_days: std::env::var("TOKEN_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        // SMTP_HOST keys the whole mail block: absent means mail is off,
        // present means the rest of the block is required.
        let mail = match std::env::var("SMTP_HOST") {
            Ok(smtp_host) => Some(MailConfig {
                smtp_host,
                smtp_username: std::env::var("SMTP_USERNAME").context("SMTP_USERNAME")?,
                smtp_password: std::env::var("SMTP_PASSWORD").context("SMTP_PASSWORD")?,
                from_address: std::env::var("MAIL_FROM").context("MAIL_FROM")?,
            }),
            Err(_) => None,
        };
        Ok(Self {
            database_url,
            token,
            mail,
        })
    }
}
