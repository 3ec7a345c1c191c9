use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::info;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub client_origin: String,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = secret("MURMUR_JWT_SECRET")?;
        let jwt_refresh_secret = secret("MURMUR_JWT_REFRESH_SECRET")?;
        if jwt_secret == jwt_refresh_secret {
            bail!("MURMUR_JWT_REFRESH_SECRET must differ from MURMUR_JWT_SECRET");
        }

        Ok(Self {
            host: load("MURMUR_HOST", "0.0.0.0")?,
            port: load("MURMUR_PORT", "3000")?,
            db_path: load("MURMUR_DB_PATH", "murmur.db")?,
            jwt_secret,
            jwt_refresh_secret,
            upload_dir: load("MURMUR_UPLOAD_DIR", "./uploads")?,
            public_url: env::var("MURMUR_PUBLIC_URL").unwrap_or_default(),
            client_origin: load("MURMUR_CLIENT_ORIGIN", "http://localhost:5173")?,
            secure_cookies: load("MURMUR_SECURE_COOKIES", "false")?,
        })
    }
}

fn load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}"))
}

fn secret(key: &str) -> Result<String> {
    let value = env::var(key).with_context(|| format!("{key} must be set"))?;
    check_secret(key, &value)?;
    Ok(value)
}

fn check_secret(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&value) {
        bail!("{key} is empty or still a placeholder; set it in your .env file");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_secrets_are_refused() {
        assert!(check_secret("K", "").is_err());
        assert!(check_secret("K", "   ").is_err());
        assert!(check_secret("K", "dev-secret-change-me").is_err());
        assert!(check_secret("K", "b7f1c0e2a9d84e1f").is_ok());
    }
}
