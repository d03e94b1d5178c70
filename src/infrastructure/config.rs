use crate::infrastructure::security::DEFAULT_TOKEN_TTL_SECS;
use anyhow::{Context, Result, bail};
use std::env;
use std::fmt;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
const DEFAULT_SERVER_PORT: u16 = 8080;

#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub server_host: String,
    pub server_port: u16,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .finish()
    }
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let token_ttl_secs = match lookup("JWT_TTL_SECS") {
            Some(v) => v
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .with_context(|| format!("JWT_TTL_SECS must be a positive integer, got {:?}", v))?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        let server_port = match lookup("SERVER_PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("SERVER_PORT must be a valid port, got {:?}", v))?,
            None => DEFAULT_SERVER_PORT,
        };

        Ok(Self {
            jwt_secret,
            token_ttl_secs,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            server_port,
        })
    }
}
