use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use strum_macros::{AsRefStr, EnumString};

use crate::auth::auth_log::{AuthLogConfig, AuthLogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AppEnv {
    Development,
    Production,
}

#[derive(Clone)]
pub struct Config {
    pub app_env: AppEnv,
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: String,

    pub cnpj_api_url: String,
    pub cnpj_timeout_ms: u64,

    pub auth_log: AuthLogConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        let app_env = match lookup("APP_ENV") {
            Some(v) => AppEnv::from_str(&v).map_err(|_| anyhow!("APP_ENV has invalid value {v:?}"))?,
            None => AppEnv::Development,
        };

        let mut auth_log = AuthLogConfig::for_env(app_env);
        if let Some(level) = lookup("AUTH_LOG_LEVEL") {
            auth_log.min_level = AuthLogLevel::from_str(&level)
                .map_err(|_| anyhow!("AUTH_LOG_LEVEL has invalid value {level:?}"))?;
        }
        auth_log.max_entries = parse_or(&lookup, "AUTH_LOG_BUFFER", auth_log.max_entries)?;
        // masking stays on in production whatever the flag says
        let mask: bool = parse_or(&lookup, "AUTH_LOG_MASK", true)?;
        auth_log.mask_sensitive = mask || app_env == AppEnv::Production;

        Ok(Self {
            app_env,
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parse_or(&lookup, "REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parse_or(&lookup, "RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parse_or(&lookup, "RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            cnpj_api_url: lookup("CNPJ_API_URL")
                .unwrap_or_else(|| "https://brasilapi.com.br/api/cnpj/v1".to_string()),
            cnpj_timeout_ms: parse_or(&lookup, "CNPJ_TIMEOUT_MS", 5000)?,

            auth_log,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://localhost/folha"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.refresh_token_ttl, 604_800);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.cnpj_timeout_ms, 5000);
        assert_eq!(config.auth_log.min_level, AuthLogLevel::Debug);
        assert_eq!(config.auth_log.max_entries, 100);
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).err().unwrap();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn bad_number_is_an_error_not_a_panic() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ACCESS_TOKEN_TTL", "fifteen"));
        let err = Config::from_lookup(lookup_from(&pairs)).err().unwrap();
        assert!(err.to_string().contains("ACCESS_TOKEN_TTL"));
    }

    #[test]
    fn production_raises_auth_log_level_and_forces_masking() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("APP_ENV", "Production"));
        pairs.push(("AUTH_LOG_MASK", "false"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.is_production());
        assert_eq!(config.auth_log.min_level, AuthLogLevel::Warn);
        assert!(config.auth_log.mask_sensitive);
    }

    #[test]
    fn development_can_disable_masking_and_override_level() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("AUTH_LOG_MASK", "false"));
        pairs.push(("AUTH_LOG_LEVEL", "error"));
        pairs.push(("AUTH_LOG_BUFFER", "10"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(!config.auth_log.mask_sensitive);
        assert_eq!(config.auth_log.min_level, AuthLogLevel::Error);
        assert_eq!(config.auth_log.max_entries, 10);
    }
}
