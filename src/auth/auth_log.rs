//! Structured log of authentication events.
//!
//! Entries are masked, filtered by level and kept in a bounded in-memory buffer
//! that admins can inspect. Each accepted entry is also emitted to `tracing`.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::config::AppEnv;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, EnumString, Display, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuthLogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ErrorCategory {
    Auth,
    Config,
    Network,
    Validation,
}

/// Why an authentication step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidCredentials,
    InactiveAccount,
    EmailTaken,
    InvalidEmail,
    WeakPassword,
    MissingToken,
    InvalidToken,
    TokenExpired,
    TokenRevoked,
    MissingConfig(String),
    Backend(String),
}

impl AuthFailure {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthFailure::InvalidCredentials
            | AuthFailure::InactiveAccount
            | AuthFailure::MissingToken
            | AuthFailure::InvalidToken
            | AuthFailure::TokenExpired
            | AuthFailure::TokenRevoked => ErrorCategory::Auth,
            AuthFailure::EmailTaken | AuthFailure::InvalidEmail | AuthFailure::WeakPassword => {
                ErrorCategory::Validation
            }
            AuthFailure::MissingConfig(_) => ErrorCategory::Config,
            AuthFailure::Backend(_) => ErrorCategory::Network,
        }
    }

    /// Message safe to show to the person at the login form.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthFailure::InvalidCredentials => "Invalid email or password",
            AuthFailure::InactiveAccount => "This account is disabled. Contact your HR department",
            AuthFailure::EmailTaken => "An account with this email already exists",
            AuthFailure::InvalidEmail => "Enter a valid email address",
            AuthFailure::WeakPassword => "Password must have at least 8 characters",
            AuthFailure::MissingToken => "Sign in to continue",
            AuthFailure::InvalidToken | AuthFailure::TokenRevoked => {
                "Your session is invalid. Sign in again"
            }
            AuthFailure::TokenExpired => "Your session has expired. Sign in again",
            AuthFailure::MissingConfig(_) => "Authentication is not configured. Contact the system admin",
            AuthFailure::Backend(_) => "Could not reach the authentication service. Try again later",
        }
    }

    fn level(&self) -> AuthLogLevel {
        match self.category() {
            ErrorCategory::Config | ErrorCategory::Network => AuthLogLevel::Error,
            ErrorCategory::Auth => AuthLogLevel::Warn,
            ErrorCategory::Validation => AuthLogLevel::Info,
        }
    }

    fn detail(&self) -> String {
        match self {
            AuthFailure::MissingConfig(d) | AuthFailure::Backend(d) => d.clone(),
            other => format!("{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthLogEntry {
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    pub level: AuthLogLevel,
    #[schema(example = "login")]
    pub event: String,
    pub category: Option<ErrorCategory>,
    pub message: String,
    #[schema(value_type = Object)]
    pub context: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthLogConfig {
    pub min_level: AuthLogLevel,
    pub max_entries: usize,
    pub mask_sensitive: bool,
}

impl AuthLogConfig {
    pub fn for_env(env: AppEnv) -> Self {
        let min_level = match env {
            AppEnv::Production => AuthLogLevel::Warn,
            AppEnv::Development => AuthLogLevel::Debug,
        };
        Self {
            min_level,
            max_entries: 100,
            mask_sensitive: true,
        }
    }
}

impl Default for AuthLogConfig {
    fn default() -> Self {
        Self::for_env(AppEnv::Development)
    }
}

pub struct AuthLogger {
    config: AuthLogConfig,
    entries: Mutex<VecDeque<AuthLogEntry>>,
}

impl AuthLogger {
    pub fn new(config: AuthLogConfig) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(config.max_entries)),
            config,
        }
    }

    /// Records an entry. Returns false when the level is below the configured minimum.
    pub fn log(&self, level: AuthLogLevel, event: &str, message: &str, context: Value) -> bool {
        self.push(level, event, None, message, context)
    }

    pub fn failure(&self, event: &str, failure: &AuthFailure, context: Value) -> bool {
        let message = format!("{}: {}", failure.user_message(), failure.detail());
        self.push(failure.level(), event, Some(failure.category()), &message, context)
    }

    fn push(
        &self,
        level: AuthLogLevel,
        event: &str,
        category: Option<ErrorCategory>,
        message: &str,
        context: Value,
    ) -> bool {
        if level < self.config.min_level {
            return false;
        }

        let (message, context) = if self.config.mask_sensitive {
            (mask_text(message), mask_context(context))
        } else {
            (message.to_string(), context)
        };

        emit(level, event, category, &message, &context);

        if self.config.max_entries == 0 {
            return true;
        }

        let entry = AuthLogEntry {
            timestamp: Utc::now(),
            level,
            event: event.to_string(),
            category,
            message,
            context,
        };

        let mut entries = self.buffer();
        entries.push_back(entry);
        while entries.len() > self.config.max_entries {
            entries.pop_front();
        }
        true
    }

    /// Buffered entries, oldest first, optionally limited to `min` and above.
    pub fn entries(&self, min: Option<AuthLogLevel>) -> Vec<AuthLogEntry> {
        self.buffer()
            .iter()
            .filter(|e| min.is_none_or(|m| e.level >= m))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.buffer().clear();
    }

    // a panic while logging must not lose the buffer
    fn buffer(&self) -> MutexGuard<'_, VecDeque<AuthLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn emit(
    level: AuthLogLevel,
    event: &str,
    category: Option<ErrorCategory>,
    message: &str,
    context: &Value,
) {
    let category = category.as_ref().map(|c| c.as_ref()).unwrap_or("-");
    match level {
        AuthLogLevel::Debug => tracing::debug!(event, category, context = %context, "{message}"),
        AuthLogLevel::Info => tracing::info!(event, category, context = %context, "{message}"),
        AuthLogLevel::Warn => tracing::warn!(event, category, context = %context, "{message}"),
        AuthLogLevel::Error => tracing::error!(event, category, context = %context, "{message}"),
    }
}

static AUTH_LOG: OnceCell<AuthLogger> = OnceCell::new();

/// Installs the process-wide logger. Later calls keep the first config.
pub fn init(config: AuthLogConfig) {
    if AUTH_LOG.set(AuthLogger::new(config)).is_err() {
        tracing::debug!("auth log already initialised");
    }
}

pub fn global() -> &'static AuthLogger {
    AUTH_LOG.get_or_init(|| AuthLogger::new(AuthLogConfig::default()))
}

/* =========================
Masking
========================= */

const REDACTED: &str = "***";
const SECRET_KEYS: [&str; 3] = ["password", "secret", "authorization"];

/// `john.doe@example.com` becomes `jo***@example.com`.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !domain.is_empty() => {
            let keep: String = local.chars().take(2).collect();
            format!("{keep}{REDACTED}@{domain}")
        }
        _ => REDACTED.to_string(),
    }
}

/// Keeps the first and last four characters of anything long enough to hide a middle.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return REDACTED.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn mask_text(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            if word.contains('@') {
                mask_email(word)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn mask_field(key: &str, value: Value) -> Value {
    let key = key.to_ascii_lowercase();
    if SECRET_KEYS.iter().any(|s| key.ends_with(s)) {
        return Value::String(REDACTED.to_string());
    }
    match value {
        Value::String(s) if key.ends_with("token") || key == "jti" => Value::String(mask_token(&s)),
        Value::String(s) if s.contains('@') => Value::String(mask_email(&s)),
        other => mask_context(other),
    }
}

fn mask_context(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let masked = mask_field(&k, v);
                    (k, masked)
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(mask_context).collect()),
        Value::String(s) if s.contains('@') => Value::String(mask_email(&s)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn logger(min_level: AuthLogLevel, max_entries: usize) -> AuthLogger {
        AuthLogger::new(AuthLogConfig {
            min_level,
            max_entries,
            mask_sensitive: true,
        })
    }

    #[test]
    fn masks_emails_tokens_and_secrets() {
        assert_eq!(mask_email("john.doe@example.com"), "jo***@example.com");
        assert_eq!(mask_email("a@x.io"), "a***@x.io");
        assert_eq!(mask_email("not-an-email"), "***");
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.payload.sig"), "eyJh....sig");
        assert_eq!(mask_token("short"), "***");
    }

    #[test]
    fn context_is_masked_recursively() {
        let log = logger(AuthLogLevel::Debug, 10);
        log.log(
            AuthLogLevel::Info,
            "login",
            "attempt for maria@empresa.com.br",
            json!({
                "email": "maria@empresa.com.br",
                "Password": "hunter22",
                "refresh_token": "abcd1234efgh5678",
                "nested": { "client_secret": "xyz", "user_id": 7 }
            }),
        );

        let entry = &log.entries(None)[0];
        assert_eq!(entry.message, "attempt for ma***@empresa.com.br");
        assert_eq!(entry.context["email"], "ma***@empresa.com.br");
        assert_eq!(entry.context["Password"], "***");
        assert_eq!(entry.context["refresh_token"], "abcd...5678");
        assert_eq!(entry.context["nested"]["client_secret"], "***");
        assert_eq!(entry.context["nested"]["user_id"], 7);
    }

    #[test]
    fn masking_can_be_disabled() {
        let log = AuthLogger::new(AuthLogConfig {
            min_level: AuthLogLevel::Debug,
            max_entries: 10,
            mask_sensitive: false,
        });
        log.log(AuthLogLevel::Info, "login", "x", json!({ "email": "maria@empresa.com" }));
        assert_eq!(log.entries(None)[0].context["email"], "maria@empresa.com");
    }

    #[test]
    fn drops_entries_below_min_level() {
        let log = logger(AuthLogLevel::Warn, 10);
        assert!(!log.log(AuthLogLevel::Debug, "login", "debug", Value::Null));
        assert!(!log.log(AuthLogLevel::Info, "login", "info", Value::Null));
        assert!(log.log(AuthLogLevel::Error, "login", "error", Value::Null));
        assert_eq!(log.entries(None).len(), 1);
    }

    #[test]
    fn buffer_is_trimmed_oldest_first() {
        let log = logger(AuthLogLevel::Debug, 3);
        for i in 0..5 {
            log.log(AuthLogLevel::Info, "login", &format!("attempt {i}"), Value::Null);
        }
        let messages: Vec<_> = log.entries(None).into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["attempt 2", "attempt 3", "attempt 4"]);
    }

    #[test]
    fn clear_recovers_a_poisoned_buffer() {
        let log = logger(AuthLogLevel::Debug, 10);
        log.log(AuthLogLevel::Info, "login", "before", Value::Null);

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = log.entries.lock().unwrap();
            panic!("panicked while holding the buffer");
        }));
        assert!(log.entries.is_poisoned());

        log.clear();
        assert!(log.entries(None).is_empty());
        log.log(AuthLogLevel::Info, "login", "after", Value::Null);
        assert_eq!(log.entries(None).len(), 1);
    }

    #[test]
    fn zero_sized_buffer_keeps_nothing() {
        let log = logger(AuthLogLevel::Debug, 0);
        assert!(log.log(AuthLogLevel::Error, "login", "boom", Value::Null));
        assert!(log.entries(None).is_empty());
    }

    #[test]
    fn entries_can_be_filtered_by_level() {
        let log = logger(AuthLogLevel::Debug, 10);
        log.log(AuthLogLevel::Debug, "a", "a", Value::Null);
        log.log(AuthLogLevel::Warn, "b", "b", Value::Null);
        log.log(AuthLogLevel::Error, "c", "c", Value::Null);
        assert_eq!(log.entries(Some(AuthLogLevel::Warn)).len(), 2);
        log.clear();
        assert!(log.entries(None).is_empty());
    }

    #[test]
    fn failures_are_classified() {
        assert_eq!(AuthFailure::InvalidCredentials.category(), ErrorCategory::Auth);
        assert_eq!(AuthFailure::TokenExpired.category(), ErrorCategory::Auth);
        assert_eq!(AuthFailure::WeakPassword.category(), ErrorCategory::Validation);
        assert_eq!(AuthFailure::EmailTaken.category(), ErrorCategory::Validation);
        assert_eq!(
            AuthFailure::MissingConfig("JWT_SECRET".into()).category(),
            ErrorCategory::Config
        );
        assert_eq!(
            AuthFailure::Backend("pool timed out".into()).category(),
            ErrorCategory::Network
        );
    }

    #[test]
    fn failures_map_to_user_messages() {
        assert_eq!(AuthFailure::InvalidCredentials.user_message(), "Invalid email or password");
        assert_eq!(
            AuthFailure::TokenExpired.user_message(),
            "Your session has expired. Sign in again"
        );
        // internal detail never leaks into the user message
        let backend = AuthFailure::Backend("mysql://10.0.0.3 refused".into());
        assert!(!backend.user_message().contains("10.0.0.3"));
    }

    #[test]
    fn failure_entries_carry_category_and_level() {
        let log = logger(AuthLogLevel::Debug, 10);
        log.failure("login", &AuthFailure::Backend("pool timed out".into()), Value::Null);
        log.failure("register", &AuthFailure::WeakPassword, Value::Null);

        let entries = log.entries(None);
        assert_eq!(entries[0].level, AuthLogLevel::Error);
        assert_eq!(entries[0].category, Some(ErrorCategory::Network));
        assert!(entries[0].message.contains("pool timed out"));
        assert_eq!(entries[1].level, AuthLogLevel::Info);
        assert_eq!(entries[1].category, Some(ErrorCategory::Validation));
    }

    #[test]
    fn env_config_sets_min_level() {
        assert_eq!(AuthLogConfig::for_env(AppEnv::Production).min_level, AuthLogLevel::Warn);
        assert_eq!(AuthLogConfig::for_env(AppEnv::Development).min_level, AuthLogLevel::Debug);
    }
}
