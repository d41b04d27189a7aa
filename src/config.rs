//! Runtime configuration loaded from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default. Malformed values fall back to the
//! default instead of failing startup; only `DATABASE_URL` is mandatory and
//! that is checked in `main`.

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SESSION_TTL_HOURS: i64 = 720;
const DEFAULT_AUTO_CHECKOUT_INTERVAL_SECS: u64 = 3600;
const DEFAULT_AUTO_CHECKOUT_WINDOW_START: u32 = 22;
const DEFAULT_AUTO_CHECKOUT_WINDOW_END: u32 = 24;
const DEFAULT_AUTO_CHECKOUT_MAX_HOURS: i64 = 4;
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;
const MAX_AUTO_CHECKOUT_MAX_HOURS: i64 = 24 * 30;

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// Settings for the background auto-checkout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoCheckoutConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// First local hour (inclusive) in which the pass may run.
    pub window_start: u32,
    /// Local hour (exclusive) at which the window closes. May be less than
    /// `window_start` for windows that wrap past midnight.
    pub window_end: u32,
    /// Visits open longer than this are closed.
    pub max_visit_hours: i64,
}

impl Default for AutoCheckoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_AUTO_CHECKOUT_INTERVAL_SECS,
            window_start: DEFAULT_AUTO_CHECKOUT_WINDOW_START,
            window_end: DEFAULT_AUTO_CHECKOUT_WINDOW_END,
            max_visit_hours: DEFAULT_AUTO_CHECKOUT_MAX_HOURS,
        }
    }
}

impl AutoCheckoutConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_bool("AUTO_CHECKOUT_ENABLED").unwrap_or(defaults.enabled),
            interval_secs: env_parse("AUTO_CHECKOUT_INTERVAL_SECS", defaults.interval_secs).max(1),
            window_start: env_parse("AUTO_CHECKOUT_WINDOW_START", defaults.window_start).min(24),
            window_end: env_parse("AUTO_CHECKOUT_WINDOW_END", defaults.window_end).min(24),
            max_visit_hours: env_parse("AUTO_CHECKOUT_MAX_HOURS", defaults.max_visit_hours)
                .clamp(0, MAX_AUTO_CHECKOUT_MAX_HOURS),
        }
    }
}

/// Resend credentials. Both must be present for email delivery.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub from: String,
}

impl MailConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("RESEND_API_KEY").ok().filter(|v| !v.trim().is_empty())?;
        let from = std::env::var("RESEND_FROM").ok().filter(|v| !v.trim().is_empty())?;
        Some(Self { api_key, from })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub auto_checkout: AutoCheckoutConfig,
    pub mail: Option<MailConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            cookie_secure: false,
            auto_checkout: AutoCheckoutConfig::default(),
            mail: None,
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS).clamp(1, MAX_SESSION_TTL_HOURS),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            auto_checkout: AutoCheckoutConfig::from_env(),
            mail: MailConfig::from_env(),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
