use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub port: u16,
    pub schedule: ScheduleSettings,
}

/// Which status the schedule fallback assigns to generated slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicyKind {
    AlwaysAvailable,
    Random,
}

impl FromStr for FallbackPolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" | "always_available" => Ok(Self::AlwaysAvailable),
            "random" | "demo" => Ok(Self::Random),
            other => Err(format!("unknown fallback policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub fetch_timeout_ms: u64,
    /// Extra attempts after the first failed fetch of persisted rows.
    pub fetch_retries: u32,
    pub retry_backoff_ms: u64,
    pub max_range_days: i64,
    pub fallback_policy: FallbackPolicyKind,
    pub fallback_seed: Option<u64>,
    /// Persist generated fallback days so repeat visits see the same schedule.
    pub fallback_write_back: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 5_000,
            fetch_retries: 1,
            retry_backoff_ms: 200,
            max_range_days: 31,
            fallback_policy: FallbackPolicyKind::AlwaysAvailable,
            fallback_seed: None,
            fallback_write_back: false,
        }
    }
}

impl ScheduleSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            fetch_timeout_ms: parse_var("SCHEDULE_FETCH_TIMEOUT_MS", defaults.fetch_timeout_ms),
            fetch_retries: parse_var("SCHEDULE_FETCH_RETRIES", defaults.fetch_retries),
            retry_backoff_ms: parse_var("SCHEDULE_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
            max_range_days: parse_var("SCHEDULE_MAX_RANGE_DAYS", defaults.max_range_days),
            fallback_policy: parse_var("SCHEDULE_FALLBACK_POLICY", defaults.fallback_policy),
            fallback_seed: env::var("SCHEDULE_FALLBACK_SEED")
                .ok()
                .and_then(|raw| match raw.parse() {
                    Ok(seed) => Some(seed),
                    Err(_) => {
                        warn!("SCHEDULE_FALLBACK_SEED is not a number, ignoring");
                        None
                    }
                }),
            fallback_write_back: parse_var("SCHEDULE_FALLBACK_WRITE_BACK", defaults.fallback_write_back),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            port: parse_var("PORT", 3000),
            schedule: ScheduleSettings::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}
