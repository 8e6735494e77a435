//! Runtime settings for the sync engine.
//!
//! Endpoints and keys here are safe-to-ship public values; secret
//! credentials live in the persisted auth session, never in settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::backup::DEFAULT_KEEP;
use crate::sync::remote::RETRY_ATTEMPTS;
use crate::util::{is_http_url, normalize_text_option};

const ENV_SUPABASE_URL: &str = "DAYKEEP_SUPABASE_URL";
const ENV_SUPABASE_ANON_KEY: &str = "DAYKEEP_SUPABASE_ANON_KEY";

/// Engine settings with their built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    /// Quiet period after the last local change before an upload.
    pub debounce_secs: u64,
    /// Interval between periodic heartbeat uploads.
    pub heartbeat_secs: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Upper bound on the shutdown flush.
    pub shutdown_timeout_secs: u64,
    /// Attempts per remote request before giving up on transient failures.
    pub retry_attempts: u32,
    /// Number of pre-sync backups kept on disk.
    pub backup_keep: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            debounce_secs: 3,
            heartbeat_secs: 300,
            request_timeout_secs: 30,
            shutdown_timeout_secs: 10,
            retry_attempts: RETRY_ATTEMPTS,
            backup_keep: DEFAULT_KEEP,
        }
    }
}

impl Settings {
    /// Defaults overlaid with `DAYKEEP_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env();
        settings
    }

    /// Overlay `DAYKEEP_*` environment variables onto these settings.
    pub fn apply_env(&mut self) {
        if let Some(url) = env_value(ENV_SUPABASE_URL) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = env_value(ENV_SUPABASE_ANON_KEY) {
            self.supabase_anon_key = Some(key);
        }
    }

    /// Whether both remote endpoint values are present and plausible.
    #[must_use]
    pub fn is_remote_configured(&self) -> bool {
        self.remote_endpoint().is_some()
    }

    /// The validated `(url, anon_key)` pair, if configured.
    #[must_use]
    pub fn remote_endpoint(&self) -> Option<(String, String)> {
        let url = normalize_text_option(self.supabase_url.clone()).filter(|u| is_http_url(u))?;
        let key = normalize_text_option(self.supabase_anon_key.clone())?;
        Some((url, key))
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    #[must_use]
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn env_value(name: &str) -> Option<String> {
    normalize_text_option(std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timings() {
        let settings = Settings::default();
        assert_eq!(settings.debounce(), Duration::from_secs(3));
        assert_eq!(settings.heartbeat(), Duration::from_secs(300));
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.retry_attempts, 3);
        assert_eq!(settings.backup_keep, 10);
    }

    #[test]
    fn remote_endpoint_requires_both_values() {
        let mut settings = Settings::default();
        assert!(!settings.is_remote_configured());

        settings.supabase_url = Some("https://p.supabase.co".to_string());
        assert!(!settings.is_remote_configured());

        settings.supabase_anon_key = Some("anon".to_string());
        assert_eq!(
            settings.remote_endpoint(),
            Some(("https://p.supabase.co".to_string(), "anon".to_string()))
        );
    }

    #[test]
    fn remote_endpoint_rejects_non_http_url() {
        let settings = Settings {
            supabase_url: Some("p.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            ..Settings::default()
        };
        assert!(settings.remote_endpoint().is_none());
    }

    #[test]
    fn settings_round_trip_as_json() {
        let settings = Settings {
            supabase_url: Some("https://p.supabase.co".to_string()),
            debounce_secs: 5,
            ..Settings::default()
        };
        let raw = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, settings);
    }
}
