//! Run configuration
//!
//! Built once from the environment at startup and passed explicitly to every
//! component. Nothing below this module reads environment variables.
//!
//! | Variable             | Required | Default                    |
//! |----------------------|----------|----------------------------|
//! | `ANTHROPIC_API_KEY`  | yes      |                            |
//! | `ROAM_API_TOKEN`     | yes      |                            |
//! | `ROAM_GRAPH_NAME`    | yes      |                            |
//! | `ANTHROPIC_MODEL`    | no       | `claude-sonnet-4-20250514` |
//! | `ANTHROPIC_BASE_URL` | no       | `https://api.anthropic.com`|
//! | `ROAM_API_BASE`      | no       | public Roam backend        |
//! | `TZ_HOURS`           | no       | `8`                        |

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use daybook_store::StoreSettings;
use thiserror::Error;

pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ENV_ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";
pub const ENV_ROAM_API_TOKEN: &str = "ROAM_API_TOKEN";
pub const ENV_ROAM_GRAPH_NAME: &str = "ROAM_GRAPH_NAME";
pub const ENV_ROAM_API_BASE: &str = "ROAM_API_BASE";
pub const ENV_TZ_HOURS: &str = "TZ_HOURS";

/// Variables without which a run cannot start, in reporting order.
pub const REQUIRED_VARS: [&str; 3] = [
    ENV_ANTHROPIC_API_KEY,
    ENV_ROAM_API_TOKEN,
    ENV_ROAM_GRAPH_NAME,
];

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
/// UTC+8
pub const DEFAULT_TZ_HOURS: i32 = 8;
pub const DEFAULT_MAX_TOKENS: u32 = 16384;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid {name}: {reason}")]
    Invalid { name: String, reason: String },
}

#[derive(Clone)]
pub struct EngineConfig {
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub roam_api_token: String,
    pub roam_graph: String,
    /// Overrides the primary store host; peers stay at their defaults.
    pub roam_api_base: Option<String>,
    /// Offset used to decide which calendar day "today" is.
    pub tz_offset: FixedOffset,
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("anthropic_api_key", &"<redacted>")
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("roam_api_token", &"<redacted>")
            .field("roam_graph", &self.roam_graph)
            .field("roam_api_base", &self.roam_api_base)
            .field("tz_offset", &self.tz_offset)
            .finish()
    }
}

impl EngineConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Unset and blank values are
    /// treated the same.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|name| get(name).is_none())
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let tz_offset = match get(ENV_TZ_HOURS) {
            Some(raw) => parse_tz_hours(&raw)?,
            None => offset_from_hours(DEFAULT_TZ_HOURS)?,
        };

        Ok(Self {
            anthropic_api_key: get(ENV_ANTHROPIC_API_KEY).unwrap_or_default(),
            anthropic_base_url: get(ENV_ANTHROPIC_BASE_URL)
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            model: get(ENV_ANTHROPIC_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: DEFAULT_MAX_TOKENS,
            roam_api_token: get(ENV_ROAM_API_TOKEN).unwrap_or_default(),
            roam_graph: get(ENV_ROAM_GRAPH_NAME).unwrap_or_default(),
            roam_api_base: get(ENV_ROAM_API_BASE),
            tz_offset,
        })
    }

    /// Store client settings derived from this configuration.
    pub fn store_settings(&self) -> StoreSettings {
        let settings = StoreSettings::new(&self.roam_graph, &self.roam_api_token);
        match &self.roam_api_base {
            Some(base) => settings.with_api_base(base),
            None => settings,
        }
    }

    /// Calendar date at `now` in the configured offset.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz_offset).date_naive()
    }
}

fn parse_tz_hours(raw: &str) -> Result<FixedOffset, ConfigError> {
    let hours: i32 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name: ENV_TZ_HOURS.to_string(),
        reason: format!("expected whole hours, got {raw:?}"),
    })?;
    offset_from_hours(hours)
}

fn offset_from_hours(hours: i32) -> Result<FixedOffset, ConfigError> {
    let out_of_range = || ConfigError::Invalid {
        name: ENV_TZ_HOURS.to_string(),
        reason: format!("{hours} is outside -12..=14"),
    };
    if !(-12..=14).contains(&hours) {
        return Err(out_of_range());
    }
    FixedOffset::east_opt(hours * 3600).ok_or_else(out_of_range)
}
