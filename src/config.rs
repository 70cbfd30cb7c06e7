use std::time::Duration;

use clap::{Args, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// PostgREST endpoint of the hosted database
    Rest,
    /// Direct Postgres connection
    Postgres,
    /// Built-in fixture data, no store access
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Global options. Every flag falls back to an environment variable, and a
/// `.env` file is loaded before parsing.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    #[arg(long, env = "PACING_BACKEND", value_enum, default_value_t = Backend::Rest, global = true)]
    pub backend: Backend,

    #[arg(long, env = "SUPABASE_URL", global = true)]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true, global = true)]
    pub supabase_key: Option<String>,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value_t = 30, global = true)]
    pub refresh_secs: u64,

    #[arg(long, env = "CLOCK_INTERVAL_SECS", default_value_t = 1, global = true)]
    pub clock_secs: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

impl Settings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_secs(self.clock_secs.max(1))
    }

    /// URL and key, or `None` when either is missing or blank.
    pub fn rest_credentials(&self) -> Option<(&str, &str)> {
        let url = self.supabase_url.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        let key = self.supabase_key.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        Some((url, key))
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let harness = Harness::parse_from([
            "test",
            "--supabase-url",
            "https://example.supabase.co",
            "--supabase-key",
            "  ",
            "--database-url",
            "",
        ]);
        assert_eq!(harness.settings.rest_credentials(), None);
        assert_eq!(harness.settings.database_url(), None);
    }

    #[test]
    fn intervals_never_drop_to_zero() {
        let harness = Harness::parse_from(["test", "--refresh-secs", "0", "--clock-secs", "5"]);
        assert_eq!(harness.settings.refresh_interval(), Duration::from_secs(1));
        assert_eq!(harness.settings.clock_interval(), Duration::from_secs(5));
    }
}
