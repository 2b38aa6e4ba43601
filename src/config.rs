use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

use crate::audio::{IdleConfig, Volume};

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Slash commands register here instead of globally

    // Audio
    pub default_volume: u8,
    pub cache_dir: PathBuf,
    pub ffmpeg_path: String,
    pub loudnorm_filter: String,
    pub fetch_timeout: Duration,

    // Idle
    pub idle_timeout: Duration,
    pub idle_checks: u32,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn duration_from_env(key: &str, default: &str) -> Result<Duration> {
    let raw = env_or(key, default);
    humantime::parse_duration(&raw).with_context(|| format!("{} is not a duration: {:?}", key, raw))
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            discord_token: std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            default_volume: env_or("DEFAULT_VOLUME", "20")
                .parse()
                .context("DEFAULT_VOLUME must be an integer")?,
            cache_dir: env_or("AUDIO_CACHE_DIR", "audio").into(),
            ffmpeg_path: env_or("FFMPEG_PATH", "ffmpeg"),
            loudnorm_filter: env_or("LOUDNORM_FILTER", "loudnorm=I=-16.0:TP=-1.0"),
            fetch_timeout: duration_from_env("FETCH_TIMEOUT", "30s")?,

            idle_timeout: duration_from_env("IDLE_TIMEOUT", "30s")?,
            idle_checks: env_or("IDLE_CHECKS", "3")
                .parse()
                .context("IDLE_CHECKS must be an integer")?,
        };

        config.validate()?;

        std::fs::create_dir_all(&config.cache_dir)
            .with_context(|| format!("could not create {}", config.cache_dir.display()))?;

        Ok(config)
    }

    /// Sanity checks that catch typos before the bot connects.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        if self.default_volume > Volume::MAX {
            anyhow::bail!("Default volume must be between 0 and 100, got: {}", self.default_volume);
        }

        if self.idle_checks == 0 {
            anyhow::bail!("Idle checks must be greater than 0");
        }

        if self.idle_timeout.is_zero() {
            anyhow::bail!("Idle timeout must be greater than 0");
        }

        if self.fetch_timeout.is_zero() {
            anyhow::bail!("Fetch timeout must be greater than 0");
        }

        Ok(())
    }

    pub fn volume(&self) -> Volume {
        Volume::clamped(i64::from(self.default_volume))
    }

    pub fn idle(&self) -> IdleConfig {
        IdleConfig {
            window: self.idle_timeout,
            checks: self.idle_checks,
        }
    }

    /// Loggable summary without the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands in {}\n  \
            Audio: {}% vol, cache at {}, {} ({})\n  \
            Fetch timeout: {}\n  \
            Idle: leave after {} ({} checks)",
            self.guild_id.map_or("global".to_string(), |id| format!("guild {}", id)),
            self.default_volume,
            self.cache_dir.display(),
            self.ffmpeg_path,
            self.loudnorm_filter,
            humantime::format_duration(self.fetch_timeout),
            humantime::format_duration(self.idle_timeout),
            self.idle_checks,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: None,

            default_volume: Volume::DEFAULT.percent(),
            cache_dir: "audio".into(),
            ffmpeg_path: "ffmpeg".to_string(),
            loudnorm_filter: "loudnorm=I=-16.0:TP=-1.0".to_string(),
            fetch_timeout: Duration::from_secs(30),

            idle_timeout: Duration::from_secs(30),
            idle_checks: 3,
        }
    }
}
