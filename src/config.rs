use anyhow::{Context, Result};
use ::config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::audio::queue::MAX_VOLUME;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    // Discord
    #[serde(alias = "token")]
    pub discord_token: String,
    pub guild_id: Option<u64>, // Registers commands per guild while developing
    #[serde(alias = "prefix")]
    pub command_prefix: String,

    // Playback
    pub default_volume: u8,
    pub max_queue_size: usize,
    pub max_start_attempts: u32,
}

impl Config {
    /// Loads `.env`, then an optional `config.json`, then environment
    /// variables, each layer overriding the previous one.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = ::config::Config::builder()
            .add_source(File::new("config.json", FileFormat::Json).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()
            .context("reading configuration")?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: ::config::Config) -> Result<Self> {
        let fallback_token = settings.get_string("bot_token").ok();

        let mut config: Self = settings
            .try_deserialize()
            .context("parsing configuration")?;

        if config.discord_token.trim().is_empty() {
            if let Some(token) = fallback_token {
                config.discord_token = token;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - A Discord token must be present
    /// - Volume must be between 0 and 200 percent
    /// - Queue size and start attempts must be greater than 0
    /// - The command prefix must not be blank
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("Discord token is required (set DISCORD_TOKEN)");
        }

        if self.default_volume > MAX_VOLUME {
            anyhow::bail!(
                "Default volume must be between 0 and {}, got: {}",
                MAX_VOLUME,
                self.default_volume
            );
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.max_start_attempts == 0 {
            anyhow::bail!("Max start attempts must be greater than 0");
        }

        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("Command prefix must not be blank");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Leaves out the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: prefix `{}` (Guild: {})\n  \
            Playback: {}% vol, {} max queue, {} start attempts",
            self.command_prefix,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.default_volume,
            self.max_queue_size,
            self.max_start_attempts,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: None,
            command_prefix: "!".to_string(),

            default_volume: 80,
            max_queue_size: 1000,
            max_start_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn from_json(json: &str) -> Result<Config> {
        let settings = ::config::Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()?;
        Config::from_settings(settings)
    }

    #[test]
    fn test_json_keys_and_defaults() {
        let config = from_json(r#"{ "token": "abc", "prefix": "?" }"#).unwrap();

        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.command_prefix, "?");
        assert_eq!(config.default_volume, 80);
        assert_eq!(config.max_queue_size, 1000);
        assert_eq!(config.max_start_attempts, 3);
        assert_eq!(config.guild_id, None);
    }

    #[test]
    fn test_bot_token_fallback() {
        let config = from_json(r#"{ "bot_token": "xyz", "guild_id": 42 }"#).unwrap();

        assert_eq!(config.discord_token, "xyz");
        assert_eq!(config.guild_id, Some(42));
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let err = from_json("{}").unwrap_err();
        assert!(err.to_string().contains("Discord token is required"));
    }

    #[test]
    fn test_validate_ranges() {
        let valid = Config {
            discord_token: "abc".into(),
            ..Config::default()
        };
        assert!(valid.validate().is_ok());

        let loud = Config {
            default_volume: 201,
            ..valid.clone()
        };
        assert!(loud.validate().is_err());

        let no_retries = Config {
            max_start_attempts: 0,
            ..valid.clone()
        };
        assert!(no_retries.validate().is_err());

        let empty_queue = Config {
            max_queue_size: 0,
            ..valid
        };
        assert!(empty_queue.validate().is_err());
    }

    #[test]
    fn test_summary_hides_token() {
        let config = Config {
            discord_token: "secret-token".into(),
            guild_id: Some(7),
            ..Config::default()
        };

        let summary = config.summary();
        assert!(!summary.contains("secret-token"));
        assert!(summary.contains("Guild: 7"));
        assert!(summary.contains("80% vol"));
    }
}
