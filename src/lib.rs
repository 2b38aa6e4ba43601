//! # Dota Audio
//!
//! Per-guild voice line playback for the Dota Discord bot.
//!
//! Other parts of the bot reach playback through the [`PlayerRegistry`]:
//!
//! ```rust,no_run
//! # use dota_audio::audio::PlayerRegistry;
//! # use serenity::all::{ChannelId, GuildId};
//! # async fn example(registry: &PlayerRegistry) -> Result<(), dota_audio::error::PlayerError> {
//! let guild_id = GuildId::new(408172061723459584);
//! let channel_id = ChannelId::new(408481491597787136);
//!
//! registry
//!     .play_url("https://example.com/responses/Axe_attack_01.mp3", guild_id, channel_id)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod bot;
pub mod cache;
pub mod config;
pub mod error;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_support;

pub use audio::PlayerRegistry;
