//! # Audio Module
//!
//! Per-guild playback of voice lines.
//!
//! ## Architecture
//!
//! ### [`registry`] - Player Registry
//! - One [`Player`] per guild, created on first use and kept for the process lifetime
//! - Entry point for "play this URL here"
//!
//! ### [`player`] - Audio Player
//! - Playback state machine (`Stopped`, `Playing`, `Paused`) behind one mutex per guild
//! - Downloads the current track into the cache and hands it to the voice transport
//! - A coordinator task advances the queue whenever a stream finishes
//!
//! ### [`queue`] - Queue Management
//! - Ordered tracks with a cursor and a repeat mode
//! - Shuffle of upcoming tracks, paged listings
//!
//! ### [`idle`] - Idle Monitor
//! - Leaves the voice channel once the bot has been alone for the idle window
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dota_audio::audio::{player::PlayerStatus, PlayerRegistry};
//! use serenity::model::id::{ChannelId, GuildId};
//!
//! # async fn example(registry: &PlayerRegistry) -> anyhow::Result<()> {
//! let guild_id = GuildId::new(123456789);
//! registry
//!     .play_url("https://example.com/Axe_attack_01.mp3", guild_id, ChannelId::new(42))
//!     .await?;
//!
//! let player = registry.get_or_create(guild_id);
//! player.set_volume(35).await;
//! assert_eq!(player.status().await, PlayerStatus::Playing);
//! # Ok(())
//! # }
//! ```

pub mod idle;
pub mod player;
pub mod queue;
pub mod registry;
pub mod track;
pub mod volume;

pub use idle::{IdleConfig, IdleMonitor};
pub use player::{Player, PlayerStatus};
pub use queue::{Queue, RepeatMode};
pub use registry::PlayerRegistry;
pub use track::Track;
pub use volume::Volume;
