use dashmap::DashMap;
use futures::future::join_all;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tracing::info;

use super::{player::Player, track::Track, volume::Volume};
use crate::{cache::TrackCache, error::PlayerError, voice::VoiceGateway};

/// Owns one [`Player`] per guild for the lifetime of the process.
pub struct PlayerRegistry {
    players: DashMap<GuildId, Arc<Player>>,
    gateway: Arc<dyn VoiceGateway>,
    cache: Arc<TrackCache>,
    default_volume: Volume,
}

impl PlayerRegistry {
    pub fn new(gateway: Arc<dyn VoiceGateway>, cache: Arc<TrackCache>, default_volume: Volume) -> Self {
        Self {
            players: DashMap::new(),
            gateway,
            cache,
            default_volume,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn VoiceGateway> {
        &self.gateway
    }

    /// The guild's player, created on first use. Players are never removed.
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<Player> {
        self.players
            .entry(guild_id)
            .or_insert_with(|| {
                Player::new(
                    guild_id,
                    self.gateway.clone(),
                    self.cache.clone(),
                    self.default_volume,
                )
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Player>> {
        self.players.get(&guild_id).map(|player| player.clone())
    }

    /// Queues the audio at `url` and makes sure the guild is playing in `channel_id`.
    pub async fn play_url(
        &self,
        url: &str,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<(), PlayerError> {
        let player = self.get_or_create(guild_id);
        let track = Track::from_url(url);
        info!("➕ Queued {} in guild {}", track.name(), guild_id);

        player.add([track], false).await;
        player.play(channel_id).await
    }

    pub fn user_in_voice_channel(&self, guild_id: GuildId, user_id: UserId) -> bool {
        self.gateway.user_channel(guild_id, user_id).is_some()
    }

    /// Stops every player at once. Used on shutdown.
    pub async fn stop_all(&self) {
        let players: Vec<Arc<Player>> = self.players.iter().map(|entry| entry.value().clone()).collect();
        info!("🛑 Stopping {} player(s)", players.len());
        join_all(players.iter().map(|player| player.stop())).await;
    }
}
