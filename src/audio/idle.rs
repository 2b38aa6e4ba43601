use dashmap::DashSet;
use serenity::model::id::GuildId;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::registry::PlayerRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleConfig {
    /// Total time the bot must stay alone before it leaves.
    pub window: Duration,
    /// Number of presence checks spread over the window.
    pub checks: u32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(30),
            checks: 3,
        }
    }
}

impl IdleConfig {
    fn tick(&self) -> Duration {
        self.window / self.checks.max(1)
    }
}

/// Leaves voice channels the bot has been left alone in.
pub struct IdleMonitor {
    registry: Arc<PlayerRegistry>,
    config: IdleConfig,
    waiting: DashSet<GuildId>,
    shutdown: CancellationToken,
}

impl IdleMonitor {
    pub fn new(registry: Arc<PlayerRegistry>, config: IdleConfig) -> Self {
        Self {
            registry,
            config,
            waiting: DashSet::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Whether the bot sits in a voice channel without any human.
    pub fn is_alone(&self, guild_id: GuildId) -> bool {
        let gateway = self.registry.gateway();
        let Some(channel_id) = gateway.bot_channel(guild_id) else {
            return false;
        };

        gateway
            .channel_members(guild_id, channel_id)
            .iter()
            .all(|member| member.bot)
    }

    /// Waits out the idle window and stops the guild's player if the bot
    /// stayed alone in the same channel the whole time.
    ///
    /// Returns whether the player was stopped.
    pub async fn check(&self, guild_id: GuildId) -> bool {
        if !self.is_alone(guild_id) {
            return false;
        }
        if !self.waiting.insert(guild_id) {
            debug!("Idle check already running for guild {}", guild_id);
            return false;
        }

        let alone = self.wait_alone(guild_id).await;
        self.waiting.remove(&guild_id);

        if alone {
            info!("💤 Alone in voice for {:?}, leaving guild {}", self.config.window, guild_id);
            self.registry.get_or_create(guild_id).stop().await;
        }
        alone
    }

    async fn wait_alone(&self, guild_id: GuildId) -> bool {
        let gateway = self.registry.gateway();
        let Some(channel_id) = gateway.bot_channel(guild_id) else {
            return false;
        };

        for _ in 0..self.config.checks {
            tokio::select! {
                _ = self.shutdown.cancelled() => return false,
                _ = tokio::time::sleep(self.config.tick()) => {}
            }

            if gateway.bot_channel(guild_id) != Some(channel_id) {
                debug!("Bot left or moved in guild {}, idle check aborted", guild_id);
                return false;
            }
            if !self.is_alone(guild_id) {
                debug!("Someone joined in guild {}, idle check aborted", guild_id);
                return false;
            }
        }
        true
    }

    /// Cancels every wait in progress.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
