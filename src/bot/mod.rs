//! # Bot Module
//!
//! Serenity event handler tying Discord events to the audio players.
//!
//! - `ready`: hands the cache to the voice gateway and registers `/volume`
//! - `interaction_create`: dispatches slash commands
//! - `voice_state_update`: stops the guild's player when the bot is kicked
//!   from voice, and lets the idle monitor decide whether to leave

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready, UserId, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;

use crate::{
    audio::{IdleMonitor, PlayerRegistry},
    config::Config,
    voice::SongbirdGateway,
};

pub struct DotaAudioBot {
    config: Arc<Config>,
    registry: Arc<PlayerRegistry>,
    idle: Arc<IdleMonitor>,
    gateway: Arc<SongbirdGateway>,
}

impl DotaAudioBot {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<PlayerRegistry>,
        idle: Arc<IdleMonitor>,
        gateway: Arc<SongbirdGateway>,
    ) -> Self {
        Self {
            config,
            registry,
            idle,
            gateway,
        }
    }

    /// Registers slash commands in the configured guild, or globally.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ Bot is not a member of guild {}, commands not registered", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Commands registered for guild {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Commands registered globally");
            }
        }

        Ok(())
    }
}

/// Whether an update reports the bot itself leaving voice, whatever its previous state.
fn bot_left_voice(bot_id: UserId, new: &VoiceState) -> bool {
    left_voice(bot_id, new.user_id, new.channel_id)
}

fn left_voice(bot_id: UserId, user_id: UserId, channel_id: Option<ChannelId>) -> bool {
    user_id == bot_id && channel_id.is_none()
}

#[async_trait]
impl EventHandler for DotaAudioBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online in {} guild(s)", ready.user.name, ready.guilds.len());

        self.gateway.attach_cache(ctx.cache.clone());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Could not register commands: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let result = match command.data.name.as_str() {
            commands::VOLUME => commands::handle_volume(&ctx, &command, &self.registry).await,
            other => {
                warn!("Unknown command: {}", other);
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Error handling /{}: {:?}", command.data.name, e);
        }
    }

    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };

        let bot_id = ctx.cache.current_user().id;
        if bot_left_voice(bot_id, &new) {
            info!("🔌 Bot was disconnected from voice in guild {}", guild_id);
            if let Some(player) = self.registry.get(guild_id) {
                player.stop().await;
            }
            return;
        }

        let idle = self.idle.clone();
        tokio::spawn(async move {
            idle.check(guild_id).await;
        });
    }
}
