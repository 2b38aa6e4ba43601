use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::{
    cache::Cache,
    model::id::{ChannelId, GuildId, UserId},
};
use songbird::{
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::{
    transcode::Transcoder, StreamCompletion, StreamControl, StreamRequest, TrackOutcome,
    VoiceConnection, VoiceGateway, VoiceMember,
};
use crate::error::VoiceError;

/// [`VoiceGateway`] backed by songbird for transport and the serenity cache
/// for presence.
pub struct SongbirdGateway {
    manager: Arc<Songbird>,
    cache: OnceLock<Arc<Cache>>,
    transcoder: Transcoder,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>, transcoder: Transcoder) -> Self {
        Self {
            manager,
            cache: OnceLock::new(),
            transcoder,
        }
    }

    /// Presence queries answer "nobody" until the cache is attached on ready.
    pub fn attach_cache(&self, cache: Arc<Cache>) {
        if self.cache.set(cache).is_err() {
            debug!("Serenity cache already attached");
        }
    }

    fn voice_channel_of(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        let cache = self.cache.get()?;
        let guild = cache.guild(guild_id)?;
        guild
            .voice_states
            .get(&user_id)
            .and_then(|voice_state| voice_state.channel_id)
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, VoiceError> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| VoiceError::Join(format!("{:?}", e)))?;

        info!("🔊 Connected to voice channel {} in guild {}", channel_id, guild_id);

        Ok(Arc::new(SongbirdConnection {
            manager: self.manager.clone(),
            guild_id,
            call,
            transcoder: self.transcoder.clone(),
        }))
    }

    fn bot_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let bot_id = self.cache.get()?.current_user().id;
        self.voice_channel_of(guild_id, bot_id)
    }

    fn user_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        self.voice_channel_of(guild_id, user_id)
    }

    fn channel_members(&self, guild_id: GuildId, channel_id: ChannelId) -> Vec<VoiceMember> {
        let Some(cache) = self.cache.get() else {
            return Vec::new();
        };
        let Some(guild) = cache.guild(guild_id) else {
            return Vec::new();
        };

        guild
            .voice_states
            .values()
            .filter(|voice_state| voice_state.channel_id == Some(channel_id))
            .map(|voice_state| {
                let bot = guild
                    .members
                    .get(&voice_state.user_id)
                    .or(voice_state.member.as_ref())
                    .map(|member| member.user.bot)
                    .unwrap_or(false);

                VoiceMember {
                    user_id: voice_state.user_id,
                    bot,
                }
            })
            .collect()
    }
}

struct SongbirdConnection {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    call: Arc<tokio::sync::Mutex<Call>>,
    transcoder: Transcoder,
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn channel(&self) -> Option<ChannelId> {
        let call = self.call.lock().await;
        call.current_channel().map(|channel| ChannelId::from(channel.0))
    }

    async fn move_to(&self, channel_id: ChannelId) -> Result<(), VoiceError> {
        self.manager
            .join(self.guild_id, channel_id)
            .await
            .map_err(|e| VoiceError::Join(format!("{:?}", e)))?;

        info!("🔀 Moved to voice channel {} in guild {}", channel_id, self.guild_id);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        self.manager
            .remove(self.guild_id)
            .await
            .map_err(|e| VoiceError::Leave(format!("{:?}", e)))?;

        info!("👋 Disconnected from voice in guild {}", self.guild_id);
        Ok(())
    }

    async fn play(
        &self,
        request: StreamRequest,
        completion: StreamCompletion,
    ) -> Result<Box<dyn StreamControl>, VoiceError> {
        let input = self.transcoder.spawn(&request.path, request.position)?;

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        if let Err(e) = handle.set_volume(request.gain) {
            warn!("Could not set initial volume: {}", e);
        }

        let notifier = CompletionNotifier {
            guild_id: self.guild_id,
            slot: Arc::new(Mutex::new(Some(completion))),
        };

        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(Event::Track(event), notifier.clone())
                .map_err(|e| VoiceError::Stream(format!("could not register track event: {}", e)))?;
        }

        Ok(Box::new(SongbirdStream(handle)))
    }
}

/// Forwards the first End or Error event of a track to its completion.
#[derive(Clone)]
struct CompletionNotifier {
    guild_id: GuildId,
    slot: Arc<Mutex<Option<StreamCompletion>>>,
}

#[async_trait]
impl VoiceEventHandler for CompletionNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let outcome = match ctx {
            EventContext::Track(tracks) => tracks
                .iter()
                .map(|(state, _handle)| outcome_of(&state.playing))
                .find(|outcome| *outcome != TrackOutcome::Ended)
                .unwrap_or(TrackOutcome::Ended),
            _ => TrackOutcome::Ended,
        };

        let completion = self.slot.lock().take();
        if let Some(completion) = completion {
            debug!("🎵 Stream finished in guild {}: {:?}", self.guild_id, outcome);
            completion.finish(outcome);
        }

        None
    }
}

/// Errored tracks failed; anything else that ends a track counts as ended.
fn outcome_of(mode: &PlayMode) -> TrackOutcome {
    match mode {
        PlayMode::Errored(e) => TrackOutcome::Failed(format!("{:?}", e)),
        _ => TrackOutcome::Ended,
    }
}

struct SongbirdStream(TrackHandle);

impl StreamControl for SongbirdStream {
    fn pause(&self) -> Result<(), VoiceError> {
        self.0.pause().map_err(|e| VoiceError::Control(e.to_string()))
    }

    fn resume(&self) -> Result<(), VoiceError> {
        self.0.play().map_err(|e| VoiceError::Control(e.to_string()))
    }

    fn set_gain(&self, gain: f32) -> Result<(), VoiceError> {
        self.0
            .set_volume(gain)
            .map_err(|e| VoiceError::Control(e.to_string()))
    }

    fn stop(&self) -> Result<(), VoiceError> {
        self.0.stop().map_err(|e| VoiceError::Control(e.to_string()))
    }
}
