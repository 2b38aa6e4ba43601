use serde::Serialize;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::{
    queue::{Queue, QueueInfo, RepeatMode},
    track::Track,
    volume::Volume,
};
use crate::{
    cache::TrackCache,
    error::{PlayerError, VoiceError},
    voice::{StreamCompletion, StreamControl, StreamRequest, TrackOutcome, VoiceConnection, VoiceGateway},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerStatus {
    Stopped,
    Playing,
    Paused,
}

/// Events consumed by a player's coordinator task.
#[derive(Debug)]
pub enum PlayerEvent {
    /// The stream started as `generation` finished.
    TrackCompleted {
        generation: u64,
        outcome: TrackOutcome,
    },
}

struct PlayerState {
    queue: Queue,
    connection: Option<Arc<dyn VoiceConnection>>,
    stream: Option<Box<dyn StreamControl>>,
    /// Channel the current cascade plays into.
    channel: Option<ChannelId>,
    volume: Volume,
    status: PlayerStatus,
    /// Bumped for every stream started or torn down; completions carrying an
    /// older value belong to a stream the player already let go of.
    generation: u64,
}

impl PlayerState {
    fn halt_stream(&mut self) {
        self.generation += 1;
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                warn!("Could not stop stream: {}", e);
            }
        }
    }
}

/// Audio player of one guild.
///
/// Every operation locks the player's state, so queue edits, status changes
/// and stream starts of one guild never interleave. Finished streams are
/// reported as [`PlayerEvent`]s to a coordinator task that advances the queue
/// and starts the next track.
pub struct Player {
    guild_id: GuildId,
    gateway: Arc<dyn VoiceGateway>,
    cache: Arc<TrackCache>,
    state: Mutex<PlayerState>,
    events: mpsc::UnboundedSender<PlayerEvent>,
}

impl Player {
    /// Creates the player and spawns its coordinator. Needs a tokio runtime.
    pub fn new(
        guild_id: GuildId,
        gateway: Arc<dyn VoiceGateway>,
        cache: Arc<TrackCache>,
        volume: Volume,
    ) -> Arc<Self> {
        let (events, receiver) = mpsc::unbounded_channel();

        let player = Arc::new(Self {
            guild_id,
            gateway,
            cache,
            state: Mutex::new(PlayerState {
                queue: Queue::new(),
                connection: None,
                stream: None,
                channel: None,
                volume,
                status: PlayerStatus::Stopped,
                generation: 0,
            }),
            events,
        });

        tokio::spawn(coordinate(Arc::downgrade(&player), receiver));
        debug!("🎚️ Player created for guild {}", guild_id);
        player
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Joins `channel_id`, or moves there if connected elsewhere.
    pub async fn connect(&self, channel_id: ChannelId) -> Result<(), PlayerError> {
        let mut state = self.state.lock().await;
        self.connect_locked(&mut state, channel_id).await
    }

    /// Starts or resumes playback of the current track in `channel_id`.
    ///
    /// A no-op while already playing. With nothing left in the queue the
    /// player simply ends up `Stopped`.
    pub async fn play(&self, channel_id: ChannelId) -> Result<(), PlayerError> {
        let mut state = self.state.lock().await;
        self.connect_locked(&mut state, channel_id).await?;
        state.channel = Some(channel_id);

        match state.status {
            PlayerStatus::Playing => {
                debug!("Already playing in guild {}", self.guild_id);
                Ok(())
            }
            PlayerStatus::Paused => {
                if let Some(stream) = &state.stream {
                    stream.resume()?;
                }
                state.status = PlayerStatus::Playing;
                info!("▶️ Playback resumed in guild {}", self.guild_id);
                Ok(())
            }
            PlayerStatus::Stopped => self.start_current(&mut state).await,
        }
    }

    /// Pauses the live stream. Returns whether anything was paused.
    pub async fn pause(&self) -> Result<bool, PlayerError> {
        let mut state = self.state.lock().await;
        if state.status != PlayerStatus::Playing {
            return Ok(false);
        }

        if let Some(stream) = &state.stream {
            stream.pause()?;
        }
        state.status = PlayerStatus::Paused;
        info!("⏸️ Playback paused in guild {}", self.guild_id);
        Ok(true)
    }

    /// Resumes a paused stream. Returns whether anything was resumed.
    pub async fn resume(&self) -> Result<bool, PlayerError> {
        let mut state = self.state.lock().await;
        if state.status != PlayerStatus::Paused {
            return Ok(false);
        }

        if let Some(stream) = &state.stream {
            stream.resume()?;
        }
        state.status = PlayerStatus::Playing;
        info!("▶️ Playback resumed in guild {}", self.guild_id);
        Ok(true)
    }

    /// Drops the current track, even under `RepeatMode::One`, and plays the next.
    pub async fn skip(&self, channel_id: ChannelId) -> Result<(), PlayerError> {
        let mut state = self.state.lock().await;
        self.connect_locked(&mut state, channel_id).await?;
        state.channel = Some(channel_id);

        state.halt_stream();
        state.status = PlayerStatus::Stopped;
        state.queue.skip();
        info!("⏭️ Track skipped in guild {}", self.guild_id);

        self.start_current(&mut state).await
    }

    /// Clamps to `0..=100`, applies the gain to the live stream and returns
    /// the value actually set.
    pub async fn set_volume(&self, volume: i64) -> Volume {
        let mut state = self.state.lock().await;
        state.volume = Volume::clamped(volume);

        if let Some(stream) = &state.stream {
            if let Err(e) = stream.set_gain(state.volume.gain()) {
                warn!("Could not change live volume: {}", e);
            }
        }

        info!("🔊 Volume set to {} in guild {}", state.volume, self.guild_id);
        state.volume
    }

    /// Clears the queue, ends the stream and leaves the voice channel.
    ///
    /// Returns the tracks that had not finished playing.
    pub async fn stop(&self) -> Vec<Track> {
        let mut state = self.state.lock().await;
        let pending = state.queue.clear();
        state.halt_stream();

        if let Some(connection) = state.connection.take() {
            if let Err(e) = connection.disconnect().await {
                warn!("Could not leave voice in guild {}: {}", self.guild_id, e);
            }
        }

        state.channel = None;
        state.status = PlayerStatus::Stopped;
        info!("⏹️ Playback stopped in guild {}", self.guild_id);
        pending
    }

    pub async fn add(&self, tracks: impl IntoIterator<Item = Track>, play_next: bool) {
        self.state.lock().await.queue.add(tracks, play_next);
    }

    pub async fn shuffle(&self) {
        self.state.lock().await.queue.shuffle();
    }

    pub async fn set_repeat(&self, mode: RepeatMode) {
        self.state.lock().await.queue.set_repeat(mode);
    }

    pub async fn status(&self) -> PlayerStatus {
        self.state.lock().await.status
    }

    pub async fn volume(&self) -> Volume {
        self.state.lock().await.volume
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.state.lock().await.queue.current_track().cloned()
    }

    pub async fn queue_info(&self) -> QueueInfo {
        self.state.lock().await.queue.info()
    }

    async fn connect_locked(
        &self,
        state: &mut PlayerState,
        channel_id: ChannelId,
    ) -> Result<(), PlayerError> {
        match &state.connection {
            Some(connection) => {
                if connection.channel().await != Some(channel_id) {
                    connection.move_to(channel_id).await?;
                }
                Ok(())
            }
            None => {
                let connection = self.gateway.connect(self.guild_id, channel_id).await?;
                state.connection = Some(connection);
                Ok(())
            }
        }
    }

    /// Starts the track under the cursor, or settles on `Stopped` if there is none.
    async fn start_current(&self, state: &mut PlayerState) -> Result<(), PlayerError> {
        let Some(track) = state.queue.current_track().cloned() else {
            state.status = PlayerStatus::Stopped;
            info!("📭 Queue finished in guild {}", self.guild_id);
            return Ok(());
        };

        state.status = PlayerStatus::Playing;
        let started = self.start_stream(state, &track).await;
        if started.is_err() {
            state.status = PlayerStatus::Stopped;
        }
        started
    }

    async fn start_stream(&self, state: &mut PlayerState, track: &Track) -> Result<(), PlayerError> {
        let path = self.cache.download(track).await?;
        let connection = state.connection.clone().ok_or(VoiceError::NotConnected)?;

        state.generation += 1;
        let generation = state.generation;
        let events = self.events.clone();
        let completion = StreamCompletion::new(move |outcome| {
            // The coordinator is gone once the player is dropped.
            let _ = events.send(PlayerEvent::TrackCompleted { generation, outcome });
        });

        let request = StreamRequest {
            path,
            position: track.position(),
            gain: state.volume.gain(),
        };
        let stream = connection.play(request, completion).await?;
        state.stream = Some(stream);

        info!("🎵 Playing {} in guild {}", track.name(), self.guild_id);
        Ok(())
    }

    async fn handle_event(&self, event: PlayerEvent) {
        let PlayerEvent::TrackCompleted { generation, outcome } = event;
        let mut state = self.state.lock().await;

        if generation != state.generation {
            debug!(
                "Ignoring completion of stale stream {} in guild {} (current {})",
                generation, self.guild_id, state.generation
            );
            return;
        }

        state.stream = None;
        state.status = PlayerStatus::Stopped;

        match outcome {
            TrackOutcome::Ended => state.queue.advance(),
            TrackOutcome::Failed(reason) => {
                let name = state.queue.current_track().map(|t| t.name().to_string());
                warn!(
                    "❌ Track {} failed in guild {}: {}",
                    name.as_deref().unwrap_or("?"),
                    self.guild_id,
                    reason
                );
                state.queue.skip();
            }
        }

        let Some(channel_id) = state.channel else {
            return;
        };

        if let Err(e) = self.connect_locked(&mut state, channel_id).await {
            error!("Could not rejoin voice in guild {}: {}", self.guild_id, e);
            return;
        }

        let mut failures = 0;
        while let Err(e) = self.start_current(&mut state).await {
            failures += 1;
            let name = state.queue.current_track().map(|t| t.name().to_string());
            warn!(
                "⏭️ Skipping {} in guild {}: {}",
                name.as_deref().unwrap_or("?"),
                self.guild_id,
                e
            );

            if failures >= state.queue.len() {
                error!("Every queued track failed in guild {}, stopping", self.guild_id);
                break;
            }
            state.queue.skip();
        }
    }
}

/// Drains a player's events until the player is dropped.
async fn coordinate(player: Weak<Player>, mut events: mpsc::UnboundedReceiver<PlayerEvent>) {
    while let Some(event) = events.recv().await {
        let Some(player) = player.upgrade() else {
            break;
        };
        player.handle_event(event).await;
    }
}
