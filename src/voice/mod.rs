//! # Voice Module
//!
//! The voice transport as seen by the players.
//!
//! The player never touches songbird directly; it talks to three traits:
//!
//! - [`VoiceGateway`]: joins channels and answers presence questions
//!   (where is the bot, where is a user, who is in a channel).
//! - [`VoiceConnection`]: one joined guild; moves, leaves and starts streams.
//! - [`StreamControl`]: the live stream (pause, resume, gain, stop).
//!
//! [`call`] implements them on top of songbird and ffmpeg. Tests use
//! in-memory fakes.

pub mod call;
pub mod transcode;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{fmt, path::PathBuf, sync::Arc, time::Duration};

use crate::error::VoiceError;

pub use call::SongbirdGateway;

/// How a stream finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Played to the end or stopped.
    Ended,
    /// Decode, transcode or transport error.
    Failed(String),
}

/// What to stream: a cached file, where to start, and how loud.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub path: PathBuf,
    pub position: Duration,
    pub gain: f32,
}

/// One-shot notifier handed to the transport with every stream.
///
/// Consuming `finish` guarantees the owner hears about a stream at most once.
pub struct StreamCompletion {
    notify: Box<dyn FnOnce(TrackOutcome) + Send>,
}

impl StreamCompletion {
    pub fn new(notify: impl FnOnce(TrackOutcome) + Send + 'static) -> Self {
        Self {
            notify: Box::new(notify),
        }
    }

    pub fn finish(self, outcome: TrackOutcome) {
        (self.notify)(outcome);
    }
}

impl fmt::Debug for StreamCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCompletion").finish_non_exhaustive()
    }
}

/// A member currently sitting in a voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceMember {
    pub user_id: UserId,
    pub bot: bool,
}

#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Joins `channel`, returning the guild's connection.
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, VoiceError>;

    /// Channel the bot currently sits in, as reported by the gateway.
    fn bot_channel(&self, guild_id: GuildId) -> Option<ChannelId>;

    fn user_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId>;

    fn channel_members(&self, guild_id: GuildId, channel_id: ChannelId) -> Vec<VoiceMember>;
}

#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Channel the connection is in right now, following moves made by others.
    async fn channel(&self) -> Option<ChannelId>;

    async fn move_to(&self, channel_id: ChannelId) -> Result<(), VoiceError>;

    /// Leaves the channel, dropping anything still playing.
    async fn disconnect(&self) -> Result<(), VoiceError>;

    /// Starts a stream. `completion` fires once when it ends or errors.
    async fn play(
        &self,
        request: StreamRequest,
        completion: StreamCompletion,
    ) -> Result<Box<dyn StreamControl>, VoiceError>;
}

pub trait StreamControl: Send + Sync {
    fn pause(&self) -> Result<(), VoiceError>;

    fn resume(&self) -> Result<(), VoiceError>;

    fn set_gain(&self, gain: f32) -> Result<(), VoiceError>;

    fn stop(&self) -> Result<(), VoiceError>;
}
