//! In-memory voice transport and fetcher used by the unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::watch;

use crate::{
    cache::Fetcher,
    error::{FetchError, VoiceError},
    voice::{
        StreamCompletion, StreamControl, StreamRequest, TrackOutcome, VoiceConnection,
        VoiceGateway, VoiceMember,
    },
};

/// Polls `condition` until it holds, panicking after about a second.
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

pub fn human(id: u64) -> VoiceMember {
    VoiceMember {
        user_id: UserId::new(id),
        bot: false,
    }
}

pub fn bot(id: u64) -> VoiceMember {
    VoiceMember {
        user_id: UserId::new(id),
        bot: true,
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl FakeFetcher {
    pub fn fail_for(&self, url: &str) {
        self.failing.lock().insert(url.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(Bytes::from(format!("audio from {url}")))
    }
}

/// Gateway with a single shared connection. The bot's channel is whatever
/// that connection is joined to.
#[derive(Default)]
pub struct FakeGateway {
    connection: Arc<FakeConnection>,
    connects: AtomicUsize,
    fail_connects: AtomicBool,
    users: Mutex<HashMap<UserId, ChannelId>>,
    members: Mutex<HashMap<ChannelId, Vec<VoiceMember>>>,
}

impl FakeGateway {
    pub fn connection(&self) -> Arc<FakeConnection> {
        self.connection.clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn fail_connects(&self) {
        self.fail_connects.store(true, Ordering::SeqCst);
    }

    pub fn set_user_channel(&self, user_id: UserId, channel_id: ChannelId) {
        self.users.lock().insert(user_id, channel_id);
    }

    pub fn set_members(&self, channel_id: ChannelId, members: Vec<VoiceMember>) {
        self.members.lock().insert(channel_id, members);
    }

    /// Moves or drops the bot behind the player's back.
    pub fn set_bot_channel(&self, channel_id: Option<ChannelId>) {
        *self.connection.channel.lock() = channel_id;
    }
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    async fn connect(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, VoiceError> {
        if self.fail_connects.load(Ordering::SeqCst) {
            return Err(VoiceError::Join("scripted failure".into()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.connection.channel.lock() = Some(channel_id);
        Ok(self.connection.clone())
    }

    fn bot_channel(&self, _guild_id: GuildId) -> Option<ChannelId> {
        self.connection.current_channel()
    }

    fn user_channel(&self, _guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        self.users.lock().get(&user_id).copied()
    }

    fn channel_members(&self, _guild_id: GuildId, channel_id: ChannelId) -> Vec<VoiceMember> {
        self.members
            .lock()
            .get(&channel_id)
            .cloned()
            .unwrap_or_default()
    }
}

pub struct FakeConnection {
    channel: Mutex<Option<ChannelId>>,
    moves: AtomicUsize,
    disconnects: AtomicUsize,
    fail_play: AtomicBool,
    streams: Mutex<Vec<Arc<FakeStream>>>,
    active: Arc<AtomicUsize>,
    max_active: AtomicUsize,
    started: watch::Sender<usize>,
}

impl Default for FakeConnection {
    fn default() -> Self {
        Self {
            channel: Mutex::new(None),
            moves: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            fail_play: AtomicBool::new(false),
            streams: Mutex::new(Vec::new()),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: AtomicUsize::new(0),
            started: watch::channel(0).0,
        }
    }
}

impl FakeConnection {
    pub fn current_channel(&self) -> Option<ChannelId> {
        *self.channel.lock()
    }

    pub fn moves(&self) -> usize {
        self.moves.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn fail_plays(&self) {
        self.fail_play.store(true, Ordering::SeqCst);
    }

    pub fn started(&self) -> usize {
        *self.started.borrow()
    }

    /// Highest number of streams that were ever live at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn stream(&self, index: usize) -> Arc<FakeStream> {
        self.streams.lock()[index].clone()
    }

    pub fn request(&self, index: usize) -> StreamRequest {
        self.stream(index).request.clone()
    }

    /// Reports the `index`th stream as finished, like the transport would.
    pub fn finish(&self, index: usize, outcome: TrackOutcome) {
        self.stream(index).complete(outcome);
    }

    pub async fn wait_for_started(&self, count: usize) {
        let mut started = self.started.subscribe();
        tokio::time::timeout(Duration::from_secs(2), started.wait_for(|n| *n >= count))
            .await
            .expect("stream was not started in time")
            .expect("stream counter closed");
    }
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    async fn channel(&self) -> Option<ChannelId> {
        self.current_channel()
    }

    async fn move_to(&self, channel_id: ChannelId) -> Result<(), VoiceError> {
        self.moves.fetch_add(1, Ordering::SeqCst);
        *self.channel.lock() = Some(channel_id);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        *self.channel.lock() = None;
        Ok(())
    }

    async fn play(
        &self,
        request: StreamRequest,
        completion: StreamCompletion,
    ) -> Result<Box<dyn StreamControl>, VoiceError> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(VoiceError::Stream("scripted failure".into()));
        }

        let stream = Arc::new(FakeStream {
            gain: Mutex::new(request.gain),
            request,
            completion: Mutex::new(Some(completion)),
            paused: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            active: self.active.clone(),
        });

        let live = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(live, Ordering::SeqCst);
        self.streams.lock().push(stream.clone());
        self.started.send_modify(|n| *n += 1);

        Ok(Box::new(FakeStreamHandle(stream)))
    }
}

pub struct FakeStream {
    pub request: StreamRequest,
    completion: Mutex<Option<StreamCompletion>>,
    paused: AtomicBool,
    stopped: AtomicBool,
    gain: Mutex<f32>,
    active: Arc<AtomicUsize>,
}

impl FakeStream {
    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn gain(&self) -> f32 {
        *self.gain.lock()
    }

    fn complete(&self, outcome: TrackOutcome) {
        let completion = self.completion.lock().take();
        if let Some(completion) = completion {
            self.active.fetch_sub(1, Ordering::SeqCst);
            completion.finish(outcome);
        }
    }
}

struct FakeStreamHandle(Arc<FakeStream>);

impl StreamControl for FakeStreamHandle {
    fn pause(&self) -> Result<(), VoiceError> {
        self.0.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> Result<(), VoiceError> {
        self.0.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_gain(&self, gain: f32) -> Result<(), VoiceError> {
        *self.0.gain.lock() = gain;
        Ok(())
    }

    /// Stopping ends the stream, which reports back just like songbird does.
    fn stop(&self) -> Result<(), VoiceError> {
        self.0.stopped.store(true, Ordering::SeqCst);
        self.0.complete(TrackOutcome::Ended);
        Ok(())
    }
}
