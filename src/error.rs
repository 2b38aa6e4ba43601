use thiserror::Error;

/// Failure while fetching a track into the audio cache.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request for {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("could not write cache file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failure in the voice transport (join, move, leave, stream start).
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("could not join voice channel: {0}")]
    Join(String),

    #[error("could not leave voice channel: {0}")]
    Leave(String),

    #[error("could not start stream: {0}")]
    Stream(String),

    #[error("stream control failed: {0}")]
    Control(String),

    #[error("not connected to a voice channel")]
    NotConnected,
}

/// Errors surfaced by player operations.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}
