use std::{
    path::Path,
    process::{Command, Stdio},
    time::Duration,
};

use songbird::input::{ChildContainer, Input};
use tracing::debug;

use crate::error::VoiceError;

/// ffmpeg invocation used to turn a cached file into a live stream.
#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg: String,
    filter: String,
}

impl Transcoder {
    pub fn new(ffmpeg: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            filter: filter.into(),
        }
    }

    /// Arguments seeking to `position` and applying the loudness filter.
    ///
    /// Output is 48kHz stereo WAV on stdout so songbird can probe it.
    pub fn args(&self, path: &Path, position: Duration) -> Vec<String> {
        vec![
            "-nostdin".into(),
            "-loglevel".into(),
            "error".into(),
            "-ss".into(),
            format!("{:.3}", position.as_secs_f64()),
            "-i".into(),
            path.display().to_string(),
            "-vn".into(),
            "-af".into(),
            self.filter.clone(),
            "-c:a".into(),
            "pcm_s16le".into(),
            "-f".into(),
            "wav".into(),
            "-ar".into(),
            "48000".into(),
            "-ac".into(),
            "2".into(),
            "pipe:1".into(),
        ]
    }

    /// Spawns ffmpeg and wraps its stdout as a songbird input.
    pub fn spawn(&self, path: &Path, position: Duration) -> Result<Input, VoiceError> {
        let args = self.args(path, position);
        debug!("🎛️ {} {}", self.ffmpeg, args.join(" "));

        let child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VoiceError::Stream(format!("could not spawn {}: {}", self.ffmpeg, e)))?;

        Ok(ChildContainer::from(child).into())
    }
}
