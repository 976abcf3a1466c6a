//! Video metadata pushed in by the player once a file is opened.

use serde::{Deserialize, Serialize};

use crate::error::VideoContextError;

/// Duration/fps of the loaded video. Replaced wholesale on reload, never patched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoContext {
    duration: f64,
    fps: f64,
}

impl VideoContext {
    pub fn new(duration: f64, fps: f64) -> Result<Self, VideoContextError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(VideoContextError::Duration(duration));
        }
        if !fps.is_finite() || fps <= 0.0 {
            return Err(VideoContextError::Fps(fps));
        }
        Ok(Self { duration, fps })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Frame index for a time, truncated toward zero.
    pub fn frame_at(&self, time: f64) -> i64 {
        time_to_frame(time, self.fps)
    }
}

pub fn time_to_frame(time: f64, fps: f64) -> i64 {
    (time * fps) as i64
}
