//! Playback mirror and the host media-player contract.

/// Commands the engine sends to the host's media player.
///
/// The player answers asynchronously through the engine's
/// `on_time_update` / `on_metadata_loaded` notifications.
pub trait MediaPlayer {
    fn play(&mut self);

    fn pause(&mut self);

    /// Jump the play-head to `time` seconds.
    fn seek(&mut self, time: f64);
}

/// Engine-side copy of the player's position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackMirror {
    /// Playable resource (URL or path) of the loaded video.
    pub source: Option<String>,

    /// Seconds elapsed.
    pub current_time: f64,

    /// Total seconds; zero until metadata is loaded.
    pub duration: f64,

    pub is_playing: bool,
}

impl PlaybackMirror {
    pub fn has_video(&self) -> bool {
        self.source.is_some()
    }

    /// Whether the player has reported a usable duration.
    pub fn duration_known(&self) -> bool {
        self.duration > 0.0
    }

    /// Clamp a requested position into what the player can show.
    pub fn clamp_time(&self, time: f64) -> f64 {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        if self.duration_known() {
            time.min(self.duration)
        } else {
            time
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_without_duration_only_floors_at_zero() {
        let mirror = PlaybackMirror::default();
        assert_eq!(mirror.clamp_time(-3.0), 0.0);
        assert_eq!(mirror.clamp_time(500.0), 500.0);
        assert_eq!(mirror.clamp_time(f64::NAN), 0.0);
    }

    #[test]
    fn clamp_with_duration_caps_at_end() {
        let mirror = PlaybackMirror {
            duration: 90.0,
            ..Default::default()
        };
        assert_eq!(mirror.clamp_time(120.0), 90.0);
        assert_eq!(mirror.clamp_time(45.5), 45.5);
    }
}
