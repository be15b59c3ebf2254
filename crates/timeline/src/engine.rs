//! The segment timeline engine.
//!
//! Editing follows a two-button point-in / point-out convention: mark-in
//! appends a provisional segment at the play-head, mark-out closes the most
//! recently appended one. Segments are kept in insertion order, never
//! sorted, and may overlap.

use incruste_common::config::TimelineDefaults;

use crate::performer::Performer;
use crate::playback::{MediaPlayer, PlaybackMirror};
use crate::segment::Segment;
use crate::snapshot::{self, SnapshotError};

/// Default provisional length of a freshly marked segment (seconds).
pub const DEFAULT_PROVISIONAL_LENGTH_SECS: f64 = 5.0;

/// Result of an active-state query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveState {
    /// True iff at least one segment contains the queried time.
    pub active: bool,

    /// Insertion-order indices of the matching segments.
    pub matched: Vec<usize>,
}

/// Owns the segment collection and the playback mirror for a session.
#[derive(Debug, Clone)]
pub struct SegmentTimeline {
    segments: Vec<Segment>,
    open_segment: Option<usize>,
    playback: PlaybackMirror,
    provisional_length_secs: f64,
}

impl SegmentTimeline {
    pub fn new() -> Self {
        Self::with_provisional_length(DEFAULT_PROVISIONAL_LENGTH_SECS)
    }

    pub fn with_provisional_length(secs: f64) -> Self {
        Self {
            segments: Vec::new(),
            open_segment: None,
            playback: PlaybackMirror::default(),
            provisional_length_secs: if secs.is_finite() { secs.max(0.0) } else { 0.0 },
        }
    }

    pub fn from_defaults(defaults: &TimelineDefaults) -> Self {
        Self::with_provisional_length(defaults.provisional_length_secs)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn playback(&self) -> &PlaybackMirror {
        &self.playback
    }

    pub fn current_time(&self) -> f64 {
        self.playback.current_time
    }

    pub fn has_video(&self) -> bool {
        self.playback.has_video()
    }

    /// Index of the segment opened by the last mark-in and not yet closed.
    pub fn open_segment(&self) -> Option<usize> {
        self.open_segment
    }

    /// Number of recorded takes.
    pub fn take_count(&self) -> usize {
        self.segments.len()
    }

    // Editing

    /// Append a provisional segment `[at_time, at_time + length]` for
    /// `performer`. Returns its index, or `None` for a non-finite time.
    pub fn mark_in(&mut self, at_time: f64, performer: &Performer) -> Option<usize> {
        if !at_time.is_finite() {
            tracing::warn!(at_time, "Ignoring mark in at unusable time");
            return None;
        }
        let start = at_time.max(0.0);
        let segment =
            Segment::for_performer(performer, start, start + self.provisional_length_secs);
        self.segments.push(segment);
        let index = self.segments.len() - 1;
        self.open_segment = Some(index);
        tracing::debug!(index, start, performer = %performer.id, "Mark in");
        Some(index)
    }

    /// Overwrite the `end` of the last segment with `at_time`.
    ///
    /// Targets the last element by insertion order, not the segment under the
    /// play-head. Returns the edited index, or `None` when there is nothing
    /// to close or `at_time` is not finite.
    pub fn mark_out(&mut self, at_time: f64) -> Option<usize> {
        if !at_time.is_finite() {
            tracing::warn!(at_time, "Ignoring mark out at unusable time");
            return None;
        }
        let Some(index) = self.segments.len().checked_sub(1) else {
            tracing::debug!(at_time, "Mark out ignored: no segment to close");
            return None;
        };
        let segment = &mut self.segments[index];
        segment.end = at_time;
        if segment.is_inverted() {
            tracing::warn!(
                index,
                start = segment.start,
                end = segment.end,
                "Mark out placed before the in-point; segment is inverted"
            );
        }
        self.open_segment = None;
        tracing::debug!(index, end = at_time, "Mark out");
        Some(index)
    }

    /// Mark in at the mirrored play-head position.
    pub fn mark_in_now(&mut self, performer: &Performer) -> Option<usize> {
        self.mark_in(self.playback.current_time, performer)
    }

    /// Mark out at the mirrored play-head position.
    pub fn mark_out_now(&mut self) -> Option<usize> {
        self.mark_out(self.playback.current_time)
    }

    /// Remove the segment at `index`. Out of range is a no-op.
    pub fn delete_segment(&mut self, index: usize) -> Option<Segment> {
        if index >= self.segments.len() {
            tracing::debug!(index, len = self.segments.len(), "Delete ignored: out of range");
            return None;
        }
        let removed = self.segments.remove(index);
        self.open_segment = match self.open_segment {
            Some(open) if open == index => None,
            Some(open) if open > index => Some(open - 1),
            other => other,
        };
        tracing::debug!(index, "Segment deleted");
        Some(removed)
    }

    /// Drop every segment.
    pub fn reset_all(&mut self) {
        self.segments.clear();
        self.open_segment = None;
        tracing::debug!("Segments reset");
    }

    // Queries

    /// Which segments contain `t` (boundaries inclusive).
    pub fn compute_active(&self, t: f64) -> ActiveState {
        let matched: Vec<usize> = self
            .segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.contains(t))
            .map(|(i, _)| i)
            .collect();
        ActiveState {
            active: !matched.is_empty(),
            matched,
        }
    }

    /// Active state at the mirrored play-head.
    pub fn active_now(&self) -> ActiveState {
        self.compute_active(self.playback.current_time)
    }

    /// Report inverted intervals and same-performer overlaps.
    ///
    /// Nothing is rejected; hosts decide what to do with the list.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = vec![];

        for (i, s) in self.segments.iter().enumerate() {
            if s.is_inverted() {
                issues.push(format!(
                    "Segment #{} ({}) is inverted: {:.2}s > {:.2}s",
                    i + 1,
                    s.label,
                    s.start,
                    s.end
                ));
            }
        }

        for (i, a) in self.segments.iter().enumerate() {
            for (j, b) in self.segments.iter().enumerate().skip(i + 1) {
                if a.id == b.id && a.overlaps(b) {
                    issues.push(format!(
                        "Segments #{} and #{} overlap for performer {}",
                        i + 1,
                        j + 1,
                        a.id
                    ));
                }
            }
        }

        issues
    }

    // Player mirror

    /// A new video was supplied: forget all segments and positions.
    pub fn load_video(&mut self, source: impl Into<String>) {
        let source = source.into();
        tracing::info!(%source, "Video loaded; timeline reset");
        self.segments.clear();
        self.open_segment = None;
        self.playback = PlaybackMirror {
            source: Some(source),
            ..PlaybackMirror::default()
        };
    }

    /// Return to the "no video" state.
    pub fn unload_video(&mut self) {
        self.segments.clear();
        self.open_segment = None;
        self.playback = PlaybackMirror::default();
    }

    /// Player time-update notification.
    pub fn on_time_update(&mut self, current_time: f64) {
        if !current_time.is_finite() || current_time < 0.0 {
            tracing::warn!(current_time, "Ignoring unusable time update");
            return;
        }
        self.playback.current_time = current_time;
    }

    /// Player metadata-loaded notification.
    pub fn on_metadata_loaded(&mut self, duration: f64) {
        if !duration.is_finite() || duration < 0.0 {
            tracing::warn!(duration, "Ignoring unusable media duration");
            return;
        }
        self.playback.duration = duration;
    }

    /// Move the play-head and tell the player. Returns the applied time.
    ///
    /// Without a loaded video nothing moves and the current time is returned.
    pub fn seek(&mut self, time: f64, player: &mut dyn MediaPlayer) -> f64 {
        if !self.has_video() {
            tracing::debug!(time, "Seek ignored: no video loaded");
            return self.playback.current_time;
        }
        let clamped = self.playback.clamp_time(time);
        player.seek(clamped);
        self.playback.current_time = clamped;
        clamped
    }

    /// Toggle between play and pause. Returns the new playing state.
    pub fn toggle_play(&mut self, player: &mut dyn MediaPlayer) -> bool {
        if !self.has_video() {
            return false;
        }
        if self.playback.is_playing {
            player.pause();
        } else {
            player.play();
        }
        self.playback.is_playing = !self.playback.is_playing;
        self.playback.is_playing
    }

    // Snapshots

    /// Serialize the collection in insertion order.
    pub fn export_snapshot(&self) -> Result<String, SnapshotError> {
        snapshot::export_segments(&self.segments)
    }

    /// Replace the collection with a previously exported document.
    pub fn import_snapshot(&mut self, json: &str) -> Result<usize, SnapshotError> {
        let segments = snapshot::import_segments(json)?;
        self.segments = segments;
        self.open_segment = None;
        Ok(self.segments.len())
    }
}

impl Default for SegmentTimeline {
    fn default() -> Self {
        Self::new()
    }
}
