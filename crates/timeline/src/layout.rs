//! Timecode and timeline-bar geometry for hosts that draw the timeline.

use crate::segment::Segment;

/// Horizontal placement of a segment on the timeline bar, in percent of the
/// bar width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSpan {
    pub left_percent: f64,
    pub width_percent: f64,
}

/// Format seconds as `HH:MM:SS`, truncating fractions.
pub fn format_timecode(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.trunc() as u64
    } else {
        0
    };
    let hours = (total / 3600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Play-head position in percent of the bar.
pub fn playhead_percent(current_time: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        current_time / duration * 100.0
    } else {
        0.0
    }
}

/// Where a segment sits on the bar. Inverted segments get zero width.
pub fn segment_span(segment: &Segment, duration: f64) -> SegmentSpan {
    if duration <= 0.0 {
        return SegmentSpan {
            left_percent: 0.0,
            width_percent: 0.0,
        };
    }
    let left = segment.start / duration * 100.0;
    let right = segment.end / duration * 100.0;
    SegmentSpan {
        left_percent: left,
        width_percent: (right - left).max(0.0),
    }
}

/// Convert a click position (fraction of bar width) into a seek time.
pub fn time_at_fraction(fraction: f64, duration: f64) -> f64 {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    fraction * duration.max(0.0)
}
