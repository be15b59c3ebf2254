//! Show the segments stored in an export.

use std::path::PathBuf;

use anyhow::Context;
use incruste_timeline::layout::{format_timecode, segment_span};
use incruste_timeline::SegmentTimeline;

pub fn run(path: PathBuf, duration: Option<f64>) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut timeline = SegmentTimeline::new();
    timeline
        .import_snapshot(&json)
        .context("Failed to load segments")?;

    println!("Export: {}", path.display());
    println!("  Takes: {}", timeline.take_count());
    println!();

    println!("Segments:");
    if timeline.segments().is_empty() {
        println!("  (none)");
    }
    for (i, seg) in timeline.segments().iter().enumerate() {
        print!(
            "  #{i:<3} {} -> {}  {:<20} {} ({:.2}s)",
            format_timecode(seg.start),
            format_timecode(seg.end),
            seg.label,
            seg.color,
            seg.duration()
        );
        if let Some(total) = duration {
            let span = segment_span(seg, total);
            print!(
                "  [bar {:.1}% + {:.1}%]",
                span.left_percent, span.width_percent
            );
        }
        println!();
    }

    let issues = timeline.validate();
    if !issues.is_empty() {
        println!();
        println!("Issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
    }

    Ok(())
}
