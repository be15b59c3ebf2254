//! Simulated playback of an export driving the live compositor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use incruste_common::config::AppConfig;
use incruste_compositor::capture::SyntheticCamera;
use incruste_compositor::composite::coverage;
use incruste_compositor::segmentation::BackgroundDifferenceFactory;
use incruste_compositor::{CaptureConstraints, CompositorOptions, LiveCompositor, OverlayLabel};
use incruste_timeline::layout::format_timecode;
use incruste_timeline::{MediaPlayer, SegmentTimeline};

pub struct PreviewArgs {
    pub path: PathBuf,
    pub duration: Option<f64>,
    pub step: f64,
    pub tick_ms: u64,
    pub output_dir: Option<PathBuf>,
    pub deny_camera: bool,
}

/// A player whose clock only moves when the preview loop advances it.
#[derive(Debug, Default)]
struct SimulatedPlayer {
    position: f64,
    playing: bool,
}

impl MediaPlayer for SimulatedPlayer {
    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, time: f64) {
        self.position = time;
    }
}

pub async fn run(config: &AppConfig, args: PreviewArgs) -> anyhow::Result<()> {
    if !args.step.is_finite() || args.step <= 0.0 {
        bail!("--step must be a positive number of seconds");
    }

    let json = std::fs::read_to_string(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let mut timeline = SegmentTimeline::from_defaults(&config.timeline);
    timeline.load_video(args.path.display().to_string());
    timeline
        .import_snapshot(&json)
        .with_context(|| format!("Failed to load segments from {}", args.path.display()))?;

    let last_out = timeline
        .segments()
        .iter()
        .map(|s| s.end.max(s.start))
        .fold(0.0_f64, f64::max);
    let duration = args.duration.unwrap_or(last_out + 1.0);
    timeline.on_metadata_loaded(duration);

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let camera = if args.deny_camera {
        SyntheticCamera::denied()
    } else {
        SyntheticCamera::new()
    };
    let first = config.performers.first().cloned().unwrap_or_default();
    let mut compositor = LiveCompositor::new(
        Arc::new(camera),
        Arc::new(BackgroundDifferenceFactory::default()),
        CompositorOptions::from_config(config),
        OverlayLabel::new(first.name, first.color),
    );
    let status = compositor.start(CaptureConstraints::from(config.capture)).await;
    println!("Compositor: {status:?}");

    println!(
        "Previewing {} segment(s) over {}",
        timeline.take_count(),
        format_timecode(duration)
    );

    let mut player = SimulatedPlayer::default();
    timeline.seek(0.0, &mut player);
    timeline.toggle_play(&mut player);

    let tick = Duration::from_millis(args.tick_ms);
    let mut was_active = false;
    let mut saved = 0usize;
    let mut shown_banner = false;

    while player.playing && player.position <= duration {
        timeline.on_time_update(player.position);
        let state = timeline.active_now();

        if let Some(seg) = state.matched.first().map(|&i| &timeline.segments()[i]) {
            compositor.set_label(OverlayLabel::new(seg.label.clone(), seg.color.clone()));
        }
        compositor.set_active(state.active);

        if state.active != was_active {
            let stamp = format_timecode(player.position);
            if state.active {
                println!("[{stamp}] IN   {}", compositor.label().text);
            } else {
                println!("[{stamp}] OUT");
            }
            was_active = state.active;
        }

        let view = compositor.overlay_view();
        if let Some(reason) = view.error_banner.as_deref() {
            if !shown_banner {
                println!("           overlay error: {reason}");
                shown_banner = true;
            }
        }

        if let (Some(dir), Some(frame)) = (&args.output_dir, compositor.presented_frame()) {
            let file = dir.join(format!("overlay_{saved:05}.png"));
            frame
                .save(&file)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            tracing::debug!(
                path = %file.display(),
                coverage = coverage(&frame),
                "Saved overlay frame"
            );
            saved += 1;
        }

        tokio::time::sleep(tick).await;
        player.position += args.step;
    }

    timeline.toggle_play(&mut player);
    compositor.shutdown().await;

    let stats = compositor.stats();
    println!();
    println!("Pipeline:");
    println!("  Frames captured: {}", stats.frames_captured);
    println!("  Results committed: {}", stats.results_committed);
    println!("  Stale results: {}", stats.results_stale);
    println!("  Dropped ticks: {} ({:.1}%)", stats.frames_dropped, stats.drop_rate());
    if args.output_dir.is_some() {
        println!("  Overlay frames saved: {saved}");
    }

    Ok(())
}
