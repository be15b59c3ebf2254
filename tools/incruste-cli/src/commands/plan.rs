//! Run an edit script against a fresh timeline and export the segments.
//!
//! One command per line, `#` starts a comment:
//!
//! ```text
//! load studio.mp4
//! duration 30
//! select p2
//! time 2.5
//! in            # mark-in at the play-head
//! out 9         # mark-out at an explicit time
//! seek 12
//! delete 0
//! reset
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context};
use incruste_common::config::AppConfig;
use incruste_timeline::snapshot::write_snapshot;
use incruste_timeline::{MediaPlayer, PerformerRoster, SegmentTimeline};

#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    Load(String),
    Duration(f64),
    Time(f64),
    Seek(f64),
    Select(String),
    In(Option<f64>),
    Out(Option<f64>),
    Delete(usize),
    Reset,
}

/// Parse an edit script.
pub fn parse_script(text: &str) -> anyhow::Result<Vec<PlanStep>> {
    let mut steps = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        let arg = parts.next();
        let step = parse_step(cmd, arg)
            .with_context(|| format!("line {}: '{}'", lineno + 1, line))?;
        steps.push(step);
    }
    Ok(steps)
}

fn parse_step(cmd: &str, arg: Option<&str>) -> anyhow::Result<PlanStep> {
    let secs = |arg: Option<&str>| -> anyhow::Result<f64> {
        let raw = arg.context("missing time argument")?;
        raw.parse::<f64>()
            .with_context(|| format!("'{raw}' is not a number"))
    };
    let optional_secs = |arg: Option<&str>| -> anyhow::Result<Option<f64>> {
        match arg {
            Some(_) => secs(arg).map(Some),
            None => Ok(None),
        }
    };

    Ok(match cmd {
        "load" => PlanStep::Load(arg.context("missing video source")?.to_string()),
        "duration" => PlanStep::Duration(secs(arg)?),
        "time" => PlanStep::Time(secs(arg)?),
        "seek" => PlanStep::Seek(secs(arg)?),
        "select" => PlanStep::Select(arg.context("missing performer id")?.to_string()),
        "in" => PlanStep::In(optional_secs(arg)?),
        "out" => PlanStep::Out(optional_secs(arg)?),
        "delete" => {
            let raw = arg.context("missing segment index")?;
            PlanStep::Delete(
                raw.parse::<usize>()
                    .with_context(|| format!("'{raw}' is not an index"))?,
            )
        }
        "reset" => PlanStep::Reset,
        other => bail!("unknown command '{other}'"),
    })
}

/// Player stand-in for scripted sessions: positions come from the script.
struct ScriptPlayer;

impl MediaPlayer for ScriptPlayer {
    fn play(&mut self) {}

    fn pause(&mut self) {}

    fn seek(&mut self, time: f64) {
        tracing::debug!(time, "Script player seek");
    }
}

/// Apply `steps` to `timeline`.
pub fn apply(
    timeline: &mut SegmentTimeline,
    roster: &mut PerformerRoster,
    steps: &[PlanStep],
) -> anyhow::Result<()> {
    let mut player = ScriptPlayer;
    for step in steps {
        tracing::debug!(?step, "Applying");
        match step {
            PlanStep::Load(source) => timeline.load_video(source.clone()),
            PlanStep::Duration(secs) => timeline.on_metadata_loaded(*secs),
            PlanStep::Time(secs) => timeline.on_time_update(*secs),
            PlanStep::Seek(secs) => {
                timeline.seek(*secs, &mut player);
            }
            PlanStep::Select(id) => {
                if roster.select(id).is_none() {
                    bail!("unknown performer '{id}'");
                }
            }
            PlanStep::In(Some(at)) => {
                if timeline.mark_in(*at, roster.selected()).is_none() {
                    println!("  (in ignored: {at} is not a usable time)");
                }
            }
            PlanStep::In(None) => {
                timeline.mark_in_now(roster.selected());
            }
            PlanStep::Out(Some(at)) => {
                if timeline.mark_out(*at).is_none() {
                    println!("  (out ignored: no segment yet or unusable time)");
                }
            }
            PlanStep::Out(None) => {
                if timeline.mark_out_now().is_none() {
                    println!("  (out ignored: no segment yet)");
                }
            }
            PlanStep::Delete(index) => {
                if timeline.delete_segment(*index).is_none() {
                    println!("  (delete ignored: no segment #{index})");
                }
            }
            PlanStep::Reset => timeline.reset_all(),
        }
    }
    Ok(())
}

pub fn run(config: &AppConfig, script: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;
    let steps = parse_script(&text)?;

    let mut timeline = SegmentTimeline::from_defaults(&config.timeline);
    let mut roster = PerformerRoster::from_entries(&config.performers);
    apply(&mut timeline, &mut roster, &steps)?;

    let output = output.unwrap_or_else(|| PathBuf::from(&config.timeline.export_file_name));
    write_snapshot(&output, timeline.segments())
        .with_context(|| format!("Failed to export segments to {}", output.display()))?;

    println!("Applied {} step(s) from {}", steps.len(), script.display());
    println!("  Segments: {}", timeline.take_count());
    for issue in timeline.validate() {
        println!("  [WARN] {issue}");
    }
    println!("Exported to: {}", output.display());

    Ok(())
}
