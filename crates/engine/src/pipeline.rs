use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::align::{FuzzyAligner, LineAligner};
use crate::assembler::Assembler;
use crate::config::ConformSettings;
use crate::error::{ConformError, ConformResult, InputRole};
use crate::ingest::{load_timeline, SourceTimeline};
use crate::render::write_xmeml;
use crate::resolve::resolve_media;
use crate::script::{load_script, ScriptBlock};
use crate::sync::build_sync_map;
use crate::timeline::Timeline;
use crate::transcript::{load_transcript, TranscriptIndex};

const NOT_FOUND_SAMPLE_CHARS: usize = 50;
const NO_MEDIA_SAMPLE_CHARS: usize = 30;
const SUMMARY_SAMPLES: usize = 5;

/// What happened to the script lines of a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub lines: usize,
    pub placed: usize,
    /// Lines the aligner could not find in the transcript.
    pub not_found: Vec<String>,
    /// Lines found in the transcript but outside every camera placement.
    pub no_media: Vec<String>,
    /// Segments dropped for a non-positive padded duration.
    pub degenerate: usize,
    pub duration_frames: i64,
    pub fps: f64,
}

impl RunReport {
    /// Output length as `<m>min <s>s`.
    pub fn duration_label(&self) -> String {
        let seconds = if self.fps > 0.0 {
            self.duration_frames as f64 / self.fps
        } else {
            0.0
        };
        format!(
            "{}min {}s",
            (seconds / 60.0).floor() as i64,
            (seconds % 60.0).floor() as i64
        )
    }

    pub fn log_summary(&self) {
        info!(
            lines = self.lines,
            placed = self.placed,
            degenerate = self.degenerate,
            "Final duration: {}",
            self.duration_label()
        );
        if !self.not_found.is_empty() {
            warn!(
                "{} lines not found in transcript, e.g. {:?}",
                self.not_found.len(),
                sample(&self.not_found)
            );
        }
        if !self.no_media.is_empty() {
            warn!(
                "{} lines found without matching media, e.g. {:?}",
                self.no_media.len(),
                sample(&self.no_media)
            );
        }
    }
}

fn sample(lines: &[String]) -> &[String] {
    &lines[..lines.len().min(SUMMARY_SAMPLES)]
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

pub struct ConformOutcome {
    pub timeline: Timeline,
    pub report: RunReport,
}

/// Conform with the stock [`FuzzyAligner`].
pub fn conform(
    source: &SourceTimeline,
    transcript: &Value,
    script: &[ScriptBlock],
    settings: &ConformSettings,
) -> ConformOutcome {
    let aligner = FuzzyAligner::new(settings.aligner.clone());
    conform_with(&aligner, source, transcript, script, settings)
}

pub fn conform_with<A: LineAligner>(
    aligner: &A,
    source: &SourceTimeline,
    transcript: &Value,
    script: &[ScriptBlock],
    settings: &ConformSettings,
) -> ConformOutcome {
    let fps = source.format.fps;
    let sync_map = build_sync_map(&source.video, &source.audio);
    let index = TranscriptIndex::build(transcript, fps, &settings.transcript);

    let mut assembler = Assembler::new(
        &source.format,
        &settings.output.sequence_name,
        settings.output.audio_tracks,
        &settings.handles,
        &sync_map,
    );
    let (handle_in, handle_out) = assembler.handles();
    info!(handle_in, handle_out, "Handle frames");

    let mut report = RunReport {
        fps,
        ..RunReport::default()
    };

    for block in script {
        info!(block = %block.name, lines = block.len(), "Processing block");

        for line in &block.lines {
            report.lines += 1;

            let Some(found) = aligner.align(line, &index) else {
                report.not_found.push(truncate(line, NOT_FOUND_SAMPLE_CHARS));
                continue;
            };

            let Some(segment) = resolve_media(
                found.start_frame,
                found.end_frame,
                &source.video,
                settings.resolver.tolerance_frames,
            ) else {
                let sample = truncate(line, NO_MEDIA_SAMPLE_CHARS);
                warn!(
                    start = found.start_frame,
                    end = found.end_frame,
                    "Text found but no matching media: {}...",
                    sample
                );
                report.no_media.push(sample);
                continue;
            };

            match assembler.place(&segment) {
                Some(_) => report.placed += 1,
                None => report.degenerate += 1,
            }
        }
    }

    report.duration_frames = assembler.cursor();
    ConformOutcome {
        timeline: assembler.finish(),
        report,
    }
}

/// The three documents a run needs. `None` means not supplied.
#[derive(Debug, Clone, Default)]
pub struct InputPaths {
    pub timeline: Option<PathBuf>,
    pub transcript: Option<PathBuf>,
    pub script: Option<PathBuf>,
}

impl InputPaths {
    fn require(path: &Option<PathBuf>, role: InputRole) -> ConformResult<&Path> {
        path.as_deref().ok_or(ConformError::MissingInput(role))
    }
}

/// Load the inputs from disk, conform, and write the output document.
///
/// Nothing is written unless all three inputs are present and the script
/// parses.
pub fn run(inputs: &InputPaths, output: &Path, settings: &ConformSettings) -> ConformResult<RunReport> {
    let timeline_path = InputPaths::require(&inputs.timeline, InputRole::Timeline)?;
    let transcript_path = InputPaths::require(&inputs.transcript, InputRole::Transcript)?;
    let script_path = InputPaths::require(&inputs.script, InputRole::Script)?;

    let script = load_script(script_path, &settings.script.blocks)?;
    let source = load_timeline(Some(timeline_path));
    let transcript = load_transcript(transcript_path);

    let outcome = conform(&source, &transcript, &script, settings);
    write_xmeml(&outcome.timeline, output)?;
    info!("Timeline written to {}", output.display());
    outcome.report.log_summary();

    Ok(outcome.report)
}
