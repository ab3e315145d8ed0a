use std::path::Path;

use serde::Deserialize;

use crate::error::{ConformError, ConformResult};

/// Root settings structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConformSettings {
    #[serde(default)]
    pub handles: HandleSettings,

    #[serde(default)]
    pub aligner: AlignerThresholds,

    #[serde(default)]
    pub resolver: ResolverSettings,

    #[serde(default)]
    pub transcript: TranscriptSettings,

    #[serde(default)]
    pub script: ScriptSettings,

    #[serde(default)]
    pub output: OutputSettings,

    #[serde(default)]
    pub discovery: DiscoverySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ConformSettings {
    pub fn from_toml_str(content: &str) -> ConformResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> ConformResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConformError::io(path, e))?;
        Self::from_toml_str(&content)
    }
}

/// Editorial padding added around every resolved excerpt.
#[derive(Debug, Clone, Deserialize)]
pub struct HandleSettings {
    #[serde(default = "default_handle_seconds")]
    pub in_seconds: f64,

    #[serde(default = "default_handle_seconds")]
    pub out_seconds: f64,
}

fn default_handle_seconds() -> f64 {
    1.5
}

impl Default for HandleSettings {
    fn default() -> Self {
        Self {
            in_seconds: default_handle_seconds(),
            out_seconds: default_handle_seconds(),
        }
    }
}

impl HandleSettings {
    /// Handle sizes in whole frames (truncated) at the given real rate.
    pub fn frames(&self, fps: f64) -> (i64, i64) {
        (
            (self.in_seconds * fps) as i64,
            (self.out_seconds * fps) as i64,
        )
    }
}

/// Acceptance thresholds for the fuzzy aligner.
///
/// These were tuned by hand against real interviews; they are exposed so a
/// run can be re-tuned without a rebuild.
#[derive(Debug, Clone, Deserialize)]
pub struct AlignerThresholds {
    /// Longest common substring must cover at least this share of the line.
    #[serde(default = "default_min_substring_ratio")]
    pub min_substring_ratio: f64,

    /// Best walk score must exceed this share of the target tokens.
    #[serde(default = "default_min_score_ratio")]
    pub min_score_ratio: f64,

    /// A walk is abandoned once its score drops below `slope * examined`.
    #[serde(default = "default_abort_slope")]
    pub abort_slope: f64,
}

fn default_min_substring_ratio() -> f64 {
    0.5
}

fn default_min_score_ratio() -> f64 {
    0.6
}

fn default_abort_slope() -> f64 {
    0.7
}

impl Default for AlignerThresholds {
    fn default() -> Self {
        Self {
            min_substring_ratio: default_min_substring_ratio(),
            min_score_ratio: default_min_score_ratio(),
            abort_slope: default_abort_slope(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverSettings {
    /// Slack, in frames, allowed on both ends when bracketing a placement.
    #[serde(default = "default_tolerance_frames")]
    pub tolerance_frames: i64,
}

fn default_tolerance_frames() -> i64 {
    5
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            tolerance_frames: default_tolerance_frames(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptSettings {
    /// Any timestamp above this marks the whole file as milliseconds.
    #[serde(default = "default_millisecond_threshold")]
    pub millisecond_threshold: f64,

    /// Word length assumed when a node has no end timestamp.
    #[serde(default = "default_word_seconds")]
    pub default_word_seconds: f64,
}

fn default_millisecond_threshold() -> f64 {
    500_000.0
}

fn default_word_seconds() -> f64 {
    0.5
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            millisecond_threshold: default_millisecond_threshold(),
            default_word_seconds: default_word_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptSettings {
    /// Script members holding quoted lines, in processing order.
    #[serde(default = "default_blocks")]
    pub blocks: Vec<String>,
}

fn default_blocks() -> Vec<String> {
    vec!["bloco_1".to_string(), "bloco_2".to_string()]
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            blocks: default_blocks(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_file")]
    pub file_name: String,

    #[serde(default = "default_sequence_name")]
    pub sequence_name: String,

    /// Audio tracks laid out in the output sequence. External sources use
    /// them two at a time.
    #[serde(default = "default_audio_tracks")]
    pub audio_tracks: usize,
}

fn default_output_file() -> String {
    "TIMELINE_TEXT_BASED.xml".to_string()
}

fn default_sequence_name() -> String {
    "TIMELINE_TEXT_BASED".to_string()
}

fn default_audio_tracks() -> usize {
    12
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            file_name: default_output_file(),
            sequence_name: default_sequence_name(),
            audio_tracks: default_audio_tracks(),
        }
    }
}

/// Naming conventions used to pick inputs out of a working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySettings {
    /// Case-insensitive substring identifying the script JSON.
    #[serde(default = "default_script_marker")]
    pub script_marker: String,

    /// Preferred substrings for the source timeline file name.
    #[serde(default = "default_timeline_markers")]
    pub timeline_markers: Vec<String>,

    /// Name prefixes never taken as the transcript.
    #[serde(default = "default_transcript_exclude")]
    pub transcript_exclude: Vec<String>,
}

fn default_script_marker() -> String {
    "coutinho".to_string()
}

fn default_timeline_markers() -> Vec<String> {
    vec!["limpa".to_string(), "limpo".to_string()]
}

fn default_transcript_exclude() -> Vec<String> {
    vec!["INPUT".to_string(), "Roteiro".to_string(), "~$".to_string()]
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            script_marker: default_script_marker(),
            timeline_markers: default_timeline_markers(),
            transcript_exclude: default_transcript_exclude(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
