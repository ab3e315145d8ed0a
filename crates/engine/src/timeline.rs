use crate::ingest::SourceFormat;

/// Audio sample characteristics written for every output file.
pub const AUDIO_SAMPLE_RATE: u32 = 48000;
pub const AUDIO_DEPTH: u32 = 16;

#[derive(Debug, Clone)]
pub struct SequenceSettings {
    pub name: String,
    pub uuid: String,
    pub timebase: u32,
    pub ntsc: bool,
    pub resolution: Resolution,
}

impl SequenceSettings {
    pub fn new(name: impl Into<String>, format: &SourceFormat) -> Self {
        SequenceSettings {
            name: name.into(),
            uuid: uuid::Uuid::new_v4().to_string(),
            timebase: format.timebase,
            ntsc: format.ntsc,
            resolution: Resolution {
                width: format.width,
                height: format.height,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// A media file as referenced from the output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFileRef {
    pub id: String,
    pub name: String,
    pub path: String,
    pub channels: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        }
    }
}

/// Cross-reference from one clip to another member of its link group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipLink {
    pub clip_id: String,
    pub kind: TrackKind,
    /// 1-based output track of the linked clip.
    pub track_index: usize,
    /// Ordinal of the segment the group belongs to.
    pub clip_index: usize,
}

#[derive(Debug, Clone)]
pub struct OutputClip {
    pub id: String,
    pub name: String,
    pub start: i64,
    pub end: i64,
    pub source_in: i64,
    pub source_out: i64,
    pub file: MediaFileRef,
    pub kind: TrackKind,
    /// Source channel for audio clips.
    pub source_channel: Option<usize>,
    pub links: Vec<ClipLink>,
}

impl OutputClip {
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    /// Output channel (1 or 2) for audio tracks.
    pub output_channel: Option<u8>,
    pub clips: Vec<OutputClip>,
}

#[derive(Debug, Clone)]
pub struct Timeline {
    pub settings: SequenceSettings,
    pub video: Track,
    pub audio: Vec<Track>,
}

impl Timeline {
    /// One empty video track plus `audio_tracks` audio tracks alternating
    /// between output channels 1 and 2.
    pub fn new(settings: SequenceSettings, audio_tracks: usize) -> Self {
        Timeline {
            settings,
            video: Track {
                output_channel: None,
                clips: Vec::new(),
            },
            audio: (1..=audio_tracks)
                .map(|index| Track {
                    output_channel: Some(if index % 2 == 1 { 1 } else { 2 }),
                    clips: Vec::new(),
                })
                .collect(),
        }
    }

    /// Length of the sequence in frames.
    pub fn duration(&self) -> i64 {
        self.video.clips.iter().map(|c| c.end).max().unwrap_or(0)
    }

    pub fn clip_count(&self) -> usize {
        self.video.clips.len() + self.audio.iter().map(|t| t.clips.len()).sum::<usize>()
    }
}
