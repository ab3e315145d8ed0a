use std::collections::HashMap;

use tracing::debug;

use crate::config::HandleSettings;
use crate::ingest::{SourceFormat, DEFAULT_CHANNELS};
use crate::resolve::ResolvedSegment;
use crate::sync::{SyncMap, SyncOffset};
use crate::text::{resolve_media_path, unification_key};
use crate::timeline::{ClipLink, MediaFileRef, OutputClip, SequenceSettings, Timeline, TrackKind};

/// Where a segment landed in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedSegment {
    /// 1-based ordinal shared by every clip of the segment.
    pub clip_index: usize,
    pub start: i64,
    pub end: i64,
    pub source_in: i64,
    pub source_out: i64,
    pub external_sources: usize,
}

/// Lays resolved segments back to back on a growing [`Timeline`].
pub struct Assembler<'a> {
    timeline: Timeline,
    sync_map: &'a SyncMap,
    handle_in: i64,
    handle_out: i64,
    cursor: i64,
    segment_count: usize,
    media_files: HashMap<String, MediaFileRef>,
    external_files: HashMap<String, MediaFileRef>,
}

impl<'a> Assembler<'a> {
    pub fn new(
        format: &SourceFormat,
        sequence_name: &str,
        audio_tracks: usize,
        handles: &HandleSettings,
        sync_map: &'a SyncMap,
    ) -> Self {
        let (handle_in, handle_out) = handles.frames(format.fps);
        Assembler {
            timeline: Timeline::new(SequenceSettings::new(sequence_name, format), audio_tracks),
            sync_map,
            handle_in,
            handle_out,
            cursor: 0,
            segment_count: 0,
            media_files: HashMap::new(),
            external_files: HashMap::new(),
        }
    }

    pub fn handles(&self) -> (i64, i64) {
        (self.handle_in, self.handle_out)
    }

    /// Next free frame on the output axis.
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Pad `segment` with handles and lay it at the cursor.
    ///
    /// Returns `None`, leaving all state untouched, when the padded range
    /// has no positive duration.
    pub fn place(&mut self, segment: &ResolvedSegment) -> Option<PlacedSegment> {
        let source_in = (segment.source_in - self.handle_in).max(0);
        let source_out = segment.source_out + self.handle_out;
        let duration = source_out - source_in;
        if duration <= 0 {
            return None;
        }

        self.segment_count += 1;
        let n = self.segment_count;
        let start = self.cursor;
        let end = start + duration;

        let media = self
            .media_files
            .entry(file_key(&segment.file.name))
            .or_insert_with(|| MediaFileRef {
                id: uuid::Uuid::new_v4().to_string(),
                name: segment.file.name.clone(),
                path: segment.file.path.clone(),
                channels: segment.file.channels,
            })
            .clone();

        let sync_map = self.sync_map;
        let externals: &[SyncOffset] = sync_map
            .get(&unification_key(&segment.file.name))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let pairs = externals.len().min(self.timeline.audio.len() / 2);

        let video_link = ClipLink {
            clip_id: format!("v-{}", n),
            kind: TrackKind::Video,
            track_index: 1,
            clip_index: n,
        };

        let frame = ClipFrame {
            start,
            end,
            source_in,
            source_out,
        };

        if externals.is_empty() {
            let group = [
                video_link,
                audio_link(format!("a1-{}", n), 1, n),
                audio_link(format!("a2-{}", n), 2, n),
            ];
            self.timeline
                .video
                .clips
                .push(frame.clip(&group[0], &media, None, &group));
            for (slot, member) in group[1..].iter().enumerate() {
                if let Some(track) = self.timeline.audio.get_mut(member.track_index - 1) {
                    track
                        .clips
                        .push(frame.clip(member, &media, Some(slot + 1), &group));
                }
            }
        } else {
            let mut video_group = vec![video_link.clone()];
            for (i, offset) in externals[..pairs].iter().enumerate() {
                let file = self.external_file(offset);
                let ext_frame = ClipFrame {
                    start,
                    end,
                    source_in: source_in + offset.delta,
                    source_out: source_in + offset.delta + duration,
                };
                let group = [
                    video_link.clone(),
                    audio_link(format!("ext-{}-{}L", n, i), 2 * i + 1, n),
                    audio_link(format!("ext-{}-{}R", n, i), 2 * i + 2, n),
                ];
                for (slot, member) in group[1..].iter().enumerate() {
                    self.timeline.audio[member.track_index - 1]
                        .clips
                        .push(ext_frame.clip(member, &file, Some(slot + 1), &group));
                }
                video_group.extend_from_slice(&group[1..]);
            }
            self.timeline
                .video
                .clips
                .push(frame.clip(&video_link, &media, None, &video_group));
        }

        debug!(
            clip = n,
            file = %segment.file.name,
            source_in,
            source_out,
            start,
            external = pairs,
            "Placed segment"
        );

        self.cursor = end;
        Some(PlacedSegment {
            clip_index: n,
            start,
            end,
            source_in,
            source_out,
            external_sources: pairs,
        })
    }

    fn external_file(&mut self, offset: &SyncOffset) -> MediaFileRef {
        self.external_files
            .entry(file_key(&offset.name))
            .or_insert_with(|| MediaFileRef {
                id: uuid::Uuid::new_v4().to_string(),
                name: offset.name.clone(),
                path: resolve_media_path(&offset.name, &offset.path),
                channels: offset.channels.max(DEFAULT_CHANNELS),
            })
            .clone()
    }

    pub fn finish(self) -> Timeline {
        self.timeline
    }
}

/// Output file entries are shared by name, ignoring case.
fn file_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn audio_link(clip_id: String, track_index: usize, clip_index: usize) -> ClipLink {
    ClipLink {
        clip_id,
        kind: TrackKind::Audio,
        track_index,
        clip_index,
    }
}

/// Output and source range shared by the clips of one placement.
struct ClipFrame {
    start: i64,
    end: i64,
    source_in: i64,
    source_out: i64,
}

impl ClipFrame {
    fn clip(
        &self,
        this: &ClipLink,
        file: &MediaFileRef,
        source_channel: Option<usize>,
        group: &[ClipLink],
    ) -> OutputClip {
        OutputClip {
            id: this.clip_id.clone(),
            name: file.name.clone(),
            start: self.start,
            end: self.end,
            source_in: self.source_in,
            source_out: self.source_out,
            file: file.clone(),
            kind: this.kind,
            source_channel,
            links: group
                .iter()
                .filter(|member| member.clip_id != this.clip_id)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::FileRecord;
    use std::sync::Arc;

    fn format() -> SourceFormat {
        SourceFormat::default()
    }

    fn segment(name: &str, source_in: i64, source_out: i64) -> ResolvedSegment {
        ResolvedSegment {
            file: Arc::new(FileRecord {
                id: "f1".into(),
                name: name.into(),
                path: format!("/shoot/{}", name),
                channels: 2,
            }),
            source_in,
            source_out,
        }
    }

    fn offset(name: &str, delta: i64) -> SyncOffset {
        SyncOffset {
            name: name.into(),
            path: format!("/audio/{}", name),
            channels: 1,
            track: 3,
            delta,
        }
    }

    #[test]
    fn camera_audio_pair_linked_to_video() {
        let sync = SyncMap::new();
        let mut asm = Assembler::new(&format(), "seq", 12, &HandleSettings::default(), &sync);
        assert_eq!(asm.handles(), (45, 45));

        let placed = asm.place(&segment("cam1.mov", 1050, 1075)).unwrap();
        assert_eq!((placed.source_in, placed.source_out), (1005, 1120));
        assert_eq!((placed.start, placed.end), (0, 115));
        assert_eq!(asm.cursor(), 115);

        let timeline = asm.finish();
        let video = &timeline.video.clips[0];
        assert_eq!(video.id, "v-1");
        let linked: Vec<&str> = video.links.iter().map(|l| l.clip_id.as_str()).collect();
        assert_eq!(linked, vec!["a1-1", "a2-1"]);

        let a1 = &timeline.audio[0].clips[0];
        let a2 = &timeline.audio[1].clips[0];
        assert_eq!((a1.source_in, a1.source_out), (1005, 1120));
        assert_eq!(a1.source_channel, Some(1));
        assert_eq!(a2.source_channel, Some(2));
        assert!(a1.links.iter().any(|l| l.clip_id == "v-1" && l.kind == TrackKind::Video));
        assert!(a1.links.iter().all(|l| l.clip_id != "a1-1"));
        assert_eq!(timeline.clip_count(), 3);
    }

    #[test]
    fn in_handle_clamped_at_zero() {
        let sync = SyncMap::new();
        let mut asm = Assembler::new(&format(), "seq", 12, &HandleSettings::default(), &sync);
        let placed = asm.place(&segment("cam1.mov", 10, 40)).unwrap();
        assert_eq!(placed.source_in, 0);
        assert_eq!(placed.source_out, 85);
    }

    #[test]
    fn degenerate_segment_leaves_state_untouched() {
        let sync = SyncMap::new();
        let handles = HandleSettings {
            in_seconds: 0.0,
            out_seconds: 0.0,
        };
        let mut asm = Assembler::new(&format(), "seq", 12, &handles, &sync);
        assert!(asm.place(&segment("cam1.mov", 100, 100)).is_none());
        assert_eq!(asm.cursor(), 0);
        assert_eq!(asm.timeline().clip_count(), 0);

        let placed = asm.place(&segment("cam1.mov", 100, 130)).unwrap();
        assert_eq!(placed.clip_index, 1);
    }

    #[test]
    fn segments_are_back_to_back() {
        let sync = SyncMap::new();
        let mut asm = Assembler::new(&format(), "seq", 12, &HandleSettings::default(), &sync);
        let first = asm.place(&segment("cam1.mov", 500, 600)).unwrap();
        let second = asm.place(&segment("cam2.mov", 200, 260)).unwrap();
        assert_eq!(second.start, first.end);
        assert_eq!(second.clip_index, 2);
        assert_eq!(asm.finish().duration(), second.end);
    }

    #[test]
    fn external_audio_replaces_camera_audio() {
        let mut sync = SyncMap::new();
        sync.insert("cam1".into(), vec![offset("zoom1.wav", -10)]);
        let mut asm = Assembler::new(&format(), "seq", 12, &HandleSettings::default(), &sync);
        let placed = asm.place(&segment("cam1.mov", 1050, 1075)).unwrap();
        assert_eq!(placed.external_sources, 1);

        let timeline = asm.finish();
        let left = &timeline.audio[0].clips[0];
        let right = &timeline.audio[1].clips[0];
        assert_eq!(left.id, "ext-1-0L");
        assert_eq!(right.id, "ext-1-0R");
        assert_eq!((left.source_in, left.source_out), (995, 1110));
        assert_eq!(left.file.channels, 2);
        assert_eq!(left.file.path, "/audio/zoom1.wav");
        assert!(left.links.iter().any(|l| l.clip_id == "v-1"));
        assert!(left.links.iter().any(|l| l.clip_id == "ext-1-0R"));

        let video = &timeline.video.clips[0];
        let linked: Vec<&str> = video.links.iter().map(|l| l.clip_id.as_str()).collect();
        assert_eq!(linked, vec!["ext-1-0L", "ext-1-0R"]);
        assert_eq!(timeline.clip_count(), 3);
    }

    #[test]
    fn external_sources_bounded_by_tracks() {
        let mut sync = SyncMap::new();
        sync.insert(
            "cam1".into(),
            (0..5).map(|i| offset(&format!("mic{}.wav", i), i)).collect(),
        );
        let mut asm = Assembler::new(&format(), "seq", 6, &HandleSettings::default(), &sync);
        let placed = asm.place(&segment("cam1.mov", 1000, 1100)).unwrap();
        assert_eq!(placed.external_sources, 3);

        let timeline = asm.finish();
        for (i, track) in timeline.audio.iter().enumerate() {
            assert_eq!(track.clips.len(), 1);
            assert_eq!(track.clips[0].links[0].track_index, 1);
            assert_eq!(track.output_channel, Some(if i % 2 == 0 { 1 } else { 2 }));
        }
        assert_eq!(timeline.audio[5].clips[0].id, "ext-1-2R");
    }

    #[test]
    fn file_ids_are_reused_per_key() {
        let mut sync = SyncMap::new();
        sync.insert("cam1".into(), vec![offset("zoom1.wav", 0)]);
        let mut asm = Assembler::new(&format(), "seq", 12, &HandleSettings::default(), &sync);
        asm.place(&segment("cam1.mov", 100, 200)).unwrap();
        asm.place(&segment("Cam1.MOV", 400, 500)).unwrap();
        asm.place(&segment("cam2.mov", 400, 500)).unwrap();

        let timeline = asm.finish();
        let ids: Vec<&str> = timeline.video.clips.iter().map(|c| c.file.id.as_str()).collect();
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);
        let ext = &timeline.audio[0].clips;
        assert_eq!(ext[0].file.id, ext[1].file.id);
    }

    #[test]
    fn same_stem_with_other_extension_is_a_separate_file() {
        let mut sync = SyncMap::new();
        sync.insert(
            "cam1".into(),
            vec![offset("cam1.wav", 0), offset("cam1.bwf", 0)],
        );
        let mut asm = Assembler::new(&format(), "seq", 12, &HandleSettings::default(), &sync);
        asm.place(&segment("cam1.mov", 100, 200)).unwrap();
        asm.place(&segment("cam1.mxf", 400, 500)).unwrap();

        let timeline = asm.finish();
        let mov = &timeline.video.clips[0].file;
        let mxf = &timeline.video.clips[1].file;
        assert_ne!(mov.id, mxf.id);
        assert_eq!(mxf.path, "/shoot/cam1.mxf");

        let wav = &timeline.audio[0].clips[0].file;
        let bwf = &timeline.audio[2].clips[0].file;
        assert_ne!(wav.id, bwf.id);
        assert_eq!(bwf.path, "/audio/cam1.bwf");
    }
}
