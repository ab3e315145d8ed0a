use std::collections::HashMap;

use tracing::info;

use crate::ingest::{AudioPlacement, Placement};
use crate::text::{is_external_audio_name, unification_key};

/// One external audio source synced to a camera file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOffset {
    pub name: String,
    pub path: String,
    pub channels: u32,
    /// 1-based audio track the source sat on.
    pub track: usize,
    /// Add to a camera source frame to get the external source frame.
    pub delta: i64,
}

/// Unification key of a camera file -> its external audio sources.
pub type SyncMap = HashMap<String, Vec<SyncOffset>>;

/// Frame delta between an audio and a video placement that overlap.
pub fn sync_delta(video: &Placement, audio: &Placement) -> i64 {
    audio.source_in + (video.start - audio.start) - video.source_in
}

fn overlaps(video: &Placement, audio: &Placement) -> bool {
    video.start.max(audio.start) < video.end.min(audio.end)
}

pub fn build_sync_map(video: &[Placement], audio: &[AudioPlacement]) -> SyncMap {
    let mut map = SyncMap::new();
    let mut pairs = 0usize;

    for v in video {
        let key = unification_key(&v.file.name);
        let entries = map.entry(key.clone()).or_default();

        for AudioPlacement { placement: a, track } in audio {
            if a.file.id == v.file.id || a.file.path == v.file.path {
                continue;
            }
            // A same-named file is only external when it is a separate recording.
            if unification_key(&a.file.name) == key && !is_external_audio_name(&a.file.name) {
                continue;
            }
            if !overlaps(v, a) {
                continue;
            }
            if entries.iter().any(|e| e.path == a.file.path) {
                continue;
            }

            entries.push(SyncOffset {
                name: a.file.name.clone(),
                path: a.file.path.clone(),
                channels: a.file.channels,
                track: *track,
                delta: sync_delta(v, a),
            });
            pairs += 1;
        }
    }

    info!(pairs, "External audio pairs mapped");
    map
}
