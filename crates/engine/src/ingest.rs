use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use roxmltree::{Document, Node, ParsingOptions};
use tracing::{info, warn};

use crate::text::resolve_media_path;

/// Channel count assumed when a file does not declare more.
pub const DEFAULT_CHANNELS: u32 = 2;

/// Frame rate and frame size of the source sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFormat {
    /// Declared timebase (nominal frames per second).
    pub timebase: u32,
    pub ntsc: bool,
    /// Real frames per second (29.97 for NTSC 30).
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for SourceFormat {
    fn default() -> Self {
        Self {
            timebase: 30,
            ntsc: false,
            fps: 30.0,
            width: 1920,
            height: 1080,
        }
    }
}

impl SourceFormat {
    fn with_rate(mut self, timebase: u32, ntsc: bool) -> Self {
        self.timebase = timebase;
        self.ntsc = ntsc;
        self.fps = if ntsc && timebase == 30 {
            29.97
        } else {
            timebase as f64
        };
        self
    }
}

/// One unique `file` entry of the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// The document's own file id.
    pub id: String,
    pub name: String,
    pub path: String,
    pub channels: u32,
}

/// A clip item laid on the source timeline.
#[derive(Debug, Clone)]
pub struct Placement {
    pub start: i64,
    pub end: i64,
    pub source_in: i64,
    pub source_out: i64,
    pub file: Arc<FileRecord>,
}

/// A placement on an audio track, with its 1-based track number.
#[derive(Debug, Clone)]
pub struct AudioPlacement {
    pub placement: Placement,
    pub track: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SourceTimeline {
    pub format: SourceFormat,
    pub files: HashMap<String, Arc<FileRecord>>,
    /// Video placements sorted by start frame.
    pub video: Vec<Placement>,
    /// Audio placements in document order.
    pub audio: Vec<AudioPlacement>,
}

/// Read and parse a timeline file, degrading to defaults on any failure.
pub fn load_timeline(path: Option<&Path>) -> SourceTimeline {
    let Some(path) = path else {
        return SourceTimeline::default();
    };

    info!("Reading source timeline {}", path.display());
    match std::fs::read_to_string(path) {
        Ok(xml) => parse_timeline(&xml),
        Err(e) => {
            warn!("Could not read timeline {}: {}", path.display(), e);
            SourceTimeline::default()
        }
    }
}

pub fn parse_timeline(xml: &str) -> SourceTimeline {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = match Document::parse_with_options(xml, options) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Malformed timeline document, using defaults: {}", e);
            return SourceTimeline::default();
        }
    };

    let root = doc.root_element();
    let format = parse_format(root);
    info!(
        width = format.width,
        height = format.height,
        fps = format.fps,
        "Detected source format"
    );

    let files = parse_files(root);

    let mut video = Vec::new();
    for track in find_all(root, &["video", "track"]) {
        video.extend(track_placements(track, &files));
    }
    video.sort_by_key(|p| p.start);

    let mut audio = Vec::new();
    for (idx, track) in find_all(root, &["audio", "track"]).into_iter().enumerate() {
        audio.extend(
            track_placements(track, &files)
                .into_iter()
                .map(|placement| AudioPlacement {
                    placement,
                    track: idx + 1,
                }),
        );
    }

    info!(
        files = files.len(),
        video = video.len(),
        audio = audio.len(),
        "Source timeline ingested"
    );

    SourceTimeline {
        format,
        files,
        video,
        audio,
    }
}

fn parse_format(root: Node) -> SourceFormat {
    let mut format = SourceFormat::default();
    let Some(sequence) = find_first(root, &["sequence"]) else {
        return format;
    };

    if let Some(rate) = child(sequence, "rate") {
        if let Some(timebase) = child_text(rate, "timebase").and_then(|t| t.parse::<u32>().ok()) {
            let ntsc = child_text(rate, "ntsc") == Some("TRUE");
            format = format.with_rate(timebase, ntsc);
        }
    }

    if let Some(chars) = find_first(
        sequence,
        &["media", "video", "format", "samplecharacteristics"],
    ) {
        if let Some(width) = child_text(chars, "width").and_then(|t| t.parse().ok()) {
            format.width = width;
        }
        if let Some(height) = child_text(chars, "height").and_then(|t| t.parse().ok()) {
            format.height = height;
        }
    }

    format
}

fn parse_files(root: Node) -> HashMap<String, Arc<FileRecord>> {
    let mut files = HashMap::new();

    for node in root.descendants().filter(|n| n.has_tag_name("file")) {
        let Some(id) = node.attribute("id") else {
            continue;
        };
        // Later <file id="..."/> entries are back-references without a name.
        let Some(name) = child(node, "name").map(|n| n.text().unwrap_or("").trim().to_string())
        else {
            continue;
        };
        if files.contains_key(id) {
            continue;
        }

        let raw_path = child_text(node, "pathurl").unwrap_or("");
        let channels = find_first(
            node,
            &["media", "audio", "samplecharacteristics", "channelcount"],
        )
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse::<u32>().ok())
        .map(|declared| declared.max(DEFAULT_CHANNELS))
        .unwrap_or(DEFAULT_CHANNELS);

        let record = FileRecord {
            id: id.to_string(),
            path: resolve_media_path(&name, raw_path),
            name,
            channels,
        };
        files.insert(id.to_string(), Arc::new(record));
    }

    files
}

fn track_placements(track: Node, files: &HashMap<String, Arc<FileRecord>>) -> Vec<Placement> {
    track
        .children()
        .filter(|n| n.has_tag_name("clipitem"))
        .filter_map(|clip| {
            let file = child(clip, "file")
                .and_then(|f| f.attribute("id"))
                .and_then(|id| files.get(id))?;
            Some(Placement {
                start: child_number(clip, "start")?,
                end: child_number(clip, "end")?,
                source_in: child_number(clip, "in")?,
                source_out: child_number(clip, "out")?,
                file: Arc::clone(file),
            })
        })
        .collect()
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text()).map(str::trim)
}

fn child_number(node: Node, name: &str) -> Option<i64> {
    child_text(node, name).and_then(|t| t.parse().ok())
}

/// Follow a chain of child names below `node`.
fn follow<'a, 'input>(node: Node<'a, 'input>, path: &[&str]) -> Option<Node<'a, 'input>> {
    match path.split_first() {
        None => Some(node),
        Some((head, rest)) => node
            .children()
            .filter(|n| n.has_tag_name(*head))
            .find_map(|n| follow(n, rest)),
    }
}

/// First match of a `.//a/b/c` style path below `node`.
fn find_first<'a, 'input>(node: Node<'a, 'input>, path: &[&str]) -> Option<Node<'a, 'input>> {
    let (head, rest) = path.split_first()?;
    node.descendants()
        .skip(1)
        .filter(|n| n.has_tag_name(*head))
        .find_map(|n| follow(n, rest))
}

/// All matches of a two-level `.//parent/child` path, in document order.
fn find_all<'a, 'input>(node: Node<'a, 'input>, path: &[&str; 2]) -> Vec<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .filter(|n| n.has_tag_name(path[0]))
        .flat_map(|parent| parent.children().filter(|n| n.has_tag_name(path[1])))
        .collect()
}
