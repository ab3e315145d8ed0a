use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::TranscriptSettings;
use crate::text::normalize_text;

pub const TEXT_FIELDS: &[&str] = &["text", "content"];
pub const START_FIELDS: &[&str] = &["ts", "start", "startTime"];
pub const END_FIELDS: &[&str] = &["end_ts", "end", "endTime"];

/// A transcript node with a start timestamp, in file units.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedNode<'a> {
    pub text: Option<&'a str>,
    pub start: f64,
    pub end: Option<f64>,
}

/// Walk the tree and collect every node that has a start timestamp.
pub fn collect_timed_nodes(value: &Value) -> Vec<TimedNode<'_>> {
    let mut nodes = Vec::new();
    visit(value, &mut nodes);
    nodes
}

fn visit<'a>(value: &'a Value, out: &mut Vec<TimedNode<'a>>) {
    match value {
        Value::Object(map) => {
            if let Some(start) = first_number(map, START_FIELDS) {
                let text = TEXT_FIELDS
                    .iter()
                    .filter_map(|field| map.get(*field).and_then(Value::as_str))
                    .find(|t| !t.trim().is_empty());
                out.push(TimedNode {
                    text,
                    start,
                    end: first_number(map, END_FIELDS),
                });
            }
            for child in map.values() {
                visit(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

fn first_number(map: &serde_json::Map<String, Value>, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|field| match map.get(*field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Scale factor turning file timestamps into seconds.
pub fn detect_scale(nodes: &[TimedNode], millisecond_threshold: f64) -> f64 {
    let max = nodes.iter().map(|n| n.start).fold(f64::NEG_INFINITY, f64::max);
    if max > millisecond_threshold {
        0.001
    } else {
        1.0
    }
}

/// One spoken word on the source timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub normalized: String,
    pub start_frame: i64,
    pub end_frame: i64,
}

impl Word {
    pub fn new(text: &str, start_frame: i64, end_frame: i64) -> Self {
        Self {
            text: text.trim().to_string(),
            normalized: normalize_text(text),
            start_frame,
            end_frame,
        }
    }
}

/// Ordered words plus the master string searched by the aligner.
#[derive(Debug, Clone, Default)]
pub struct TranscriptIndex {
    words: Vec<Word>,
    master: String,
    master_chars: Vec<char>,
    scale: f64,
}

impl TranscriptIndex {
    pub fn from_words(words: Vec<Word>) -> Self {
        let master = words
            .iter()
            .map(|w| w.normalized.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let master_chars = master.chars().collect();
        Self {
            words,
            master,
            master_chars,
            scale: 1.0,
        }
    }

    pub fn build(doc: &Value, fps: f64, settings: &TranscriptSettings) -> Self {
        let nodes = collect_timed_nodes(doc);
        let scale = detect_scale(&nodes, settings.millisecond_threshold);

        let words = nodes
            .iter()
            .filter_map(|node| {
                let text = node.text?;
                let start = node.start * scale;
                let end = node
                    .end
                    .map(|e| e * scale)
                    .unwrap_or(start + settings.default_word_seconds);
                Some(Word::new(
                    text,
                    (start * fps) as i64,
                    (end * fps) as i64,
                ))
            })
            .collect();

        let mut index = Self::from_words(words);
        index.scale = scale;
        info!(words = index.len(), scale, "Transcript indexed");
        index
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn master(&self) -> &str {
        &self.master
    }

    pub(crate) fn master_chars(&self) -> &[char] {
        &self.master_chars
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Read a transcript file as JSON. Unreadable or malformed input gives
/// [`Value::Null`], which indexes to nothing.
pub fn load_transcript(path: &Path) -> Value {
    info!("Indexing transcript {}", path.display());
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Could not read transcript {}: {}", path.display(), e);
            return Value::Null;
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!("Malformed transcript {}: {}", path.display(), e);
        Value::Null
    })
}
