use std::path::Path;

use serde_json::Value;

use crate::config::TranscriptSettings;
use crate::error::{ConformError, ConformResult};
use crate::transcript::{collect_timed_nodes, detect_scale};

/// Silence, in seconds, that starts a new paragraph.
pub const PARAGRAPH_PAUSE_SECONDS: f64 = 1.5;

const TITLE: &str = "FULL TRANSCRIPT";

pub fn render_draft(doc: &Value, settings: &TranscriptSettings) -> String {
    let timed = collect_timed_nodes(doc);
    let scale = detect_scale(&timed, settings.millisecond_threshold);

    let mut nodes: Vec<(f64, &str)> = timed
        .iter()
        .filter_map(|node| Some((node.start, node.text?)))
        .collect();
    nodes.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut last_end = 0.0;

    for (ts, text) in nodes {
        let start = ts * scale;
        if !current.is_empty() && start - last_end > PARAGRAPH_PAUSE_SECONDS {
            paragraphs.push(current.join(" "));
            current.clear();
        }
        current.push(text);
        last_end = start + settings.default_word_seconds;
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    let mut out = format!("{}\n{}\n\n", TITLE, "=".repeat(TITLE.len()));
    out.push_str(&paragraphs.join("\n\n"));
    if !paragraphs.is_empty() {
        out.push('\n');
    }
    out
}

pub fn write_draft(doc: &Value, settings: &TranscriptSettings, path: &Path) -> ConformResult<()> {
    std::fs::write(path, render_draft(doc, settings)).map_err(|e| ConformError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn breaks_paragraphs_on_long_pauses() {
        let doc = json!({"words": [
            {"text": "bom", "ts": 0.0},
            {"text": "dia", "ts": 0.6},
            {"text": "tudo", "ts": 4.0},
            {"text": "bem", "ts": 4.3}
        ]});
        let draft = render_draft(&doc, &TranscriptSettings::default());
        assert_eq!(
            draft,
            "FULL TRANSCRIPT\n===============\n\nbom dia\n\ntudo bem\n"
        );
    }

    #[test]
    fn sorts_by_time_and_detects_milliseconds() {
        let doc = json!([
            {"text": "second", "ts": 900_000},
            {"text": "first", "ts": 899_000}
        ]);
        let draft = render_draft(&doc, &TranscriptSettings::default());
        // One second apart once scaled: same paragraph.
        assert!(draft.ends_with("first second\n"));
    }

    #[test]
    fn empty_transcript_has_only_title() {
        let draft = render_draft(&Value::Null, &TranscriptSettings::default());
        assert_eq!(draft, "FULL TRANSCRIPT\n===============\n\n");
    }
}
