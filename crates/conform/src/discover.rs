use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine::config::DiscoverySettings;
use engine::text::extension_lower;
use engine::InputPaths;
use tracing::{debug, info};

/// Prefix editors leave on lock files next to open documents.
const LOCK_PREFIX: &str = "~$";

/// Plain file names in `dir`, sorted.
pub fn sorted_file_names(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory {}", dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn has_extension(name: &str, ext: &str) -> bool {
    extension_lower(name).as_deref() == Some(ext)
}

pub fn find_script<'a>(names: &'a [String], settings: &DiscoverySettings) -> Option<&'a str> {
    let marker = settings.script_marker.to_lowercase();
    names
        .iter()
        .map(String::as_str)
        .find(|name| has_extension(name, "json") && name.to_lowercase().contains(&marker))
}

/// A name carrying one of the timeline markers wins; otherwise the first
/// XML document that is not a lock file.
pub fn find_timeline<'a>(names: &'a [String], settings: &DiscoverySettings) -> Option<&'a str> {
    let xml: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| has_extension(name, "xml"))
        .collect();

    xml.iter()
        .find(|name| {
            let lowered = name.to_lowercase();
            settings
                .timeline_markers
                .iter()
                .any(|marker| lowered.contains(&marker.to_lowercase()))
        })
        .or_else(|| xml.iter().find(|name| !name.starts_with(LOCK_PREFIX)))
        .copied()
}

pub fn find_transcript<'a>(
    names: &'a [String],
    script: Option<&str>,
    settings: &DiscoverySettings,
) -> Option<&'a str> {
    names.iter().map(String::as_str).find(|name| {
        has_extension(name, "json")
            && Some(*name) != script
            && !settings
                .transcript_exclude
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    })
}

/// Fill the inputs the caller left out from the contents of `dir`.
///
/// Explicit paths are kept as given. Inputs that cannot be found stay
/// `None`; the pipeline reports which one is missing.
pub fn discover(dir: &Path, explicit: InputPaths, settings: &DiscoverySettings) -> Result<InputPaths> {
    if explicit.timeline.is_some() && explicit.transcript.is_some() && explicit.script.is_some() {
        return Ok(explicit);
    }

    let names = sorted_file_names(dir)?;
    debug!(dir = %dir.display(), entries = names.len(), "Scanning for inputs");

    let in_dir = |name: &str| dir.join(name);

    let script_name = find_script(&names, settings);
    let script = explicit.script.or_else(|| script_name.map(in_dir));

    let script_file_name = script
        .as_deref()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned());
    let transcript = explicit.transcript.or_else(|| {
        find_transcript(&names, script_file_name.as_deref(), settings).map(in_dir)
    });

    let timeline = explicit
        .timeline
        .or_else(|| find_timeline(&names, settings).map(in_dir));

    for (role, path) in [
        ("timeline", &timeline),
        ("transcript", &transcript),
        ("script", &script),
    ] {
        if let Some(path) = path {
            info!("Using {} {}", role, path.display());
        }
    }

    Ok(InputPaths {
        timeline,
        transcript,
        script,
    })
}

/// Transcript for the draft utility, found by the same rule as for a run.
pub fn discover_transcript(dir: &Path, settings: &DiscoverySettings) -> Result<Option<PathBuf>> {
    let names = sorted_file_names(dir)?;
    let script = find_script(&names, settings);
    Ok(find_transcript(&names, script, settings).map(|name| dir.join(name)))
}
