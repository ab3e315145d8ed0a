use std::borrow::Cow;
use std::path::Path;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Extensions that mark a declared file name as real media.
pub const MEDIA_EXTENSIONS: &[&str] = &["mov", "mxf", "mp4", "wav", "aif", "bwf", "mp3"];

/// Extensions of separately recorded (double-system) audio files.
pub const EXTERNAL_AUDIO_EXTENSIONS: &[&str] = &["wav", "bwf", "aif", "mp3"];

/// Normalise text for matching.
///
/// Lower-cases, decomposes and drops combining marks, removes anything that
/// is not a word character or whitespace, then collapses whitespace runs.
/// Transcript words and script lines both go through this.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key used to correlate a camera file with its external audio.
///
/// `"Take1.MOV"`, `"take1.mov"` and `"take1.wav"` all give `"take1"`.
pub fn unification_key(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match lowered.rfind('.') {
        Some(dot) if dot > 0 => lowered[..dot].to_string(),
        _ => lowered,
    }
}

/// Lower-cased extension of a file name, without the dot.
pub fn extension_lower(name: &str) -> Option<String> {
    Path::new(name.trim())
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

pub fn is_external_audio_name(name: &str) -> bool {
    extension_lower(name)
        .map(|ext| EXTERNAL_AUDIO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Turn a document `pathurl` into a local filesystem path.
///
/// Percent-decodes, strips the `file://localhost` / `file://` scheme and,
/// when the declared name carries a media extension the path lacks,
/// appends the name's extension. Already-resolved paths come back unchanged.
pub fn resolve_media_path(name: &str, raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let decoded = String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned();
    let path = decoded
        .strip_prefix("file://localhost")
        .or_else(|| decoded.strip_prefix("file://"))
        .unwrap_or(&decoded);

    let name = name.trim();
    let declared_is_media = extension_lower(name)
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);

    if declared_is_media && Path::new(path).extension().is_none() {
        if let Some(ext) = Path::new(name).extension() {
            return format!("{}.{}", path, ext.to_string_lossy());
        }
    }

    path.to_string()
}

/// Encode a local path as a `file://localhost` URL, one segment at a time.
pub fn path_to_url(path: &str) -> String {
    let local = path.strip_prefix("file://localhost").unwrap_or(path);
    let encoded = local
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<Cow<'_, str>>>()
        .join("/");

    if encoded.starts_with('/') {
        format!("file://localhost{}", encoded)
    } else {
        format!("file://localhost/{}", encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_accents_and_punctuation() {
        assert_eq!(normalize_text("Olá, Mundo!"), "ola mundo");
        assert_eq!(normalize_text("  São   Paulo -- 2024 "), "sao paulo 2024");
        assert_eq!(normalize_text("Ação\tÉ\nnecessária."), "acao e necessaria");
    }

    #[test]
    fn normalize_empty_for_symbols_only() {
        assert_eq!(normalize_text("... !!"), "");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn unification_key_ignores_case_and_extension() {
        assert_eq!(unification_key("Take1.MOV"), "take1");
        assert_eq!(unification_key("take1.mov"), "take1");
        assert_eq!(unification_key("take1.wav"), "take1");
        assert_eq!(unification_key(" A.B.mxf "), "a.b");
        assert_eq!(unification_key("noext"), "noext");
    }

    #[test]
    fn external_audio_detection() {
        assert!(is_external_audio_name("ZOOM0001.WAV"));
        assert!(is_external_audio_name("boom.bwf"));
        assert!(!is_external_audio_name("cam1.mov"));
        assert!(!is_external_audio_name("readme"));
    }

    #[test]
    fn resolve_decodes_and_strips_scheme() {
        assert_eq!(
            resolve_media_path("A 1.mov", "file://localhost/Volumes/Shoot/A%201.mov"),
            "/Volumes/Shoot/A 1.mov"
        );
        assert_eq!(
            resolve_media_path("b.wav", "file:///media/b.wav"),
            "/media/b.wav"
        );
        assert_eq!(resolve_media_path("x.mov", ""), "");
    }

    #[test]
    fn resolve_appends_missing_extension() {
        assert_eq!(
            resolve_media_path("Clip.MOV", "file://localhost/footage/Clip"),
            "/footage/Clip.MOV"
        );
        assert_eq!(
            resolve_media_path("notes.txt", "file://localhost/docs/notes"),
            "/docs/notes"
        );
    }

    #[test]
    fn resolve_is_idempotent_on_local_paths() {
        let once = resolve_media_path("cam 1.mov", "file://localhost/shoot/cam%201.mov");
        assert_eq!(resolve_media_path("cam 1.mov", &once), once);
        assert_eq!(
            resolve_media_path("a.mov", "/Users/ed/a.mov"),
            "/Users/ed/a.mov"
        );
    }

    #[test]
    fn path_to_url_encodes_segments() {
        assert_eq!(
            path_to_url("/Volumes/Shoot/A 1.mov"),
            "file://localhost/Volumes/Shoot/A%201.mov"
        );
        assert_eq!(path_to_url("media/ç.wav"), "file://localhost/media/%C3%A7.wav");
        assert_eq!(
            path_to_url("file://localhost/x/y.mov"),
            "file://localhost/x/y.mov"
        );
    }
}
