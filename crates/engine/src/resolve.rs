use std::sync::Arc;

use crate::ingest::{FileRecord, Placement};

/// Source coordinates of an aligned range, before handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSegment {
    pub file: Arc<FileRecord>,
    pub source_in: i64,
    pub source_out: i64,
}

/// Find the first placement bracketing `[start, end]` within `tolerance`
/// frames and translate the range into that placement's source frames.
///
/// `placements` must be sorted by start frame.
pub fn resolve_media(
    start: i64,
    end: i64,
    placements: &[Placement],
    tolerance: i64,
) -> Option<ResolvedSegment> {
    let placement = placements
        .iter()
        .find(|p| p.start <= start + tolerance && p.end >= end - tolerance)?;

    let source_in = placement.source_in + (start - placement.start);
    Some(ResolvedSegment {
        file: Arc::clone(&placement.file),
        source_in,
        source_out: source_in + (end - start),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placements() -> Vec<Placement> {
        let cam1 = Arc::new(FileRecord {
            id: "f1".into(),
            name: "cam1.mov".into(),
            path: "/s/cam1.mov".into(),
            channels: 2,
        });
        let cam2 = Arc::new(FileRecord {
            id: "f2".into(),
            name: "cam2.mov".into(),
            path: "/s/cam2.mov".into(),
            channels: 2,
        });
        vec![
            Placement { start: 0, end: 300, source_in: 1000, source_out: 1300, file: cam1 },
            Placement { start: 300, end: 900, source_in: 40, source_out: 640, file: cam2 },
        ]
    }

    #[test]
    fn translates_into_source_frames() {
        let seg = resolve_media(50, 75, &placements(), 5).unwrap();
        assert_eq!(seg.file.name, "cam1.mov");
        assert_eq!((seg.source_in, seg.source_out), (1050, 1075));

        let seg = resolve_media(400, 500, &placements(), 5).unwrap();
        assert_eq!(seg.file.name, "cam2.mov");
        assert_eq!((seg.source_in, seg.source_out), (140, 240));
    }

    #[test]
    fn tolerance_absorbs_small_overhang() {
        // Ends 4 frames past cam1; still inside the tolerance.
        let seg = resolve_media(250, 304, &placements(), 5).unwrap();
        assert_eq!(seg.file.name, "cam1.mov");
        assert_eq!((seg.source_in, seg.source_out), (1250, 1304));
    }

    #[test]
    fn straddling_range_goes_unresolved() {
        assert!(resolve_media(250, 350, &placements(), 5).is_none());
        assert!(resolve_media(1000, 1010, &placements(), 5).is_none());
        assert!(resolve_media(0, 10, &[], 5).is_none());
    }
}
