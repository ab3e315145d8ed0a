use std::fmt::Display;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{ConformError, ConformResult};
use crate::text::path_to_url;
use crate::timeline::{
    ClipLink, OutputClip, SequenceSettings, Timeline, TrackKind, AUDIO_DEPTH, AUDIO_SAMPLE_RATE,
};

type XmlWriter = Writer<Vec<u8>>;
type XmlResult = Result<(), quick_xml::Error>;

/// Serialize the timeline as an `xmeml` (version 4) document.
pub fn render_xmeml(timeline: &Timeline) -> ConformResult<String> {
    let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_document(&mut xml, timeline)?;
    let mut out = String::from_utf8_lossy(&xml.into_inner()).into_owned();
    out.push('\n');
    Ok(out)
}

/// Render and write the document in one go.
pub fn write_xmeml(timeline: &Timeline, path: &Path) -> ConformResult<()> {
    let xml = render_xmeml(timeline)?;
    std::fs::write(path, xml).map_err(|e| ConformError::io(path, e))
}

fn write_document(xml: &mut XmlWriter, timeline: &Timeline) -> XmlResult {
    let settings = &timeline.settings;
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    xml.write_event(Event::DocType(BytesText::from_escaped("xmeml")))?;

    start_with(xml, "xmeml", &[("version", "4")])?;
    start(xml, "sequence")?;
    leaf(xml, "name", &settings.name)?;
    leaf(xml, "uuid", &settings.uuid)?;
    rate(xml, settings)?;

    start(xml, "media")?;
    start(xml, "video")?;
    start(xml, "format")?;
    start(xml, "samplecharacteristics")?;
    rate(xml, settings)?;
    leaf(xml, "width", settings.resolution.width)?;
    leaf(xml, "height", settings.resolution.height)?;
    end(xml, "samplecharacteristics")?;
    end(xml, "format")?;
    start(xml, "track")?;
    for clip in &timeline.video.clips {
        clip_item(xml, clip, settings)?;
    }
    end(xml, "track")?;
    end(xml, "video")?;

    start(xml, "audio")?;
    for track in &timeline.audio {
        start(xml, "track")?;
        if let Some(channel) = track.output_channel {
            leaf(xml, "outputchannelindex", channel)?;
        }
        for clip in &track.clips {
            clip_item(xml, clip, settings)?;
        }
        end(xml, "track")?;
    }
    end(xml, "audio")?;
    end(xml, "media")?;
    end(xml, "sequence")?;
    end(xml, "xmeml")
}

fn rate(xml: &mut XmlWriter, settings: &SequenceSettings) -> XmlResult {
    start(xml, "rate")?;
    leaf(xml, "timebase", settings.timebase)?;
    leaf(xml, "ntsc", if settings.ntsc { "TRUE" } else { "FALSE" })?;
    end(xml, "rate")
}

fn clip_item(xml: &mut XmlWriter, clip: &OutputClip, settings: &SequenceSettings) -> XmlResult {
    start_with(xml, "clipitem", &[("id", clip.id.as_str())])?;
    leaf(xml, "name", &clip.name)?;
    leaf(xml, "enabled", "TRUE")?;
    leaf(xml, "duration", clip.duration())?;
    rate(xml, settings)?;
    leaf(xml, "start", clip.start)?;
    leaf(xml, "end", clip.end)?;
    leaf(xml, "in", clip.source_in)?;
    leaf(xml, "out", clip.source_out)?;

    let file = &clip.file;
    start_with(xml, "file", &[("id", file.id.as_str())])?;
    leaf(xml, "name", &file.name)?;
    if !file.path.is_empty() {
        leaf(xml, "pathurl", path_to_url(&file.path))?;
    }
    rate(xml, settings)?;
    start(xml, "media")?;
    if clip.kind == TrackKind::Video {
        start(xml, "video")?;
        start(xml, "samplecharacteristics")?;
        rate(xml, settings)?;
        leaf(xml, "width", settings.resolution.width)?;
        leaf(xml, "height", settings.resolution.height)?;
        end(xml, "samplecharacteristics")?;
        end(xml, "video")?;
    }
    start(xml, "audio")?;
    start(xml, "samplecharacteristics")?;
    leaf(xml, "depth", AUDIO_DEPTH)?;
    leaf(xml, "samplerate", AUDIO_SAMPLE_RATE)?;
    leaf(xml, "channelcount", file.channels)?;
    end(xml, "samplecharacteristics")?;
    end(xml, "audio")?;
    end(xml, "media")?;
    end(xml, "file")?;

    if let Some(channel) = clip.source_channel {
        start(xml, "sourcetrack")?;
        leaf(xml, "mediatype", "audio")?;
        leaf(xml, "trackindex", channel)?;
        end(xml, "sourcetrack")?;
    }

    for link in &clip.links {
        link_item(xml, link)?;
    }
    end(xml, "clipitem")
}

fn link_item(xml: &mut XmlWriter, link: &ClipLink) -> XmlResult {
    start(xml, "link")?;
    leaf(xml, "linkclipref", &link.clip_id)?;
    leaf(xml, "mediatype", link.kind.as_str())?;
    leaf(xml, "trackindex", link.track_index)?;
    leaf(xml, "clipindex", link.clip_index)?;
    if link.kind == TrackKind::Video {
        leaf(xml, "groupindex", 1)?;
    }
    end(xml, "link")
}

fn start(xml: &mut XmlWriter, name: &str) -> XmlResult {
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn start_with(xml: &mut XmlWriter, name: &str, attributes: &[(&str, &str)]) -> XmlResult {
    let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
    xml.write_event(Event::Start(element))?;
    Ok(())
}

fn end(xml: &mut XmlWriter, name: &str) -> XmlResult {
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// `<name>value</name>`, with the value escaped.
fn leaf(xml: &mut XmlWriter, name: &str, value: impl Display) -> XmlResult {
    start(xml, name)?;
    xml.write_event(Event::Text(BytesText::new(&value.to_string())))?;
    end(xml, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{parse_timeline, SourceFormat};
    use crate::timeline::MediaFileRef;

    fn sample_timeline() -> Timeline {
        let format = SourceFormat {
            timebase: 30,
            ntsc: true,
            fps: 29.97,
            width: 1920,
            height: 1080,
        };
        let mut timeline = Timeline::new(SequenceSettings::new("Cut & Keep", &format), 12);
        let file = MediaFileRef {
            id: "file-a".into(),
            name: "Cam <1>.mov".into(),
            path: "/shoot/Cam <1>.mov".into(),
            channels: 2,
        };
        let video = ClipLink {
            clip_id: "v-1".into(),
            kind: TrackKind::Video,
            track_index: 1,
            clip_index: 1,
        };
        let a1 = ClipLink {
            clip_id: "a1-1".into(),
            kind: TrackKind::Audio,
            track_index: 1,
            clip_index: 1,
        };
        timeline.video.clips.push(OutputClip {
            id: "v-1".into(),
            name: file.name.clone(),
            start: 0,
            end: 100,
            source_in: 500,
            source_out: 600,
            file: file.clone(),
            kind: TrackKind::Video,
            source_channel: None,
            links: vec![a1],
        });
        timeline.audio[0].clips.push(OutputClip {
            id: "a1-1".into(),
            name: file.name.clone(),
            start: 0,
            end: 100,
            source_in: 500,
            source_out: 600,
            file,
            kind: TrackKind::Audio,
            source_channel: Some(1),
            links: vec![video],
        });
        timeline
    }

    #[test]
    fn writes_prolog_and_sequence_header() {
        let xml = render_xmeml(&sample_timeline()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE xmeml>\n"));
        assert!(xml.contains("<xmeml version=\"4\">"));
        assert!(xml.contains("<name>Cut &amp; Keep</name>"));
        assert!(xml.contains("<ntsc>TRUE</ntsc>"));
        assert_eq!(xml.matches("<outputchannelindex>1</outputchannelindex>").count(), 6);
        assert_eq!(xml.matches("<outputchannelindex>2</outputchannelindex>").count(), 6);
    }

    #[test]
    fn clip_items_carry_links_and_paths() {
        let xml = render_xmeml(&sample_timeline()).unwrap();
        assert!(xml.contains("<pathurl>file://localhost/shoot/Cam%20%3C1%3E.mov</pathurl>"));
        assert!(xml.contains("<linkclipref>a1-1</linkclipref>"));
        assert!(xml.contains("<groupindex>1</groupindex>"));
        assert_eq!(xml.matches("<sourcetrack>").count(), 1);
        assert_eq!(xml.matches("<duration>100</duration>").count(), 2);
    }

    #[test]
    fn output_is_well_formed_and_reingestable() {
        let xml = render_xmeml(&sample_timeline()).unwrap();
        let reread = parse_timeline(&xml);
        assert_eq!(reread.format.fps, 29.97);
        assert_eq!(reread.video.len(), 1);
        assert_eq!(reread.video[0].source_in, 500);
        assert_eq!(reread.video[0].file.path, "/shoot/Cam <1>.mov");
        assert_eq!(reread.audio.len(), 1);
        assert_eq!(reread.audio[0].track, 1);
    }

    #[test]
    fn attributes_and_text_are_escaped() {
        let mut timeline = sample_timeline();
        timeline.video.clips[0].id = "v-\"1\"&".into();
        timeline.video.clips[0].file.id = "f<1>".into();
        let xml = render_xmeml(&timeline).unwrap();
        assert!(xml.contains("<clipitem id=\"v-&quot;1&quot;&amp;\">"));
        assert!(xml.contains("<file id=\"f&lt;1&gt;\">"));
        assert!(xml.contains("<name>Cam &lt;1&gt;.mov</name>"));
        assert_eq!(parse_timeline(&xml).video.len(), 1);
    }

    #[test]
    fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        write_xmeml(&sample_timeline(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<clipitem id=\"v-1\">"));
    }
}
