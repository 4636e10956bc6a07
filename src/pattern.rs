use std::path::Path;

use anyhow::{Context, Result};

use crate::tag::{TrackTag, UserTextFrame};

/// Multi-value token: expands to `"<description>": "<text>"\, ` per user
/// text frame, in tag order, with the trailing separator kept after the
/// last entry.
const TEXTS_TOKEN: &str = r##"%texts,output="#d": "#t"\,%"##;

/// Content floor for the pattern file. A crude truncation check, not a real
/// minimum pattern length.
pub const MIN_PATTERN_LEN: usize = 6;

/// Read the whole pattern file as one text blob. The file handle is
/// released before any substitution starts.
pub fn load_pattern(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("reading pattern file {}", path.display()))
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn num<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn token_table(tag: &TrackTag) -> [(&'static str, String); 15] {
    [
        ("%artist%", opt(&tag.artist)),
        ("%title%", opt(&tag.title)),
        ("%release-date%", opt(&tag.release_date)),
        ("%genre%", opt(&tag.genre)),
        ("%audio-file-url%", opt(&tag.audio_file_url)),
        ("%comments%", opt(&tag.comments)),
        ("%music-cd-id%", opt(&tag.cd_id)),
        ("%publisher%", opt(&tag.publisher)),
        ("%publisher-url%", opt(&tag.publisher_url)),
        ("%album%", opt(&tag.album)),
        ("%album-artist%", opt(&tag.album_artist)),
        ("%track%", num(&tag.track)),
        ("%track-total%", num(&tag.track_total)),
        ("$length()", num(&tag.duration_secs)),
        (TEXTS_TOKEN, expand_user_text_frames(&tag.user_text_frames)),
    ]
}

fn expand_user_text_frames(frames: &[UserTextFrame]) -> String {
    let mut out = String::new();
    for frame in frames {
        // Separator commas stay escaped until the final unescape pass so
        // they cannot be confused with commas inside the frame text.
        out.push_str(&format!("\"{}\": \"{}\"\\, ", frame.description, frame.text));
    }
    out
}

/// Fill every placeholder token in `pattern` with the matching tag value.
///
/// Single forward pass, earliest literal match wins. Substituted values are
/// emitted verbatim and never rescanned, so a tag value that happens to
/// contain token text does not trigger a second substitution. Absent fields
/// render as empty strings. The final step turns every remaining `\,` into
/// a plain comma; it runs strictly after all token substitution so commas
/// inside user frame text stay unambiguous.
pub fn substitute(pattern: &str, tag: &TrackTag) -> String {
    let table = token_table(tag);

    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    'scan: while let Some(ch) = rest.chars().next() {
        for (token, value) in &table {
            if let Some(stripped) = rest.strip_prefix(token) {
                out.push_str(value);
                rest = stripped;
                continue 'scan;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out.replace("\\,", ",")
}
