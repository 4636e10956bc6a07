use std::borrow::Cow;
use std::path::Path;

use anyhow::{Context, Result};
use lofty::ape::ApeFile;
use lofty::config::{ParseOptions, ParsingMode};
use lofty::file::FileType;
use lofty::flac::FlacFile;
use lofty::id3::v2::{Frame, Id3v2Tag};
use lofty::iff::aiff::AiffFile;
use lofty::iff::wav::WavFile;
use lofty::mpeg::MpegFile;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, ItemValue, Tag};

/// How chatty extraction is allowed to be. `Quiet` keeps recoverable decoder
/// complaints (non-standard genre names and the like) off stderr; `Verbose`
/// reads with best-attempt parsing and reports what was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    #[default]
    Quiet,
    Verbose,
}

/// A free-form key/value metadata entry (TXXX-style), beyond the fixed
/// standard fields. Order follows the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTextFrame {
    pub description: String,
    pub text: String,
}

/// Read-only projection of one audio file's metadata. Every field may be
/// absent; absence renders as an empty string at substitution time.
#[derive(Debug, Clone, Default)]
pub struct TrackTag {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub genre: Option<String>,
    pub audio_file_url: Option<String>,
    pub comments: Option<String>,
    /// ID3v2 stores the music-CD identifier (MCDI) as a raw TOC blob with
    /// no text rendering, and no other supported format carries one, so
    /// this stays absent and the token renders empty.
    pub cd_id: Option<String>,
    pub publisher: Option<String>,
    pub publisher_url: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub track: Option<u32>,
    pub track_total: Option<u32>,
    pub duration_secs: Option<u64>,
    pub user_text_frames: Vec<UserTextFrame>,
}

fn parse_options(verbosity: Verbosity) -> ParseOptions {
    let parsing_mode = match verbosity {
        Verbosity::Quiet => ParsingMode::Relaxed,
        Verbosity::Verbose => ParsingMode::BestAttempt,
    };
    ParseOptions::new().parsing_mode(parsing_mode)
}

/// Load the metadata of `path` into a [`TrackTag`].
///
/// A file that decodes but carries no tag at all is not an error: every
/// field comes back `None` (duration still populated from the stream
/// properties). Open/decode failures propagate to the caller.
pub fn extract(path: &Path, verbosity: Verbosity) -> Result<TrackTag> {
    let tagged_file = Probe::open(path)
        .with_context(|| format!("opening audio file {}", path.display()))?
        .options(parse_options(verbosity))
        .read()
        .with_context(|| format!("decoding audio file {}", path.display()))?;

    let mut out = TrackTag {
        duration_secs: Some(tagged_file.properties().duration().as_secs()),
        ..TrackTag::default()
    };

    let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(t) => t,
        None => {
            tracing::debug!(path = %path.display(), "file carries no tag, all fields empty");
            return Ok(out);
        }
    };

    out.artist = tag.artist().map(Cow::into_owned);
    out.title = tag.title().map(Cow::into_owned);
    out.album = tag.album().map(Cow::into_owned);
    out.genre = tag.genre().map(Cow::into_owned);
    out.comments = tag.comment().map(Cow::into_owned);
    out.track = tag.track();
    out.track_total = tag.track_total();
    out.album_artist = get(tag, &ItemKey::AlbumArtist);
    out.release_date = get(tag, &ItemKey::RecordingDate).or_else(|| get(tag, &ItemKey::Year));
    out.audio_file_url = get(tag, &ItemKey::AudioFileUrl);
    out.publisher = get(tag, &ItemKey::Publisher).or_else(|| get(tag, &ItemKey::Label));
    out.publisher_url = get(tag, &ItemKey::PublisherUrl);

    // The generic tag drops TXXX frames with unrecognized descriptions, so
    // user text frames have to come from the concrete ID3v2 tag. Formats
    // without one (Vorbis and friends) keep their nonstandard keys in the
    // generic tag, where the fallback picks them up.
    out.user_text_frames = match read_id3v2(path, tagged_file.file_type(), verbosity) {
        Some(id3v2) => id3v2_user_text_frames(id3v2),
        None => generic_user_text_frames(tag),
    };

    tracing::debug!(
        path = %path.display(),
        artist = out.artist.as_deref().unwrap_or(""),
        title = out.title.as_deref().unwrap_or(""),
        user_text_frames = out.user_text_frames.len(),
        "extracted tag"
    );

    Ok(out)
}

fn get(tag: &Tag, key: &ItemKey) -> Option<String> {
    tag.get_string(key).map(str::to_string)
}

/// Re-read the file as its concrete type to get at the ID3v2 tag the
/// generic conversion flattens. Returns `None` for formats that cannot
/// carry one, or files that simply don't.
fn read_id3v2(path: &Path, file_type: FileType, verbosity: Verbosity) -> Option<Id3v2Tag> {
    let options = parse_options(verbosity);
    let mut file = std::fs::File::open(path).ok()?;
    match file_type {
        FileType::Mpeg => MpegFile::read_from(&mut file, options).ok()?.id3v2().cloned(),
        FileType::Wav => WavFile::read_from(&mut file, options).ok()?.id3v2().cloned(),
        FileType::Aiff => AiffFile::read_from(&mut file, options).ok()?.id3v2().cloned(),
        FileType::Flac => FlacFile::read_from(&mut file, options).ok()?.id3v2().cloned(),
        FileType::Ape => ApeFile::read_from(&mut file, options).ok()?.id3v2().cloned(),
        _ => None,
    }
}

/// TXXX frames in file order, standard or not.
fn id3v2_user_text_frames(id3v2: Id3v2Tag) -> Vec<UserTextFrame> {
    id3v2
        .into_iter()
        .filter_map(|frame| match frame {
            Frame::UserText(frame) => Some(UserTextFrame {
                description: frame.description,
                text: frame.content,
            }),
            _ => None,
        })
        .collect()
}

/// Non-ID3v2 formats surface their free-form entries as unknown text items
/// keyed by description; tag order is preserved.
fn generic_user_text_frames(tag: &Tag) -> Vec<UserTextFrame> {
    tag.items()
        .filter_map(|item| match (item.key(), item.value()) {
            (ItemKey::Unknown(description), ItemValue::Text(text)) => Some(UserTextFrame {
                description: description.clone(),
                text: text.clone(),
            }),
            _ => None,
        })
        .collect()
}
