//! Decoding of `key: value` replies into typed records.
//!
//! Decoding is permissive: a missing key leaves the field's default, and a
//! value that fails to parse also leaves the default without affecting any
//! other field. Callers that want to know about such values pass an
//! `on_invalid` hook to the `*_with` variants.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::protocol::SEPARATOR;

/// One reply parsed into a key/value map. Later duplicates overwrite earlier ones.
pub type Record = HashMap<String, String>;

/// Split each line on its first `": "`; lines without it are dropped.
pub fn parse_record(lines: &[String]) -> Record {
    lines
        .iter()
        .filter_map(|line| line.split_once(SEPARATOR))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Values of `tag` from a `list` reply, in server order.
///
/// The tag is matched case-insensitively; the value is returned verbatim.
pub fn decode_list(lines: &[String], tag: &str) -> Vec<String> {
    let prefix = format!("{}{}", tag, SEPARATOR);
    lines
        .iter()
        .filter_map(|line| {
            line.get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(&prefix))
                .map(|_| line[prefix.len()..].to_string())
        })
        .collect()
}

/// Player status as reported by the `status` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// `play`, `pause`, `stop`, or empty when unknown.
    pub state: String,
    /// 0-100, or -1 when the server has no mixer.
    pub volume: i32,
    pub repeat: bool,
    pub random: bool,
    pub single: bool,
    pub consume: bool,
    pub playlist_length: u32,
    pub song: i32,
    pub song_id: i32,
    pub next_song: i32,
    pub next_song_id: i32,
    /// Whole seconds.
    pub duration: u32,
    /// Seconds into the current song.
    pub elapsed: f64,
    /// kbit/s
    pub bitrate: u32,
    pub error: String,
    pub artist: String,
    pub album: String,
    pub title: String,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            state: String::new(),
            volume: -1,
            repeat: false,
            random: false,
            single: false,
            consume: false,
            playlist_length: 0,
            song: 0,
            song_id: -1,
            next_song: 0,
            next_song_id: -1,
            duration: 0,
            elapsed: 0.0,
            bitrate: 0,
            error: String::new(),
            artist: String::new(),
            album: String::new(),
            title: String::new(),
        }
    }
}

impl Status {
    pub fn is_playing(&self) -> bool {
        self.state == "play"
    }

    pub fn is_paused(&self) -> bool {
        self.state == "pause"
    }

    /// True when a current song exists whose metadata is worth fetching.
    pub fn has_current_song(&self) -> bool {
        self.is_playing() || self.is_paused()
    }

    /// Copy now-playing metadata from a `currentsong` record.
    pub fn apply_song(&mut self, song: &Song) {
        self.artist = song.artist.clone();
        self.album = song.album.clone();
        self.title = song.title.clone();
    }
}

/// Metadata of the current song, from the `currentsong` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub file: String,
    pub artist: String,
    pub album: String,
    pub title: String,
    pub position: Option<u32>,
    pub id: Option<u32>,
    pub duration: Option<f64>,
}

/// Reads fields out of a record, reporting unparsable values.
struct Fields<'a, F> {
    record: &'a Record,
    on_invalid: F,
}

impl<'a, F> Fields<'a, F>
where
    F: FnMut(&str, &str),
{
    fn text(&self, key: &str) -> Option<String> {
        self.record.get(key).cloned()
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.record.get(key).map(|value| value == "1")
    }

    fn parse<T: FromStr>(&mut self, key: &str) -> Option<T> {
        let record = self.record;
        let raw = record.get(key)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                (self.on_invalid)(key, raw);
                None
            }
        }
    }
}

/// Decode a `status` record with silent defaults.
pub fn decode_status(record: &Record) -> Status {
    decode_status_with(record, |_, _| {})
}

/// Decode a `status` record, calling `on_invalid(key, raw)` for each
/// value that could not be parsed.
pub fn decode_status_with<F>(record: &Record, on_invalid: F) -> Status
where
    F: FnMut(&str, &str),
{
    let mut fields = Fields { record, on_invalid };
    let defaults = Status::default();

    Status {
        state: fields.text("state").unwrap_or(defaults.state),
        volume: fields.parse("volume").unwrap_or(defaults.volume),
        repeat: fields.flag("repeat").unwrap_or(defaults.repeat),
        random: fields.flag("random").unwrap_or(defaults.random),
        single: fields.flag("single").unwrap_or(defaults.single),
        consume: fields.flag("consume").unwrap_or(defaults.consume),
        playlist_length: fields
            .parse("playlistlength")
            .unwrap_or(defaults.playlist_length),
        song: fields.parse("song").unwrap_or(defaults.song),
        song_id: fields.parse("songid").unwrap_or(defaults.song_id),
        next_song: fields.parse("nextsong").unwrap_or(defaults.next_song),
        next_song_id: fields.parse("nextsongid").unwrap_or(defaults.next_song_id),
        // Fractional on the wire, truncated to whole seconds
        duration: fields
            .parse::<f64>("duration")
            .map(|secs| secs as u32)
            .unwrap_or(defaults.duration),
        elapsed: fields.parse("elapsed").unwrap_or(defaults.elapsed),
        bitrate: fields.parse("bitrate").unwrap_or(defaults.bitrate),
        error: fields.text("error").unwrap_or(defaults.error),
        artist: defaults.artist,
        album: defaults.album,
        title: defaults.title,
    }
}

pub fn decode_song(record: &Record) -> Song {
    decode_song_with(record, |_, _| {})
}

pub fn decode_song_with<F>(record: &Record, on_invalid: F) -> Song
where
    F: FnMut(&str, &str),
{
    let mut fields = Fields { record, on_invalid };
    Song {
        file: fields.text("file").unwrap_or_default(),
        artist: fields.text("Artist").unwrap_or_default(),
        album: fields.text("Album").unwrap_or_default(),
        title: fields.text("Title").unwrap_or_default(),
        position: fields.parse("Pos"),
        id: fields.parse("Id"),
        duration: fields.parse("duration"),
    }
}
