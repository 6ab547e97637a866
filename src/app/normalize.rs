use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::ident::{new_item_id, now_ms};
use super::model::{Playlist, Subscription, VideoRecord, Visibility};
use crate::error::ExportError;

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_-]{10}[AEIMQUYcgkosw048]").expect("video id pattern is valid")
});

const CHANNEL_URL_PREFIX: &str = "https://www.youtube.com/channel/";
const UNKNOWN_CHANNEL: &str = "Unknown";

pub(crate) fn clean_text(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|ch| !matches!(ch, '\u{200B}'..='\u{200F}' | '\u{FEFF}'))
        .map(|ch| match ch {
            '\u{00A0}' => ' ',
            '\u{2024}' => '.',
            other => other,
        })
        .collect()
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(clean_text(text)),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn text_field(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .filter_map(value_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn uint_field(item: &Value, key: &str) -> u64 {
    match item.get(key) {
        Some(Value::Number(number)) => number.as_u64().unwrap_or_else(|| {
            number
                .as_f64()
                .filter(|value| value.is_finite() && *value > 0.0)
                .map_or(0, |value| value.trunc() as u64)
        }),
        Some(Value::String(text)) => {
            let whole = text.split('.').next().unwrap_or_default();
            whole
                .chars()
                .filter(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .unwrap_or(0)
        }
        _ => 0,
    }
}

pub(crate) fn video_from_item(item: &Value) -> Option<VideoRecord> {
    let video_id = text_field(item, &["id"]);
    if video_id.is_empty() {
        return None;
    }
    Some(VideoRecord {
        video_id,
        title: text_field(item, &["title"]),
        author: text_field(item, &["channel", "uploader"]),
        author_id: text_field(item, &["channel_id", "uploader_id"]),
        length_seconds: uint_field(item, "duration"),
        published: i64::try_from(uint_field(item, "timestamp")).unwrap_or(0),
        time_added: now_ms(),
        item_id: new_item_id(),
        is_placeholder: false,
    })
}

pub(crate) fn placeholder(video_id: &str) -> VideoRecord {
    VideoRecord {
        video_id: video_id.to_string(),
        title: String::new(),
        author: String::new(),
        author_id: String::new(),
        length_seconds: 0,
        published: 0,
        time_added: now_ms(),
        item_id: new_item_id(),
        is_placeholder: true,
    }
}

/// Turn a single-video lookup into exactly one record.
///
/// Lookup failures and items without a title become placeholders carrying the
/// requested id.
pub(crate) fn normalize_lookup(
    video_id: &str,
    outcome: Result<Value, ExportError>,
) -> VideoRecord {
    let item = match outcome {
        Ok(item) => item,
        Err(err) => {
            warn!("{video_id}: {err}; writing placeholder");
            return placeholder(video_id);
        }
    };

    let has_title = item.get("title").is_some_and(|title| !title.is_null());
    match video_from_item(&item) {
        Some(mut record) if has_title => {
            if record.video_id != video_id {
                record.video_id = video_id.to_string();
            }
            record
        }
        _ => {
            warn!("{video_id}: extractor returned no metadata; writing placeholder");
            placeholder(video_id)
        }
    }
}

pub(crate) fn playlist_from_listing(
    info: &Value,
    name_override: Option<&str>,
    description: &str,
    source: &str,
) -> Playlist {
    let name = name_override
        .map(str::to_string)
        .unwrap_or_else(|| text_field(info, &["title"]));
    let mut playlist = Playlist::new(&name, description, source);
    playlist.visibility =
        Visibility::from_availability(info.get("availability").and_then(Value::as_str));

    let entries = info
        .get("entries")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (index, entry) in entries.iter().enumerate() {
        match video_from_item(entry) {
            Some(record) => playlist.push(record),
            None => warn!("{source}: entry #{} has no video id, skipped", index + 1),
        }
    }
    playlist
}

pub(crate) fn subscriptions_from_feed(info: &Value) -> Vec<Subscription> {
    let Some(entries) = info.get("entries").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter(|entry| !entry.is_null())
        .filter_map(|entry| {
            let channel_id = text_field(entry, &["channel_id", "id"]);
            if channel_id.is_empty() {
                return None;
            }
            let mut name = text_field(entry, &["title", "channel"]);
            if name.is_empty() {
                name = UNKNOWN_CHANNEL.to_string();
            }
            Some(Subscription::youtube(
                format!("{CHANNEL_URL_PREFIX}{channel_id}"),
                name,
            ))
        })
        .collect()
}

/// Video ids from an ID file body: one per line, blank lines and `#` comments
/// ignored, the first id-shaped token on a line wins.
pub(crate) fn parse_ids(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| VIDEO_ID_RE.find(line))
        .map(|found| found.as_str().to_string())
        .collect()
}

pub(crate) fn read_ids_file(path: &Path) -> Result<Vec<String>, ExportError> {
    let raw = fs::read_to_string(path).map_err(|err| ExportError::io(path, err))?;
    Ok(parse_ids(&raw))
}
