use chrono::Utc;
use uuid::Uuid;

const PLAYLIST_ID_PREFIX: &str = "ft-playlist--";

pub(crate) fn new_item_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn new_playlist_id() -> String {
    format!("{PLAYLIST_ID_PREFIX}{}", Uuid::new_v4())
}

/// Wall-clock epoch milliseconds. Not monotonic across calls.
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
