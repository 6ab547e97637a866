use serde::Serialize;

use super::ident::{new_playlist_id, now_ms};

pub(crate) const DEFAULT_PLAYLIST_NAME: &str = "Imported Playlist";

/// Canonical video entry. Descriptive fields are empty/zero when unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VideoRecord {
    pub(crate) video_id: String,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) author_id: String,
    pub(crate) length_seconds: u64,
    pub(crate) published: i64,
    pub(crate) time_added: i64,
    pub(crate) item_id: String,
    pub(crate) is_placeholder: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Visibility {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl Visibility {
    pub(crate) fn from_availability(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("public") => Self::Public,
            Some("unlisted") => Self::Unlisted,
            _ => Self::Private,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Playlist {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) videos: Vec<VideoRecord>,
    pub(crate) playlist_id: String,
    pub(crate) created_at: i64,
    pub(crate) last_updated_at: i64,
    pub(crate) visibility: Visibility,
    pub(crate) source: String,
}

impl Playlist {
    pub(crate) fn new(name: &str, description: &str, source: impl Into<String>) -> Self {
        let name = name.trim();
        let ts = now_ms();
        Self {
            name: if name.is_empty() {
                DEFAULT_PLAYLIST_NAME.to_string()
            } else {
                name.to_string()
            },
            description: description.to_string(),
            videos: Vec::new(),
            playlist_id: new_playlist_id(),
            created_at: ts,
            last_updated_at: ts,
            visibility: Visibility::default(),
            source: source.into(),
        }
    }

    pub(crate) fn push(&mut self, video: VideoRecord) {
        self.videos.push(video);
        self.last_updated_at = now_ms().max(self.last_updated_at);
    }

    pub(crate) fn placeholder_count(&self) -> usize {
        self.videos.iter().filter(|video| video.is_placeholder).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Subscription {
    pub(crate) service_id: u32,
    pub(crate) url: String,
    pub(crate) name: String,
}

impl Subscription {
    pub(crate) const YOUTUBE: u32 = 0;

    pub(crate) fn youtube(url: String, name: String) -> Self {
        Self {
            service_id: Self::YOUTUBE,
            url,
            name,
        }
    }
}
