use serde::Serialize;

use super::model::{Playlist, Subscription, VideoRecord, Visibility};

const PIPED_WATCH_URL: &str = "https://youtube.com/watch?v=";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const PIPED_FORMAT: &str = "Piped";
const PIPED_VERSION: u32 = 1;
const CSV_HEADER: &str = "videoId,addedAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonStyle {
    Pretty,
    Compact,
}

impl JsonStyle {
    pub(crate) fn from_pretty(pretty: bool) -> Self {
        if pretty { Self::Pretty } else { Self::Compact }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Document<'a> {
    FreetubePlaylist(&'a Playlist),
    PipedJson(&'a [Playlist]),
    PipedCsv(&'a [Playlist]),
    UrlList(&'a [Playlist]),
    IdList(&'a [Playlist]),
    NewpipeSubscriptions {
        app_version: &'a str,
        app_version_int: i64,
        subscriptions: &'a [Subscription],
    },
}

impl Document<'_> {
    /// Encode to bytes. `style` only affects the JSON schemas.
    pub(crate) fn encode(&self, style: JsonStyle) -> serde_json::Result<Vec<u8>> {
        match *self {
            Self::FreetubePlaylist(playlist) => to_json(&FreetubeRecord::new(playlist), style),
            Self::PipedJson(playlists) => to_json(&PipedExport::new(playlists), style),
            Self::PipedCsv(playlists) => Ok(piped_csv(playlists)),
            Self::UrlList(playlists) => Ok(lines(playlists, |video| {
                format!("{WATCH_URL}{}", video.video_id)
            })),
            Self::IdList(playlists) => Ok(lines(playlists, |video| video.video_id.clone())),
            Self::NewpipeSubscriptions {
                app_version,
                app_version_int,
                subscriptions,
            } => to_json(
                &NewpipeExport {
                    app_version,
                    app_version_int,
                    subscriptions,
                },
                style,
            ),
        }
    }

    pub(crate) fn entry_count(&self) -> usize {
        match *self {
            Self::FreetubePlaylist(playlist) => playlist.videos.len(),
            Self::PipedJson(playlists)
            | Self::PipedCsv(playlists)
            | Self::UrlList(playlists)
            | Self::IdList(playlists) => playlists.iter().map(|pl| pl.videos.len()).sum(),
            Self::NewpipeSubscriptions { subscriptions, .. } => subscriptions.len(),
        }
    }
}

fn to_json<T: Serialize>(value: &T, style: JsonStyle) -> serde_json::Result<Vec<u8>> {
    match style {
        JsonStyle::Pretty => serde_json::to_vec_pretty(value),
        JsonStyle::Compact => serde_json::to_vec(value),
    }
}

fn all_videos(playlists: &[Playlist]) -> impl Iterator<Item = &VideoRecord> {
    playlists.iter().flat_map(|playlist| playlist.videos.iter())
}

fn lines(playlists: &[Playlist], render: impl Fn(&VideoRecord) -> String) -> Vec<u8> {
    let mut out = String::new();
    for video in all_videos(playlists) {
        out.push_str(&render(video));
        out.push('\n');
    }
    out.into_bytes()
}

fn piped_csv(playlists: &[Playlist]) -> Vec<u8> {
    let mut out = String::from(CSV_HEADER);
    out.push_str("\r\n");
    for video in all_videos(playlists) {
        out.push_str(&csv_field(&video.video_id));
        out.push(',');
        out.push_str(&video.time_added.to_string());
        out.push_str("\r\n");
    }
    out.into_bytes()
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FreetubeRecord<'a> {
    playlist_name: &'a str,
    protected: bool,
    description: &'a str,
    videos: Vec<FreetubeVideo<'a>>,
    #[serde(rename = "_id")]
    id: &'a str,
    created_at: i64,
    last_updated_at: i64,
}

impl<'a> FreetubeRecord<'a> {
    fn new(playlist: &'a Playlist) -> Self {
        Self {
            playlist_name: &playlist.name,
            protected: false,
            description: &playlist.description,
            videos: playlist.videos.iter().map(FreetubeVideo::new).collect(),
            id: &playlist.playlist_id,
            created_at: playlist.created_at,
            last_updated_at: playlist.last_updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FreetubeVideo<'a> {
    video_id: &'a str,
    title: &'a str,
    author: &'a str,
    author_id: &'a str,
    length_seconds: u64,
    published: i64,
    time_added: i64,
    playlist_item_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> FreetubeVideo<'a> {
    fn new(video: &'a VideoRecord) -> Self {
        Self {
            video_id: &video.video_id,
            title: &video.title,
            author: &video.author,
            author_id: &video.author_id,
            length_seconds: video.length_seconds,
            published: video.published,
            time_added: video.time_added,
            playlist_item_id: &video.item_id,
            kind: "video",
        }
    }
}

#[derive(Serialize)]
struct PipedExport<'a> {
    format: &'static str,
    version: u32,
    playlists: Vec<PipedPlaylist<'a>>,
}

impl<'a> PipedExport<'a> {
    fn new(playlists: &'a [Playlist]) -> Self {
        Self {
            format: PIPED_FORMAT,
            version: PIPED_VERSION,
            playlists: playlists
                .iter()
                .map(|playlist| PipedPlaylist {
                    name: &playlist.name,
                    kind: "playlist",
                    visibility: playlist.visibility,
                    videos: playlist
                        .videos
                        .iter()
                        .map(|video| format!("{PIPED_WATCH_URL}{}", video.video_id))
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct PipedPlaylist<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    visibility: Visibility,
    videos: Vec<String>,
}

#[derive(Serialize)]
struct NewpipeExport<'a> {
    app_version: &'a str,
    app_version_int: i64,
    subscriptions: &'a [Subscription],
}
