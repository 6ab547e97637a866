use std::num::NonZeroUsize;

use super::ident::new_playlist_id;
use super::model::Playlist;
use crate::error::ExportError;

const FALLBACK_STEM: &str = "playlist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChunkSize(NonZeroUsize);

impl ChunkSize {
    pub(crate) fn new(raw: i64) -> Result<Self, ExportError> {
        usize::try_from(raw)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or_else(|| {
                ExportError::Configuration(format!("split size must be a positive integer, got {raw}"))
            })
    }

    pub(crate) fn get(self) -> usize {
        self.0.get()
    }
}

/// Filename parts for chunks: `<base>_<stem>_<NNN>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkNaming {
    pub(crate) base: String,
    pub(crate) stem: String,
    pub(crate) ext: String,
}

impl ChunkNaming {
    pub(crate) fn file_name(&self, sequence: usize) -> String {
        format!("{}_{}_{sequence:03}.{}", self.base, self.stem, self.ext)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Chunk {
    pub(crate) file_name: String,
    pub(crate) playlist: Playlist,
}

/// Partition `playlist` into contiguous chunks of at most `size` videos.
///
/// Each chunk is its own playlist (fresh id) sharing the parent's name and
/// metadata. Sequence numbers start at 1 and have no gaps.
pub(crate) fn split_playlist(playlist: &Playlist, size: ChunkSize, naming: &ChunkNaming) -> Vec<Chunk> {
    playlist
        .videos
        .chunks(size.get())
        .enumerate()
        .map(|(index, videos)| Chunk {
            file_name: naming.file_name(index + 1),
            playlist: Playlist {
                name: playlist.name.clone(),
                description: playlist.description.clone(),
                videos: videos.to_vec(),
                playlist_id: new_playlist_id(),
                created_at: playlist.created_at,
                last_updated_at: playlist.last_updated_at,
                visibility: playlist.visibility,
                source: playlist.source.clone(),
            },
        })
        .collect()
}

pub(crate) fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() || trimmed.chars().all(|ch| ch == '.') {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}
