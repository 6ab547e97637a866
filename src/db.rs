use std::path::Path;

use crate::app::encode::{Document, JsonStyle};
use crate::app::model::Playlist;
use crate::error::ExportError;
use crate::writer::{Destination, append_line};

#[derive(Debug, Clone)]
pub struct PlaylistDatabase {
    dest: Destination,
}

impl PlaylistDatabase {
    pub fn open(dest: Destination) -> Self {
        Self { dest }
    }

    pub fn path(&self) -> &Path {
        &self.dest.path
    }

    pub fn append(&self, playlist: &Playlist) -> Result<(), ExportError> {
        let record = Document::FreetubePlaylist(playlist)
            .encode(JsonStyle::Compact)
            .map_err(|err| ExportError::io(&self.dest.path, err.into()))?;
        append_line(&self.dest, &record)
    }
}
