use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::writer::Destination;

const DATABASE_NAME: &str = "playlists.db";
const FLATPAK_CONFIG: &str = ".var/app/io.freetubeapp.FreeTube/config/FreeTube";

/// Resolve where FreeTube's `playlists.db` lives.
///
/// An explicit override is trusted enough to have its directory created; the OS
/// default must already exist (FreeTube creates it on first launch).
pub fn freetube_database(override_path: Option<&Path>) -> Result<Destination> {
    if let Some(user_path) = override_path {
        return Ok(Destination::creatable(resolve_override(user_path)));
    }
    Ok(Destination::new(default_config_dir()?.join(DATABASE_NAME)))
}

pub(crate) fn resolve_override(user_path: &Path) -> PathBuf {
    let named_like_file = user_path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("db") || ext.eq_ignore_ascii_case("json"));
    if user_path.is_file() || named_like_file {
        user_path.to_path_buf()
    } else {
        user_path.join(DATABASE_NAME)
    }
}

fn default_config_dir() -> Result<PathBuf> {
    if cfg!(target_os = "linux")
        && let Some(home) = dirs::home_dir()
    {
        let flatpak = home.join(FLATPAK_CONFIG);
        if flatpak.exists() {
            return Ok(flatpak);
        }
    }
    let base = dirs::config_dir().context("unable to resolve config directory")?;
    Ok(base.join("FreeTube"))
}
