use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "yt-playlist-export",
    version,
    about = "Export YouTube playlists/IDs to FreeTube, Piped and NewPipe formats"
)]
pub struct Cli {
    /// YouTube playlist URL(s)
    pub playlist_urls: Vec<String>,

    /// File with YouTube IDs (one per line)
    #[arg(short = 'f', long)]
    pub ids_file: Option<PathBuf>,

    /// Playlist name (IDs mode or a single URL)
    #[arg(long)]
    pub name: Option<String>,

    /// Playlist description
    #[arg(long, default_value = "")]
    pub description: String,

    /// yt-dlp --cookies-from-browser value, e.g. "brave:Default"
    #[arg(short = 'c', long)]
    pub browser_cookies: Option<String>,

    /// Path to a Netscape cookie file
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// Pass youtubetab:skip=authcheck to yt-dlp
    #[arg(long)]
    pub skip_authcheck: bool,

    /// Seconds to wait between extractor requests
    #[arg(long, allow_negative_numbers = true)]
    pub sleep: Option<f64>,

    /// Export format
    #[arg(short = 'e', long = "export", value_enum, default_value_t = ExportFormat::FreetubeDb)]
    pub format: ExportFormat,

    /// Output path (file, or directory for several FreeTube JSON playlists)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Override FreeTube playlists.db location (file or directory)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Split playlists into chunks of N videos (piped-json, freetube-json)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub split: Option<i64>,

    /// Output directory for split files (default chunks/<basename>)
    #[arg(long)]
    pub split_dir: Option<PathBuf>,

    /// Pretty-print JSON outputs
    #[arg(long)]
    pub pretty: bool,

    /// NewPipe app_version
    #[arg(long, default_value = "0.19.8")]
    pub newpipe_version: String,

    /// NewPipe app_version_int
    #[arg(long, default_value_t = 953)]
    pub newpipe_version_int: i64,

    /// Only log warnings and errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug output, including extractor invocations
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    FreetubeDb,
    FreetubeJson,
    PipedJson,
    PipedCsv,
    Urls,
    Ids,
    NewpipeSubs,
}

impl ExportFormat {
    pub fn supports_split(self) -> bool {
        matches!(self, Self::PipedJson | Self::FreetubeJson)
    }
}
