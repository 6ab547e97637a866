use std::path::PathBuf;
use std::time::Duration;

use super::encode::JsonStyle;
use super::extractor::ExtractorSettings;
use super::split::ChunkSize;
use crate::cli::{Cli, ExportFormat};
use crate::error::ExportError;

/// Validated settings for one invocation. Built before any extraction or I/O.
#[derive(Debug, Clone)]
pub(crate) struct ExportPlan {
    pub(crate) format: ExportFormat,
    pub(crate) urls: Vec<String>,
    pub(crate) ids_file: Option<PathBuf>,
    pub(crate) name: Option<String>,
    pub(crate) description: String,
    pub(crate) output: Option<PathBuf>,
    pub(crate) database_path: Option<PathBuf>,
    pub(crate) split: Option<ChunkSize>,
    pub(crate) split_dir: Option<PathBuf>,
    pub(crate) style: JsonStyle,
    pub(crate) newpipe_version: String,
    pub(crate) newpipe_version_int: i64,
    pub(crate) extractor: ExtractorSettings,
}

impl ExportPlan {
    pub(crate) fn from_cli(cli: &Cli) -> Result<Self, ExportError> {
        let split = cli.split.map(ChunkSize::new).transpose()?;
        if split.is_some() && !cli.format.supports_split() {
            return Err(ExportError::Configuration(
                "--split only applies to piped-json and freetube-json".to_string(),
            ));
        }
        if cli.split_dir.is_some() && split.is_none() {
            return Err(ExportError::Configuration(
                "--split-dir requires --split".to_string(),
            ));
        }
        if cli.format == ExportFormat::NewpipeSubs
            && (!cli.playlist_urls.is_empty() || cli.ids_file.is_some())
        {
            return Err(ExportError::Configuration(
                "newpipe-subs does not take playlist URLs or --ids-file".to_string(),
            ));
        }
        if cli.cookies.is_some() && cli.browser_cookies.is_some() {
            return Err(ExportError::Configuration(
                "use either --cookies or --browser-cookies, not both".to_string(),
            ));
        }
        if cli.path.is_some() && cli.format != ExportFormat::FreetubeDb {
            return Err(ExportError::Configuration(
                "--path only applies to freetube-db".to_string(),
            ));
        }
        if cli.output.is_some() && cli.format == ExportFormat::FreetubeDb {
            return Err(ExportError::Configuration(
                "freetube-db writes to --path, not --output".to_string(),
            ));
        }
        let request_delay = cli.sleep.map(parse_delay).transpose()?;

        Ok(Self {
            format: cli.format,
            urls: cli.playlist_urls.clone(),
            ids_file: cli.ids_file.clone(),
            name: cli.name.clone().filter(|name| !name.trim().is_empty()),
            description: cli.description.clone(),
            output: cli.output.clone(),
            database_path: cli.path.clone(),
            split,
            split_dir: cli.split_dir.clone(),
            style: JsonStyle::from_pretty(cli.pretty),
            newpipe_version: cli.newpipe_version.clone(),
            newpipe_version_int: cli.newpipe_version_int,
            extractor: ExtractorSettings {
                cookies_file: cli.cookies.clone(),
                browser_cookies: cli.browser_cookies.clone(),
                skip_authcheck: cli.skip_authcheck,
                request_delay,
                verbose: cli.verbose,
            },
        })
    }

    pub(crate) fn has_playlist_inputs(&self) -> bool {
        !self.urls.is_empty() || self.ids_file.is_some()
    }

    pub(crate) fn name_for_url(&self) -> Option<&str> {
        (self.urls.len() == 1).then_some(self.name.as_deref()).flatten()
    }
}

fn parse_delay(seconds: f64) -> Result<Duration, ExportError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        ExportError::Configuration(format!("--sleep must be a non-negative number, got {seconds}"))
    })
}
