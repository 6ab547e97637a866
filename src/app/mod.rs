pub(crate) mod encode;
mod extractor;
mod ident;
pub(crate) mod model;
pub(crate) mod normalize;
mod plan;
mod split;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::CommandFactory;
use tracing::{error, info, warn};

use crate::cli::{Cli, ExportFormat};
use crate::db::PlaylistDatabase;
use crate::error::ExportError;
use crate::paths::freetube_database;
use crate::writer::{Destination, write_atomic};

use self::encode::{Document, JsonStyle};
use self::extractor::{Extractor, SUBSCRIPTIONS_FEED_URL, YtDlp};
use self::model::Playlist;
use self::normalize::{
    normalize_lookup, playlist_from_listing, read_ids_file, subscriptions_from_feed,
};
use self::plan::ExportPlan;
use self::split::{ChunkNaming, ChunkSize, sanitize_name, split_playlist};

const FREETUBE_JSON_DIR: &str = "freetube_json_playlists";
const SPLIT_ROOT: &str = "chunks";
const SUBSCRIPTIONS_FILE: &str = "newpipe-subscriptions.json";

pub fn run(cli: Cli) -> Result<()> {
    let plan = ExportPlan::from_cli(&cli)?;
    if plan.format != ExportFormat::NewpipeSubs && !plan.has_playlist_inputs() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let database = match plan.format {
        ExportFormat::FreetubeDb => Some(PlaylistDatabase::open(freetube_database(
            plan.database_path.as_deref(),
        )?)),
        _ => None,
    };
    let mut extractor = YtDlp::new(plan.extractor.clone());

    let report = export(&plan, &mut extractor, database.as_ref());
    report.log_summary();
    report.into_result()?;
    Ok(())
}

#[derive(Debug)]
pub(crate) struct JobOutcome {
    pub(crate) job: String,
    pub(crate) result: Result<Vec<PathBuf>, ExportError>,
}

#[derive(Debug, Default)]
pub(crate) struct BatchReport {
    pub(crate) jobs: Vec<JobOutcome>,
}

impl BatchReport {
    fn record(&mut self, job: impl Into<String>, result: Result<Vec<PathBuf>, ExportError>) {
        let job = job.into();
        if let Err(err) = &result {
            error!("{job}: {err}");
        }
        self.jobs.push(JobOutcome { job, result });
    }

    pub(crate) fn failed(&self) -> usize {
        self.jobs.iter().filter(|job| job.result.is_err()).count()
    }

    pub(crate) fn written(&self) -> Vec<&Path> {
        self.jobs
            .iter()
            .filter_map(|job| job.result.as_ref().ok())
            .flatten()
            .map(PathBuf::as_path)
            .collect()
    }

    fn log_summary(&self) {
        let written = self.written().len();
        match self.failed() {
            0 => info!("Done: {written} file(s) written"),
            failed => {
                warn!("Done: {written} file(s) written, {failed} job(s) failed");
                for job in self.jobs.iter().filter(|job| job.result.is_err()) {
                    warn!("  failed: {}", job.job);
                }
            }
        }
    }

    pub(crate) fn into_result(self) -> Result<(), ExportError> {
        match self.failed() {
            0 => Ok(()),
            failed => Err(ExportError::PartialBatch {
                failed,
                total: self.jobs.len(),
            }),
        }
    }
}

/// Run every job in `plan` in order. A failing job never stops its siblings.
pub(crate) fn export(
    plan: &ExportPlan,
    extractor: &mut dyn Extractor,
    database: Option<&PlaylistDatabase>,
) -> BatchReport {
    let mut report = BatchReport::default();
    if plan.format == ExportFormat::NewpipeSubs {
        let result = export_subscriptions(plan, extractor);
        report.record(SUBSCRIPTIONS_FEED_URL, result);
        return report;
    }

    let playlists = collect_playlists(plan, extractor, &mut report);
    if playlists.is_empty() {
        return report;
    }

    match plan.format {
        ExportFormat::FreetubeDb => match database {
            Some(db) => {
                for playlist in &playlists {
                    report.record(playlist.source.as_str(), append_to_database(db, playlist));
                }
            }
            None => report.record(
                "freetube-db",
                Err(ExportError::Configuration(
                    "no FreeTube database location".to_string(),
                )),
            ),
        },
        ExportFormat::FreetubeJson => match plan.split {
            Some(size) => export_chunks(plan, &playlists, size, ChunkDocument::Freetube, &mut report),
            None => export_freetube_json(plan, &playlists, &mut report),
        },
        ExportFormat::PipedJson => match plan.split {
            Some(size) => export_chunks(plan, &playlists, size, ChunkDocument::Piped, &mut report),
            None => write_combined(plan, Document::PipedJson(&playlists), "piped.json", &mut report),
        },
        ExportFormat::PipedCsv => {
            write_combined(plan, Document::PipedCsv(&playlists), "piped.csv", &mut report)
        }
        ExportFormat::Urls => {
            write_combined(plan, Document::UrlList(&playlists), "urls.txt", &mut report)
        }
        ExportFormat::Ids => {
            write_combined(plan, Document::IdList(&playlists), "ids.txt", &mut report)
        }
        // Exported from the channel feed above.
        ExportFormat::NewpipeSubs => {}
    }
    report
}

fn collect_playlists(
    plan: &ExportPlan,
    extractor: &mut dyn Extractor,
    report: &mut BatchReport,
) -> Vec<Playlist> {
    let mut playlists = Vec::new();

    if let Some(ids_file) = &plan.ids_file {
        match playlist_from_ids_file(plan, ids_file, extractor) {
            Ok(playlist) => playlists.push(playlist),
            Err(err) => report.record(ids_file.display().to_string(), Err(err)),
        }
    }

    for url in &plan.urls {
        match extractor.extract_playlist(url) {
            Ok(info) => {
                let playlist =
                    playlist_from_listing(&info, plan.name_for_url(), &plan.description, url);
                info!("{url}: '{}' with {} video(s)", playlist.name, playlist.videos.len());
                playlists.push(playlist);
            }
            Err(err) => report.record(url.as_str(), Err(err)),
        }
    }
    playlists
}

fn playlist_from_ids_file(
    plan: &ExportPlan,
    path: &Path,
    extractor: &mut dyn Extractor,
) -> Result<Playlist, ExportError> {
    let source = path.display().to_string();
    let ids = read_ids_file(path)?;
    if ids.is_empty() {
        return Err(ExportError::extraction(source, "no valid YouTube IDs found"));
    }

    let name = plan
        .name
        .clone()
        .unwrap_or_else(|| default_ids_name(path, ids.len()));
    let mut playlist = Playlist::new(&name, &plan.description, source.as_str());
    for video_id in &ids {
        let record = normalize_lookup(video_id, extractor.extract_video(video_id));
        if !record.is_placeholder {
            info!("{video_id}  |  {}  |  {}", record.title, record.author);
        }
        playlist.push(record);
    }

    let placeholders = playlist.placeholder_count();
    if placeholders > 0 {
        warn!(
            "{source}: {placeholders} of {} video(s) exported as placeholders",
            ids.len()
        );
    }
    Ok(playlist)
}

fn default_ids_name(path: &Path, count: usize) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or_else(|| format!("Imported IDs ({count})"))
}

fn append_to_database(
    db: &PlaylistDatabase,
    playlist: &Playlist,
) -> Result<Vec<PathBuf>, ExportError> {
    db.append(playlist)?;
    info!(
        "Playlist '{}' ({} video(s)) appended to {}",
        playlist.name,
        playlist.videos.len(),
        db.path().display()
    );
    Ok(vec![db.path().to_path_buf()])
}

fn write_document(
    dest: &Destination,
    document: Document<'_>,
    style: JsonStyle,
) -> Result<PathBuf, ExportError> {
    let bytes = document
        .encode(style)
        .map_err(|err| ExportError::io(&dest.path, err.into()))?;
    write_atomic(dest, &bytes)?;
    info!(
        "Wrote {} ({} entries)",
        dest.path.display(),
        document.entry_count()
    );
    Ok(dest.path.clone())
}

fn write_combined(
    plan: &ExportPlan,
    document: Document<'_>,
    default_name: &str,
    report: &mut BatchReport,
) {
    let dest = Destination::new(
        plan.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_name)),
    );
    let result = write_document(&dest, document, plan.style).map(|path| vec![path]);
    report.record(dest.path.display().to_string(), result);
}

fn export_freetube_json(plan: &ExportPlan, playlists: &[Playlist], report: &mut BatchReport) {
    if let [playlist] = playlists {
        let path = plan.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!("{}.freetube.json", sanitize_name(&playlist.name)))
        });
        let result = write_document(
            &Destination::new(path),
            Document::FreetubePlaylist(playlist),
            plan.style,
        );
        report.record(playlist.source.as_str(), result.map(|path| vec![path]));
        return;
    }

    let dir = plan
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(FREETUBE_JSON_DIR));
    for (playlist, stem) in playlists.iter().zip(unique_stems(playlists)) {
        let dest = Destination::creatable(dir.join(format!("{stem}.json")));
        let result = write_document(&dest, Document::FreetubePlaylist(playlist), plan.style);
        report.record(playlist.source.as_str(), result.map(|path| vec![path]));
    }
}

#[derive(Debug, Clone, Copy)]
enum ChunkDocument {
    Piped,
    Freetube,
}

impl ChunkDocument {
    fn default_base(self) -> &'static str {
        match self {
            Self::Piped => "piped",
            Self::Freetube => "freetube",
        }
    }
}

fn export_chunks(
    plan: &ExportPlan,
    playlists: &[Playlist],
    size: ChunkSize,
    kind: ChunkDocument,
    report: &mut BatchReport,
) {
    let base = plan
        .output
        .as_deref()
        .and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| kind.default_base().to_string());
    let dir = plan
        .split_dir
        .clone()
        .unwrap_or_else(|| Path::new(SPLIT_ROOT).join(&base));

    for (playlist, stem) in playlists.iter().zip(unique_stems(playlists)) {
        let naming = ChunkNaming {
            base: base.clone(),
            stem,
            ext: "json".to_string(),
        };
        let chunks = split_playlist(playlist, size, &naming);
        if chunks.is_empty() {
            warn!("{}: playlist '{}' is empty, nothing to split", playlist.source, playlist.name);
        }

        let mut written = Vec::with_capacity(chunks.len());
        let mut result = Ok(());
        for chunk in &chunks {
            let dest = Destination::creatable(dir.join(&chunk.file_name));
            let document = match kind {
                ChunkDocument::Piped => Document::PipedJson(std::slice::from_ref(&chunk.playlist)),
                ChunkDocument::Freetube => Document::FreetubePlaylist(&chunk.playlist),
            };
            match write_document(&dest, document, plan.style) {
                Ok(path) => written.push(path),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        if !written.is_empty() {
            info!(
                "{}: {} chunk file(s) in {}",
                playlist.source,
                written.len(),
                dir.display()
            );
        }
        report.record(playlist.source.as_str(), result.map(|()| written));
    }
}

fn unique_stems(playlists: &[Playlist]) -> Vec<String> {
    let mut seen = HashSet::new();
    playlists
        .iter()
        .map(|playlist| {
            let stem = sanitize_name(&playlist.name);
            let mut candidate = stem.clone();
            let mut suffix = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{stem}_{suffix}");
                suffix += 1;
            }
            candidate
        })
        .collect()
}

fn export_subscriptions(
    plan: &ExportPlan,
    extractor: &mut dyn Extractor,
) -> Result<Vec<PathBuf>, ExportError> {
    info!("Fetching subscriptions from {SUBSCRIPTIONS_FEED_URL}");
    let feed = extractor.fetch_subscriptions()?;
    let subscriptions = subscriptions_from_feed(&feed);
    if subscriptions.is_empty() {
        return Err(ExportError::extraction(
            SUBSCRIPTIONS_FEED_URL,
            "no subscriptions found; make sure the cookies belong to a logged-in account",
        ));
    }

    let dest = Destination::new(
        plan.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(SUBSCRIPTIONS_FILE)),
    );
    let document = Document::NewpipeSubscriptions {
        app_version: &plan.newpipe_version,
        app_version_int: plan.newpipe_version_int,
        subscriptions: &subscriptions,
    };
    Ok(vec![write_document(&dest, document, plan.style)?])
}
