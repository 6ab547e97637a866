use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command as ProcessCommand, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::error::ExportError;

const YTDLP_ENV: &str = "YT_PLAYLIST_EXPORT_YTDLP";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
pub(crate) const SUBSCRIPTIONS_FEED_URL: &str = "https://www.youtube.com/feed/channels";

/// Source of raw metadata items. Implementations never retry.
pub(crate) trait Extractor {
    fn extract_playlist(&mut self, url: &str) -> Result<Value, ExportError>;
    fn extract_video(&mut self, video_id: &str) -> Result<Value, ExportError>;
    fn fetch_subscriptions(&mut self) -> Result<Value, ExportError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ExtractorSettings {
    pub(crate) cookies_file: Option<PathBuf>,
    pub(crate) browser_cookies: Option<String>,
    pub(crate) skip_authcheck: bool,
    pub(crate) request_delay: Option<Duration>,
    pub(crate) verbose: bool,
}

#[derive(Debug)]
pub(crate) struct YtDlp {
    bin: PathBuf,
    settings: ExtractorSettings,
    last_request: Option<Instant>,
}

impl YtDlp {
    pub(crate) fn new(settings: ExtractorSettings) -> Self {
        Self {
            bin: resolve_ytdlp_bin(),
            settings,
            last_request: None,
        }
    }

    fn command(&self, flat: bool) -> ProcessCommand {
        let mut cmd = ProcessCommand::new(&self.bin);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args(base_args(&self.settings, flat));
        cmd
    }

    fn wait_for_slot(&mut self) {
        if let (Some(delay), Some(last)) = (self.settings.request_delay, self.last_request) {
            let elapsed = last.elapsed();
            if elapsed < delay {
                thread::sleep(delay - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }

    fn dump_json(&mut self, input: &str, url: &str, flat: bool) -> Result<Value, ExportError> {
        self.wait_for_slot();
        let mut cmd = self.command(flat);
        cmd.arg(url);
        debug!("running {} for {url}", self.bin.display());

        let output = cmd.output().map_err(|err| {
            ExportError::extraction(
                input,
                format!("failed to launch {}: {err}", self.bin.display()),
            )
        })?;
        if self.settings.verbose {
            for line in String::from_utf8_lossy(&output.stderr).lines() {
                debug!("yt-dlp: {line}");
            }
        }
        if !output.status.success() {
            return Err(ExportError::extraction(
                input,
                failure_reason(&output.stderr, &output.status.to_string()),
            ));
        }

        let value: Value = serde_json::from_slice(&output.stdout).map_err(|err| {
            ExportError::extraction(input, format!("unparseable yt-dlp output: {err}"))
        })?;
        if value.is_null() {
            return Err(ExportError::extraction(input, "yt-dlp returned no data"));
        }
        Ok(value)
    }
}

impl Extractor for YtDlp {
    fn extract_playlist(&mut self, url: &str) -> Result<Value, ExportError> {
        self.dump_json(url, url, true)
    }

    fn extract_video(&mut self, video_id: &str) -> Result<Value, ExportError> {
        let url = format!("{WATCH_URL}{video_id}");
        self.dump_json(video_id, &url, false)
    }

    fn fetch_subscriptions(&mut self) -> Result<Value, ExportError> {
        self.dump_json(SUBSCRIPTIONS_FEED_URL, SUBSCRIPTIONS_FEED_URL, true)
    }
}

pub(crate) fn base_args(settings: &ExtractorSettings, flat: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--dump-single-json".into(),
        "--skip-download".into(),
        "--no-warnings".into(),
    ];
    if flat {
        args.push("--flat-playlist".into());
        args.push("--ignore-errors".into());
    } else {
        args.push("--no-playlist".into());
    }
    if let Some(cookies) = &settings.cookies_file {
        args.push("--cookies".into());
        args.push(cookies.into());
    } else if let Some(browser) = &settings.browser_cookies {
        args.push("--cookies-from-browser".into());
        args.push(browser.into());
    }
    if settings.skip_authcheck {
        args.push("--extractor-args".into());
        args.push("youtubetab:skip=authcheck".into());
    }
    if let Some(delay) = settings.request_delay {
        args.push("--sleep-requests".into());
        args.push(delay.as_secs_f64().to_string().into());
    }
    if settings.verbose {
        args.push("--verbose".into());
    }
    args
}

/// Last meaningful stderr line, bounded, or the exit status when stderr is empty.
pub(crate) fn failure_reason(stderr: &[u8], status: &str) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let line = stderr
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty() && !line.starts_with("[debug]"));
    match line {
        Some(line) => {
            let line = line.strip_prefix("ERROR: ").unwrap_or(line);
            line.chars().take(240).collect()
        }
        None => format!("yt-dlp {status}"),
    }
}

pub(crate) fn resolve_ytdlp_bin() -> PathBuf {
    resolve_ytdlp_bin_from_env(env::var_os(YTDLP_ENV))
}

pub(crate) fn resolve_ytdlp_bin_from_env(env_value: Option<OsString>) -> PathBuf {
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from("yt-dlp"),
    }
}
