use std::collections::HashMap;
use std::fs;
use std::path::Path;

use clap::Parser;
use serde_json::{Value, json};
use tempfile::TempDir;

use super::extractor::Extractor;
use super::plan::ExportPlan;
use super::*;

#[derive(Debug, Default)]
struct FakeExtractor {
    playlists: HashMap<String, Value>,
    videos: HashMap<String, Value>,
    feed: Option<Value>,
    calls: Vec<String>,
}

impl FakeExtractor {
    fn with_video(mut self, id: &str, title: &str) -> Self {
        self.videos.insert(
            id.to_string(),
            json!({"id": id, "title": title, "channel": "Channel", "channel_id": "UC1", "duration": 60}),
        );
        self
    }

    fn with_playlist(mut self, url: &str, title: &str, ids: &[String]) -> Self {
        let entries = ids
            .iter()
            .map(|id| json!({"id": id, "title": format!("Video {id}")}))
            .collect::<Vec<_>>();
        self.playlists
            .insert(url.to_string(), json!({"title": title, "entries": entries}));
        self
    }
}

impl Extractor for FakeExtractor {
    fn extract_playlist(&mut self, url: &str) -> Result<Value, ExportError> {
        self.calls.push(url.to_string());
        self.playlists
            .get(url)
            .cloned()
            .ok_or_else(|| ExportError::extraction(url, "This playlist does not exist"))
    }

    fn extract_video(&mut self, video_id: &str) -> Result<Value, ExportError> {
        self.calls.push(video_id.to_string());
        self.videos
            .get(video_id)
            .cloned()
            .ok_or_else(|| ExportError::extraction(video_id, "Video unavailable"))
    }

    fn fetch_subscriptions(&mut self) -> Result<Value, ExportError> {
        self.calls.push("feed".to_string());
        self.feed
            .clone()
            .ok_or_else(|| ExportError::extraction("feed", "login required"))
    }
}

fn plan_for(args: &[&str]) -> ExportPlan {
    let cli = Cli::try_parse_from(std::iter::once("yt-playlist-export").chain(args.iter().copied()))
        .expect("arguments parse");
    ExportPlan::from_cli(&cli).expect("valid plan")
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn ids(count: usize) -> Vec<String> {
    (0..count).map(|n| format!("v{n:010}")).collect()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).expect("read output")).expect("valid json")
}

fn strip_volatile(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in ["timeAdded", "createdAt", "lastUpdatedAt", "_id", "playlistItemId"] {
                map.remove(key);
            }
            map.values_mut().for_each(strip_volatile);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_volatile),
        _ => {}
    }
}

#[test]
fn ids_file_with_prefixed_line_exports_two_ids_in_order() {
    let tmp = TempDir::new().expect("temp dir");
    let ids_file = tmp.path().join("ids.txt");
    fs::write(&ids_file, "dQw4w9WgXcQ\nyoutube 1DxWY0nLEF0\n").expect("seed ids");
    let out = tmp.path().join("out.txt");

    let mut extractor = FakeExtractor::default()
        .with_video("dQw4w9WgXcQ", "Never Gonna Give You Up")
        .with_video("1DxWY0nLEF0", "Other");
    let plan = plan_for(&["-f", &path_arg(&ids_file), "-e", "ids", "-o", &path_arg(&out)]);
    let report = export(&plan, &mut extractor, None);

    assert_eq!(report.failed(), 0);
    assert_eq!(
        fs::read_to_string(&out).expect("read ids"),
        "dQw4w9WgXcQ\n1DxWY0nLEF0\n"
    );
    assert_eq!(extractor.calls, vec!["dQw4w9WgXcQ", "1DxWY0nLEF0"]);
}

#[test]
fn failed_lookups_still_appear_in_every_format() {
    let tmp = TempDir::new().expect("temp dir");
    let ids_file = tmp.path().join("mixed.txt");
    fs::write(
        &ids_file,
        "# three ids, one unavailable\naaaaaaaaaaA\nbbbbbbbbbbA\nccccccccccA\n",
    )
    .expect("seed ids");

    for (format, file) in [
        ("freetube-json", "out.json"),
        ("piped-json", "piped.json"),
        ("piped-csv", "piped.csv"),
        ("urls", "urls.txt"),
        ("ids", "ids.txt"),
    ] {
        let out = tmp.path().join(file);
        let mut extractor = FakeExtractor::default()
            .with_video("aaaaaaaaaaA", "A")
            .with_video("ccccccccccA", "C");
        let plan = plan_for(&["-f", &path_arg(&ids_file), "-e", format, "-o", &path_arg(&out)]);
        let report = export(&plan, &mut extractor, None);
        assert_eq!(report.failed(), 0, "{format}");

        let entries = match format {
            "freetube-json" => {
                let record = read_json(&out);
                assert_eq!(record["playlistName"], "mixed");
                assert_eq!(record["videos"][1]["videoId"], "bbbbbbbbbbA");
                assert_eq!(record["videos"][1]["title"], "");
                record["videos"].as_array().map_or(0, Vec::len)
            }
            "piped-json" => read_json(&out)["playlists"][0]["videos"]
                .as_array()
                .map_or(0, Vec::len),
            "piped-csv" => fs::read_to_string(&out).expect("read csv").lines().count() - 1,
            _ => fs::read_to_string(&out).expect("read list").lines().count(),
        };
        assert_eq!(entries, 3, "{format}");
    }
}

#[test]
fn large_playlist_split_into_three_chunk_files() {
    let tmp = TempDir::new().expect("temp dir");
    let chunk_dir = tmp.path().join("chunks");
    let url = "https://www.youtube.com/playlist?list=PLbig";
    let mut extractor = FakeExtractor::default().with_playlist(url, "Big List", &ids(1200));

    let plan = plan_for(&[
        "-e",
        "piped-json",
        "--split",
        "500",
        "--split-dir",
        &path_arg(&chunk_dir),
        url,
    ]);
    let report = export(&plan, &mut extractor, None);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.written().len(), 3);

    let mut counts = Vec::new();
    for seq in 1..=3 {
        let path = chunk_dir.join(format!("piped_Big_List_{seq:03}.json"));
        let chunk = read_json(&path);
        assert_eq!(chunk["format"], "Piped");
        assert_eq!(chunk["playlists"][0]["name"], "Big List");
        counts.push(chunk["playlists"][0]["videos"].as_array().map_or(0, Vec::len));
    }
    assert_eq!(counts, vec![500, 500, 200]);
    assert!(!chunk_dir.join("piped_Big_List_004.json").exists());

    let last_chunk = read_json(&chunk_dir.join("piped_Big_List_003.json"));
    assert_eq!(
        last_chunk["playlists"][0]["videos"][0],
        "https://youtube.com/watch?v=v0000001000"
    );
}

#[test]
fn freetube_json_split_uses_output_stem_as_base() {
    let tmp = TempDir::new().expect("temp dir");
    let chunk_dir = tmp.path().join("parts");
    let url = "https://www.youtube.com/playlist?list=PLsmall";
    let mut extractor = FakeExtractor::default().with_playlist(url, "Small", &ids(5));

    let plan = plan_for(&[
        "-e",
        "freetube-json",
        "--split",
        "2",
        "--split-dir",
        &path_arg(&chunk_dir),
        "-o",
        "backup.json",
        url,
    ]);
    let report = export(&plan, &mut extractor, None);
    assert_eq!(report.failed(), 0);

    let sizes = (1..=3)
        .map(|seq| {
            read_json(&chunk_dir.join(format!("backup_Small_{seq:03}.json")))["videos"]
                .as_array()
                .map_or(0, Vec::len)
        })
        .collect::<Vec<_>>();
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[test]
fn append_to_existing_database_adds_exactly_one_line() {
    let tmp = TempDir::new().expect("temp dir");
    let db_path = tmp.path().join("playlists.db");
    let existing = "{\"_id\":\"favorites\"}\n{\"_id\":\"watchLater\"}\n{\"_id\":\"other\"}\n";
    fs::write(&db_path, existing).expect("seed db");
    let ids_file = tmp.path().join("one.txt");
    fs::write(&ids_file, "dQw4w9WgXcQ\n").expect("seed ids");

    let mut extractor = FakeExtractor::default().with_video("dQw4w9WgXcQ", "Song");
    let plan = plan_for(&["-f", &path_arg(&ids_file), "--name", "Imported"]);
    let db = PlaylistDatabase::open(Destination::new(&db_path));
    let report = export(&plan, &mut extractor, Some(&db));
    assert_eq!(report.failed(), 0);

    let raw = fs::read_to_string(&db_path).expect("read db");
    let lines = raw.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 4);
    assert!(raw.starts_with(existing));
    let record: Value = serde_json::from_str(lines[3]).expect("record parses");
    assert_eq!(record["playlistName"], "Imported");
    assert_eq!(record["protected"], false);
    assert_eq!(record["videos"][0]["type"], "video");
}

#[test]
fn failing_url_does_not_stop_other_playlists() {
    let tmp = TempDir::new().expect("temp dir");
    let out = tmp.path().join("piped.json");
    let good = "https://www.youtube.com/playlist?list=PLgood";
    let bad = "https://www.youtube.com/playlist?list=PLgone";
    let mut extractor = FakeExtractor::default().with_playlist(good, "Good", &ids(2));

    let plan = plan_for(&["-e", "piped-json", "-o", &path_arg(&out), bad, good]);
    let report = export(&plan, &mut extractor, None);

    assert_eq!(report.failed(), 1);
    let failed = report
        .jobs
        .iter()
        .find(|job| job.result.is_err())
        .expect("failed job");
    assert_eq!(failed.job, bad);
    assert_eq!(read_json(&out)["playlists"][0]["name"], "Good");
    assert!(matches!(
        report.into_result(),
        Err(ExportError::PartialBatch { failed: 1, total: 2 })
    ));
}

#[test]
fn write_failure_is_reported_against_the_output() {
    let tmp = TempDir::new().expect("temp dir");
    let out = tmp.path().join("missing-dir").join("urls.txt");
    let url = "https://www.youtube.com/playlist?list=PL1";
    let mut extractor = FakeExtractor::default().with_playlist(url, "One", &ids(1));

    let plan = plan_for(&["-e", "urls", "-o", &path_arg(&out), url]);
    let report = export(&plan, &mut extractor, None);

    assert_eq!(report.failed(), 1);
    assert_eq!(report.jobs[0].job, path_arg(&out));
    assert!(matches!(report.jobs[0].result, Err(ExportError::Io { .. })));
    assert!(!out.exists());
}

#[test]
fn duplicate_names_get_distinct_freetube_files() {
    let tmp = TempDir::new().expect("temp dir");
    let out_dir = tmp.path().join("ft");
    let first = "https://www.youtube.com/playlist?list=PL1";
    let second = "https://www.youtube.com/playlist?list=PL2";
    let mut extractor = FakeExtractor::default()
        .with_playlist(first, "Mix", &ids(1))
        .with_playlist(second, "Mix", &ids(2));

    let plan = plan_for(&["-e", "freetube-json", "-o", &path_arg(&out_dir), first, second]);
    let report = export(&plan, &mut extractor, None);

    assert_eq!(report.failed(), 0);
    assert_eq!(read_json(&out_dir.join("Mix.json"))["videos"].as_array().map(Vec::len), Some(1));
    assert_eq!(read_json(&out_dir.join("Mix_2.json"))["videos"].as_array().map(Vec::len), Some(2));
}

#[test]
fn empty_ids_file_is_a_failed_job() {
    let tmp = TempDir::new().expect("temp dir");
    let ids_file = tmp.path().join("empty.txt");
    fs::write(&ids_file, "# nothing here\n\n").expect("seed ids");
    let out = tmp.path().join("ids.txt");

    let mut extractor = FakeExtractor::default();
    let plan = plan_for(&["-f", &path_arg(&ids_file), "-e", "ids", "-o", &path_arg(&out)]);
    let report = export(&plan, &mut extractor, None);

    assert_eq!(report.failed(), 1);
    assert_eq!(report.jobs[0].job, path_arg(&ids_file));
    assert!(!out.exists());
}

#[test]
fn repeated_compact_exports_are_identical_apart_from_volatile_fields() {
    let tmp = TempDir::new().expect("temp dir");
    let url = "https://www.youtube.com/playlist?list=PL1";

    let mut outputs = Vec::new();
    for run in 0..2 {
        let piped = tmp.path().join(format!("piped-{run}.json"));
        let freetube = tmp.path().join(format!("freetube-{run}.json"));
        let mut extractor = FakeExtractor::default().with_playlist(url, "Stable", &ids(4));
        let piped_plan = plan_for(&["-e", "piped-json", "-o", &path_arg(&piped), url]);
        let freetube_plan = plan_for(&["-e", "freetube-json", "-o", &path_arg(&freetube), url]);
        assert_eq!(export(&piped_plan, &mut extractor, None).failed(), 0);
        assert_eq!(export(&freetube_plan, &mut extractor, None).failed(), 0);

        let mut record = read_json(&freetube);
        strip_volatile(&mut record);
        outputs.push((fs::read(&piped).expect("read piped"), record));
    }

    assert_eq!(outputs[0].0, outputs[1].0);
    assert_eq!(outputs[0].1, outputs[1].1);
}

#[test]
fn subscriptions_are_written_with_versions() {
    let tmp = TempDir::new().expect("temp dir");
    let out = tmp.path().join("subs.json");
    let mut extractor = FakeExtractor {
        feed: Some(json!({"entries": [{"channel_id": "UC1", "title": "First"}]})),
        ..FakeExtractor::default()
    };

    let plan = plan_for(&[
        "-e",
        "newpipe-subs",
        "-o",
        &path_arg(&out),
        "--newpipe-version",
        "0.26.0",
        "--newpipe-version-int",
        "1200",
    ]);
    let report = export(&plan, &mut extractor, None);

    assert_eq!(report.failed(), 0);
    assert_eq!(
        read_json(&out),
        json!({
            "app_version": "0.26.0",
            "app_version_int": 1200,
            "subscriptions": [
                {"service_id": 0, "url": "https://www.youtube.com/channel/UC1", "name": "First"}
            ]
        })
    );
}

#[test]
fn empty_subscription_feed_fails_without_writing() {
    let tmp = TempDir::new().expect("temp dir");
    let out = tmp.path().join("subs.json");
    let mut extractor = FakeExtractor {
        feed: Some(json!({"entries": []})),
        ..FakeExtractor::default()
    };

    let plan = plan_for(&["-e", "newpipe-subs", "-o", &path_arg(&out)]);
    let report = export(&plan, &mut extractor, None);

    assert_eq!(report.failed(), 1);
    assert!(!out.exists());
}
