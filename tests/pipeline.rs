use serde_json::json;
use std::path::{Path, PathBuf};

use trend_reporter::archive::{ANALYSIS_FILE, DIGEST_FILE, RAW_FILE};
use trend_reporter::config::ReportConfig;
use trend_reporter::fetcher::DumpSource;
use trend_reporter::pipeline::{run_report, RunOptions};
use trend_reporter::{AnalysisResult, QualityIssue, ReportError};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("trend-reporter-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_dump(dir: &Path, posts: serde_json::Value) -> PathBuf {
    let path = dir.join("input.json");
    std::fs::write(&path, serde_json::to_string(&posts).unwrap()).unwrap();
    path
}

fn healthy_posts(accounts: &[&str]) -> serde_json::Value {
    let posts: Vec<serde_json::Value> = accounts
        .iter()
        .flat_map(|account| {
            (0..3).map(move |i| {
                json!({
                    "id": format!("{}-{}", account, i),
                    "url": format!("https://www.instagram.com/p/{}{}/", account, i),
                    "caption": format!("look {} #ootd #패션 #광고", i),
                    "likesCount": 1000 * (i + 1),
                    "commentsCount": 10,
                    "videoPlayCount": 5000,
                    "ownerUsername": account
                })
            })
        })
        .collect();
    serde_json::Value::Array(posts)
}

fn config(output_dir: PathBuf) -> ReportConfig {
    ReportConfig {
        output_dir,
        ..ReportConfig::default()
    }
}

#[tokio::test]
async fn dump_run_writes_raw_analysis_and_digest() {
    let dir = scratch("pipeline-save");
    let config = config(dir.join("output"));
    let accounts = config.usernames();
    let account_refs: Vec<&str> = accounts.iter().map(String::as_str).collect();
    let input = write_dump(&dir, healthy_posts(&account_refs));

    let summary = run_report(&DumpSource::new(input), &config, &RunOptions::default())
        .await
        .unwrap();

    assert!(summary.quality.valid);
    assert_eq!(summary.total_posts(), 18);
    assert!(summary.hashtag_count() >= 2);
    assert!(summary.result.top_hashtags.iter().all(|stat| stat.tag != "#광고"));
    assert!(summary.digest.contains("Posts analysed: 18"));

    let run_dir = summary.run_dir.clone().unwrap();
    assert!(run_dir.ends_with(&summary.run_id));
    assert!(run_dir.join(RAW_FILE).exists());
    assert!(run_dir.join(DIGEST_FILE).exists());

    let saved: AnalysisResult =
        serde_json::from_str(&std::fs::read_to_string(run_dir.join(ANALYSIS_FILE)).unwrap()).unwrap();
    assert_eq!(saved, summary.result);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn no_save_leaves_output_dir_untouched() {
    let dir = scratch("pipeline-nosave");
    let config = config(dir.join("output"));
    let input = write_dump(&dir, healthy_posts(&["a", "b", "c", "d", "e", "f"]));

    let summary = run_report(&DumpSource::new(input), &config, &RunOptions { save: false })
        .await
        .unwrap();

    assert!(summary.run_dir.is_none());
    assert!(!dir.join("output").exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn sparse_batch_stops_at_quality_gate() {
    let dir = scratch("pipeline-gate");
    let config = config(dir.join("output"));
    let input = write_dump(
        &dir,
        json!([{ "caption": "#ootd", "likesCount": 10, "ownerUsername": "dip_magazine" }]),
    );

    let err = run_report(&DumpSource::new(input), &config, &RunOptions::default())
        .await
        .unwrap_err();

    match err {
        ReportError::QualityGate(report) => {
            assert!(!report.valid);
            assert!(report
                .issues
                .iter()
                .any(|issue| matches!(issue, QualityIssue::InsufficientVolume { total: 1, expected: 12 })));
        }
        other => panic!("expected quality gate error, got: {other:?}"),
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn missing_dump_is_a_fetch_error() {
    let dir = scratch("pipeline-missing");
    let config = config(dir.join("output"));

    let err = run_report(
        &DumpSource::new(dir.join("nope.json")),
        &config,
        &RunOptions { save: false },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ReportError::Fetch(_)));

    std::fs::remove_dir_all(&dir).ok();
}
