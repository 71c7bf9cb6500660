use chrono::Local;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::archive::{self, RunArchive, ANALYSIS_FILE, DIGEST_FILE, RAW_FILE};
use crate::config::ReportConfig;
use crate::digest::render_digest;
use crate::error::ReportError;
use crate::fetcher::{FetchRequest, PostSource};
use crate::quality::{validate_fetch_quality, QualityReport};
use crate::{analyze, AnalysisResult};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Write raw posts, analysis and digest under the output directory.
    pub save: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { save: true }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub duration: Duration,
    pub quality: QualityReport,
    pub result: AnalysisResult,
    pub digest: String,
    pub run_dir: Option<PathBuf>,
}

impl RunSummary {
    pub fn total_posts(&self) -> usize {
        self.result.total_posts
    }

    pub fn hashtag_count(&self) -> usize {
        self.result.top_hashtags.len()
    }

    pub fn viral_count(&self) -> usize {
        self.result.top_viral.len()
    }

    pub fn insight_count(&self) -> usize {
        self.result.insights.len()
    }
}

/// Fetches, gates, analyses and archives one report run.
///
/// A batch that fails the quality gate stops the run before analysis; the raw
/// dump is still kept so the failed collection can be inspected.
pub async fn run_report<S: PostSource>(
    source: &S,
    config: &ReportConfig,
    options: &RunOptions,
) -> Result<RunSummary, ReportError> {
    let started = Instant::now();
    let started_at = Local::now().naive_local();
    let request = FetchRequest::from_config(config)?;
    tracing::info!(
        accounts = request.accounts.len(),
        days = request.window.days(),
        content_type = request.content_type.label(),
        "report run started"
    );

    let batch = source.fetch(&request).await?;
    tracing::info!(posts = batch.posts.len(), "fetch complete");

    let archive = if options.save {
        let archive = RunArchive::create(&config.output_dir, started_at).await?;
        archive.write_json(RAW_FILE, &batch.posts).await?;
        Some(archive)
    } else {
        None
    };

    let account_count = if batch.metadata.accounts.is_empty() {
        request.accounts.len()
    } else {
        batch.metadata.accounts.len()
    };
    let quality = validate_fetch_quality(&batch.posts, account_count);
    if !quality.valid {
        tracing::error!(summary = %quality.summary(), "quality gate rejected batch");
        return Err(ReportError::QualityGate(quality));
    }

    let result = analyze(&batch, config);
    let digest = render_digest(&result);
    if let Some(archive) = archive.as_ref() {
        archive.write_json(ANALYSIS_FILE, &result).await?;
        archive.write_text(DIGEST_FILE, &digest).await?;
    }

    let summary = RunSummary {
        run_id: archive
            .as_ref()
            .map(|archive| archive.run_id().to_string())
            .unwrap_or_else(|| archive::run_id(started_at)),
        duration: started.elapsed(),
        quality,
        result,
        digest,
        run_dir: archive.map(|archive| archive.dir().to_path_buf()),
    };
    tracing::info!(
        run_id = %summary.run_id,
        posts = summary.total_posts(),
        hashtags = summary.hashtag_count(),
        viral = summary.viral_count(),
        insights = summary.insight_count(),
        elapsed_ms = summary.duration.as_millis() as u64,
        "report run finished"
    );
    Ok(summary)
}
