pub mod archive;
pub mod config;
pub mod digest;
pub mod error;
pub mod fetcher;
pub mod insights;
pub mod pipeline;
pub mod quality;
pub mod scoring;

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::insights::{collection_failed, generate_insights, Insight};
use crate::scoring::{HashtagAggregator, HashtagStat, ViralEntry, ViralRanker};

pub use crate::error::{ConfigError, FetchError, ReportError};
pub use crate::quality::{validate_fetch_quality, QualityIssue, QualityReport};

/// One scraped post as returned by the scraping service.
///
/// Counts may be missing, null, or negative (hidden like counts); accessors
/// read all of those as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(rename = "likesCount", default)]
    pub likes_count: Option<i64>,
    #[serde(rename = "commentsCount", default)]
    pub comments_count: Option<i64>,
    #[serde(rename = "videoPlayCount", default)]
    pub video_play_count: Option<i64>,
    #[serde(rename = "ownerUsername", default)]
    pub owner_username: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Post {
    pub fn likes(&self) -> u64 {
        non_negative(self.likes_count)
    }

    pub fn comments(&self) -> u64 {
        non_negative(self.comments_count)
    }

    pub fn views(&self) -> u64 {
        non_negative(self.video_play_count)
    }

    pub fn caption_text(&self) -> &str {
        self.caption.as_deref().unwrap_or("")
    }

    pub fn has_caption(&self) -> bool {
        !self.caption_text().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchMetadata {
    pub fetched_at: Option<String>,
    pub days: Option<u32>,
    pub content_type: Option<String>,
    pub accounts: Vec<String>,
    pub total_posts: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchBatch {
    pub posts: Vec<Post>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_posts: usize,
    pub analysis_period: String,
    pub accounts: Vec<String>,
    pub top_hashtags: Vec<HashtagStat>,
    pub top_viral: Vec<ViralEntry>,
    pub insights: Vec<Insight>,
    pub generated_at: String,
}

pub fn analyze(batch: &FetchBatch, config: &ReportConfig) -> AnalysisResult {
    analyze_at(batch, config, Local::now().naive_local())
}

/// Runs the full analysis as of `now`.
///
/// Never fails: an empty batch yields empty rankings and a single
/// diagnostic insight.
pub fn analyze_at(batch: &FetchBatch, config: &ReportConfig, now: NaiveDateTime) -> AnalysisResult {
    let posts = &batch.posts;
    tracing::info!(posts = posts.len(), "analysis started");

    let analysis_period = analysis_period(batch, config, now);
    let generated_at = now.format("%Y-%m-%d %H:%M").to_string();

    if posts.is_empty() {
        tracing::warn!("no posts collected, returning empty analysis");
        return AnalysisResult {
            total_posts: 0,
            analysis_period,
            accounts: batch.metadata.accounts.clone(),
            top_hashtags: Vec::new(),
            top_viral: Vec::new(),
            insights: vec![collection_failed()],
            generated_at,
        };
    }

    let aggregator = HashtagAggregator::new(&config.analysis, &config.keywords);
    let report = aggregator.aggregate(posts);
    let diagnostics = &report.diagnostics;
    tracing::info!(
        total = diagnostics.total_posts,
        with_caption = diagnostics.posts_with_caption,
        with_hashtags = diagnostics.posts_with_hashtags,
        found = diagnostics.hashtags_found,
        excluded = diagnostics.excluded_total,
        unique = diagnostics.unique_tags,
        "hashtag diagnostics"
    );
    if !diagnostics.excluded.is_empty() {
        let excluded = diagnostics
            .excluded
            .iter()
            .map(|(tag, count)| format!("#{}({})", tag, count))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(%excluded, "excluded hashtags");
    }

    let top_hashtags = report.stats;
    let top_viral = ViralRanker::new(config.analysis.top_viral).rank(posts);
    let insights = generate_insights(&top_hashtags, &top_viral, &config.keywords.sponsorship);
    tracing::info!(
        hashtags = top_hashtags.len(),
        viral = top_viral.len(),
        insights = insights.len(),
        "analysis finished"
    );

    AnalysisResult {
        total_posts: posts.len(),
        analysis_period,
        accounts: batch.metadata.accounts.clone(),
        top_hashtags,
        top_viral,
        insights,
        generated_at,
    }
}

/// `"start ~ end"` from the configured range, or the trailing window ending at `now`.
fn analysis_period(batch: &FetchBatch, config: &ReportConfig, now: NaiveDateTime) -> String {
    if let Ok(Some((start, end))) = config.analysis.date_range() {
        return format!("{} ~ {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"));
    }
    let days = batch.metadata.days.unwrap_or(config.analysis.days);
    let end = now.date();
    let start = end - Duration::days(i64::from(days));
    format!("{} ~ {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}

fn non_negative(value: Option<i64>) -> u64 {
    value.unwrap_or(0).max(0) as u64
}

pub fn format_number(value: f64) -> String {
    let rounded = value.round().max(0.0) as i64;
    let mut chars: Vec<char> = rounded.to_string().chars().collect();
    let mut result = String::new();
    let mut count = 0usize;

    while let Some(ch) = chars.pop() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(ch);
        count += 1;
    }

    result.chars().rev().collect()
}

pub fn format_percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}
