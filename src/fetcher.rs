use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;

use crate::config::{ContentType, ReportConfig, ScraperConfig};
use crate::error::{ConfigError, FetchError};
use crate::{FetchBatch, FetchMetadata, Post};

pub const MAX_CHUNK_DAYS: i64 = 30;
pub const RECENT_WINDOW_DAYS: i64 = 14;
pub const RESULTS_PER_DAY: u32 = 5;
pub const MAX_RESULTS_LIMIT: u32 = 500;
pub const MAX_RUN_TIMEOUT_SECS: u64 = 900;

const WAIT_FOR_FINISH_SECS: u64 = 60;
const HTTP_TIMEOUT_SECS: u64 = 120;

/// Anything that can hand the pipeline a batch of posts.
pub trait PostSource {
    fn fetch(&self, request: &FetchRequest) -> impl Future<Output = Result<FetchBatch, FetchError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchWindow {
    LastDays(u32),
    /// Inclusive calendar range; the end day runs through 23:59:59.
    Range { start: NaiveDate, end: NaiveDate },
}

impl FetchWindow {
    pub fn bounds(&self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        match *self {
            FetchWindow::LastDays(days) => (now - Duration::days(i64::from(days)), now),
            FetchWindow::Range { start, end } => {
                let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
                (start.and_time(NaiveTime::MIN), end.and_time(end_of_day))
            }
        }
    }

    pub fn days(&self) -> u32 {
        match *self {
            FetchWindow::LastDays(days) => days,
            FetchWindow::Range { start, end } => (end - start).num_days().max(0) as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub accounts: Vec<String>,
    pub content_type: ContentType,
    pub limit_per_account: u32,
    pub window: FetchWindow,
}

impl FetchRequest {
    pub fn from_config(config: &ReportConfig) -> Result<Self, ConfigError> {
        let window = match config.analysis.date_range()? {
            Some((start, end)) => FetchWindow::Range { start, end },
            None => FetchWindow::LastDays(config.analysis.days),
        };
        Ok(Self {
            accounts: config.usernames(),
            content_type: config.analysis.content_type,
            limit_per_account: config.analysis.limit_per_account,
            window,
        })
    }

    pub fn metadata(&self, total_posts: usize, now: NaiveDateTime) -> FetchMetadata {
        FetchMetadata {
            fetched_at: Some(now.format("%Y-%m-%dT%H:%M:%S").to_string()),
            days: Some(self.window.days()),
            content_type: Some(self.content_type.label().to_string()),
            accounts: self.accounts.clone(),
            total_posts: Some(total_posts),
        }
    }
}

/// Reads a previously archived dump instead of calling the scraping service.
#[derive(Debug, Clone)]
pub struct DumpSource {
    path: PathBuf,
}

impl DumpSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PostSource for DumpSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchBatch, FetchError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchError::Dump {
                path: self.path.clone(),
                source,
            })?;
        let value: serde_json::Value = serde_json::from_str(&contents)?;
        let now = Local::now().naive_local();

        let batch = if value.is_array() {
            let posts: Vec<Post> = serde_json::from_value(value)?;
            let metadata = request.metadata(posts.len(), now);
            FetchBatch { posts, metadata }
        } else if value.get("posts").is_some() {
            let mut batch: FetchBatch = serde_json::from_value(value)?;
            if batch.metadata.accounts.is_empty() {
                batch.metadata.accounts = request.accounts.clone();
            }
            batch.metadata.total_posts.get_or_insert(batch.posts.len());
            batch
        } else {
            return Err(FetchError::Parse(
                "dump must be a post array or an object with a `posts` field".to_string(),
            ));
        };

        tracing::info!(path = %self.path.display(), posts = batch.posts.len(), "loaded dump");
        Ok(batch)
    }
}

/// Scraping-service client: one actor run per date chunk.
#[derive(Clone)]
pub struct ApifySource {
    client: reqwest::Client,
    token: String,
    scraper: ScraperConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunInput {
    #[serde(rename = "directUrls")]
    pub direct_urls: Vec<String>,
    #[serde(rename = "resultsLimit")]
    pub results_limit: u32,
    #[serde(rename = "resultsType")]
    pub results_type: String,
    #[serde(rename = "searchType")]
    pub search_type: String,
    #[serde(rename = "onlyPostsNewerThan")]
    pub only_posts_newer_than: String,
    #[serde(rename = "maxRequestRetries")]
    pub max_request_retries: u32,
    #[serde(rename = "maxConcurrency")]
    pub max_concurrency: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
struct RunData {
    id: String,
    status: String,
    #[serde(rename = "defaultDatasetId")]
    default_dataset_id: String,
}

impl ApifySource {
    pub fn from_config(config: &ReportConfig) -> Result<Self, FetchError> {
        let token = config
            .apify_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or(FetchError::MissingToken)?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            token,
            scraper: config.scraper.clone(),
        })
    }

    async fn fetch_chunk(
        &self,
        request: &FetchRequest,
        since: NaiveDateTime,
        until: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<Vec<Post>, FetchError> {
        let days_ago = (now - since).num_days();
        let results_limit = adjusted_limit(request.limit_per_account, days_ago);
        if results_limit != request.limit_per_account {
            tracing::info!(
                days_ago,
                from = request.limit_per_account,
                to = results_limit,
                "raised results limit for older window"
            );
        }

        let input = RunInput {
            direct_urls: request
                .accounts
                .iter()
                .map(|username| direct_url(username, request.content_type))
                .collect(),
            results_limit,
            results_type: "posts".to_string(),
            search_type: "user".to_string(),
            only_posts_newer_than: since.format("%Y-%m-%d").to_string(),
            max_request_retries: self.scraper.max_request_retries,
            max_concurrency: self.scraper.max_concurrency,
        };
        let timeout = run_timeout(&self.scraper, request.accounts.len());

        let run = self.start_run(&input, timeout).await?;
        tracing::info!(run_id = %run.id, status = %run.status, "scraper run started");
        let run = self.wait_for_run(run).await?;

        let items: Vec<Post> = self.dataset_items(&run.default_dataset_id).await?;
        let total = items.len();
        if total == 0 {
            return Err(FetchError::Empty);
        }

        let posts: Vec<Post> = items
            .into_iter()
            .filter(|post| in_window(post.timestamp.as_deref(), since, until))
            .collect();
        tracing::info!(kept = posts.len(), total, "filtered chunk to window");

        if posts.is_empty() {
            tracing::warn!(total, "every collected item falls outside the window");
        } else if posts.len() < self.scraper.min_results_threshold {
            tracing::warn!(
                kept = posts.len(),
                threshold = self.scraper.min_results_threshold,
                "collected fewer posts than the minimum threshold"
            );
        }
        Ok(posts)
    }

    async fn start_run(&self, input: &RunInput, timeout_secs: u64) -> Result<RunData, FetchError> {
        let url = format!(
            "{}/acts/{}/runs",
            self.scraper.api_base.trim_end_matches('/'),
            self.scraper.actor_id
        );
        let response = self
            .client
            .post(url)
            .query(&[
                ("timeout", timeout_secs.to_string()),
                ("maxTotalChargeUsd", self.scraper.max_cost_usd.to_string()),
                ("waitForFinish", WAIT_FOR_FINISH_SECS.to_string()),
            ])
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;
        let body: ApiResponse<RunData> = read_json(response).await?;
        Ok(body.data)
    }

    async fn wait_for_run(&self, mut run: RunData) -> Result<RunData, FetchError> {
        loop {
            match run.status.as_str() {
                "SUCCEEDED" => return Ok(run),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(FetchError::RunFailed {
                        run_id: run.id,
                        status: run.status,
                    })
                }
                _ => tracing::debug!(run_id = %run.id, status = %run.status, "run still in progress"),
            }

            let url = format!(
                "{}/actor-runs/{}",
                self.scraper.api_base.trim_end_matches('/'),
                run.id
            );
            let response = self
                .client
                .get(url)
                .query(&[("waitForFinish", WAIT_FOR_FINISH_SECS.to_string())])
                .bearer_auth(&self.token)
                .send()
                .await?;
            let body: ApiResponse<RunData> = read_json(response).await?;
            run = body.data;
        }
    }

    async fn dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>, FetchError> {
        let url = format!(
            "{}/datasets/{}/items",
            self.scraper.api_base.trim_end_matches('/'),
            dataset_id
        );
        let response = self
            .client
            .get(url)
            .query(&[("format", "json"), ("clean", "true")])
            .bearer_auth(&self.token)
            .send()
            .await?;
        read_json(response).await
    }
}

impl PostSource for ApifySource {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchBatch, FetchError> {
        let now = Local::now().naive_local();
        let (since, until) = request.window.bounds(now);
        let chunks = plan_chunks(since, until);
        tracing::info!(
            accounts = request.accounts.len(),
            content_type = request.content_type.label(),
            days = (until - since).num_days(),
            chunks = chunks.len(),
            "collecting posts"
        );

        let mut posts = Vec::new();
        let mut first_error = None;
        let mut failed = 0usize;
        for (index, (start, end)) in chunks.iter().enumerate() {
            match self.fetch_chunk(request, *start, *end, now).await {
                Ok(chunk) => {
                    posts.extend(chunk);
                    tracing::info!(chunk = index + 1, of = chunks.len(), collected = posts.len(), "chunk done");
                }
                Err(err) => {
                    tracing::warn!(chunk = index + 1, of = chunks.len(), error = %err, "chunk failed");
                    failed += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        if failed == chunks.len() {
            if let Some(err) = first_error {
                return Err(err);
            }
        }

        let collected = posts.len();
        let posts = dedup_posts(posts);
        if posts.len() != collected {
            tracing::info!(before = collected, after = posts.len(), "removed duplicate posts");
        }

        let metadata = request.metadata(posts.len(), now);
        Ok(FetchBatch { posts, metadata })
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(FetchError::Api {
            status: status.as_u16(),
            message: message.trim().to_string(),
        });
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Splits a window into consecutive chunks of at most `MAX_CHUNK_DAYS`.
pub fn plan_chunks(since: NaiveDateTime, until: NaiveDateTime) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    if (until - since).num_days() <= MAX_CHUNK_DAYS {
        return vec![(since, until)];
    }

    let mut chunks = Vec::new();
    let mut start = since;
    while start < until {
        let end = (start + Duration::days(MAX_CHUNK_DAYS)).min(until);
        chunks.push((start, end));
        start = end + Duration::seconds(1);
    }
    chunks
}

/// The service applies the results limit before its date filter, so older
/// windows need a larger limit to reach back far enough.
pub fn adjusted_limit(limit_per_account: u32, days_ago: i64) -> u32 {
    if days_ago <= RECENT_WINDOW_DAYS {
        return limit_per_account;
    }
    let needed = u32::try_from(days_ago)
        .unwrap_or(u32::MAX)
        .saturating_mul(RESULTS_PER_DAY);
    limit_per_account.max(needed).min(MAX_RESULTS_LIMIT)
}

pub fn run_timeout(scraper: &ScraperConfig, accounts: usize) -> u64 {
    let per_account = scraper
        .timeout_per_account_secs
        .saturating_mul(accounts as u64);
    scraper
        .timeout_secs
        .saturating_add(per_account)
        .min(MAX_RUN_TIMEOUT_SECS)
}

/// Items without a readable timestamp are kept.
pub fn in_window(timestamp: Option<&str>, since: NaiveDateTime, until: NaiveDateTime) -> bool {
    let Some(raw) = timestamp else {
        return true;
    };
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.f"));
    match parsed {
        Ok(posted) => posted >= since && posted <= until,
        Err(_) => true,
    }
}

/// Keeps the first post per URL (or id when the URL is missing).
pub fn dedup_posts(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| match post.url.as_deref().or(post.id.as_deref()) {
            Some(key) => seen.insert(key.to_string()),
            None => true,
        })
        .collect()
}

pub fn direct_url(username: &str, content_type: ContentType) -> String {
    match content_type {
        ContentType::Reels => format!("https://www.instagram.com/{}/reels/", username),
        ContentType::Posts => format!("https://www.instagram.com/{}/", username),
    }
}
