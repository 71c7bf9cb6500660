use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use trend_reporter::config::ReportConfig;
use trend_reporter::{AnalysisResult, FetchBatch, QualityReport};

#[derive(Debug, Deserialize)]
pub struct ApiAnalyzeRequest {
    #[serde(flatten)]
    pub batch: FetchBatch,
    pub request_id: Option<String>,
    pub top_hashtags: Option<usize>,
    pub top_viral: Option<usize>,
    pub exclude_hashtags: Option<Vec<String>>,
}

impl ApiAnalyzeRequest {
    /// Splits the request into the batch and the effective configuration.
    pub fn into_parts(self, base: &ReportConfig) -> Result<(FetchBatch, ReportConfig), String> {
        let mut config = base.clone();
        if let Some(value) = self.top_hashtags {
            config.analysis.top_hashtags = value;
        }
        if let Some(value) = self.top_viral {
            config.analysis.top_viral = value;
        }
        if let Some(tags) = self.exclude_hashtags {
            config.analysis.exclude_hashtags = tags;
        }
        config.validate().map_err(|err| err.to_string())?;
        Ok((self.batch, config))
    }
}

/// Accounts the batch claims to cover, or the distinct post owners when it doesn't say.
pub fn account_count(batch: &FetchBatch) -> usize {
    if !batch.metadata.accounts.is_empty() {
        return batch.metadata.accounts.len();
    }
    let owners: HashSet<&str> = batch
        .posts
        .iter()
        .filter_map(|post| post.owner_username.as_deref())
        .collect();
    owners.len().max(1)
}

#[derive(Debug, Serialize)]
pub struct ApiAnalyzeResponse {
    pub request_id: String,
    pub quality: QualityReport,
    pub result: AnalysisResult,
}

#[derive(Debug, Serialize)]
pub struct ApiQualityRejection {
    pub request_id: String,
    pub error: String,
    pub issues: Vec<String>,
    pub quality: QualityReport,
}

impl ApiQualityRejection {
    pub fn from_report(quality: QualityReport, request_id: String) -> Self {
        Self {
            request_id,
            error: "data quality too low to report".to_string(),
            issues: quality.messages(),
            quality,
        }
    }
}
