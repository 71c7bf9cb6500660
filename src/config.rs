use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Reels,
    Posts,
}

impl ContentType {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "reels" | "reel" => Some(ContentType::Reels),
            "posts" | "post" => Some(ContentType::Posts),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentType::Reels => "reels",
            ContentType::Posts => "posts",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub days: u32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub content_type: ContentType,
    pub limit_per_account: u32,
    pub top_hashtags: usize,
    pub top_viral: usize,
    pub exclude_hashtags: Vec<String>,
    /// Adds every celebrity keyword to the exclusion set.
    pub exclude_celebrity_tags: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            days: 7,
            start_date: None,
            end_date: None,
            content_type: ContentType::Reels,
            limit_per_account: 50,
            top_hashtags: 50,
            top_viral: 7,
            exclude_hashtags: strings(&["제작지원", "광고", "행사초대"]),
            exclude_celebrity_tags: false,
        }
    }
}

impl AnalysisConfig {
    /// Explicit `[start, end]` window, when both dates are configured.
    pub fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>, ConfigError> {
        match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (Some(start), Some(end)) => {
                let start = parse_date("start_date", start)?;
                let end = parse_date("end_date", end)?;
                if end <= start {
                    return Err(ConfigError::Invalid(format!(
                        "end_date {} must be after start_date {}",
                        end, start
                    )));
                }
                Ok(Some((start, end)))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::Invalid(
                "start_date and end_date must be set together".to_string(),
            )),
        }
    }

    pub fn exclusion_set(&self, keywords: &KeywordConfig) -> HashSet<String> {
        let mut set: HashSet<String> = self
            .exclude_hashtags
            .iter()
            .map(|tag| normalize_tag(tag))
            .filter(|tag| !tag.is_empty())
            .collect();
        if self.exclude_celebrity_tags {
            set.extend(
                keywords
                    .celebrity
                    .iter()
                    .map(|tag| normalize_tag(tag))
                    .filter(|tag| !tag.is_empty()),
            );
        }
        set
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub celebrity: Vec<String>,
    pub brand: Vec<String>,
    pub trend: Vec<String>,
    pub item: Vec<String>,
    pub sponsorship: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            celebrity: strings(&[
                "jennie", "jisoo", "rose", "lisa", "karina", "winter", "ningning", "giselle",
                "bts", "뷔", "지민", "태용", "nct", "stray", "아이브", "에스파", "블랙핑크",
                "제니", "지수", "로제", "닝닝", "카리나", "윈터", "라이즈", "원빈", "레이",
                "아이유", "뉴진스", "르세라핌", "세븐틴", "투바투",
            ]),
            brand: strings(&[
                "샤넬", "디올", "구찌", "프라다", "루이비통", "마뗑킴", "디에디트", "올리브",
                "휠라", "나이키", "아디다스", "자라", "유니클로", "무신사",
            ]),
            trend: strings(&[
                "테크", "아이폰", "갤럭시", "ios", "꿀팁", "업데이트", "ai", "폰", "앱", "틱톡",
                "숏폼", "릴스", "트렌드",
            ]),
            item: strings(&[
                "코트", "재킷", "아우터", "스카프", "링", "가방", "슈즈", "부츠", "원피스",
                "청바지", "니트", "후드", "맨투맨",
            ]),
            sponsorship: strings(&["광고", "제작지원"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub api_base: String,
    pub actor_id: String,
    pub timeout_secs: u64,
    pub timeout_per_account_secs: u64,
    pub max_cost_usd: f64,
    pub max_request_retries: u32,
    pub max_concurrency: u32,
    pub min_results_threshold: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.apify.com/v2".to_string(),
            actor_id: "apify~instagram-scraper".to_string(),
            timeout_secs: 300,
            timeout_per_account_secs: 60,
            max_cost_usd: 5.0,
            max_request_retries: 3,
            max_concurrency: 5,
            min_results_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    #[serde(default = "default_account_category")]
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub analysis: AnalysisConfig,
    pub keywords: KeywordConfig,
    pub scraper: ScraperConfig,
    pub accounts: Vec<AccountConfig>,
    #[serde(skip_serializing)]
    pub apify_token: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let accounts = [
            "dip_magazine",
            "the_edit.co.kr",
            "on_fleekkk",
            "fashionandstyle.official",
            "luxmag.kr",
            "histofit",
        ]
        .iter()
        .map(|username| AccountConfig {
            username: username.to_string(),
            category: "Fashion".to_string(),
        })
        .collect();

        Self {
            output_dir: PathBuf::from("output"),
            analysis: AnalysisConfig::default(),
            keywords: KeywordConfig::default(),
            scraper: ScraperConfig::default(),
            accounts,
            apify_token: None,
        }
    }
}

impl ReportConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                toml::from_str(&contents)?
            } else {
                ReportConfig::default()
            }
        } else {
            ReportConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = toml::to_string_pretty(self)?;
        std::fs::write(path, payload).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis.date_range()?;
        if self.analysis.top_hashtags == 0 {
            return Err(ConfigError::Invalid("top_hashtags must be positive".to_string()));
        }
        if self.analysis.top_viral == 0 {
            return Err(ConfigError::Invalid("top_viral must be positive".to_string()));
        }
        if self.analysis.days == 0 {
            return Err(ConfigError::Invalid("days must be positive".to_string()));
        }
        Ok(())
    }

    pub fn usernames(&self) -> Vec<String> {
        self.accounts
            .iter()
            .map(|account| account.username.clone())
            .collect()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = env::var("APIFY_TOKEN") {
            if !token.trim().is_empty() {
                self.apify_token = Some(token.trim().to_string());
            }
        }
        if let Ok(days) = env::var("REPORT_DAYS") {
            if let Ok(value) = days.parse::<u32>() {
                self.analysis.days = value;
            }
        }
        if let Ok(content_type) = env::var("REPORT_CONTENT_TYPE") {
            if let Some(value) = ContentType::from_str(&content_type) {
                self.analysis.content_type = value;
            }
        }
        if let Ok(output_dir) = env::var("REPORT_OUTPUT_DIR") {
            if !output_dir.trim().is_empty() {
                self.output_dir = PathBuf::from(output_dir);
            }
        }
    }
}

/// Lowercases a hashtag and strips its leading `#` markers.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|err| {
        ConfigError::Invalid(format!("{} must be YYYY-MM-DD, got {:?}: {}", field, value, err))
    })
}

fn default_account_category() -> String {
    "general".to_string()
}

fn default_config_path() -> Option<PathBuf> {
    env::var("REPORT_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/report.toml")))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ReportConfig = toml::from_str(
            r##"
            [analysis]
            top_viral = 3
            exclude_hashtags = ["#AD", "협찬"]

            [[accounts]]
            username = "dip_magazine"
            "##,
        )
        .unwrap();

        assert_eq!(config.analysis.top_viral, 3);
        assert_eq!(config.analysis.top_hashtags, 50);
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].category, "general");
        assert!(!config.keywords.brand.is_empty());
    }

    #[test]
    fn sample_config_is_valid() {
        let config: ReportConfig = toml::from_str(include_str!("../config/report.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.accounts.len(), 6);
        assert_eq!(config.analysis.content_type, ContentType::Reels);
    }

    #[test]
    fn written_config_reloads() {
        let dir = std::env::temp_dir().join(format!("trend-reporter-config-{}", std::process::id()));
        let path = dir.join("report.toml");
        let mut config = ReportConfig::default();
        config.analysis.top_viral = 4;
        config.apify_token = Some("secret".to_string());
        config.write(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("secret"));
        let reloaded: ReportConfig = toml::from_str(&contents).unwrap();
        assert_eq!(reloaded.analysis.top_viral, 4);
        assert_eq!(reloaded.accounts, config.accounts);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn exclusion_set_is_normalized() {
        let mut analysis = AnalysisConfig::default();
        analysis.exclude_hashtags = vec!["#AD".to_string(), " 협찬 ".to_string(), "#".to_string()];
        let set = analysis.exclusion_set(&KeywordConfig::default());

        assert!(set.contains("ad"));
        assert!(set.contains("협찬"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn celebrity_filter_extends_exclusions() {
        let mut analysis = AnalysisConfig::default();
        analysis.exclude_celebrity_tags = true;
        let set = analysis.exclusion_set(&KeywordConfig::default());

        assert!(set.contains("제니"));
        assert!(set.contains("광고"));
    }

    #[test]
    fn date_range_requires_both_ends_in_order() {
        let mut analysis = AnalysisConfig::default();
        analysis.start_date = Some("2025-12-01".to_string());
        assert!(analysis.date_range().is_err());

        analysis.end_date = Some("2025-11-01".to_string());
        assert!(analysis.date_range().is_err());

        analysis.end_date = Some("2025-12-31".to_string());
        let (start, end) = analysis.date_range().unwrap().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn validate_rejects_zero_top_sizes() {
        let mut config = ReportConfig::default();
        config.analysis.top_viral = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn content_type_parses_aliases() {
        assert_eq!(ContentType::from_str("Reel"), Some(ContentType::Reels));
        assert_eq!(ContentType::from_str("posts"), Some(ContentType::Posts));
        assert_eq!(ContentType::from_str("stories"), None);
    }
}
