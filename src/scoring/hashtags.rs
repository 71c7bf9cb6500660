use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::config::{AnalysisConfig, KeywordConfig};
use crate::scoring::engagement;
use crate::Post;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"));

pub const HOT_SCORE_EXPONENT: f64 = 0.3;
pub const HOT_THRESHOLD: f64 = 50.0;
pub const RISING_THRESHOLD: f64 = 25.0;

const FREQUENT_COUNT: usize = 3;
const VERY_FREQUENT_COUNT: usize = 5;
const HIGH_ENGAGEMENT: f64 = 100_000.0;
const SPIKE_ENGAGEMENT: f64 = 300_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashtagCategory {
    Celebrity,
    Brand,
    Trend,
    Item,
    General,
}

impl HashtagCategory {
    pub fn label(self) -> &'static str {
        match self {
            HashtagCategory::Celebrity => "celebrity",
            HashtagCategory::Brand => "brand",
            HashtagCategory::Trend => "trend",
            HashtagCategory::Item => "item",
            HashtagCategory::General => "general",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HashtagCategory::Celebrity => "Celebrity/idol",
            HashtagCategory::Brand => "Brand",
            HashtagCategory::Trend => "Tech/trend",
            HashtagCategory::Item => "Fashion item",
            HashtagCategory::General => "General",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashtagGrade {
    Hot,
    Rising,
    Stable,
}

impl HashtagGrade {
    pub fn label(self) -> &'static str {
        match self {
            HashtagGrade::Hot => "Hot",
            HashtagGrade::Rising => "Rising",
            HashtagGrade::Stable => "Stable",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            HashtagGrade::Hot => "🔥",
            HashtagGrade::Rising => "📈",
            HashtagGrade::Stable => "⚪",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeReason {
    FrequentAndEngaging,
    ViralSpike,
    HighFrequency,
    HighHotScore,
    UpwardTrend,
    Steady,
}

impl GradeReason {
    pub fn label(self) -> &'static str {
        match self {
            GradeReason::FrequentAndEngaging => "high frequency + high engagement",
            GradeReason::ViralSpike => "single viral spike",
            GradeReason::HighFrequency => "high frequency",
            GradeReason::HighHotScore => "high hot score",
            GradeReason::UpwardTrend => "upward trend",
            GradeReason::Steady => "steady",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashtagStat {
    /// Lowercased tag with its leading `#`.
    pub tag: String,
    pub count: usize,
    pub total_engagement: f64,
    pub avg_engagement: f64,
    pub hot_score: f64,
    pub category: HashtagCategory,
    pub grade: HashtagGrade,
    pub grade_reason: GradeReason,
}

/// Side observations gathered while aggregating one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashtagDiagnostics {
    pub total_posts: usize,
    pub posts_with_caption: usize,
    pub posts_with_hashtags: usize,
    pub hashtags_found: usize,
    pub excluded_total: usize,
    /// Excluded tags with their occurrence counts, most frequent first.
    pub excluded: Vec<(String, usize)>,
    pub unique_tags: usize,
}

impl HashtagDiagnostics {
    pub fn excluded_count(&self, tag: &str) -> usize {
        let key = crate::config::normalize_tag(tag);
        self.excluded
            .iter()
            .find(|(excluded, _)| *excluded == key)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashtagReport {
    pub stats: Vec<HashtagStat>,
    pub diagnostics: HashtagDiagnostics,
}

/// Ordered (category, keywords) table; the first category with a keyword
/// contained in the tag wins.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    rules: Vec<(HashtagCategory, Vec<String>)>,
}

impl CategoryRules {
    pub fn new(keywords: &KeywordConfig) -> Self {
        let lower = |values: &[String]| -> Vec<String> {
            values
                .iter()
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty())
                .collect()
        };
        Self {
            rules: vec![
                (HashtagCategory::Celebrity, lower(&keywords.celebrity)),
                (HashtagCategory::Brand, lower(&keywords.brand)),
                (HashtagCategory::Trend, lower(&keywords.trend)),
                (HashtagCategory::Item, lower(&keywords.item)),
            ],
        }
    }

    pub fn categorize(&self, tag: &str) -> HashtagCategory {
        let tag = tag.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| tag.contains(keyword.as_str())))
            .map(|(category, _)| *category)
            .unwrap_or(HashtagCategory::General)
    }
}

/// `count × avg^0.3`, or zero when the average is not positive.
pub fn hot_score(count: usize, avg_engagement: f64) -> f64 {
    if !avg_engagement.is_finite() || avg_engagement <= 0.0 {
        return 0.0;
    }
    count as f64 * avg_engagement.powf(HOT_SCORE_EXPONENT)
}

pub fn grade(hot_score: f64, count: usize, avg_engagement: f64) -> (HashtagGrade, GradeReason) {
    if hot_score >= HOT_THRESHOLD {
        let reason = if count >= FREQUENT_COUNT && avg_engagement >= HIGH_ENGAGEMENT {
            GradeReason::FrequentAndEngaging
        } else if avg_engagement >= SPIKE_ENGAGEMENT {
            GradeReason::ViralSpike
        } else if count >= VERY_FREQUENT_COUNT {
            GradeReason::HighFrequency
        } else {
            GradeReason::HighHotScore
        };
        (HashtagGrade::Hot, reason)
    } else if hot_score >= RISING_THRESHOLD {
        (HashtagGrade::Rising, GradeReason::UpwardTrend)
    } else {
        (HashtagGrade::Stable, GradeReason::Steady)
    }
}

/// Extracts `#word` tags from a caption, lowercased and without the marker.
pub fn extract_hashtags(caption: &str) -> Vec<String> {
    HASHTAG_RE
        .captures_iter(caption)
        .filter_map(|captures| captures.get(1))
        .map(|tag| tag.as_str().to_lowercase())
        .collect()
}

struct TagTotals {
    count: usize,
    total_engagement: f64,
}

#[derive(Debug, Clone)]
pub struct HashtagAggregator {
    exclude: HashSet<String>,
    rules: CategoryRules,
    top_n: usize,
}

impl HashtagAggregator {
    pub fn new(analysis: &AnalysisConfig, keywords: &KeywordConfig) -> Self {
        Self {
            exclude: analysis.exclusion_set(keywords),
            rules: CategoryRules::new(keywords),
            top_n: analysis.top_hashtags,
        }
    }

    pub fn aggregate(&self, posts: &[Post]) -> HashtagReport {
        // Insertion-ordered so equal hot scores keep first-seen order after the stable sort.
        let mut order: Vec<(String, TagTotals)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut excluded: Vec<(String, usize)> = Vec::new();
        let mut diagnostics = HashtagDiagnostics {
            total_posts: posts.len(),
            ..HashtagDiagnostics::default()
        };

        for post in posts {
            let caption = post.caption_text();
            if !caption.trim().is_empty() {
                diagnostics.posts_with_caption += 1;
            }
            let tags = extract_hashtags(caption);
            if tags.is_empty() {
                continue;
            }
            diagnostics.posts_with_hashtags += 1;
            diagnostics.hashtags_found += tags.len();

            let score = engagement(post);
            for tag in tags {
                if self.exclude.contains(&tag) {
                    diagnostics.excluded_total += 1;
                    match excluded.iter_mut().find(|(name, _)| *name == tag) {
                        Some((_, count)) => *count += 1,
                        None => excluded.push((tag, 1)),
                    }
                    continue;
                }
                match index.get(&tag) {
                    Some(&position) => {
                        let totals = &mut order[position].1;
                        totals.count += 1;
                        totals.total_engagement += score;
                    }
                    None => {
                        index.insert(tag.clone(), order.len());
                        order.push((
                            tag,
                            TagTotals {
                                count: 1,
                                total_engagement: score,
                            },
                        ));
                    }
                }
            }
        }

        diagnostics.unique_tags = order.len();
        excluded.sort_by(|a, b| b.1.cmp(&a.1));
        diagnostics.excluded = excluded;

        let mut stats: Vec<HashtagStat> = order
            .into_iter()
            .map(|(tag, totals)| self.build_stat(tag, totals))
            .collect();
        stats.sort_by(|a, b| {
            b.hot_score
                .partial_cmp(&a.hot_score)
                .unwrap_or(Ordering::Equal)
        });
        stats.truncate(self.top_n);

        HashtagReport { stats, diagnostics }
    }

    fn build_stat(&self, tag: String, totals: TagTotals) -> HashtagStat {
        let avg_engagement = if totals.count == 0 {
            0.0
        } else {
            totals.total_engagement / totals.count as f64
        };
        let hot_score = hot_score(totals.count, avg_engagement);
        let (grade, grade_reason) = grade(hot_score, totals.count, avg_engagement);
        HashtagStat {
            category: self.rules.categorize(&tag),
            tag: format!("#{}", tag),
            count: totals.count,
            total_engagement: totals.total_engagement,
            avg_engagement,
            hot_score,
            grade,
            grade_reason,
        }
    }
}
