use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{format_percent, Post};

pub const MIN_POSTS_PER_ACCOUNT: usize = 2;
pub const MIN_CAPTION_RATE: f64 = 0.3;
pub const MIN_ENGAGEMENT_RATE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityIssue {
    NoPosts,
    InsufficientVolume { total: usize, expected: usize },
    SparseCaptions { rate: f64 },
    SparseEngagement { rate: f64 },
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::NoPosts => write!(f, "no posts collected"),
            QualityIssue::InsufficientVolume { total, expected } => write!(
                f,
                "insufficient volume: {} posts (expected at least {})",
                total, expected
            ),
            QualityIssue::SparseCaptions { rate } => write!(
                f,
                "captions too sparse for hashtag analysis: {}",
                format_percent(*rate)
            ),
            QualityIssue::SparseEngagement { rate } => write!(
                f,
                "engagement data too sparse for reliable ranking: {}",
                format_percent(*rate)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_posts: usize,
    pub caption_rate: f64,
    pub engagement_rate: f64,
    pub issues: Vec<QualityIssue>,
    pub valid: bool,
}

impl QualityReport {
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|issue| issue.to_string()).collect()
    }

    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            "ok".to_string()
        } else {
            self.messages().join("; ")
        }
    }
}

/// Checks a fetched batch against minimum volume and completeness thresholds.
///
/// Every issue is reported; the batch is valid only when it has at least one
/// post per account and no issue was flagged.
pub fn validate_fetch_quality(posts: &[Post], account_count: usize) -> QualityReport {
    let total = posts.len();
    if total == 0 {
        return QualityReport {
            total_posts: 0,
            caption_rate: 0.0,
            engagement_rate: 0.0,
            issues: vec![QualityIssue::NoPosts],
            valid: false,
        };
    }

    let with_caption = posts.iter().filter(|post| post.has_caption()).count();
    let with_engagement = posts
        .iter()
        .filter(|post| post.likes() > 0 || post.views() > 0)
        .count();
    let caption_rate = with_caption as f64 / total as f64;
    let engagement_rate = with_engagement as f64 / total as f64;

    let mut issues = Vec::new();
    let expected = account_count * MIN_POSTS_PER_ACCOUNT;
    if total < expected {
        issues.push(QualityIssue::InsufficientVolume { total, expected });
    }
    if caption_rate < MIN_CAPTION_RATE {
        issues.push(QualityIssue::SparseCaptions { rate: caption_rate });
    }
    if engagement_rate < MIN_ENGAGEMENT_RATE {
        issues.push(QualityIssue::SparseEngagement {
            rate: engagement_rate,
        });
    }

    for issue in &issues {
        tracing::warn!(%issue, "data quality");
    }

    QualityReport {
        total_posts: total,
        caption_rate,
        engagement_rate,
        valid: total >= account_count && issues.is_empty(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(caption: Option<&str>, likes: Option<i64>, views: Option<i64>) -> Post {
        Post {
            caption: caption.map(str::to_string),
            likes_count: likes,
            video_play_count: views,
            ..Post::default()
        }
    }

    fn healthy(count: usize) -> Vec<Post> {
        (0..count).map(|_| post(Some("#ootd"), Some(10), None)).collect()
    }

    #[test]
    fn healthy_batch_is_valid() {
        let report = validate_fetch_quality(&healthy(10), 5);
        assert!(report.valid);
        assert!(report.issues.is_empty());
        assert_eq!(report.caption_rate, 1.0);
        assert_eq!(report.engagement_rate, 1.0);
        assert_eq!(report.summary(), "ok");
    }

    #[test]
    fn single_post_for_five_accounts_is_invalid() {
        let report = validate_fetch_quality(&healthy(1), 5);
        assert!(!report.valid);
        assert_eq!(
            report.issues,
            vec![QualityIssue::InsufficientVolume { total: 1, expected: 10 }]
        );
    }

    #[test]
    fn empty_batch_is_invalid() {
        let report = validate_fetch_quality(&[], 3);
        assert!(!report.valid);
        assert_eq!(report.issues, vec![QualityIssue::NoPosts]);
    }

    #[test]
    fn sparse_captions_and_engagement_are_flagged() {
        let mut posts = vec![post(None, None, None); 8];
        posts.push(post(Some("#a"), Some(5), None));
        posts.push(post(Some("  "), None, Some(100)));
        let report = validate_fetch_quality(&posts, 1);

        assert!(!report.valid);
        assert!((report.caption_rate - 0.2).abs() < 1e-9);
        assert!((report.engagement_rate - 0.2).abs() < 1e-9);
        assert_eq!(report.issues.len(), 2);
        assert!(matches!(report.issues[0], QualityIssue::SparseCaptions { .. }));
        assert!(matches!(report.issues[1], QualityIssue::SparseEngagement { .. }));
    }

    #[test]
    fn whitespace_captions_count_as_present() {
        let posts = vec![post(Some(" \n"), Some(10), None); 4];
        let report = validate_fetch_quality(&posts, 1);

        assert_eq!(report.caption_rate, 1.0);
        assert!(report.valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn comments_alone_do_not_count_as_engagement() {
        let mut only_comments = post(Some("hi"), None, None);
        only_comments.comments_count = Some(40);
        let report = validate_fetch_quality(&[only_comments.clone(), only_comments], 1);
        assert_eq!(report.engagement_rate, 0.0);
        assert!(!report.valid);
    }

    #[test]
    fn messages_are_readable() {
        let report = validate_fetch_quality(&healthy(1), 5);
        assert_eq!(
            report.messages(),
            vec!["insufficient volume: 1 posts (expected at least 10)".to_string()]
        );
    }
}
