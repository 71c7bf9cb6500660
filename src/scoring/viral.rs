use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::scoring::engagement;
use crate::Post;

pub const CAPTION_PREVIEW_CHARS: usize = 50;
pub const TOPIC_CHARS: usize = 30;

const DEFAULT_TOPIC_MARKER: &str = "✨";
const EMPTY_TOPIC: &str = "✨ Content";

/// Ordered topic table: the first marker whose keywords appear in the caption wins.
const TOPIC_RULES: &[(&str, &[&str])] = &[
    ("📱", &["아이폰", "iphone", "ios"]),
    ("👗", &["패션", "코디", "옷"]),
    ("🎵", &["bts", "방탄", "블랙핑크", "에스파"]),
    ("💄", &["뷰티", "메이크업"]),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViralEntry {
    pub rank: usize,
    pub username: String,
    pub topic: String,
    pub likes: u64,
    pub comments: u64,
    pub views: u64,
    pub engagement: f64,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ViralRanker {
    top_n: usize,
}

impl ViralRanker {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn rank(&self, posts: &[Post]) -> Vec<ViralEntry> {
        let mut scored: Vec<(&Post, f64)> = posts.iter().map(|post| (post, engagement(post))).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(self.top_n)
            .enumerate()
            .map(|(index, (post, engagement))| ViralEntry {
                rank: index + 1,
                username: format!("@{}", post.owner_username.as_deref().unwrap_or("unknown")),
                topic: topic_label(post.caption_text()),
                likes: post.likes(),
                comments: post.comments(),
                views: post.views(),
                engagement,
                url: post.url.clone().unwrap_or_default(),
            })
            .collect()
    }
}

/// Short one-line label for a caption, prefixed with a topic marker.
pub fn topic_label(caption: &str) -> String {
    let preview = truncate_chars(caption, CAPTION_PREVIEW_CHARS);
    if preview.is_empty() {
        return EMPTY_TOPIC.to_string();
    }

    let lowercase = preview.to_lowercase();
    let marker = TOPIC_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowercase.contains(keyword)))
        .map(|(marker, _)| *marker)
        .unwrap_or(DEFAULT_TOPIC_MARKER);

    format!("{} {}", marker, truncate_chars(&preview, TOPIC_CHARS))
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
