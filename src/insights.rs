use serde::{Deserialize, Serialize};

use crate::format_number;
use crate::scoring::{HashtagCategory, HashtagStat, ViralEntry};

pub const MAX_INSIGHTS: usize = 5;

const CATEGORY_WINDOW: usize = 10;
const SPOTLIGHT_TAGS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub number: usize,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
}

pub fn insufficient_data() -> Insight {
    Insight {
        number: 1,
        title: "Insufficient data".to_string(),
        description: "Not enough data was collected to derive insights. Try a longer period or more accounts."
            .to_string(),
        keywords: vec!["insufficient data".to_string()],
    }
}

pub fn collection_failed() -> Insight {
    Insight {
        number: 1,
        title: "Data collection failed".to_string(),
        description: "No posts were collected from Instagram. Check the network and the scraper API token."
            .to_string(),
        keywords: vec!["collection failed".to_string()],
    }
}

/// Builds up to five observations from the ranked hashtags and viral posts.
pub fn generate_insights(
    hashtags: &[HashtagStat],
    viral: &[ViralEntry],
    sponsorship_terms: &[String],
) -> Vec<Insight> {
    if hashtags.is_empty() && viral.is_empty() {
        return vec![insufficient_data()];
    }

    let mut drafts: Vec<(String, String, Vec<String>)> = Vec::new();

    if hashtags.is_empty() {
        drafts.push((
            "Content without hashtags".to_string(),
            "None of the collected posts used hashtags; the batch is mostly untagged reels or posts."
                .to_string(),
            vec!["no hashtags".to_string()],
        ));
    } else {
        let category = dominant_category(hashtags);
        let top_tags: Vec<String> = hashtags.iter().take(5).map(|stat| stat.tag.clone()).collect();
        drafts.push((
            format!("{} content leads", category.display_name()),
            format!(
                "{} tags dominate the top {} hashtags. Top hashtags: {}",
                category.display_name(),
                hashtags.len().min(CATEGORY_WINDOW),
                top_tags[..top_tags.len().min(SPOTLIGHT_TAGS)].join(", ")
            ),
            top_tags.into_iter().take(4).collect(),
        ));
    }

    if let Some(top) = viral.first() {
        drafts.push((
            format!("Top viral: {}", top.username),
            format!("Reached {} views. {}", format_number(top.views as f64), top.topic),
            vec![
                top.username.clone(),
                format!("{} views", format_number(top.views as f64)),
            ],
        ));
    }

    if let Some((username, count)) = leading_account(viral) {
        drafts.push((
            format!("{} leads the viral list", username),
            format!(
                "{} of the top {} viral posts come from {}",
                count,
                viral.len(),
                username
            ),
            vec![username.to_string()],
        ));
    }

    let celebrity: Vec<String> = hashtags
        .iter()
        .filter(|stat| stat.category == HashtagCategory::Celebrity)
        .take(SPOTLIGHT_TAGS)
        .map(|stat| stat.tag.clone())
        .collect();
    if !celebrity.is_empty() {
        drafts.push((
            "Celebrity tags guarantee traffic".to_string(),
            format!(
                "Celebrity-related hashtags recorded high engagement: {}",
                celebrity.join(", ")
            ),
            celebrity,
        ));
    }

    let sponsored: Vec<String> = hashtags
        .iter()
        .filter(|stat| {
            stat.category == HashtagCategory::Brand
                || sponsorship_terms
                    .iter()
                    .any(|term| !term.is_empty() && stat.tag.contains(term.to_lowercase().as_str()))
        })
        .take(SPOTLIGHT_TAGS)
        .map(|stat| stat.tag.clone())
        .collect();
    if !sponsored.is_empty() {
        drafts.push((
            "Brand collaborations are active".to_string(),
            format!("Sponsored and brand content ranks high: {}", sponsored.join(", ")),
            sponsored,
        ));
    }

    drafts
        .into_iter()
        .take(MAX_INSIGHTS)
        .enumerate()
        .map(|(index, (title, description, keywords))| Insight {
            number: index + 1,
            title,
            description,
            keywords,
        })
        .collect()
}

/// Most frequent category among the top hashtags; ties go to the first one seen.
fn dominant_category(hashtags: &[HashtagStat]) -> HashtagCategory {
    let mut counts: Vec<(HashtagCategory, usize)> = Vec::new();
    for stat in hashtags.iter().take(CATEGORY_WINDOW) {
        match counts.iter_mut().find(|(category, _)| *category == stat.category) {
            Some((_, count)) => *count += 1,
            None => counts.push((stat.category, 1)),
        }
    }
    counts
        .iter()
        .fold(None, |best: Option<(HashtagCategory, usize)>, &(category, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((category, count)),
        })
        .map(|(category, _)| category)
        .unwrap_or(HashtagCategory::General)
}

/// Username with the most viral entries; ties go to the higher-ranked account.
fn leading_account(viral: &[ViralEntry]) -> Option<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for entry in viral {
        match counts.iter_mut().find(|(username, _)| *username == entry.username) {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.username.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (username, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((username, count));
        }
    }
    best
}
