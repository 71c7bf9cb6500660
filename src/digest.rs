use crate::{format_float, format_number, AnalysisResult};

const RULE: &str = "--------------------------------";
const DIGEST_TAGS: usize = 3;
const DIGEST_INSIGHTS: usize = 3;

/// Fixed appendix of report terms: (term, meaning).
pub const GLOSSARY: &[(&str, &str)] = &[
    ("Engagement", "likes + 3 x comments + 0.1 x views for a single post"),
    ("Frequency", "number of posts in the period that used the hashtag"),
    ("Avg engagement", "total engagement of the posts using a hashtag divided by its frequency"),
    ("Hot score", "frequency x avg engagement^0.3; higher means hotter right now"),
    ("Grade", "Hot (50+), Rising (25 to 50) or Stable (under 25) by hot score, with overrides"),
    ("Views", "number of times a reel was played"),
    ("Viral", "a post whose engagement far outpaces the rest of the batch"),
];

pub fn digest_subject(result: &AnalysisResult) -> String {
    let end = result
        .analysis_period
        .split('~')
        .nth(1)
        .map(str::trim)
        .unwrap_or(result.analysis_period.as_str());
    format!("Instagram weekly trend report ({})", end)
}

/// Plain-text body summarising an analysis for email delivery.
pub fn render_digest(result: &AnalysisResult) -> String {
    let top_tags = result
        .top_hashtags
        .iter()
        .take(DIGEST_TAGS)
        .map(|stat| stat.tag.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let top_viral = result
        .top_viral
        .first()
        .map(|entry| {
            format!(
                "{} - {} ({} views)",
                entry.username,
                entry.topic,
                format_number(entry.views as f64)
            )
        })
        .unwrap_or_default();

    let mut lines = vec![
        "Instagram trend report".to_string(),
        RULE.to_string(),
        format!("Period: {}", result.analysis_period),
        format!("Posts analysed: {}", result.total_posts),
        String::new(),
        "Highlights".to_string(),
        RULE.to_string(),
        format!("Top hashtags: {}", top_tags),
        format!("Top viral: {}", top_viral),
        String::new(),
        "Hashtag grades".to_string(),
        RULE.to_string(),
    ];
    lines.extend(
        result
            .top_hashtags
            .iter()
            .take(DIGEST_TAGS)
            .enumerate()
            .map(|(index, stat)| {
                format!(
                    "  {}. {} {} {} | {} | hot {} | {}",
                    index + 1,
                    stat.tag,
                    stat.grade.marker(),
                    stat.grade.label(),
                    stat.category.label(),
                    format_float(stat.hot_score, 1),
                    stat.grade_reason.label()
                )
            }),
    );
    lines.extend([String::new(), "Key insights".to_string(), RULE.to_string()]);
    lines.extend(
        result
            .insights
            .iter()
            .take(DIGEST_INSIGHTS)
            .map(|insight| format!("  * {}", insight.title)),
    );
    lines.extend([String::new(), "Glossary".to_string(), RULE.to_string()]);
    lines.extend(
        GLOSSARY
            .iter()
            .map(|(term, meaning)| format!("  {}: {}", term, meaning)),
    );
    lines.push(String::new());
    lines.push(format!("Generated at {}", result.generated_at));

    let mut body = lines.join("\n");
    body.push('\n');
    body
}
