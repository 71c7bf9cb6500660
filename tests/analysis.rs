use chrono::{NaiveDate, NaiveDateTime};
use trend_reporter::config::ReportConfig;
use trend_reporter::scoring::{HashtagCategory, HashtagGrade};
use trend_reporter::{analyze, analyze_at, FetchBatch, FetchMetadata, Post};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 12, 15)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn post(owner: &str, caption: &str, likes: i64, comments: i64, views: i64) -> Post {
    Post {
        id: Some(format!("{}-{}-{}", owner, likes, views)),
        caption: Some(caption.to_string()),
        likes_count: Some(likes),
        comments_count: Some(comments),
        video_play_count: Some(views),
        owner_username: Some(owner.to_string()),
        url: Some(format!("https://www.instagram.com/p/{}{}/", owner, likes)),
        timestamp: Some("2025-12-12T10:00:00.000Z".to_string()),
    }
}

fn batch(posts: Vec<Post>) -> FetchBatch {
    FetchBatch {
        metadata: FetchMetadata {
            days: Some(7),
            accounts: vec!["dip_magazine".to_string(), "histofit".to_string()],
            total_posts: Some(posts.len()),
            ..FetchMetadata::default()
        },
        posts,
    }
}

fn fashion_week() -> Vec<Post> {
    vec![
        post("dip_magazine", "오늘의 코디 #패션 #제니 #샤넬", 120_000, 2_000, 900_000),
        post("histofit", "#패션 #코트 겨울 아우터 추천", 80_000, 500, 300_000),
        post("dip_magazine", "#패션 #OOTD #광고", 40_000, 100, 0),
        post("histofit", "새 아이폰 리뷰 #아이폰 #ootd", 5_000, 40, 20_000),
        post("dip_magazine", "caption without tags", 1_000, 10, 0),
        post("histofit", "#제작지원 #코트", 700, 3, 0),
    ]
}

#[test]
fn empty_batch_yields_single_insight() {
    let result = analyze(&FetchBatch::default(), &ReportConfig::default());

    assert_eq!(result.total_posts, 0);
    assert!(result.top_hashtags.is_empty());
    assert!(result.top_viral.is_empty());
    assert_eq!(result.insights.len(), 1);
}

#[test]
fn full_batch_produces_ranked_report() {
    let result = analyze_at(&batch(fashion_week()), &ReportConfig::default(), now());

    assert_eq!(result.total_posts, 6);
    assert_eq!(result.analysis_period, "2025-12-08 ~ 2025-12-15");
    assert_eq!(result.generated_at, "2025-12-15 09:30");
    assert_eq!(result.accounts.len(), 2);

    assert!(result.top_hashtags.iter().all(|stat| stat.count >= 1 && stat.hot_score >= 0.0));
    assert!(result
        .top_hashtags
        .windows(2)
        .all(|pair| pair[0].hot_score >= pair[1].hot_score));

    let top = &result.top_hashtags[0];
    assert_eq!(top.tag, "#패션");
    assert_eq!(top.count, 3);
    assert_eq!(top.grade, HashtagGrade::Hot);

    let ootd = result.top_hashtags.iter().find(|stat| stat.tag == "#ootd").unwrap();
    assert_eq!(ootd.count, 2);

    let jennie = result.top_hashtags.iter().find(|stat| stat.tag == "#제니").unwrap();
    assert_eq!(jennie.category, HashtagCategory::Celebrity);
    let coat = result.top_hashtags.iter().find(|stat| stat.tag == "#코트").unwrap();
    assert_eq!(coat.category, HashtagCategory::Item);

    assert_eq!(result.top_viral.len(), 6);
    assert_eq!(result.top_viral[0].username, "@dip_magazine");
    let ranks: Vec<usize> = result.top_viral.iter().map(|entry| entry.rank).collect();
    assert_eq!(ranks, (1..=6).collect::<Vec<_>>());
    assert!(result
        .top_viral
        .windows(2)
        .all(|pair| pair[0].engagement >= pair[1].engagement));

    assert!(!result.insights.is_empty() && result.insights.len() <= 5);
}

#[test]
fn excluded_tags_never_surface() {
    let result = analyze_at(&batch(fashion_week()), &ReportConfig::default(), now());
    for excluded in ["#광고", "#제작지원", "#행사초대"] {
        assert!(result.top_hashtags.iter().all(|stat| stat.tag != excluded));
    }
}

#[test]
fn celebrity_exclusion_drops_idol_tags() {
    let mut config = ReportConfig::default();
    config.analysis.exclude_celebrity_tags = true;
    let result = analyze_at(&batch(fashion_week()), &config, now());
    assert!(result.top_hashtags.iter().all(|stat| stat.tag != "#제니"));
}

#[test]
fn fashion_scenario_grades_stable() {
    let posts = vec![
        post("a", "#패션", 100, 10, 0),
        post("b", "#패션", 200, 20, 0),
        post("c", "#패션", 300, 30, 0),
    ];
    let result = analyze_at(&batch(posts), &ReportConfig::default(), now());

    let stat = &result.top_hashtags[0];
    assert_eq!(stat.count, 3);
    assert!((stat.avg_engagement - 260.0).abs() < 1e-9);
    assert!((stat.hot_score - 3.0 * 260f64.powf(0.3)).abs() < 1e-9);
    assert_eq!(stat.grade, HashtagGrade::Stable);
}

#[test]
fn top_sizes_truncate_output() {
    let mut config = ReportConfig::default();
    config.analysis.top_hashtags = 2;
    config.analysis.top_viral = 3;
    let result = analyze_at(&batch(fashion_week()), &config, now());
    assert_eq!(result.top_hashtags.len(), 2);
    assert_eq!(result.top_viral.len(), 3);
}

#[test]
fn analysis_is_idempotent() {
    let input = batch(fashion_week());
    let config = ReportConfig::default();
    let first = analyze_at(&input, &config, now());
    let second = analyze_at(&input, &config, now());
    assert_eq!(first, second);
}

#[test]
fn untagged_batch_still_reports_viral_content() {
    let posts = vec![
        post("a", "no tags here", 10, 1, 100),
        post("b", "", 5, 0, 0),
    ];
    let result = analyze_at(&batch(posts), &ReportConfig::default(), now());
    assert!(result.top_hashtags.is_empty());
    assert_eq!(result.top_viral.len(), 2);
    assert_eq!(result.top_viral[1].topic, "✨ Content");
    assert_eq!(result.insights[0].title, "Content without hashtags");
}

#[test]
fn result_serializes_for_reporting() {
    let result = analyze_at(&batch(fashion_week()), &ReportConfig::default(), now());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["top_hashtags"][0]["tag"], "#패션");
    assert_eq!(json["top_hashtags"][0]["grade"], "hot");
    assert!(json["insights"].as_array().is_some());
}
