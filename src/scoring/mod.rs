pub mod engagement;
pub mod hashtags;
pub mod viral;

pub use engagement::engagement;
pub use hashtags::{
    grade, hot_score, CategoryRules, GradeReason, HashtagAggregator, HashtagCategory,
    HashtagDiagnostics, HashtagGrade, HashtagReport, HashtagStat,
};
pub use viral::{topic_label, ViralEntry, ViralRanker};
