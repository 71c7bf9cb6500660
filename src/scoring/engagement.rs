use crate::Post;

pub const LIKE_WEIGHT: f64 = 1.0;
pub const COMMENT_WEIGHT: f64 = 3.0;
pub const VIEW_WEIGHT: f64 = 0.1;

/// `likes + 3 × comments + 0.1 × views`, with missing counts read as zero.
pub fn engagement(post: &Post) -> f64 {
    post.likes() as f64 * LIKE_WEIGHT
        + post.comments() as f64 * COMMENT_WEIGHT
        + post.views() as f64 * VIEW_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(likes: Option<i64>, comments: Option<i64>, views: Option<i64>) -> Post {
        Post {
            likes_count: likes,
            comments_count: comments,
            video_play_count: views,
            ..Post::default()
        }
    }

    #[test]
    fn weights_comments_and_views() {
        let score = engagement(&post(Some(100), Some(10), Some(1_000)));
        assert!((score - 230.0).abs() < 1e-9);
    }

    #[test]
    fn missing_counts_are_zero() {
        assert_eq!(engagement(&post(None, None, None)), 0.0);
        assert!((engagement(&post(None, Some(2), None)) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn hidden_like_counts_do_not_go_negative() {
        let score = engagement(&post(Some(-1), Some(0), None));
        assert_eq!(score, 0.0);
    }

    #[test]
    fn monotonic_in_each_count() {
        let base = engagement(&post(Some(10), Some(10), Some(10)));
        assert!(engagement(&post(Some(11), Some(10), Some(10))) >= base);
        assert!(engagement(&post(Some(10), Some(11), Some(10))) >= base);
        assert!(engagement(&post(Some(10), Some(10), Some(11))) >= base);
    }
}
