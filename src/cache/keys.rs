// src/cache/keys.rs

use std::time::Duration;

/// Per-quiz cache key prefix. The full key is `quiz_{id}` (decimal id); the
/// format is relied on by external cache inspectors, do not change it.
pub const QUIZ_KEY_PREFIX: &str = "quiz_";

/// Canonical key for the quiz listing cache.
pub const LIST_CACHE_KEY: &str = "quiz_list";

/// TTL for a cached single-quiz projection. Single quizzes are read far more
/// often than they change, so they get the long tier.
pub const QUIZ_TTL: Duration = Duration::from_secs(3600);

/// TTL for the listing cache. Listings churn on every create/delete, so they
/// get the short tier and self-heal faster.
pub const LIST_TTL: Duration = Duration::from_secs(900);

/// TTL for a negative-cached "quiz not found" marker. Bounds repeated-miss
/// load on the database when a non-existent id is probed.
pub const NEGATIVE_TTL: Duration = Duration::from_secs(300);

/// Cache key for a single quiz.
pub fn quiz_key(id: i64) -> String {
    format!("{}{}", QUIZ_KEY_PREFIX, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_key_format() {
        assert_eq!(quiz_key(42), "quiz_42");
        assert_eq!(quiz_key(0), "quiz_0");
    }
}
