// src/coordinator.rs

use std::collections::{HashMap, HashSet};

use crate::{
    cache::{CacheError, QuizCacheService},
    models::quiz::QuizAggregate,
};

/// What a unit of work did to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Persist,
    Update,
    Remove,
}

/// A persistence lifecycle notification, normalized to the quiz aggregate it
/// affects. Question events carry their owning quiz so the commit step can
/// refresh the right cache entry.
#[derive(Debug, Clone)]
pub enum EntityEvent {
    Quiz(QuizAggregate),
    Question {
        question_id: i64,
        quiz: QuizAggregate,
    },
}

#[derive(Debug)]
struct TrackedQuiz {
    quiz: QuizAggregate,
    operation: Operation,
}

#[derive(Debug)]
struct TrackedQuestion {
    quiz_id: i64,
    quiz: QuizAggregate,
    operation: Operation,
}

/// Batches cache invalidations for one unit of work.
///
/// Lifecycle notifications accumulate in per-id maps while the unit of work
/// is open (re-registration of the same id overwrites, so the latest
/// operation wins). After the database commit, `unit_of_work_committed`
/// applies exactly one cache transition per affected quiz and resets the
/// tracking state. One instance per request/transaction; never shared across
/// concurrent units of work.
pub struct WriteCoordinator {
    cache: QuizCacheService,
    quizzes: HashMap<i64, TrackedQuiz>,
    questions: HashMap<i64, TrackedQuestion>,
}

impl WriteCoordinator {
    pub fn new(cache: QuizCacheService) -> Self {
        Self {
            cache,
            quizzes: HashMap::new(),
            questions: HashMap::new(),
        }
    }

    pub fn entity_persisted(&mut self, event: EntityEvent) {
        self.track(event, Operation::Persist);
    }

    pub fn entity_updated(&mut self, event: EntityEvent) {
        self.track(event, Operation::Update);
    }

    pub fn entity_removed(&mut self, event: EntityEvent) {
        self.track(event, Operation::Remove);
    }

    fn track(&mut self, event: EntityEvent, operation: Operation) {
        match event {
            EntityEvent::Quiz(quiz) => {
                let quiz_id = quiz.id();
                self.quizzes.insert(quiz_id, TrackedQuiz { quiz, operation });
                tracing::debug!(quiz_id, ?operation, "tracked quiz change");
            }
            EntityEvent::Question { question_id, quiz } => {
                let quiz_id = quiz.id();
                self.questions.insert(
                    question_id,
                    TrackedQuestion {
                        quiz_id,
                        quiz,
                        operation,
                    },
                );
                tracing::debug!(question_id, quiz_id, ?operation, "tracked question change");
            }
        }
    }

    /// Applies the cache transitions for everything tracked in this unit of
    /// work, then resets the tracking maps.
    ///
    /// Directly-tracked quizzes are authoritative; a quiz reached only
    /// through question events is refreshed once, no matter how many of its
    /// questions were touched. Cache failures are logged per quiz and never
    /// propagate, so a cache outage cannot fail a database commit. The stale
    /// entry they leave behind still expires via TTL.
    pub async fn unit_of_work_committed(&mut self) {
        let quizzes = std::mem::take(&mut self.quizzes);
        let questions = std::mem::take(&mut self.questions);

        let mut handled: HashSet<i64> = HashSet::new();

        for (quiz_id, tracked) in &quizzes {
            handled.insert(*quiz_id);
            if let Err(err) = self.apply(&tracked.quiz, tracked.operation).await {
                tracing::error!(
                    quiz_id = *quiz_id,
                    operation = ?tracked.operation,
                    error = %err,
                    "cache update failed for quiz"
                );
            }
        }

        for (question_id, tracked) in &questions {
            if !handled.insert(tracked.quiz_id) {
                continue;
            }

            if let Err(err) = self.apply(&tracked.quiz, tracked.operation).await {
                tracing::error!(
                    quiz_id = tracked.quiz_id,
                    question_id = *question_id,
                    operation = ?tracked.operation,
                    error = %err,
                    "cache update failed for quiz touched via question"
                );
            }
        }
    }

    /// Per-quiz transition policy.
    ///
    /// Listing caches are purged on persist/remove (membership changed) but
    /// not on update: listings self-heal within their own TTL instead of
    /// being rebuilt on every field edit.
    async fn apply(&self, quiz: &QuizAggregate, operation: Operation) -> Result<(), CacheError> {
        let quiz_id = quiz.id();

        match operation {
            Operation::Remove => {
                self.cache.invalidate_quiz_cache(quiz_id).await?;
                self.cache.invalidate_list_caches().await?;
                tracing::info!(quiz_id, "invalidated cache for removed quiz");
            }
            Operation::Persist => {
                self.cache.invalidate_quiz_cache(quiz_id).await?;
                self.cache.cache_quiz(quiz).await?;
                self.cache.invalidate_list_caches().await?;
                tracing::info!(quiz_id, "refreshed cache for new quiz");
            }
            Operation::Update => {
                self.cache.invalidate_quiz_cache(quiz_id).await?;
                self.cache.cache_quiz(quiz).await?;
                tracing::info!(quiz_id, "refreshed cache for updated quiz");
            }
        }

        Ok(())
    }
}
