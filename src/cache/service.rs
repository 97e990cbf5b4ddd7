// src/cache/service.rs

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    cache::{
        CacheBackend, CacheError, Computed,
        keys::{LIST_CACHE_KEY, LIST_TTL, NEGATIVE_TTL, QUIZ_TTL, quiz_key},
        projection::{QuizProjection, QuizSummary},
    },
    models::quiz::QuizAggregate,
    store::QuizStore,
};

/// Cache-aside facade over the aggregate store for single-quiz reads and
/// listing reads.
///
/// Owns key derivation, the two TTL tiers, negative-result caching and the
/// projection of aggregates into cache-friendly JSON. A missing quiz is
/// stored as a JSON `null` marker with a short TTL so repeated probes for a
/// non-existent id do not all reach the database.
#[derive(Clone)]
pub struct QuizCacheService {
    backend: Arc<dyn CacheBackend>,
    store: Arc<dyn QuizStore>,
    debug_bypass: bool,
}

/// Counts and TTL configuration returned by the stats endpoint.
#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub quiz_count: usize,
    pub quiz_ttl_secs: u64,
    pub list_ttl_secs: u64,
    pub negative_ttl_secs: u64,
}

/// Metadata for one quiz currently present in the cache.
#[derive(Debug, Serialize)]
pub struct CachedQuizInfo {
    pub id: i64,
    pub name: String,
    pub question_count: usize,
}

impl QuizCacheService {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        store: Arc<dyn QuizStore>,
        debug_bypass: bool,
    ) -> Self {
        Self {
            backend,
            store,
            debug_bypass,
        }
    }

    /// Returns the projection for a quiz, or None if it does not exist.
    ///
    /// With `use_cache` (and no debug bypass), serves from the cache and
    /// falls through to the store on miss; a store miss is negative-cached
    /// for five minutes. Backend failures propagate to the caller.
    pub async fn get_quiz(
        &self,
        id: i64,
        use_cache: bool,
    ) -> Result<Option<QuizProjection>, CacheError> {
        if !use_cache || self.debug_bypass {
            return self.load_quiz(id).await;
        }

        let key = quiz_key(id);
        let value = self
            .backend
            .get_or_compute(
                &key,
                QUIZ_TTL,
                Box::pin(async move {
                    tracing::debug!(quiz_id = id, "cache miss, loading quiz from database");

                    match self.load_quiz(id).await? {
                        Some(projection) => Ok(Computed::fresh(serde_json::to_value(&projection)?)),
                        None => {
                            tracing::debug!(quiz_id = id, "quiz not found, caching negative result");
                            Ok(Computed::short_lived(Value::Null, NEGATIVE_TTL))
                        }
                    }
                }),
            )
            .await?;

        if value.is_null() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(value)?))
    }

    /// Force-refreshes the cache entry for a quiz: deletes the existing key,
    /// then performs a cache-aside read which reconstructs and re-stores it.
    pub async fn cache_quiz(&self, quiz: &QuizAggregate) -> Result<(), CacheError> {
        let id = quiz.id();
        self.backend.delete(&quiz_key(id)).await?;
        self.get_quiz(id, true).await?;

        tracing::debug!(quiz_id = id, "refreshed quiz cache entry");
        Ok(())
    }

    /// Deletes the per-quiz cache entry. Idempotent.
    pub async fn invalidate_quiz_cache(&self, id: i64) -> Result<(), CacheError> {
        self.backend.delete(&quiz_key(id)).await?;
        tracing::debug!(quiz_id = id, "invalidated quiz cache entry");
        Ok(())
    }

    /// Returns summaries for every quiz, cache-aside over the canonical
    /// listing key with the short TTL tier.
    pub async fn get_all_quizzes(&self, use_cache: bool) -> Result<Vec<QuizSummary>, CacheError> {
        if !use_cache || self.debug_bypass {
            return self.load_summaries().await;
        }

        let value = self
            .backend
            .get_or_compute(
                LIST_CACHE_KEY,
                LIST_TTL,
                Box::pin(async move {
                    tracing::debug!("cache miss, loading quiz list from database");
                    let summaries = self.load_summaries().await?;
                    Ok(Computed::fresh(serde_json::to_value(&summaries)?))
                }),
            )
            .await?;

        Ok(serde_json::from_value(value)?)
    }

    /// Deletes the canonical listing cache entry. Idempotent.
    pub async fn invalidate_list_caches(&self) -> Result<(), CacheError> {
        self.backend.delete(LIST_CACHE_KEY).await?;
        tracing::debug!("invalidated quiz list cache");
        Ok(())
    }

    /// Populates the cache with every quiz in the store, then primes the
    /// listing cache. Returns the number of quizzes warmed.
    pub async fn warmup_cache(&self) -> Result<usize, CacheError> {
        let quizzes = self.store.find_all().await?;
        let mut count = 0;

        for quiz in &quizzes {
            self.get_quiz(quiz.id(), true).await?;
            count += 1;
        }

        self.get_all_quizzes(true).await?;

        tracing::info!(count, "warmed up quiz cache");
        Ok(count)
    }

    /// Reloads a quiz from the store and repopulates its cache entry.
    /// Returns false (with no side effects) when the quiz does not exist.
    pub async fn refresh_quiz_cache(&self, id: i64) -> Result<bool, CacheError> {
        if self.store.find_by_id(id).await?.is_none() {
            tracing::warn!(quiz_id = id, "cannot refresh quiz cache, quiz not found");
            return Ok(false);
        }

        self.invalidate_quiz_cache(id).await?;
        self.get_quiz(id, true).await?;

        tracing::debug!(quiz_id = id, "refreshed quiz cache");
        Ok(true)
    }

    /// Cache observability snapshot; performs no mutation.
    pub async fn get_stats(&self) -> Result<CacheStats, CacheError> {
        let cached = self.cached_quizzes_list().await?;

        Ok(CacheStats {
            quiz_count: cached.len(),
            quiz_ttl_secs: QUIZ_TTL.as_secs(),
            list_ttl_secs: LIST_TTL.as_secs(),
            negative_ttl_secs: NEGATIVE_TTL.as_secs(),
        })
    }

    /// Probes which quizzes currently have a live cache entry.
    pub async fn cached_quizzes_list(&self) -> Result<Vec<CachedQuizInfo>, CacheError> {
        let quizzes = self.store.find_all().await?;
        let mut result = Vec::new();

        for quiz in &quizzes {
            let Some(value) = self.backend.get(&quiz_key(quiz.id())).await? else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let projection: QuizProjection = serde_json::from_value(value)?;
            result.push(CachedQuizInfo {
                id: projection.id,
                name: projection.name,
                question_count: projection.questions.len(),
            });
        }

        Ok(result)
    }

    /// Drops every per-quiz entry known to the store plus the listing entry.
    pub async fn clear_all_caches(&self) -> Result<(), CacheError> {
        let quizzes = self.store.find_all().await?;
        for quiz in &quizzes {
            self.invalidate_quiz_cache(quiz.id()).await?;
        }

        self.invalidate_list_caches().await?;

        tracing::info!("cleared all quiz caches");
        Ok(())
    }

    async fn load_quiz(&self, id: i64) -> Result<Option<QuizProjection>, CacheError> {
        let aggregate = self.store.find_by_id(id).await?;
        Ok(aggregate.as_ref().map(QuizProjection::from))
    }

    async fn load_summaries(&self) -> Result<Vec<QuizSummary>, CacheError> {
        let quizzes = self.store.find_all().await?;
        Ok(quizzes.iter().map(QuizSummary::from).collect())
    }
}
