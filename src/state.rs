use crate::cache::QuizCacheService;
use crate::config::Config;
use crate::store::QuizWriteStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn QuizWriteStore>,
    pub cache: QuizCacheService,
}
