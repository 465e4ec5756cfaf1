use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::db::Database;
use crate::middleware::rate_limit::RateLimiter;
use crate::services::dictionary::DictionaryProvider;
use crate::services::ingestion::NewsProvider;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    db: Database,
    dictionary: Arc<dyn DictionaryProvider>,
    news: Arc<dyn NewsProvider>,
    rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Database,
        dictionary: Arc<dyn DictionaryProvider>,
        news: Arc<dyn NewsProvider>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit));
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            db,
            dictionary,
            news,
            rate_limiter,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn dictionary(&self) -> Arc<dyn DictionaryProvider> {
        Arc::clone(&self.dictionary)
    }

    pub fn news(&self) -> Arc<dyn NewsProvider> {
        Arc::clone(&self.news)
    }

    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.rate_limiter)
    }
}
