use std::sync::Arc;

use crate::{
    clock::Clock,
    config::AppConfig,
    db::DbPool,
    services::{
        directory::UserDirectory, notify::NotificationHook, queries::RideQueryService,
        repo::RideRepository, rides::RideLifecycleEngine,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub directory: UserDirectory,
    pub engine: RideLifecycleEngine,
    pub queries: RideQueryService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationHook>,
    ) -> Self {
        let repo = RideRepository::new(db.clone());
        let directory = UserDirectory::new(db.clone());
        let engine = RideLifecycleEngine::new(
            repo.clone(),
            directory.clone(),
            clock.clone(),
            notifier,
        );
        let queries = RideQueryService::new(repo, clock);
        Self {
            config,
            db,
            directory,
            engine,
            queries,
        }
    }
}
