use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::{ApplicationRepository, UserRepository, UserRepositoryTrait},
    services::ApplicationService,
};

/// Shared handler state. Repositories are constructed once here and injected
/// into the service; nothing downstream reaches for a global connection.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepositoryTrait>,
    pub applications: ApplicationService,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let repository = Arc::new(ApplicationRepository::new(pool.clone()));
        let users: Arc<dyn UserRepositoryTrait> = Arc::new(UserRepository::new(pool));
        let applications = ApplicationService::new(repository, users.clone(), config.time_zone);
        Self {
            config,
            users,
            applications,
        }
    }
}
