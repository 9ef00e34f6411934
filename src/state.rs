use std::sync::Arc;

use crate::acl::{AccessControlEngine, ResourceAccessGate};
use crate::auth::{AuthService, AuthSessionManager, Clock};
use crate::config::{AppConfig, Environment};
use crate::database::{AclStore, PageStore, TokenStore, UserStore};
use crate::render::{HelperRegistry, PageRenderPipeline};

/// Storage collaborators the application is wired from
#[derive(Clone)]
pub struct Stores {
    pub tokens: Arc<dyn TokenStore>,
    pub acls: Arc<dyn AclStore>,
    pub pages: Arc<dyn PageStore>,
    pub users: Arc<dyn UserStore>,
}

/// Shared handler state; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub environment: Environment,
    pub sessions: AuthSessionManager,
    pub auth: AuthService,
    pub gate: ResourceAccessGate,
    pub pipeline: PageRenderPipeline,
    pub pages: Arc<dyn PageStore>,
}

impl AppState {
    pub fn new(config: &AppConfig, stores: Stores, clock: Arc<dyn Clock>) -> Self {
        let sessions = AuthSessionManager::new(&config.auth, stores.tokens.clone(), clock.clone());
        let auth = AuthService::new(stores.users, sessions.clone());
        let gate = ResourceAccessGate::new(AccessControlEngine::new(stores.acls, stores.tokens, clock));
        let pipeline = PageRenderPipeline::new(
            stores.pages.clone(),
            Arc::new(HelperRegistry::legacy()),
            config.render.clone(),
        );

        Self {
            environment: config.environment,
            sessions,
            auth,
            gate,
            pipeline,
            pages: stores.pages,
        }
    }

    pub fn debug_routes_enabled(&self) -> bool {
        self.environment == Environment::Development
    }
}
