use std::sync::Arc;

use crate::auth::{CredentialStore, TokenIssuer, TokenValidator};
use crate::config::JwtSettings;
use crate::payments::PaymentLedger;
use crate::store::{CategoryRepository, PaymentRepository, TaskRepository, UserRepository};
use crate::tasks::{TaskGateway, TaskQueryEngine};

/// Shared services handed to every handler as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialStore,
    pub issuer: TokenIssuer,
    pub validator: TokenValidator,
    pub queries: TaskQueryEngine,
    pub mutations: TaskGateway,
    pub categories: Arc<dyn CategoryRepository>,
    pub payments: PaymentLedger,
}

impl AppState {
    /// Wires every service to one store that implements all repository traits.
    pub fn new<S>(store: Arc<S>, jwt: &JwtSettings, max_page_size: i64) -> Self
    where
        S: UserRepository + TaskRepository + CategoryRepository + PaymentRepository + 'static,
    {
        let users: Arc<dyn UserRepository> = store.clone();
        let tasks: Arc<dyn TaskRepository> = store.clone();
        let categories: Arc<dyn CategoryRepository> = store.clone();
        let payments: Arc<dyn PaymentRepository> = store;

        Self {
            credentials: CredentialStore::new(users),
            issuer: TokenIssuer::new(jwt),
            validator: TokenValidator::new(jwt),
            queries: TaskQueryEngine::new(tasks.clone(), max_page_size),
            mutations: TaskGateway::new(tasks, categories.clone()),
            categories,
            payments: PaymentLedger::new(payments),
        }
    }

    /// Overrides the bcrypt work factor, e.g. to speed up tests.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.credentials = self.credentials.with_hash_cost(cost);
        self
    }
}
