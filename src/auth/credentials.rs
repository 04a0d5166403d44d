use std::sync::Arc;

use tokio::sync::OnceCell;
use validator::Validate;

use super::password::{hash_password, verify_password, DEFAULT_HASH_COST};
use super::{LoginRequest, RegisterRequest};
use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::store::UserRepository;

/// Registers identities and checks passwords against them.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    hash_cost: u32,
    // Hash at `hash_cost` that unknown emails are verified against.
    decoy_hash: Arc<OnceCell<String>>,
}

const DECOY_PASSWORD: &str = "taskdeck-decoy-password";

impl CredentialStore {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self {
            users,
            hash_cost: DEFAULT_HASH_COST,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Overrides the bcrypt work factor.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self.decoy_hash = Arc::new(OnceCell::new());
        self
    }

    /// Validates the request, hashes the password and inserts the user.
    ///
    /// A duplicate email (ignoring case) is reported by the store itself as part
    /// of the insert, so two concurrent registrations cannot both succeed.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AppError> {
        let request = RegisterRequest {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            password: request.password,
        };
        request.validate()?;

        let password_hash = hash_blocking(request.password, self.hash_cost).await?;
        let user = self
            .users
            .insert_user(NewUser {
                name: request.name,
                email: request.email,
                password_hash,
            })
            .await?;

        log::info!("registered user {}", user.id);
        Ok(user)
    }

    /// Looks the user up by email and verifies the password.
    ///
    /// Unknown emails and wrong passwords both yield `AppError::InvalidCredentials`,
    /// and both pay for one bcrypt verification at the configured cost.
    pub async fn authenticate(&self, request: LoginRequest) -> Result<User, AppError> {
        let request = LoginRequest {
            email: request.email.trim().to_string(),
            password: request.password,
        };
        request.validate()?;

        let Some(user) = self.users.find_user_by_email(&request.email).await? else {
            let decoy = self.decoy_hash().await?;
            verify_blocking(request.password, decoy).await?;
            return Err(AppError::InvalidCredentials);
        };

        if verify_blocking(request.password, user.password_hash.clone()).await? {
            Ok(user)
        } else {
            Err(AppError::InvalidCredentials)
        }
    }

    async fn decoy_hash(&self) -> Result<String, AppError> {
        let cost = self.hash_cost;
        self.decoy_hash
            .get_or_try_init(|| hash_blocking(DECOY_PASSWORD.to_string(), cost))
            .await
            .cloned()
    }
}

// bcrypt blocks for tens of milliseconds; keep it off the async workers.
async fn hash_blocking(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::ServerFault(format!("hashing task failed: {}", e)))?
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::ServerFault(format!("verification task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn credentials() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStore::new())).with_hash_cost(4)
    }

    fn ann(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ann Lee".to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[actix_rt::test]
    async fn test_register_stores_hash_not_password() {
        let store = credentials();
        let user = store.register(ann("ann@example.com")).await.unwrap();

        assert_eq!(user.name, "Ann Lee");
        assert_ne!(user.password_hash, "secret1");
        assert!(user.password_hash.starts_with("$2"));
    }

    #[actix_rt::test]
    async fn test_duplicate_email_in_any_case() {
        let store = credentials();
        store.register(ann("ann@example.com")).await.unwrap();

        for variant in ["ann@example.com", "ANN@example.com", "Ann@Example.Com", " ann@example.com "] {
            let result = store.register(ann(variant)).await;
            assert!(
                matches!(result, Err(AppError::DuplicateEmail)),
                "expected duplicate for {:?}",
                variant
            );
        }
    }

    #[actix_rt::test]
    async fn test_register_rejects_invalid_input() {
        let store = credentials();
        let result = store
            .register(RegisterRequest {
                name: " A ".to_string(),
                email: "not-an-email".to_string(),
                password: "123".to_string(),
            })
            .await;

        match result {
            Err(AppError::ValidationFailed { errors, .. }) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn test_authenticate_outcomes_are_indistinguishable() {
        let store = credentials();
        store.register(ann("ann@example.com")).await.unwrap();

        let ok = store.authenticate(login("ANN@example.com", "secret1")).await.unwrap();
        assert_eq!(ok.email, "ann@example.com");

        let wrong_password = store.authenticate(login("ann@example.com", "secret2")).await.unwrap_err();
        let unknown_email = store.authenticate(login("bob@example.com", "secret1")).await.unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[actix_rt::test]
    async fn test_unknown_email_is_verified_against_decoy() {
        let store = credentials();
        store.register(ann("ann@example.com")).await.unwrap();

        store.authenticate(login("ann@example.com", "secret2")).await.unwrap_err();
        assert!(store.decoy_hash.get().is_none());

        let unknown_email = store.authenticate(login("bob@example.com", "secret1")).await.unwrap_err();
        assert!(matches!(unknown_email, AppError::InvalidCredentials));

        // Same work factor as a stored hash.
        let decoy = store.decoy_hash.get().cloned().unwrap();
        assert!(decoy.starts_with("$2b$04$"));
        assert!(!verify_password("secret1", &decoy).unwrap());
    }

    #[actix_rt::test]
    async fn test_concurrent_registrations_admit_one() {
        let store = credentials();
        let attempts = (0..8).map(|_| {
            let store = store.clone();
            async move { store.register(ann("race@example.com")).await }
        });

        let results = futures::future::join_all(attempts).await;
        let created = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::DuplicateEmail)))
            .count();

        assert_eq!(created, 1);
        assert_eq!(duplicates, 7);
    }
}
