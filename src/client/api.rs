use std::env;
use std::sync::Arc;

use reqwest::{Method, Request, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use super::session::{Credential, SessionManager};
use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::models::{Category, Payment, PaymentInput, Task, TaskInput, TaskPage, UserSummary};
use crate::tasks::TaskQueryParams;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080/api";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the credentials of a protected request.
    #[error("session is not authorized")]
    Unauthorized,
    /// The session the request was prepared under ended before it was sent.
    #[error("session changed before the request was sent")]
    SessionChanged,
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        message: String,
        errors: Vec<String>,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<String>,
}

/// Typed access to the TaskDeck API on behalf of one [`SessionManager`].
///
/// Requests are never retried. A 401 on a protected request ends the session
/// it was sent under.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionManager>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Uses `TASKDECK_API_BASE_URL`, falling back to [`DEFAULT_API_BASE_URL`].
    pub fn from_env(session: Arc<SessionManager>) -> Self {
        let base_url = env::var("TASKDECK_API_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        Self::new(base_url, session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserSummary, ClientError> {
        let auth: AuthResponse = self
            .fetch(self.request(Method::POST, "/auth/register").json(request), false)
            .await?;
        self.session.register(auth.token, auth.user.clone());
        Ok(auth.user)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<UserSummary, ClientError> {
        let auth: AuthResponse = self
            .fetch(self.request(Method::POST, "/auth/login").json(request), false)
            .await?;
        self.session.login(auth.token, auth.user.clone());
        Ok(auth.user)
    }

    /// Local only; tokens are stateless so there is nothing to revoke.
    pub fn logout(&self) {
        self.session.logout();
    }

    pub async fn list_tasks(&self, query: &TaskQueryParams) -> Result<TaskPage, ClientError> {
        self.fetch(self.request(Method::GET, "/tasks").query(query), true)
            .await
    }

    pub async fn get_task(&self, id: i32) -> Result<Task, ClientError> {
        self.fetch(self.request(Method::GET, &format!("/tasks/{}", id)), true)
            .await
    }

    pub async fn create_task(&self, input: &TaskInput) -> Result<Task, ClientError> {
        self.fetch(self.request(Method::POST, "/tasks").json(input), true)
            .await
    }

    pub async fn update_task(&self, id: i32, input: &TaskInput) -> Result<Task, ClientError> {
        self.fetch(
            self.request(Method::PUT, &format!("/tasks/{}", id)).json(input),
            true,
        )
        .await
    }

    pub async fn delete_task(&self, id: i32) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("/tasks/{}", id)), true)
            .await?;
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, ClientError> {
        self.fetch(self.request(Method::GET, "/categories"), true)
            .await
    }

    pub async fn list_payments(&self) -> Result<Vec<Payment>, ClientError> {
        self.fetch(self.request(Method::GET, "/payments"), true)
            .await
    }

    pub async fn create_payment(&self, input: &PaymentInput) -> Result<Payment, ClientError> {
        self.fetch(self.request(Method::POST, "/payments").json(input), true)
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        protected: bool,
    ) -> Result<T, ClientError> {
        let response = self.send(builder, protected).await?;
        Ok(response.json().await?)
    }

    /// Sends one request, attaching the current token to protected ones.
    async fn send(
        &self,
        builder: RequestBuilder,
        protected: bool,
    ) -> Result<reqwest::Response, ClientError> {
        let (request, credential) = self.prepare(builder, protected)?;
        self.dispatch(request, credential, protected).await
    }

    fn prepare(
        &self,
        builder: RequestBuilder,
        protected: bool,
    ) -> Result<(Request, Credential), ClientError> {
        let credential = self.session.credential();
        let builder = match (&credential.token, protected) {
            (Some(token), true) => builder.bearer_auth(token),
            _ => builder,
        };
        Ok((builder.build()?, credential))
    }

    async fn dispatch(
        &self,
        request: Request,
        credential: Credential,
        protected: bool,
    ) -> Result<reqwest::Response, ClientError> {
        let method = request.method().clone();
        let url = request.url().clone();

        // A token cleared by logout or a 401 elsewhere must not go out.
        if protected && credential.token.is_some() && self.session.epoch() != credential.epoch {
            log::debug!("{} {} dropped: session changed", method, url);
            return Err(ClientError::SessionChanged);
        }

        let response = self.http.execute(request).await.map_err(|e| {
            log::error!("{} {} failed: {}", method, url, e);
            e
        })?;

        let status = response.status();
        if status.is_success() {
            log::debug!("{} {} -> {}", method, url, status);
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && protected {
            log::warn!("{} {} -> {}", method, url, status);
            if credential.token.is_some() {
                self.session.handle_unauthorized(credential.epoch);
            }
            return Err(ClientError::Unauthorized);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        log::warn!("{} {} -> {}: {}", method, url, status, body.message);
        Err(ClientError::Api {
            status: status.as_u16(),
            message: body.message,
            errors: body.errors,
        })
    }
}
