//! HTTP client for the external backend API.
//!
//! [`BackendClient`] keeps the backend's httpOnly `auth_token` and
//! `refresh_token` cookies in its own cookie jar. Nothing outside the client
//! can read them, which mirrors how a browser treats those cookies; the
//! session store only ever sees the user/session metadata in response bodies.

use async_trait::async_trait;
use reqwest::header::COOKIE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

use crate::config::ClientConfig;
use crate::cooldown::Cooldown;
use crate::error::ApiError;
use crate::models::{
    ClarificationAnswer, Credentials, EmailRequest, Envelope, IChingPrediction, MeResponse,
    PasswordChangeRequest, Profile, Quota, ReadingPage, ReadingQuery, ReadingRequest,
    SaveReadingRequest, SavedReading, SessionRecord, SignUpOutcome, SignUpRequest,
    UpdateReadingRequest, UpgradeRequest,
};

/// Name of the httpOnly access-token cookie set by the backend.
pub const AUTH_COOKIE: &str = "auth_token";

/// Header carrying a per-request correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Authentication operations the session store depends on.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST /api/auth/login`.
    async fn login(&self, credentials: &Credentials) -> Result<SessionRecord, ApiError>;

    /// `POST /api/auth/signup`.
    async fn signup(&self, request: &SignUpRequest) -> Result<SignUpOutcome, ApiError>;

    /// `POST /api/auth/logout`.
    async fn logout(&self) -> Result<(), ApiError>;

    /// `GET /api/auth/me`. `Ok(None)` when the backend reports no user.
    async fn me(&self) -> Result<Option<SessionRecord>, ApiError>;

    /// `GET /api/auth/validate-token` using the cookie jar.
    async fn validate_token(&self) -> Result<bool, ApiError>;
}

pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    resend_cooldown: Cooldown,
}

impl BackendClient {
    /// Build a client with its own cookie jar.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            resend_cooldown: Cooldown::new(config.resend_cooldown),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ---- password & email flows ----

    /// `POST /api/auth/password/change`.
    pub async fn change_password(&self, request: &PasswordChangeRequest) -> Result<(), ApiError> {
        request.validate()?;
        self.send(
            self.client
                .post(self.url("/api/auth/password/change"))
                .json(request),
        )
        .await?;
        tracing::info!("Password changed");
        Ok(())
    }

    /// `POST /api/auth/password/reset`.
    ///
    /// The backend answers with the same generic success whether or not the
    /// address exists.
    pub async fn reset_password(&self, request: &EmailRequest) -> Result<(), ApiError> {
        request.validate()?;
        self.send(
            self.client
                .post(self.url("/api/auth/password/reset"))
                .json(request),
        )
        .await?;
        Ok(())
    }

    /// `POST /api/auth/resend-confirmation`, at most once per cooldown per address.
    pub async fn resend_confirmation(&self, request: &EmailRequest) -> Result<(), ApiError> {
        request.validate()?;
        let key = request.email.trim().to_lowercase();
        if let Err(remaining) = self.resend_cooldown.try_acquire(&key) {
            return Err(ApiError::Validation(format!(
                "Please wait {} seconds before requesting another confirmation email",
                remaining.as_secs().max(1)
            )));
        }

        let result = self
            .send(
                self.client
                    .post(self.url("/api/auth/resend-confirmation"))
                    .json(request),
            )
            .await;
        if let Err(ApiError::Network(_)) = &result {
            // Nothing reached the server; let the user retry right away.
            self.resend_cooldown.reset(&key);
        }
        result.map(|_| ())
    }

    /// Validate an `auth_token` cookie value on behalf of another party.
    ///
    /// Used by the edge guard, which reads the cookie from an incoming request
    /// rather than from this client's jar.
    pub async fn validate_token_cookie(&self, token: &str) -> Result<bool, ApiError> {
        let request = self
            .client
            .get(self.url("/api/auth/validate-token"))
            .header(COOKIE, format!("{AUTH_COOKIE}={token}"));
        Self::token_verdict(self.send(request).await)
    }

    // ---- divination ----

    /// `POST /api/divination/iching-reading`.
    pub async fn iching_reading(
        &self,
        request: &ReadingRequest,
    ) -> Result<IChingPrediction, ApiError> {
        request.validate()?;
        self.post_json("/api/divination/iching-reading", request)
            .await
    }

    /// `POST /api/divination/iching-reading/save`.
    pub async fn save_reading(&self, request: &SaveReadingRequest) -> Result<SavedReading, ApiError> {
        self.post_json("/api/divination/iching-reading/save", request)
            .await
    }

    /// `POST /api/divination/iching-reading/update` with a clarifying question.
    pub async fn update_reading(
        &self,
        request: &UpdateReadingRequest,
    ) -> Result<ClarificationAnswer, ApiError> {
        request.validate()?;
        self.post_json("/api/divination/iching-reading/update", request)
            .await
    }

    // ---- reading history ----

    /// `GET /api/user/readings?page&limit[&search]`.
    pub async fn list_readings(&self, query: &ReadingQuery) -> Result<ReadingPage, ApiError> {
        let response = self
            .send(self.client.get(self.url("/api/user/readings")).query(query))
            .await?;
        Self::parse(response).await
    }

    /// `DELETE /api/user/readings/{id}`.
    pub async fn delete_reading(&self, id: &str) -> Result<(), ApiError> {
        if id.trim().is_empty() {
            return Err(ApiError::Validation("Reading id is required".into()));
        }
        self.send(
            self.client
                .delete(self.url(&format!("/api/user/readings/{id}"))),
        )
        .await?;
        Ok(())
    }

    /// `DELETE /api/user/readings` -- removes the whole history.
    pub async fn delete_all_readings(&self) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url("/api/user/readings")))
            .await?;
        Ok(())
    }

    // ---- membership ----

    /// `GET /api/user/profile`.
    pub async fn profile(&self) -> Result<Profile, ApiError> {
        self.get_json("/api/user/profile").await
    }

    /// `POST /api/user/profile/upgrade`.
    pub async fn upgrade_membership(&self, request: &UpgradeRequest) -> Result<Profile, ApiError> {
        self.post_json("/api/user/profile/upgrade", request).await
    }

    /// `GET /api/user/quota`.
    pub async fn quota(&self) -> Result<Quota, ApiError> {
        self.get_json("/api/user/quota").await
    }

    // ---- private helpers ----

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Self::parse(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.client.post(self.url(path)).json(body))
            .await?;
        Self::parse(response).await
    }

    /// Attach a request id, send, and decode any failure into an [`ApiError`].
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = request
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(request_id = %request_id, error = %e, "Backend request failed");
                ApiError::from(e)
            })?;
        Self::ensure_success(response, &request_id).await
    }

    /// Pass a success response through; turn anything else into an error.
    async fn ensure_success(
        response: reqwest::Response,
        request_id: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(status.as_u16(), &body);
        tracing::debug!(request_id, status = status.as_u16(), error = %err, "Backend rejected request");
        Err(err)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        Ok(response.json::<T>().await?)
    }

    /// Map a validate-token response onto valid / invalid / unknown.
    fn token_verdict(result: Result<reqwest::Response, ApiError>) -> Result<bool, ApiError> {
        match result {
            Ok(_) => Ok(true),
            Err(ApiError::Auth { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AuthBackend for BackendClient {
    async fn login(&self, credentials: &Credentials) -> Result<SessionRecord, ApiError> {
        credentials.validate()?;
        let envelope: Envelope<SessionRecord> =
            self.post_json("/api/auth/login", credentials).await?;
        tracing::info!(user_id = %envelope.data.user.id, "Logged in");
        Ok(envelope.data)
    }

    async fn signup(&self, request: &SignUpRequest) -> Result<SignUpOutcome, ApiError> {
        request.validate()?;
        let envelope: Envelope<SignUpOutcome> = self.post_json("/api/auth/signup", request).await?;
        tracing::info!(
            user_id = %envelope.data.user.id,
            has_session = envelope.data.session.is_some(),
            "Signed up"
        );
        Ok(envelope.data)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.send(self.client.post(self.url("/api/auth/logout")))
            .await?;
        Ok(())
    }

    async fn me(&self) -> Result<Option<SessionRecord>, ApiError> {
        let response = match self.send(self.client.get(self.url("/api/auth/me"))).await {
            Ok(response) => response,
            Err(e) if e.is_unauthorized() => return Ok(None),
            Err(e) => return Err(e),
        };
        let body: serde_json::Value = Self::parse(response).await?;
        // Accept both a bare `{user, session}` body and a `{data: {...}}` envelope.
        let inner = body
            .get("data")
            .filter(|d| d.is_object())
            .cloned()
            .unwrap_or(body);
        let me: MeResponse = serde_json::from_value(inner)
            .map_err(|e| ApiError::Network(format!("Malformed response: {e}")))?;
        Ok(me.user.map(|user| SessionRecord {
            user,
            session: me.session.unwrap_or_default(),
        }))
    }

    async fn validate_token(&self) -> Result<bool, ApiError> {
        let result = self
            .send(self.client.get(self.url("/api/auth/validate-token")))
            .await;
        Self::token_verdict(result)
    }
}
