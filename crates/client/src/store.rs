//! Session reconciliation state machine.
//!
//! [`SessionStore`] holds the single client-visible view of the current
//! session and keeps it eventually consistent with the backend's cookie
//! session. The encrypted cache only seeds an optimistic first state; every
//! seed is followed by a server check.
//!
//! Failure policy:
//! - sign-in and sign-up errors are returned to the caller;
//! - sign-out always succeeds locally, a failed server logout is logged;
//! - a sync that fails for network or server reasons leaves the state as it
//!   was, while an explicit "no user" answer clears it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use iching_core::login_errors::LoginErrorCode;
use iching_core::routes::{
    is_auth_route, is_protected_route, login_redirect, LANDING_ROUTE, LOGIN_ROUTE,
};
use tokio::sync::watch;
use validator::Validate;

use crate::backend::AuthBackend;
use crate::cache::SecureSessionCache;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiErrorKind};
use crate::models::{Credentials, Session, SessionRecord, SignUpRequest, User};

/// Where sign-up lands: the login page, flagged so it can greet the new user.
pub const SIGNUP_LANDING_ROUTE: &str = "/login?registered=true";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthStatus {
    /// No check has run yet.
    #[default]
    Uninitialized,
    Authenticated(SessionRecord),
    Unauthenticated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub status: AuthStatus,
    /// An operation against the backend is in flight.
    pub is_loading: bool,
    /// Set right after sign-up so the trip to the login page is not treated
    /// as a logged-out visit to a protected area.
    pub allow_unauthenticated_access: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self.status, AuthStatus::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match &self.status {
            AuthStatus::Authenticated(record) => Some(&record.user),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.status {
            AuthStatus::Authenticated(record) => Some(&record.session),
            _ => None,
        }
    }
}

/// Route the caller should navigate to once an operation completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub target: String,
}

impl Navigation {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Delay before a sync triggered by navigation or tab visibility.
    pub sync_debounce: Duration,
    /// Where a successful sign-in lands.
    pub landing_route: String,
}

impl StoreOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            sync_debounce: config.sync_debounce,
            ..Self::default()
        }
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            sync_debounce: Duration::from_millis(100),
            landing_route: LANDING_ROUTE.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    cache: SecureSessionCache,
    options: StoreOptions,
    state: watch::Sender<SessionState>,
    /// Id of the most recently issued sync; older responses are dropped.
    /// Held while a sync result or a superseding write is applied.
    latest_sync: Mutex<u64>,
    mounted: AtomicBool,
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        cache: SecureSessionCache,
        options: StoreOptions,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            backend,
            cache,
            options,
            state,
            latest_sync: Mutex::new(0),
            mounted: AtomicBool::new(true),
        }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Seed state from the cache, then reconcile with the server.
    pub async fn initialize(&self) {
        let cached = self.cache.load();
        tracing::debug!(cached = cached.is_some(), "Initializing session state");
        self.update(move |s| {
            s.status = match cached {
                Some(record) => AuthStatus::Authenticated(record),
                None => AuthStatus::Unauthenticated,
            };
        });
        self.sync().await;
    }

    /// Log in and land on the protected area.
    ///
    /// Validation failures return before any request. Backend errors are
    /// returned to the caller after the loading flag is cleared.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Navigation, ApiError> {
        credentials.validate()?;
        self.update(|s| s.is_loading = true);

        match self.backend.login(credentials).await {
            Ok(record) => {
                self.superseding(|| {
                    self.persist(&record);
                    self.update(move |s| {
                        s.status = AuthStatus::Authenticated(record);
                        s.is_loading = false;
                        s.allow_unauthenticated_access = false;
                    });
                });
                Ok(Navigation::to(self.options.landing_route.clone()))
            }
            Err(e) => {
                tracing::info!(kind = ?e.kind(), error = %e, "Sign-in failed");
                self.update(|s| {
                    s.status = AuthStatus::Unauthenticated;
                    s.is_loading = false;
                });
                Err(e)
            }
        }
    }

    /// Register and send the user to the login page.
    ///
    /// Registration does not count as authentication: confirmation may still
    /// be pending. Any session the backend returns is cached for the next
    /// start, and the state is left unauthenticated.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<Navigation, ApiError> {
        request.validate()?;
        self.update(|s| s.is_loading = true);

        match self.backend.signup(request).await {
            Ok(outcome) => {
                if let Some(session) = outcome.session {
                    self.persist(&SessionRecord {
                        user: outcome.user,
                        session,
                    });
                }
                self.update(|s| {
                    s.status = AuthStatus::Unauthenticated;
                    s.is_loading = false;
                    s.allow_unauthenticated_access = true;
                });
                Ok(Navigation::to(SIGNUP_LANDING_ROUTE))
            }
            Err(e) => {
                tracing::info!(kind = ?e.kind(), error = %e, "Sign-up failed");
                self.update(|s| s.is_loading = false);
                Err(e)
            }
        }
    }

    /// Log out. Never fails.
    ///
    /// Local state is cleared before the server call so no stale
    /// authenticated view is shown while it runs.
    pub async fn sign_out(&self) -> Navigation {
        self.superseding(|| {
            self.update(|s| {
                s.status = AuthStatus::Unauthenticated;
                s.is_loading = true;
                s.allow_unauthenticated_access = false;
            });
            self.cache.clear();
        });

        if let Err(e) = self.backend.logout().await {
            tracing::warn!(error = %e, "Server logout failed, local session cleared anyway");
        }

        self.update(|s| s.is_loading = false);
        Navigation::to(LOGIN_ROUTE)
    }

    /// Reconcile local state with the server session. Idempotent.
    ///
    /// Only the most recently issued sync may apply its result.
    pub async fn sync(&self) {
        let id = {
            let mut latest = self.latest_sync();
            *latest += 1;
            *latest
        };
        self.update(|s| s.is_loading = true);

        let result = self.backend.me().await;
        self.apply_sync(id, result);
    }

    /// Apply a sync result unless a newer sync or a sign-in/out has been
    /// issued since. The id check and the writes happen under one lock.
    fn apply_sync(&self, id: u64, result: Result<Option<SessionRecord>, ApiError>) {
        let latest = self.latest_sync();
        if *latest != id {
            tracing::debug!(sync_id = id, "Discarding superseded sync result");
            return;
        }

        match result {
            Ok(Some(record)) => {
                let record = self.merge_session(record);
                self.persist(&record);
                self.update(move |s| {
                    s.status = AuthStatus::Authenticated(record);
                    s.is_loading = false;
                });
            }
            Ok(None) => self.clear_session("no user"),
            Err(e) if e.kind() == ApiErrorKind::Auth => self.clear_session("rejected"),
            Err(e) => {
                tracing::warn!(error = %e, "Session sync failed, keeping current state");
                self.update(|s| s.is_loading = false);
            }
        }
    }

    /// Navigation hook. Arriving on an auth page consumes the post-sign-up
    /// allowance; entering a protected area triggers a debounced sync.
    pub async fn on_route_change(&self, path: &str) {
        if is_auth_route(path) && self.get().allow_unauthenticated_access {
            self.update(|s| s.allow_unauthenticated_access = false);
        }
        if !is_protected_route(path) {
            return;
        }
        tokio::time::sleep(self.options.sync_debounce).await;
        self.sync().await;
    }

    /// Tab visibility hook: becoming visible triggers a debounced sync.
    pub async fn on_visibility_change(&self, visible: bool) {
        if !visible {
            return;
        }
        tokio::time::sleep(self.options.sync_debounce).await;
        self.sync().await;
    }

    /// Client-side guard: the redirect target for `path`, if any.
    ///
    /// Nothing is decided while the state is unresolved or loading.
    pub fn guard(&self, path: &str) -> Option<String> {
        let state = self.get();
        if !is_protected_route(path) || state.is_authenticated() {
            return None;
        }
        if state.is_loading || state.status == AuthStatus::Uninitialized {
            return None;
        }
        if state.allow_unauthenticated_access {
            return Some(login_redirect(None, None));
        }
        Some(login_redirect(Some(LoginErrorCode::Unauthorized), Some(path)))
    }

    /// Stop applying state changes. In-flight operations finish silently.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    // ---- private helpers ----

    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        if !self.mounted.load(Ordering::SeqCst) {
            tracing::debug!("Store unmounted, dropping state update");
            return;
        }
        self.state.send_modify(f);
    }

    fn latest_sync(&self) -> MutexGuard<'_, u64> {
        self.latest_sync.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Invalidate in-flight syncs and run `f` before any of them can apply.
    fn superseding<R>(&self, f: impl FnOnce() -> R) -> R {
        let mut latest = self.latest_sync();
        *latest += 1;
        f()
    }

    fn persist(&self, record: &SessionRecord) {
        if let Err(e) = self.cache.save(record) {
            tracing::warn!(error = %e, "Failed to write session cache");
        }
    }

    fn clear_session(&self, reason: &str) {
        tracing::info!(reason, "Server reports no session, clearing local state");
        self.cache.clear();
        self.update(|s| {
            s.status = AuthStatus::Unauthenticated;
            s.is_loading = false;
        });
    }

    /// Keep known session metadata when the server only reports the user.
    fn merge_session(&self, mut record: SessionRecord) -> SessionRecord {
        if record.session == Session::default() {
            if let AuthStatus::Authenticated(current) = &self.state.borrow().status {
                if current.user.id == record.user.id {
                    record.session = current.session.clone();
                }
            }
        }
        record
    }
}
