//! Authenticated request pipeline
//!
//! Two stages around the transport:
//! - `authorize` (outbound): attach the stored access token unless the path
//!   is in the No-Auth set. Read-only with respect to the credential store.
//! - `recover` (inbound): on the first 401 for a request, renew through the
//!   coordinator and replay once with the new token. Everything else,
//!   including a 401 on a replay, goes back to the caller untouched.
//!
//! Only the renewal sequence writes to the credential store: one
//! `save_tokens` on success, one `clear` on failure.

use std::sync::Arc;
use std::time::Duration;

use fridge_auth::{CredentialStore, NoAuthPaths, UserInfo};
use fridge_transport::{ApiRequest, ApiResponse, Transport};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::coordinator::{RenewalCoordinator, RenewalOutcome};
use crate::error::{Error, RenewalError, Result};
use crate::events::{EVENT_CHANNEL_CAPACITY, SessionEvent};
use crate::metrics;

/// Upper bound on one call to the refresh endpoint.
pub const DEFAULT_RENEWAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends API requests with automatic bearer injection and session renewal.
pub struct AuthPipeline {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    no_auth: NoAuthPaths,
    coordinator: RenewalCoordinator,
    renewal_timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthPipeline {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            store,
            no_auth: NoAuthPaths::default(),
            coordinator: RenewalCoordinator::new(),
            renewal_timeout: DEFAULT_RENEWAL_TIMEOUT,
            events,
        }
    }

    pub fn with_no_auth_paths(mut self, no_auth: NoAuthPaths) -> Self {
        self.no_auth = no_auth;
        self
    }

    pub fn with_renewal_timeout(mut self, timeout: Duration) -> Self {
        self.renewal_timeout = timeout;
        self
    }

    /// Receive session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn coordinator(&self) -> &RenewalCoordinator {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Send a request, renewing the session once if it comes back 401.
    #[instrument(skip_all, fields(
        request_id = %format!("req_{}", uuid::Uuid::new_v4().as_simple()),
        method = %request.method,
        path = %request.route(),
    ))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let outgoing = self.authorize(request.clone()).await?;
        let sent_with = outgoing.bearer().map(str::to_owned);
        let response = self.transport.send(outgoing).await?;
        self.recover(request, sent_with.as_deref(), response).await
    }

    /// Outbound stage: attach the stored access token.
    ///
    /// No-Auth paths pass through unmodified. A missing token is not an
    /// error; the server's 401 drives renewal instead.
    pub async fn authorize(&self, mut request: ApiRequest) -> Result<ApiRequest> {
        if self.no_auth.matches(request.route()) {
            return Ok(request);
        }

        let token = self
            .store
            .access_token()
            .await
            .map_err(|e| Error::Credential(e.to_string()))?;
        match token {
            Some(token) => request
                .set_bearer(&token)
                .map_err(|e| Error::InvalidRequest(e.to_string()))?,
            None => debug!("no access token stored, sending without credentials"),
        }
        Ok(request)
    }

    /// Inbound stage: renew and replay on the first 401.
    ///
    /// `original` is the request as the caller built it, before `authorize`;
    /// `sent_with` is the bearer token it actually went out with. If the store
    /// already holds a different token, a renewal finished while the request
    /// was in flight and it is replayed with that token instead of spending
    /// the refresh token again.
    pub async fn recover(
        &self,
        original: ApiRequest,
        sent_with: Option<&str>,
        response: ApiResponse,
    ) -> Result<ApiResponse> {
        if !response.is_unauthorized() {
            return Ok(response);
        }
        if original.retried {
            warn!("replayed request rejected again, returning 401 to caller");
            return Ok(response);
        }
        if self.no_auth.matches(original.route()) {
            return Ok(response);
        }

        let current = self
            .store
            .access_token()
            .await
            .map_err(|e| Error::Credential(e.to_string()))?;
        let token = match current {
            Some(current) if sent_with != Some(current.as_str()) => {
                debug!("token was renewed while the request was in flight");
                current
            }
            _ => {
                debug!("access token rejected, renewing session");
                let transport = self.transport.clone();
                let store = self.store.clone();
                let events = self.events.clone();
                let timeout = self.renewal_timeout;
                self.coordinator
                    .begin_or_join(move || renew_session(transport, store, timeout, events))
                    .await?
            }
        };

        let mut replay = original;
        replay.retried = true;
        replay
            .set_bearer(&token)
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        metrics::record_replay();
        debug!("replaying request with renewed token");
        Ok(self.transport.send(replay).await?)
    }

    /// Exchange email and password for a session and store it.
    ///
    /// Returns the user's profile when the server includes one.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<UserInfo>> {
        let result = fridge_auth::login(self.transport.as_ref(), email, password)
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;

        self.store
            .save_tokens(result.access_token, result.refresh_token)
            .await
            .map_err(|e| Error::Credential(e.to_string()))?;
        if let Some(user) = &result.user {
            self.store
                .save_user(user.clone())
                .await
                .map_err(|e| Error::Credential(e.to_string()))?;
        }

        info!(user_id = result.user.as_ref().map(|u| u.id), "signed in");
        let _ = self.events.send(SessionEvent::SignedIn);
        Ok(result.user)
    }

    /// Drop the local session.
    pub async fn logout(&self) -> Result<()> {
        self.store
            .clear()
            .await
            .map_err(|e| Error::Credential(e.to_string()))?;
        info!("signed out");
        let _ = self.events.send(SessionEvent::SignedOut);
        Ok(())
    }
}

/// One renewal attempt, run by the coordinator on behalf of every waiter.
///
/// On failure the store is wiped before the outcome is returned, so callers
/// reacting to the error already observe a signed-out store. The exchange
/// runs on its own task so a panic inside it is handled like any other
/// failure, wipe included.
async fn renew_session(
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
) -> RenewalOutcome {
    let attempt = {
        let store = store.clone();
        tokio::spawn(async move { exchange(transport.as_ref(), store.as_ref(), timeout).await })
    };
    let outcome = attempt.await.unwrap_or_else(|e| {
        error!(error = %e, "session renewal task failed");
        Err(RenewalError::Abandoned)
    });
    match outcome {
        Ok(access) => {
            info!("session renewed");
            let _ = events.send(SessionEvent::Renewed);
            Ok(access)
        }
        Err(e) => {
            warn!(error = %e, "session renewal failed, clearing credentials");
            if let Err(clear_err) = store.clear().await {
                error!(error = %clear_err, "failed to clear credentials after renewal failure");
            }
            let _ = events.send(SessionEvent::Expired {
                reason: e.to_string(),
            });
            Err(e)
        }
    }
}

/// Read the refresh token, call the refresh endpoint, persist the new pair.
async fn exchange(
    transport: &dyn Transport,
    store: &dyn CredentialStore,
    timeout: Duration,
) -> RenewalOutcome {
    let refresh = store
        .refresh_token()
        .await
        .map_err(|e| RenewalError::Store(e.to_string()))?
        .ok_or(RenewalError::MissingRefreshToken)?;

    let pair = tokio::time::timeout(timeout, fridge_auth::refresh_session(transport, &refresh))
        .await
        .map_err(|_| {
            RenewalError::TimedOut(format!("no response within {}s", timeout.as_secs_f32()))
        })??;

    store
        .save_tokens(pair.access_token.clone(), pair.refresh_token)
        .await
        .map_err(|e| RenewalError::Store(e.to_string()))?;
    Ok(pair.access_token)
}
