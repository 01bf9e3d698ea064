//! Session client for the document portal REST API.
//!
//! Every protected call goes through `SessionClient::send`, which attaches
//! the stored bearer token and recovers from an expired access token by
//! refreshing it once and replaying the request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::auth::{CredentialPair, TokenStore, DEFAULT_EXPIRES_IN_SECS};
use crate::models::Wrapped;

use super::request::{build_form, ApiRequest, RequestBody};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the portal API
pub const DEFAULT_BASE_URL: &str = "https://app.moovymed.de/api/v1";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

const REFRESH_PATH: &str = "/user/refresh";
const LOGIN_PATH: &str = "/user/login";

/// Route the UI should navigate to once the session is gone.
pub const LOGIN_ROUTE: &str = "/login";

/// Notice shown to the user when the session cannot be recovered.
pub const SESSION_EXPIRED_NOTICE: &str = "Session expired. Please login again.";

/// Buffered session events per subscriber
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Lifecycle notifications for listeners outside the data layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The access token was replaced after an expiry.
    Refreshed,
    /// Credentials were cleared; the user must log in again.
    Terminated {
        notice: String,
        redirect: String,
        reason: String,
    },
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// A request on its way out, plus whether it has already been replayed
/// after a refresh. Never handed to callers.
struct PendingRequest {
    request: ApiRequest,
    retried: bool,
}

/// Session-aware API client.
/// Clone is cheap - the HTTP pool, store, refresh lock and event channel are shared.
#[derive(Clone)]
pub struct SessionClient {
    http: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    refresh_lock: Arc<Mutex<()>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionClient {
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, store, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, store: Arc<dyn TokenStore>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            refresh_lock: Arc::new(Mutex::new(())),
            events,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Subscribe to session lifecycle events (refresh, termination).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Currently stored credentials, if any.
    pub fn credentials(&self) -> Result<Option<CredentialPair>, ApiError> {
        self.store.get().map_err(ApiError::storage)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.credentials(), Ok(Some(_)))
    }

    /// Authenticate with email and password and persist the returned pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<CredentialPair, ApiError> {
        let url = self.url(LOGIN_PATH);
        let response = self
            .http
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        let login: LoginResponse = serde_json::from_str::<Wrapped<LoginResponse>>(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?
            .into_inner();

        let pair = CredentialPair::new(
            login.access_token,
            login.refresh_token,
            login.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
        );
        self.store.set(&pair).map_err(ApiError::storage)?;
        info!("Login successful");
        Ok(pair)
    }

    /// Forget the stored credentials.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.store.clear().map_err(ApiError::storage)?;
        info!("Logged out");
        Ok(())
    }

    /// Dispatch `request` with the stored bearer token.
    ///
    /// Responses other than 401 are returned as-is, whatever their status.
    /// A first 401 triggers one refresh and one replay; a 401 on the replay
    /// yields `ApiError::Unauthorized`. If the refresh cannot happen the
    /// stored pair is cleared, `SessionEvent::Terminated` is published and
    /// the call fails with `ApiError::SessionTerminated`.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let mut pending = PendingRequest {
            request,
            retried: false,
        };
        let mut token = self.credentials()?.map(|pair| pair.access_token);

        loop {
            let response = self.dispatch(&pending.request, token.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if pending.retried {
                warn!(path = %pending.request.path, "Request rejected again after token refresh");
                return Err(ApiError::Unauthorized);
            }
            pending.retried = true;

            debug!(path = %pending.request.path, "Access token rejected, refreshing");
            token = Some(self.recover(token.as_deref()).await?);
        }
    }

    /// `send`, then fail on non-success statuses and decode the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e)))
    }

    /// `send`, then fail on non-success statuses and discard the body.
    pub async fn send_ok(&self, request: ApiRequest) -> Result<(), ApiError> {
        let response = self.send(request).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    /// Obtain a usable access token after `rejected` was refused.
    ///
    /// Refreshes are serialized: whoever takes the lock second finds the
    /// token already replaced and reuses it instead of refreshing again.
    async fn recover(&self, rejected: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let pair = match self.credentials()? {
            Some(pair) => pair,
            None if rejected.is_some() => {
                // A concurrent call already tore the session down.
                return Err(ApiError::SessionTerminated("Session already cleared".to_string()));
            }
            None => return Err(self.terminate("No credentials stored")),
        };

        if Some(pair.access_token.as_str()) != rejected {
            debug!("Access token already refreshed by another request");
            return Ok(pair.access_token);
        }

        let Some(refresh_token) = pair.refresh_token() else {
            return Err(self.terminate("No refresh token available"));
        };

        match self.request_refresh(refresh_token).await {
            Ok(refreshed) => {
                let updated = pair.refreshed(
                    refreshed.access_token,
                    refreshed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
                    refreshed.refresh_token,
                );
                self.store.set(&updated).map_err(ApiError::storage)?;
                info!(expires_in = updated.expires_in, "Access token refreshed");
                let _ = self.events.send(SessionEvent::Refreshed);
                Ok(updated.access_token)
            }
            Err(e) => Err(self.terminate(&format!("Token refresh failed: {}", e))),
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let url = self.url(REFRESH_PATH);
        let response = self
            .http
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        let refreshed = serde_json::from_str::<Wrapped<RefreshResponse>>(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse refresh response: {}", e)))?
            .into_inner();
        Ok(refreshed)
    }

    /// Clear the stored pair and tell listeners to send the user to login.
    fn terminate(&self, reason: &str) -> ApiError {
        warn!(reason = reason, "Session terminated");
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        let _ = self.events.send(SessionEvent::Terminated {
            notice: SESSION_EXPIRED_NOTICE.to_string(),
            redirect: LOGIN_ROUTE.to_string(),
            reason: reason.to_string(),
        });
        ApiError::SessionTerminated(reason.to_string())
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let url = self.url(&request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(header::ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        debug!(method = %request.method, url = %url, "Sending request");
        let response = builder.send().await?;
        debug!(status = %response.status(), url = %url, "Received response");
        Ok(response)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
