//! HTTP plumbing shared by every endpoint.
//!
//! The gateway owns the reqwest client, the base URL, and the credential
//! store. Every request goes through [`Gateway::request`] (JSON) or
//! [`Gateway::upload`] (multipart), which attach the bearer token, peel the
//! response envelope, and translate failures into [`ApiError`]. A 401 on a
//! protected route clears the stored credential and broadcasts
//! [`SessionState::Expired`] before the error reaches the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::histogram;
use reqwest::multipart::Form;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::infra::credentials::CredentialStore;

use super::envelope::{parse_failure, unwrap_envelope};
use super::error::ApiError;

/// Authentication posture, broadcast to interested surfaces through a
/// watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    /// The server rejected the stored credential; the user has to sign in
    /// again.
    Expired,
}

/// How a route participates in session handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteKind {
    /// Ordinary routes. A 401 means the stored session died: the credential
    /// is cleared and the expiry signal fires before the error surfaces.
    Protected,
    /// Login and register. A 401 is just a wrong credential and is handed
    /// to the caller untouched.
    Auth,
}

/// Typed access to the piazza HTTP API.
pub struct Gateway {
    http: Client,
    base: Url,
    credentials: Arc<dyn CredentialStore>,
    session: watch::Sender<SessionState>,
}

impl Gateway {
    pub fn new(
        base: Url,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        let (session, _) = watch::channel(SessionState::Anonymous);
        Ok(Self {
            http,
            base,
            credentials,
            session,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("piazza-client/", env!("CARGO_PKG_VERSION"))
    }

    /// Subscribe to session transitions. The receiver also reports the
    /// current state immediately.
    pub fn session_events(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    pub(crate) fn set_session(&self, state: SessionState) {
        self.session.send_replace(state);
    }

    pub(crate) fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    /// Send a JSON request and return the unwrapped response payload.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        route: RouteKind,
        query: Option<&[(&str, String)]>,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut url = self.url(path)?;
        if let Some(pairs) = query {
            url.set_query(None);
            let mut qp = url.query_pairs_mut();
            for (name, value) in pairs {
                qp.append_pair(name, value);
            }
        }

        let mut builder = self.http.request(method.clone(), url);
        if let Some(token) = self.credentials.token().await? {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        self.send(method, path, route, builder).await
    }

    /// Send a multipart request. Upload routes are always protected.
    pub(crate) async fn upload(
        &self,
        method: Method,
        path: &str,
        form: Form,
    ) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        let mut builder = self.http.request(method.clone(), url).multipart(form);
        if let Some(token) = self.credentials.token().await? {
            builder = builder.bearer_auth(token);
        }

        self.send(method, path, RouteKind::Protected, builder).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        route: RouteKind,
        builder: reqwest::RequestBuilder,
    ) -> Result<Value, ApiError> {
        let started_at = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let outcome = self.handle(route, response).await;
        histogram!(
            "piazza_gateway_request_ms",
            "method" => method.as_str().to_owned()
        )
        .record(started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(%method, path, %status, ok = outcome.is_ok(), "gateway request finished");
        outcome
    }

    async fn handle(&self, route: RouteKind, response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status == StatusCode::UNAUTHORIZED {
            let failure = parse_failure(&bytes);
            let message = failure
                .message
                .unwrap_or_else(|| "unauthorized".to_string());
            if route == RouteKind::Protected {
                self.expire_session().await;
            }
            return Err(ApiError::unauthorized(message));
        }

        if !status.is_success() {
            let failure = parse_failure(&bytes);
            let message = failure
                .message
                .unwrap_or_else(|| format!("request failed with status {status}"));
            if status == StatusCode::BAD_REQUEST
                || status == StatusCode::UNPROCESSABLE_ENTITY
                || !failure.errors.is_empty()
            {
                return Err(ApiError::validation(message, failure.errors));
            }
            return Err(ApiError::server(status.as_u16(), message));
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::decode(format!("response body is not JSON: {err}")))?;
        Ok(unwrap_envelope(value))
    }

    async fn expire_session(&self) {
        warn!("server rejected the stored session, clearing credential");
        if let Err(err) = self.credentials.clear().await {
            warn!(error = %err, "failed to clear stored credential");
        }
        self.session.send_replace(SessionState::Expired);
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use reqwest::Method;
    use serde_json::json;

    use crate::infra::credentials::MemoryCredentialStore;

    use super::*;

    fn gateway_for(server: &MockServer, store: Arc<MemoryCredentialStore>) -> Gateway {
        let base = Url::parse(&server.base_url()).expect("mock server URL");
        Gateway::new(base, Duration::from_secs(5), store).expect("gateway")
    }

    #[tokio::test]
    async fn attaches_bearer_token_and_unwraps_envelope() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/me")
                .header("authorization", "Bearer sesame");
            then.status(200)
                .json_body(json!({"success": true, "message": "ok", "data": {"id": 1}}));
        });

        let store = Arc::new(MemoryCredentialStore::with_token("sesame"));
        let gateway = gateway_for(&server, store);
        let body = gateway
            .request(Method::GET, "api/me", RouteKind::Protected, None, None)
            .await
            .expect("request");

        mock.assert();
        assert_eq!(body, json!({"id": 1}));
    }

    #[tokio::test]
    async fn bare_payloads_pass_through_unchanged() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/me");
            then.status(200).json_body(json!({"id": 7, "data": "not a wrapper"}));
        });

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&server, store);
        let body = gateway
            .request(Method::GET, "api/me", RouteKind::Protected, None, None)
            .await
            .expect("request");

        // `success` is absent, so the body is not treated as an envelope.
        assert_eq!(body, json!({"id": 7, "data": "not a wrapper"}));
    }

    #[tokio::test]
    async fn protected_401_clears_credential_and_signals_expiry() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/me");
            then.status(401).json_body(json!({"message": "token expired"}));
        });

        let store = Arc::new(MemoryCredentialStore::with_token("stale"));
        let gateway = gateway_for(&server, Arc::clone(&store));
        let mut events = gateway.session_events();

        let err = gateway
            .request(Method::GET, "api/me", RouteKind::Protected, None, None)
            .await
            .expect_err("401 must fail");

        assert!(matches!(err, ApiError::Unauthorized { ref message } if message == "token expired"));
        assert_eq!(store.token().await.expect("token read"), None);
        assert!(events.has_changed().expect("channel open"));
        assert_eq!(*events.borrow_and_update(), SessionState::Expired);
    }

    #[tokio::test]
    async fn auth_route_401_keeps_credential() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/auth/login");
            then.status(401).json_body(json!({"message": "bad password"}));
        });

        let store = Arc::new(MemoryCredentialStore::with_token("still-good"));
        let gateway = gateway_for(&server, Arc::clone(&store));
        let events = gateway.session_events();

        let err = gateway
            .request(
                Method::POST,
                "api/auth/login",
                RouteKind::Auth,
                None,
                Some(json!({"email": "a@b.c", "password": "nope"})),
            )
            .await
            .expect_err("401 must fail");

        assert!(matches!(err, ApiError::Unauthorized { .. }));
        assert_eq!(
            store.token().await.expect("token read"),
            Some("still-good".to_string())
        );
        assert_eq!(*events.borrow(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn validation_failure_carries_field_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/auth/register");
            then.status(422).json_body(json!({
                "message": "invalid input",
                "errors": {"email": ["already taken"], "username": "too short"}
            }));
        });

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&server, store);
        let err = gateway
            .request(
                Method::POST,
                "api/auth/register",
                RouteKind::Auth,
                None,
                Some(json!({})),
            )
            .await
            .expect_err("422 must fail");

        match err {
            ApiError::Validation { message, errors } => {
                assert_eq!(message, "invalid input");
                assert_eq!(errors["email"], vec!["already taken".to_string()]);
                assert_eq!(errors["username"], vec!["too short".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_fault_maps_to_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/feed");
            then.status(503).body("upstream down");
        });

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&server, store);
        let err = gateway
            .request(Method::GET, "api/feed", RouteKind::Protected, None, None)
            .await
            .expect_err("503 must fail");

        match err {
            ApiError::Server { status, .. } => assert_eq!(status, 503),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_rejection());
    }

    #[tokio::test]
    async fn query_pairs_are_appended() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/users/search")
                .query_param("q", "ada")
                .query_param("page", "2");
            then.status(200).json_body(json!({"data": [], "page": 2}));
        });

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&server, store);
        gateway
            .request(
                Method::GET,
                "api/users/search",
                RouteKind::Protected,
                Some(&[("q", "ada".to_string()), ("page", "2".to_string())]),
                None,
            )
            .await
            .expect("request");

        mock.assert();
    }
}
