use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::auth::SessionState;
use crate::error::{Error, Result};

/// One outbound HTTP exchange, fully resolved (absolute URL, final headers).
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| Error::Api { status: self.status, message: format!("unexpected response shape: {e}") })
    }
}

/// Seam between request building and the wire. Tests swap in a scripted
/// fake; production uses one shared [`HttpTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, req: RawRequest) -> Result<RawResponse>;
}

/// reqwest-backed transport shared by the backend client and both media
/// providers.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("medley/0.1")
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, req: RawRequest) -> Result<RawResponse> {
        let mut builder = self.client.request(req.method, req.url);
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(|e| Error::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| Error::Network(e.to_string()))?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok(RawResponse { status, body })
    }
}

/// A backend request, relative to the configured base path. Authenticated
/// by default; auth endpoints opt out with [`ApiRequest::public`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub authenticated: bool,
}

impl ApiRequest {
    fn new(method: Method, path: &str) -> Self {
        Self { method, path: path.to_string(), query: Vec::new(), body: None, authenticated: true }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Skip bearer attachment and the refresh-retry policy.
    pub fn public(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// The single pipeline every backend call flows through.
///
/// Attaches the bearer token, and on a 401 for a not-yet-retried
/// authenticated request performs one silent token refresh and reissues the
/// original request exactly once. A request is retried at most once no
/// matter how many 401s it accumulates.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    session: Arc<SessionState>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: &str, session: Arc<SessionState>) -> Self {
        Self { transport, base_url: base_url.trim_end_matches('/').to_string(), session }
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn session(&self) -> Arc<SessionState> {
        self.session.clone()
    }

    fn resolve(&self, req: &ApiRequest) -> Result<Url> {
        let joined = format!("{}/{}", self.base_url, req.path.trim_start_matches('/'));
        let mut url = Url::parse(&joined)?;
        if !req.query.is_empty() {
            url.query_pairs_mut().extend_pairs(req.query.iter().map(|(k, v)| (k, v)));
        }
        Ok(url)
    }

    pub async fn send(&self, req: ApiRequest) -> Result<RawResponse> {
        let url = self.resolve(&req)?;
        let mut retried = false;
        loop {
            let mut headers = Vec::new();
            if req.authenticated {
                if let Some(token) = self.session.access_token() {
                    headers.push(("Authorization".to_string(), format!("Bearer {token}")));
                }
            }
            let raw = RawRequest {
                method: req.method.clone(),
                url: url.clone(),
                headers,
                body: req.body.clone(),
            };
            let resp = self.transport.execute(raw).await?;

            if resp.status == 401 && req.authenticated && !retried {
                retried = true;
                tracing::debug!(path = %req.path, "got 401, attempting token refresh");
                if self.refresh_access_token().await.is_some() {
                    continue;
                }
                // refresh failed; fall through and report the original denial
            }

            if (200..300).contains(&resp.status) {
                return Ok(resp);
            }
            let err = if resp.status == 401 && req.authenticated {
                Error::AuthExpired
            } else {
                Error::Api { status: resp.status, message: error_message(&resp.body) }
            };
            tracing::warn!(path = %req.path, status = resp.status, "backend request failed");
            return Err(err);
        }
    }

    /// Exchange the persisted refresh token for a new access token.
    ///
    /// No persisted refresh token means the session is unrecoverable: the
    /// token pair and user are cleared and `None` is returned without any
    /// network call. Any exchange failure also ends the session.
    // TODO: coalesce concurrent refresh attempts into a single request
    pub async fn refresh_access_token(&self) -> Option<String> {
        let Some(refresh_token) = self.session.refresh_token() else {
            self.session.clear();
            return None;
        };

        let req = ApiRequest::post("/auth/refresh-token")
            .json(serde_json::json!({ "refreshToken": refresh_token }))
            .public();
        let url = match self.resolve(&req) {
            Ok(url) => url,
            Err(_) => {
                self.session.clear();
                return None;
            }
        };
        let raw = RawRequest { method: Method::POST, url, headers: Vec::new(), body: req.body };

        match self.transport.execute(raw).await {
            Ok(resp) if (200..300).contains(&resp.status) => {
                match resp.body.get("accessToken").and_then(Value::as_str) {
                    Some(token) if !token.is_empty() => {
                        self.session.set_access_token(token);
                        Some(token.to_string())
                    }
                    _ => {
                        tracing::warn!("refresh succeeded but returned no access token");
                        self.session.clear();
                        None
                    }
                }
            }
            Ok(resp) => {
                tracing::warn!(status = resp.status, "token refresh rejected, ending session");
                self.session.clear();
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, ending session");
                self.session.clear();
                None
            }
        }
    }
}

fn error_message(body: &Value) -> String {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
