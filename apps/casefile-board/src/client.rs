//! # Casefile HTTP Client
//!
//! Wrapper around the Casefile REST API: login plus record CRUD per
//! collection. Record bodies are parsed into typed [`Record`]s on the way in.

use casefile_core::{Record, RecordId, RecordKind};
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Errors from the HTTP client layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Cannot reach the Casefile server.
    #[error("Cannot connect to Casefile at {0}")]
    ConnectionFailed(String),
    /// 401 Unauthorized - bad credentials or a missing/expired token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// 409 Conflict - the record changed since it was read.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// 429 Too Many Requests.
    #[error("Rate limited: too many requests")]
    RateLimited,
    /// Any other non-success status.
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },
    /// Failed to parse response body.
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// The principal behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
    pub role: String,
}

#[derive(Deserialize)]
struct LoginBody {
    token: String,
    user: SessionUser,
}

#[derive(Deserialize)]
struct CreatedBody {
    id: RecordId,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client that wraps calls to the Casefile REST API.
#[derive(Clone)]
pub struct RecordClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for RecordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl RecordClient {
    /// Create a client pointing at the given server URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Build a request with Bearer auth when logged in.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Send a request and map connection failures.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        req.send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.base_url)))
    }

    /// Turn a non-2xx response into the matching error.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        Err(match status {
            reqwest::StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            reqwest::StatusCode::CONFLICT => ClientError::Conflict(message),
            _ => ClientError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let resp = Self::check(self.send(req).await?).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))
    }

    fn collection_path(kind: RecordKind) -> String {
        format!("/api/{}", kind.collection())
    }

    fn record_path(kind: RecordKind, id: RecordId) -> String {
        format!("/api/{}/{}", kind.collection(), id.0)
    }

    /// POST /api/auth/login. Keeps the token for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<SessionUser, ClientError> {
        let req = self
            .request(reqwest::Method::POST, "/api/auth/login")
            .json(&json!({"email": email, "password": password}));
        let body: LoginBody = self.json(req).await?;
        self.token = Some(body.token);
        Ok(body.user)
    }

    /// GET /api/health
    pub async fn health(&self) -> Result<Value, ClientError> {
        let req = self.request(reqwest::Method::GET, "/api/health");
        self.json(req).await
    }

    /// GET /api/{collection}
    pub async fn list(&self, kind: RecordKind) -> Result<Vec<Record>, ClientError> {
        let req = self.request(reqwest::Method::GET, &Self::collection_path(kind));
        let bodies: Vec<Value> = self.json(req).await?;
        bodies
            .into_iter()
            .map(|body| {
                Record::from_json(kind, body).map_err(|e| ClientError::ParseError(e.to_string()))
            })
            .collect()
    }

    /// POST /api/{collection} → id of the new record.
    pub async fn create(&self, kind: RecordKind, body: &Value) -> Result<RecordId, ClientError> {
        let req = self
            .request(reqwest::Method::POST, &Self::collection_path(kind))
            .json(body);
        let created: CreatedBody = self.json(req).await?;
        Ok(created.id)
    }

    /// PUT /api/{collection}/{id}. With `version` the update is conditional.
    pub async fn update(
        &self,
        kind: RecordKind,
        id: RecordId,
        patch: &Map<String, Value>,
        version: Option<u64>,
    ) -> Result<Record, ClientError> {
        let mut body = patch.clone();
        if let Some(version) = version {
            body.insert("version".to_string(), version.into());
        }
        let req = self
            .request(reqwest::Method::PUT, &Self::record_path(kind, id))
            .json(&body);
        let updated: Value = self.json(req).await?;
        Record::from_json(kind, updated).map_err(|e| ClientError::ParseError(e.to_string()))
    }

    /// DELETE /api/{collection}/{id}
    pub async fn delete(&self, kind: RecordKind, id: RecordId) -> Result<(), ClientError> {
        let req = self.request(reqwest::Method::DELETE, &Self::record_path(kind, id));
        Self::check(self.send(req).await?).await?;
        Ok(())
    }
}
