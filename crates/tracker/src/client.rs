//! Typed REST/WebSocket client for the flight data API.
//!
//! Wraps the endpoints the tracker consumes (login, upload, job status,
//! dataset columns and listing) using [`reqwest`], plus the job status
//! WebSocket via `tokio-tungstenite`. The bearer token is held by the
//! client and attached explicitly to every request; there is no ambient
//! session state.

use std::sync::RwLock;

use serde::Deserialize;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use flightdeck_core::types::{DatasetId, JobId};

use crate::types::StatusUpdate;

/// A live job status WebSocket.
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// HTTP client for one flight data server.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

/// Errors from the API client layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The WebSocket handshake failed.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An authenticated endpoint was called before [`ApiClient::login`].
    #[error("not logged in")]
    MissingToken,
}

/// Response from `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserInfo,
}

/// The authenticated user, as returned by login.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub role: String,
}

/// Response from the upload endpoints: the queued parse job and the
/// dataset it will populate.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UploadTicket {
    pub job_id: JobId,
    pub dataset_id: DatasetId,
}

/// One row of `GET /datasets`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSummary {
    pub id: DatasetId,
    pub name: String,
    pub original_filename: String,
    pub parsed: bool,
    pub packet_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ColumnsResponse {
    columns: Vec<String>,
}

impl ApiClient {
    /// Create a client for a server base URL, e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token: RwLock::new(None),
        }
    }

    /// Base HTTP URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Install a bearer token obtained elsewhere.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().expect("token lock poisoned") = Some(token.into());
    }

    fn token(&self) -> Result<String, ClientError> {
        self.token
            .read()
            .expect("token lock poisoned")
            .clone()
            .ok_or(ClientError::MissingToken)
    }

    /// Log in and store the returned bearer token on the client.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ClientError> {
        let body = serde_json::json!({ "username": username, "password": password });
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&body)
            .send()
            .await?;

        let login: LoginResponse = Self::parse_response(response).await?;
        self.set_token(login.access_token.clone());
        Ok(login)
    }

    /// Upload a capture file and queue its parse job.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        display_name: Option<&str>,
    ) -> Result<UploadTicket, ClientError> {
        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string()),
        );
        if let Some(name) = display_name {
            form = form.text("name", name.to_string());
        }

        let response = self
            .http
            .post(format!("{}/datasets/upload", self.base_url))
            .bearer_auth(self.token()?)
            .multipart(form)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Queue a parse of the server's bundled demo capture.
    pub async fn demo_upload(&self) -> Result<UploadTicket, ClientError> {
        let response = self
            .http
            .post(format!("{}/datasets/demo_upload", self.base_url))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Fetch the current status snapshot of a job (the polling target).
    pub async fn job_status(&self, job_id: JobId) -> Result<StatusUpdate, ClientError> {
        let response = self
            .http
            .get(format!("{}/jobs/{job_id}", self.base_url))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Column names of a parsed dataset.
    pub async fn dataset_columns(
        &self,
        dataset_id: DatasetId,
    ) -> Result<Vec<String>, ClientError> {
        let response = self
            .http
            .get(format!("{}/datasets/{dataset_id}/columns", self.base_url))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        let columns: ColumnsResponse = Self::parse_response(response).await?;
        Ok(columns.columns)
    }

    /// List all datasets.
    pub async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, ClientError> {
        let response = self
            .http
            .get(format!("{}/datasets", self.base_url))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Open the job status WebSocket for a job.
    ///
    /// The token travels as a `?token=` query parameter, the same
    /// fallback browsers use where headers cannot be set on an upgrade.
    pub async fn connect_job_ws(&self, job_id: JobId) -> Result<WsStream, ClientError> {
        let url = format!("{}/jobs/ws/{job_id}?token={}", self.ws_base(), self.token()?);
        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))?;
        tracing::debug!(%job_id, "Job status WebSocket connected");
        Ok(stream)
    }

    /// The WebSocket flavor of the base URL (`http` → `ws`).
    fn ws_base(&self) -> String {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        }
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
