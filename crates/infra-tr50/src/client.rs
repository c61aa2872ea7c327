// TR50 HTTP client
// reason: reqwest for JSON over HTTPS, tokio RwLock for the shared session
use ambrogio_core::port::{RemoteCallClient, RemoteError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{Credentials, Tr50Config};
use crate::envelope::{auth_request, call_request, classify, session_id, unwrap_params};

/// Session-authenticated TR50 client
///
/// One session is shared by every caller; `authenticate` replaces it.
pub struct Tr50Client {
    http: Client,
    endpoint: String,
    session: RwLock<Option<String>>,
}

impl Tr50Client {
    pub fn new(config: Tr50Config) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Authenticate the application and store the new session
    ///
    /// # Errors
    /// - RemoteError::SessionInvalid if the response carries no session id
    /// - RemoteError::Transport / Api as for any other call
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<(), RemoteError> {
        let response = self.post(&auth_request(credentials)).await?;
        let session = session_id(&response)?;
        *self.session.write().await = Some(session);
        info!(app_id = %credentials.app_id, "Authenticated with TR50 API");
        Ok(())
    }

    pub async fn has_session(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Invoke `command` and return the full response envelope
    pub async fn call_raw(&self, command: &str, params: Value) -> Result<Value, RemoteError> {
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or_else(|| RemoteError::SessionInvalid("No valid session. Authenticate first.".into()))?;

        debug!(command = %command, "Sending TR50 command");
        self.post(&call_request(&session, command, params)).await
    }

    async fn post(&self, body: &Value) -> Result<Value, RemoteError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("Network or timeout error: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(format!("Network or timeout error: {}", e)))?;

        if status != StatusCode::OK {
            return Err(RemoteError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|_| RemoteError::Transport("Invalid JSON from API".into()))?;

        classify(parsed)
    }
}

#[async_trait]
impl RemoteCallClient for Tr50Client {
    /// Returns `data.params` when present, otherwise the full response
    async fn call(&self, command: &str, params: Value) -> Result<Value, RemoteError> {
        self.call_raw(command, params).await.map(unwrap_params)
    }
}
