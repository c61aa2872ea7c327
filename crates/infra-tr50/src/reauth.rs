// TR50 re-authenticator
use ambrogio_core::port::Reauthenticator;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

use crate::client::Tr50Client;
use crate::config::Credentials;

/// Re-runs `api.authenticate` with stored credentials
pub struct Tr50Reauthenticator {
    client: Arc<Tr50Client>,
    credentials: Credentials,
}

impl Tr50Reauthenticator {
    pub fn new(client: Arc<Tr50Client>, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl Reauthenticator for Tr50Reauthenticator {
    async fn reauthenticate(&self) -> bool {
        match self.client.authenticate(&self.credentials).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, app_id = %self.credentials.app_id, "Re-authentication failed");
                false
            }
        }
    }
}
