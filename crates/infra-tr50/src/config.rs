// TR50 connection settings
use std::time::Duration;

/// DeviceWise endpoint used by Ambrogio mowers
pub const DEFAULT_ENDPOINT: &str = "https://api-de.devicewise.com/api";

/// Per-request HTTP timeout (30s)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct Tr50Config {
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl Default for Tr50Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Tr50Config {
    /// Endpoint with trailing slashes removed
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Application credentials for `api.authenticate`
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub app_token: String,
    pub thing_key: String,
}

impl Credentials {
    /// The provisioned client key doubles as app id and thing key
    pub fn from_client_key(client_key: impl Into<String>, app_token: impl Into<String>) -> Self {
        let client_key = client_key.into();
        Self {
            app_id: client_key.clone(),
            app_token: app_token.into(),
            thing_key: client_key,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_token", &"<redacted>")
            .field("thing_key", &self.thing_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let config = Tr50Config::default().with_endpoint("https://example.test/api//");
        assert_eq!(config.endpoint, "https://example.test/api");
    }

    #[test]
    fn test_client_key_is_app_id_and_thing_key() {
        let creds = Credentials::from_client_key("abc", "token");
        assert_eq!(creds.app_id, "abc");
        assert_eq!(creds.thing_key, "abc");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("\"token\""));
    }
}
