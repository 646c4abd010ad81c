//! Authentication against the imaging service
//!
//! The service authenticates batch clients with a service-account key
//! file: a JSON document carrying the account identity and an API token.
//! Auth is a trait seam so the client can also run unauthenticated
//! against local test servers.

use serde::Deserialize;
use std::path::Path;

use crate::error::{EngineError, Result};

/// Signs outgoing requests with authentication headers
pub trait ApiAuth: Send + Sync {
    /// Append the headers this scheme requires
    fn sign_request(&self, headers: &mut Vec<(String, String)>) -> Result<()>;
}

/// No authentication (local or public endpoints)
#[derive(Debug, Clone, Default)]
pub struct NoAuth;

impl ApiAuth for NoAuth {
    fn sign_request(&self, _headers: &mut Vec<(String, String)>) -> Result<()> {
        Ok(())
    }
}

/// Service-account key file contents
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Account identity, e.g. `batch-export@project.iam.example.com`
    pub client_email: String,
    /// API token issued for this account
    pub token: String,
    /// Project the account belongs to
    #[serde(default)]
    pub project: Option<String>,
}

/// Bearer-token authentication from a service-account key file
#[derive(Debug, Clone)]
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
}

impl ServiceAccountAuth {
    /// Load a service-account key from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let key: ServiceAccountKey = serde_json::from_str(&text)?;
        if key.token.is_empty() {
            return Err(EngineError::Auth(format!(
                "service account {} has an empty token",
                key.client_email
            )));
        }
        Ok(Self { key })
    }

    /// Create from an already-parsed key
    pub fn new(key: ServiceAccountKey) -> Self {
        Self { key }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }
}

impl ApiAuth for ServiceAccountAuth {
    fn sign_request(&self, headers: &mut Vec<(String, String)>) -> Result<()> {
        headers.push((
            "Authorization".to_string(),
            format!("Bearer {}", self.key.token),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_auth_adds_nothing() {
        let mut headers = Vec::new();
        NoAuth.sign_request(&mut headers).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_service_account_bearer_header() {
        let auth = ServiceAccountAuth::new(ServiceAccountKey {
            client_email: "batch@proj.example.com".into(),
            token: "tok-123".into(),
            project: None,
        });

        let mut headers = Vec::new();
        auth.sign_request(&mut headers).unwrap();
        assert_eq!(
            headers,
            vec![("Authorization".to_string(), "Bearer tok-123".to_string())]
        );
    }

    #[test]
    fn test_key_file_parse() {
        let json = r#"{
            "client_email": "batch@proj.example.com",
            "token": "tok-123",
            "project": "projects/cropmapping"
        }"#;
        let key: ServiceAccountKey = serde_json::from_str(json).unwrap();
        assert_eq!(key.client_email, "batch@proj.example.com");
        assert_eq!(key.project.as_deref(), Some("projects/cropmapping"));
    }
}
