//! OAuth 2.1 credential-exchange configuration.
//!
//! The gateway only assembles this configuration; the exchange itself
//! belongs to the identity provider integration in front of the transport.
//! When no client identifier is configured the integration is disabled
//! entirely, permitting unauthenticated local operation.

/// OAuth credential-exchange settings, sourced from the environment.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Upstream client identifier.
    pub client_id: String,
    /// Upstream client secret (may be empty for public clients).
    pub client_secret: String,
    /// Public base URL of this gateway.
    pub base_url: String,
    /// Upstream authorization endpoint.
    pub authorization_endpoint: String,
    /// Upstream token endpoint.
    pub token_endpoint: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Read the configuration from the process environment.
    ///
    /// Returns `None` when `OAUTH_CLIENT_ID` is unset, which disables the
    /// integration rather than erroring.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let client_id = lookup("OAUTH_CLIENT_ID").filter(|id| !id.is_empty())?;

        Some(Self {
            client_id,
            client_secret: lookup("OAUTH_CLIENT_SECRET").unwrap_or_default(),
            base_url: lookup("BASE_URL").unwrap_or_else(|| "http://127.0.0.1:8000".into()),
            authorization_endpoint: lookup("OAUTH_AUTHORIZATION_ENDPOINT")
                .unwrap_or_else(|| "https://accounts.google.com/o/oauth2/v2/auth".into()),
            token_endpoint: lookup("OAUTH_TOKEN_ENDPOINT")
                .unwrap_or_else(|| "https://oauth2.googleapis.com/token".into()),
            scopes: lookup("OAUTH_SCOPES")
                .unwrap_or_else(|| "openid email profile".into())
                .split_whitespace()
                .map(String::from)
                .collect(),
        })
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_client_id_disables_the_integration() {
        assert!(OAuthConfig::from_lookup(|_| None).is_none());
        assert!(OAuthConfig::from_lookup(|key| match key {
            "OAUTH_CLIENT_ID" => Some(String::new()),
            _ => None,
        })
        .is_none());
    }

    #[test]
    fn defaults_target_google_endpoints() {
        let config = OAuthConfig::from_lookup(|key| match key {
            "OAUTH_CLIENT_ID" => Some("client-123".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.client_id, "client-123");
        assert_eq!(config.client_secret, "");
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert!(config.authorization_endpoint.contains("accounts.google.com"));
        assert!(config.token_endpoint.contains("oauth2.googleapis.com"));
        assert_eq!(config.scopes, vec!["openid", "email", "profile"]);
    }

    #[test]
    fn scopes_split_on_whitespace() {
        let config = OAuthConfig::from_lookup(|key| match key {
            "OAUTH_CLIENT_ID" => Some("client-123".into()),
            "OAUTH_SCOPES" => Some("openid  email".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.scopes, vec!["openid", "email"]);
    }

    #[test]
    fn debug_redacts_the_secret() {
        let config = OAuthConfig::from_lookup(|key| match key {
            "OAUTH_CLIENT_ID" => Some("client-123".into()),
            "OAUTH_CLIENT_SECRET" => Some("super-secret".into()),
            _ => None,
        })
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
    }
}
