use axum::http::{header, HeaderMap};
use base64::Engine;
use std::collections::HashMap;

/// An authenticated user role ("Manager", "Player", ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role(pub String);

/// Decides whether a role/password pair may write to the dashboard.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, role: &str, password: &str) -> Option<Role>;
}

/// Credentials supplied through configuration.
pub struct StaticCredentials {
    passwords: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        StaticCredentials {
            passwords: pairs.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }

    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.passwords.keys().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }
}

impl Authenticator for StaticCredentials {
    fn authenticate(&self, role: &str, password: &str) -> Option<Role> {
        match self.passwords.get(role) {
            Some(expected) if expected == password => Some(Role(role.to_string())),
            _ => None,
        }
    }
}

/// clap value parser for `ROLE=PASSWORD`.
pub fn parse_credential(s: &str) -> Result<(String, String), String> {
    let (role, password) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROLE=PASSWORD, got '{}'", s))?;
    let role = role.trim();
    if role.is_empty() || password.is_empty() {
        return Err(format!("expected ROLE=PASSWORD, got '{}'", s));
    }
    Ok((role.to_string(), password.to_string()))
}

/// Role and password from an `Authorization: Basic ...` header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (role, password) = text.split_once(':')?;
    Some((role.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn creds() -> StaticCredentials {
        StaticCredentials::new(vec![
            ("Manager".to_string(), "m-secret".to_string()),
            ("Player".to_string(), "p-secret".to_string()),
        ])
    }

    #[test]
    fn test_authenticate() {
        let auth = creds();
        assert_eq!(
            auth.authenticate("Manager", "m-secret"),
            Some(Role("Manager".into()))
        );
        assert_eq!(auth.authenticate("Manager", "p-secret"), None);
        assert_eq!(auth.authenticate("Coach", "m-secret"), None);
        assert_eq!(auth.roles(), vec!["Manager", "Player"]);
    }

    #[test]
    fn test_empty_credentials_refuse_everyone() {
        let auth = StaticCredentials::new(Vec::new());
        assert!(auth.is_empty());
        assert_eq!(auth.authenticate("Manager", ""), None);
    }

    #[test]
    fn test_parse_credential() {
        assert_eq!(
            parse_credential("Manager=a=b"),
            Ok(("Manager".into(), "a=b".into()))
        );
        assert!(parse_credential("Manager").is_err());
        assert!(parse_credential("=pw").is_err());
        assert!(parse_credential("Manager=").is_err());
    }

    #[test]
    fn test_basic_credentials() {
        let mut headers = HeaderMap::new();
        // "Player:p-secret"
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic UGxheWVyOnAtc2VjcmV0"),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("Player".into(), "p-secret".into()))
        );

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(basic_credentials(&headers), None);
        assert_eq!(basic_credentials(&HeaderMap::new()), None);
    }
}
