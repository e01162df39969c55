use serde::{Deserialize, Serialize};
use std::fmt;

/// Application identity issued by Pocket. Every authorization and API call carries it.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsumerKey(String);

impl ConsumerKey {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ConsumerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConsumerKey(..)")
    }
}

/// Short-lived token for one in-progress authorization attempt.
///
/// Deliberately not `Clone`: the exchange call takes it by value, so it cannot be
/// replayed once spent.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestToken(String);

impl RequestToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Durable, user-delegated credential. Immutable once obtained.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    access_token: String,
    username: String,
}

impl AccessCredential {
    pub fn new(access_token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            username: username.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("access_token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

/// Server-side filters for the retrieve call.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    pub domain: Option<String>,
    pub search: Option<String>,
}

/// A saved item as returned by `/v3/get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub item_id: String,
    pub resolved_title: String,
    pub resolved_url: String,
    pub given_title: String,
    pub given_url: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumer_key_rejects_empty_and_whitespace() {
        assert!(ConsumerKey::new("").is_none());
        assert!(ConsumerKey::new("1234 abcd").is_none());
        assert_eq!(
            ConsumerKey::new("1234-abcd").map(|k| k.as_str().to_string()),
            Some("1234-abcd".to_string())
        );
    }

    #[test]
    fn credential_debug_hides_token() {
        let credential = AccessCredential::new("secret-token", "alice");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("alice"));
    }

    #[test]
    fn item_tolerates_missing_fields() {
        let item: Item =
            serde_json::from_str(r#"{"item_id":"42","resolved_title":"Hello","sort_id":3}"#)
                .expect("decode item");
        assert_eq!(item.item_id, "42");
        assert_eq!(item.resolved_url, "");
        assert_eq!(item.sort_id, Some(3));
    }
}
