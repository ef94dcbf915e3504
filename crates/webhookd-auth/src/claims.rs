//! Verified token claims.

use serde::Deserialize;
use serde_json::{Map, Value};

/// The `aud` claim, which may be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// `"aud": "api"`
    Single(String),
    /// `"aud": ["api", "other"]`
    Many(Vec<String>),
}

impl Audience {
    /// Reads `aud` from a claim map. Absent or non-string values are `None`.
    pub fn from_claims(claims: &Map<String, Value>) -> Option<Self> {
        claims.get("aud").cloned().and_then(|aud| serde_json::from_value(aud).ok())
    }

    /// Returns whether `expected` is one of the audiences.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Self::Single(aud) => aud == expected,
            Self::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// A token whose signature, issuer and audience have been checked.
///
/// Only [`crate::TokenVerifier`] constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedClaims {
    raw: String,
    claims: Map<String, Value>,
}

impl VerifiedClaims {
    pub(crate) fn new(raw: String, claims: Map<String, Value>) -> Self {
        Self { raw, claims }
    }

    /// The token exactly as presented.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Every claim in the payload.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Looks up a single claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// The `sub` claim, if it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn claims(aud: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("aud".to_string(), aud);
        map
    }

    #[test]
    fn single_and_array_audiences() {
        let single = Audience::from_claims(&claims(json!("api"))).unwrap();
        assert!(single.contains("api"));
        assert!(!single.contains("other"));

        let many = Audience::from_claims(&claims(json!(["other", "api"]))).unwrap();
        assert!(many.contains("api"));
        assert!(!many.contains("missing"));
    }

    #[test]
    fn non_string_audiences_are_rejected() {
        assert_eq!(Audience::from_claims(&claims(json!(42))), None);
        assert_eq!(Audience::from_claims(&claims(json!(["api", 1]))), None);
        assert_eq!(Audience::from_claims(&Map::new()), None);
    }
}
