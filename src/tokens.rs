use std::fmt;

use serde::Deserialize;

use crate::Error;

/// Which of the two long-lived session tokens an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Value sent as `token_type_hint` (RFC 7009 / RFC 7662).
    pub fn hint(self) -> &'static str {
        match self {
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access token"),
            TokenKind::Refresh => f.write_str("refresh token"),
        }
    }
}

/// A provider token response, kept as the raw JSON it arrived as.
/// Provider-specific members are not reshaped; typed accessors cover the
/// members the session cares about.
#[derive(Debug, Clone)]
pub struct OAuth2Tokens {
    data: serde_json::Value,
}

impl OAuth2Tokens {
    pub fn new(data: serde_json::Value) -> Self {
        Self { data }
    }

    pub fn into_data(self) -> serde_json::Value {
        self.data
    }

    fn string_member(&self, field: &'static str) -> Result<&str, Error> {
        self.data
            .get(field)
            .and_then(serde_json::Value::as_str)
            .ok_or(Error::MissingField { field })
    }

    pub fn access_token(&self) -> Result<&str, Error> {
        self.string_member("access_token")
    }

    pub fn refresh_token(&self) -> Result<&str, Error> {
        self.string_member("refresh_token")
    }

    pub fn id_token(&self) -> Result<&str, Error> {
        self.string_member("id_token")
    }
}
