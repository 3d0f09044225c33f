use crate::tokens::TokenKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Non-success response carrying standard OAuth2 error JSON
    /// (RFC 6749 Section 5.2). `body` is the object exactly as received,
    /// including any provider-specific members.
    #[error("OAuth2 error: {code}")]
    OAuthRequest {
        status: u16,
        code: String,
        description: Option<String>,
        uri: Option<String>,
        body: serde_json::Value,
    },

    /// Provider answered with a non-success status and a JSON body that is
    /// not an RFC 6749 error object. The body is kept as received.
    #[error("Provider error (HTTP {status})")]
    Provider {
        status: u16,
        body: serde_json::Value,
    },

    /// Provider returned a non-success status with no usable body.
    #[error("Unexpected HTTP status: {status}")]
    UnexpectedResponse { status: u16 },

    /// Provider returned an error status, or a success status, with a body
    /// that is not JSON.
    #[error("Unparseable response body (HTTP {status})")]
    UnexpectedErrorBody { status: u16, body: String },

    /// Network / transport error from the HTTP client.
    #[error("HTTP request failed: {0}")]
    Http(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// A required field is missing from the token response JSON.
    #[error("Missing or invalid field: {field}")]
    MissingField { field: &'static str },

    /// The ID token is not a decodable JWT.
    #[error("Malformed ID token")]
    MalformedIdToken,

    /// The `state` returned to the callback differs from the session's.
    #[error("State mismatch")]
    StateMismatch,

    /// The operation needs a token the session does not hold.
    #[error("No {0} available")]
    NoToken(TokenKind),
}

impl Error {
    /// The JSON body the provider sent with a failed call, if any.
    pub fn provider_body(&self) -> Option<serde_json::Value> {
        match self {
            Error::OAuthRequest { body, .. } | Error::Provider { body, .. } => Some(body.clone()),
            _ => None,
        }
    }

    /// The HTTP status the provider answered with, if the failure came from
    /// a provider response.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            Error::OAuthRequest { status, .. }
            | Error::Provider { status, .. }
            | Error::UnexpectedResponse { status }
            | Error::UnexpectedErrorBody { status, .. } => Some(*status),
            _ => None,
        }
    }
}
