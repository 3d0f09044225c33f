//! The single in-memory session.
//!
//! One [`Session`] exists per process. Its `state` nonce and PKCE verifier are
//! generated once and never change; the token fields start empty and are
//! replaced as a unit by a successful code exchange or refresh. Nothing is
//! persisted.
//!
//! There is exactly one session, so the server serves one interactive user.
//! Two browsers driving the flow at once share the same `state` and verifier
//! and the later successful callback wins.

use std::fmt;

use parking_lot::RwLock;

use crate::crypto::{generate_code_verifier, generate_state, secure_eq};
use crate::error::Error;
use crate::tokens::{OAuth2Tokens, TokenKind};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No successful exchange yet.
    Unauthenticated,
    /// Tokens are held and none has been revoked through this session.
    Authenticated,
    /// Tokens are held but at least one was revoked at the provider.
    Stale,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Unauthenticated => "unauthenticated",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Stale => "stale",
        }
    }
}

/// Snapshot of the three session tokens.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
}

impl TokenSet {
    pub fn get(&self, kind: TokenKind) -> Option<&str> {
        match kind {
            TokenKind::Access => self.access_token.as_deref(),
            TokenKind::Refresh => self.refresh_token.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.id_token.is_none()
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("TokenSet")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("id_token", &redact(&self.id_token))
            .finish()
    }
}

#[derive(Default)]
struct Held {
    tokens: TokenSet,
    access_revoked: bool,
    refresh_revoked: bool,
}

pub struct Session {
    state: String,
    code_verifier: Option<String>,
    held: RwLock<Held>,
}

impl Session {
    /// Creates the session with a fresh `state` nonce and, when `pkce` is
    /// set, a fresh code verifier.
    pub fn new(pkce: bool) -> Self {
        Self::from_parts(generate_state(), pkce.then(generate_code_verifier))
    }

    /// Creates a session with a known `state` and verifier.
    pub fn from_parts(state: impl Into<String>, code_verifier: Option<String>) -> Self {
        Self {
            state: state.into(),
            code_verifier,
            held: RwLock::new(Held::default()),
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn code_verifier(&self) -> Option<&str> {
        self.code_verifier.as_deref()
    }

    pub fn pkce_enabled(&self) -> bool {
        self.code_verifier.is_some()
    }

    /// Exact, constant-time comparison of a returned `state` against the
    /// session's.
    pub fn verify_state(&self, returned: &str) -> bool {
        secure_eq(&self.state, returned)
    }

    pub fn tokens(&self) -> TokenSet {
        self.held.read().tokens.clone()
    }

    pub fn token(&self, kind: TokenKind) -> Option<String> {
        self.held.read().tokens.get(kind).map(String::from)
    }

    /// The token for `kind`, or [`Error::NoToken`] when the session has none.
    pub fn require(&self, kind: TokenKind) -> Result<String, Error> {
        self.token(kind).ok_or(Error::NoToken(kind))
    }

    /// Replaces all three tokens with the ones from a code exchange response.
    /// Members absent from the response become empty. If the response has no
    /// access token the session is left untouched.
    pub fn apply_exchange(&self, response: &OAuth2Tokens) -> Result<(), Error> {
        let tokens = TokenSet {
            access_token: Some(response.access_token()?.to_string()),
            refresh_token: response.refresh_token().ok().map(String::from),
            id_token: response.id_token().ok().map(String::from),
        };

        *self.held.write() = Held {
            tokens,
            access_revoked: false,
            refresh_revoked: false,
        };
        Ok(())
    }

    /// Applies a refresh response. The access token is always replaced; the
    /// refresh and ID tokens are replaced only when the response carries new
    /// ones, otherwise the held values stay.
    pub fn apply_refresh(&self, response: &OAuth2Tokens) -> Result<(), Error> {
        let access_token = response.access_token()?.to_string();
        let refresh_token = response.refresh_token().ok().map(String::from);
        let id_token = response.id_token().ok().map(String::from);

        let mut held = self.held.write();
        held.tokens.access_token = Some(access_token);
        held.access_revoked = false;
        if refresh_token.is_some() {
            held.tokens.refresh_token = refresh_token;
            held.refresh_revoked = false;
        }
        if id_token.is_some() {
            held.tokens.id_token = id_token;
        }
        Ok(())
    }

    /// Records that `kind` was revoked at the provider. The token value is kept.
    pub fn mark_revoked(&self, kind: TokenKind) {
        let mut held = self.held.write();
        match kind {
            TokenKind::Access => held.access_revoked = true,
            TokenKind::Refresh => held.refresh_revoked = true,
        }
    }

    pub fn is_revoked(&self, kind: TokenKind) -> bool {
        let held = self.held.read();
        match kind {
            TokenKind::Access => held.access_revoked,
            TokenKind::Refresh => held.refresh_revoked,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        let held = self.held.read();
        if held.tokens.access_token.is_none() {
            SessionPhase::Unauthenticated
        } else if held.access_revoked || held.refresh_revoked {
            SessionPhase::Stale
        } else {
            SessionPhase::Authenticated
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("pkce", &self.pkce_enabled())
            .field("phase", &self.phase())
            .field("tokens", &self.tokens())
            .finish_non_exhaustive()
    }
}
