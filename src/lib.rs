//! OAuth 2.0 authorization code flow (with optional PKCE) against a single
//! identity provider, holding one session's tokens in process memory.
//!
//! [`AuthFlow`] is the entry point: it builds the authorization URL from the
//! [`Session`]'s `state` and verifier, validates the callback, exchanges the
//! code and then refreshes, introspects and revokes the held tokens.
//! [`server::router`] exposes it over HTTP.

mod client;
mod config;
mod crypto;
mod error;
mod flow;
mod http;
mod oidc;
mod provider;
mod request;
pub mod server;
mod session;
mod tokens;

// Core
pub use client::OAuth2Client;
pub use error::Error;
pub use flow::{AuthFlow, callback_payload};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method};
pub use provider::{Endpoints, Provider};
pub use session::{Session, SessionPhase, TokenSet};
pub use tokens::{OAuth2Tokens, TokenKind};

// Configuration
pub use config::{Config, ConfigError};

// Utilities
pub use crypto::{create_code_challenge, generate_code_verifier, generate_state, secure_eq};
pub use oidc::decode_id_token;

// Default HTTP client (behind feature flag)
#[cfg(feature = "reqwest-client")]
pub use http::ReqwestClient;
