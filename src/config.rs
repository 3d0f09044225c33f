use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::{ArgAction, Parser};
use url::Url;

/// Errors that can occur when validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting was not provided or is blank.
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    /// A setting was provided but has the wrong shape.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Demo server for the OAuth 2.0 authorization code flow.
///
/// Every option can also be given through the environment (or a `.env`
/// file in the working directory).
#[derive(Debug, Clone, Parser)]
#[command(name = "authcode-session", version, about)]
pub struct Config {
    /// Provider base URL; endpoints are `{issuer}/v1/...`.
    #[arg(long, env = "OAUTH_ISSUER")]
    pub issuer: Url,

    /// OAuth client id.
    #[arg(long, env = "OAUTH_CLIENT_ID")]
    pub client_id: String,

    /// OAuth client secret.
    #[arg(long, env = "OAUTH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Local port; the redirect URI is `http://localhost:{port}/callback`.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Space separated scopes to request.
    #[arg(long, env = "OAUTH_SCOPES", default_value = "openid profile email offline_access")]
    pub scopes: String,

    /// Send a PKCE S256 challenge and verifier.
    #[arg(long, env = "OAUTH_PKCE", default_value_t = true, action = ArgAction::Set)]
    pub pkce: bool,
}

impl Config {
    /// Checks presence and shape of every setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.issuer.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "issuer must be an http or https URL, got scheme `{}`",
                self.issuer.scheme()
            )));
        }
        if self.issuer.cannot_be_a_base() || self.issuer.host_str().is_none() {
            return Err(ConfigError::Invalid("issuer must have a host".into()));
        }
        if self.issuer.query().is_some() || self.issuer.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "issuer must not carry a query or fragment".into(),
            ));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("client id"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::Missing("client secret"));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.scope_list().is_empty() {
            return Err(ConfigError::Missing("scopes"));
        }
        Ok(())
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.port)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn scope_list(&self) -> Vec<String> {
        self.scopes.split_whitespace().map(String::from).collect()
    }
}
