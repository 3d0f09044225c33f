use url::Url;

use crate::client::OAuth2Client;
use crate::error::Error;
use crate::http::HttpClient;
use crate::tokens::{OAuth2Tokens, TokenKind};

/// An OAuth 2.0 / OpenID Connect authorization server addressed by its base
/// URL (for example `https://dev-123456.okta.com/oauth2/default`).
///
/// Endpoints follow the `{base}/v1/...` layout:
///
/// | Endpoint | Path |
/// |----------|------|
/// | authorization | `/v1/authorize` |
/// | token | `/v1/token` |
/// | userinfo | `/v1/userinfo` |
/// | introspection | `/v1/introspect` |
/// | revocation | `/v1/revoke` |
///
/// Use [`Provider::with_endpoints`] for servers that lay them out differently.
#[derive(Debug, Clone)]
pub struct Provider {
    client: OAuth2Client,
    endpoints: Endpoints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorization: Url,
    pub token: Url,
    pub userinfo: Url,
    pub introspection: Url,
    pub revocation: Url,
}

impl Endpoints {
    /// Derive the endpoint set from a provider base URL. A trailing slash on
    /// the base is ignored.
    pub fn from_base_url(base: &Url) -> Result<Self, url::ParseError> {
        let base = base.as_str().trim_end_matches('/');
        let endpoint = |path: &str| Url::parse(&format!("{base}/v1/{path}"));

        Ok(Self {
            authorization: endpoint("authorize")?,
            token: endpoint("token")?,
            userinfo: endpoint("userinfo")?,
            introspection: endpoint("introspect")?,
            revocation: endpoint("revoke")?,
        })
    }
}

impl Provider {
    /// Creates a provider for a confidential client whose endpoints hang off
    /// `base_url`.
    pub fn from_base_url(
        base_url: &Url,
        client_id: impl Into<String>,
        client_secret: Option<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self::with_endpoints(
            Endpoints::from_base_url(base_url)?,
            client_id,
            client_secret,
            redirect_uri,
        ))
    }

    /// Creates a provider with explicit endpoints.
    pub fn with_endpoints(
        endpoints: Endpoints,
        client_id: impl Into<String>,
        client_secret: Option<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client: OAuth2Client::new(client_id, client_secret, Some(redirect_uri.into())),
            endpoints,
        }
    }

    /// Builds the authorization URL the user is sent to. A `code_verifier`
    /// adds the S256 PKCE challenge.
    pub fn authorization_url(&self, state: &str, scopes: &[&str], code_verifier: Option<&str>) -> Url {
        self.client.create_authorization_url(
            &self.endpoints.authorization,
            state,
            scopes,
            code_verifier,
        )
    }

    /// Exchanges an authorization code for tokens.
    pub async fn validate_authorization_code(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuth2Tokens, Error> {
        self.client
            .validate_authorization_code(http_client, &self.endpoints.token, code, code_verifier)
            .await
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh_access_token(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        refresh_token: &str,
    ) -> Result<OAuth2Tokens, Error> {
        self.client
            .refresh_access_token(http_client, &self.endpoints.token, refresh_token)
            .await
    }

    pub async fn fetch_user_info(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        access_token: &str,
    ) -> Result<serde_json::Value, Error> {
        self.client
            .fetch_user_info(http_client, &self.endpoints.userinfo, access_token)
            .await
    }

    pub async fn introspect_token(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        token: &str,
        kind: TokenKind,
    ) -> Result<serde_json::Value, Error> {
        self.client
            .introspect_token(http_client, &self.endpoints.introspection, token, kind)
            .await
    }

    pub async fn revoke_token(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        token: &str,
        kind: TokenKind,
    ) -> Result<serde_json::Value, Error> {
        self.client
            .revoke_token(http_client, &self.endpoints.revocation, token, kind)
            .await
    }
}
