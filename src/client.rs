use url::Url;

use crate::crypto::create_code_challenge;
use crate::error::Error;
use crate::http::{HttpClient, HttpRequest};
use crate::request::{
    create_bearer_request, create_oauth2_request, encode_basic_credentials, send_json_request,
    send_token_request,
};
use crate::tokens::{OAuth2Tokens, TokenKind};

/// Stateless OAuth 2.0 protocol operations. Endpoints are passed per call;
/// [`Provider`](crate::Provider) binds them once.
#[derive(Debug, Clone)]
pub struct OAuth2Client {
    client_id: String,
    /// None for public clients (credentials sent in body).
    /// Some for confidential clients (credentials sent via Basic auth).
    client_secret: Option<String>,
    redirect_uri: Option<String>,
}

impl OAuth2Client {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri,
        }
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Build an authorization URL with standard parameters:
    /// response_type=code, client_id, state, scope (space-joined), redirect_uri.
    /// With a `code_verifier`, `code_challenge` and `code_challenge_method=S256`
    /// are appended.
    pub fn create_authorization_url(
        &self,
        authorization_endpoint: &Url,
        state: &str,
        scopes: &[&str],
        code_verifier: Option<&str>,
    ) -> Url {
        let mut url = authorization_endpoint.clone();

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("state", state);

            if !scopes.is_empty() {
                query.append_pair("scope", &scopes.join(" "));
            }

            if let Some(ref redirect_uri) = self.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }

            if let Some(verifier) = code_verifier {
                query
                    .append_pair("code_challenge", &create_code_challenge(verifier))
                    .append_pair("code_challenge_method", "S256");
            }
        }

        url
    }

    /// Exchange an authorization code for tokens.
    pub async fn validate_authorization_code(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        token_endpoint: &Url,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuth2Tokens, Error> {
        let mut body = vec![pair("grant_type", "authorization_code"), pair("code", code)];
        body.extend(code_verifier.map(|verifier| pair("code_verifier", verifier)));
        body.extend(self.redirect_uri().map(|uri| pair("redirect_uri", uri)));

        let request = self.authenticated_request(token_endpoint, body);
        send_token_request(http_client, request).await
    }

    /// Refresh grant. No `scope` is sent, so the provider keeps the
    /// originally granted scope.
    pub async fn refresh_access_token(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        token_endpoint: &Url,
        refresh_token: &str,
    ) -> Result<OAuth2Tokens, Error> {
        let body = vec![
            pair("grant_type", "refresh_token"),
            pair("refresh_token", refresh_token),
        ];

        let request = self.authenticated_request(token_endpoint, body);
        send_token_request(http_client, request).await
    }

    /// OIDC UserInfo for `access_token`. The claims are returned as sent.
    pub async fn fetch_user_info(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        userinfo_endpoint: &Url,
        access_token: &str,
    ) -> Result<serde_json::Value, Error> {
        let request = create_bearer_request(userinfo_endpoint.as_str(), access_token);
        send_json_request(http_client, request).await
    }

    /// RFC 7662 introspection.
    pub async fn introspect_token(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        introspection_endpoint: &Url,
        token: &str,
        kind: TokenKind,
    ) -> Result<serde_json::Value, Error> {
        let request = self.authenticated_request(introspection_endpoint, token_form(token, kind));
        send_json_request(http_client, request).await
    }

    /// RFC 7009 revocation. Most providers answer with an empty body, which
    /// comes back as `{}`.
    pub async fn revoke_token(
        &self,
        http_client: &(impl HttpClient + ?Sized),
        revocation_endpoint: &Url,
        token: &str,
        kind: TokenKind,
    ) -> Result<serde_json::Value, Error> {
        let request = self.authenticated_request(revocation_endpoint, token_form(token, kind));
        send_json_request(http_client, request).await
    }

    /// Form POST carrying client authentication: Basic credentials for a
    /// confidential client, `client_id` in the body for a public one.
    fn authenticated_request(&self, endpoint: &Url, mut body: Vec<(String, String)>) -> HttpRequest {
        match &self.client_secret {
            Some(secret) => {
                let mut request = create_oauth2_request(endpoint.as_str(), &body);
                request.headers.push((
                    "Authorization".into(),
                    encode_basic_credentials(&self.client_id, secret),
                ));
                request
            }
            None => {
                body.push(pair("client_id", &self.client_id));
                create_oauth2_request(endpoint.as_str(), &body)
            }
        }
    }
}

fn pair(key: &str, value: &str) -> (String, String) {
    (key.to_owned(), value.to_owned())
}

/// Body shared by introspection and revocation.
fn token_form(token: &str, kind: TokenKind) -> Vec<(String, String)> {
    vec![pair("token", token), pair("token_type_hint", kind.hint())]
}
