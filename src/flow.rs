use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::Error;
use crate::http::HttpClient;
use crate::oidc::decode_id_token;
use crate::provider::Provider;
use crate::session::{Session, SessionPhase};
use crate::tokens::{OAuth2Tokens, TokenKind};

/// The authorization code flow bound to the process's single [`Session`].
///
/// Every lifecycle operation checks its precondition against the session
/// first and returns [`Error::NoToken`] without contacting the provider when
/// it is not met. Provider failures never mutate the session.
pub struct AuthFlow<H> {
    provider: Provider,
    session: Session,
    http_client: H,
    scopes: Vec<String>,
}

impl<H: HttpClient> AuthFlow<H> {
    pub fn new(provider: Provider, session: Session, http_client: H, scopes: Vec<String>) -> Self {
        Self {
            provider,
            session,
            http_client,
            scopes,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    /// The URL the user visits to authorize. Built from the session's
    /// `state` and, with PKCE, its verifier; no network call.
    pub fn authorization_url(&self) -> Url {
        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        self.provider
            .authorization_url(self.session.state(), &scopes, self.session.code_verifier())
    }

    /// Completes the flow for a provider redirect.
    ///
    /// A `state` that does not exactly match the session's is rejected with
    /// [`Error::StateMismatch`] before any network call. On a successful
    /// exchange all three session tokens are replaced together.
    #[instrument(skip_all)]
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<OAuth2Tokens, Error> {
        if !self.session.verify_state(state) {
            warn!("callback state does not match session, rejecting");
            return Err(Error::StateMismatch);
        }

        let tokens = self
            .provider
            .validate_authorization_code(&self.http_client, code, self.session.code_verifier())
            .await
            .inspect_err(|err| warn!(error = %err, "authorization code exchange failed"))?;

        self.session.apply_exchange(&tokens)?;
        info!(
            refresh_token = tokens.refresh_token().is_ok(),
            id_token = tokens.id_token().is_ok(),
            "session authenticated"
        );
        Ok(tokens)
    }

    /// Exchanges the held refresh token. A rotated refresh token replaces the
    /// held one; without rotation the held one is kept.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<OAuth2Tokens, Error> {
        let refresh_token = self.session.require(TokenKind::Refresh)?;

        let tokens = self
            .provider
            .refresh_access_token(&self.http_client, &refresh_token)
            .await
            .inspect_err(|err| warn!(error = %err, "token refresh failed"))?;

        self.session.apply_refresh(&tokens)?;
        info!(rotated = tokens.refresh_token().is_ok(), "access token refreshed");
        Ok(tokens)
    }

    /// Profile claims for the held access token, unmodified.
    #[instrument(skip_all)]
    pub async fn user_info(&self) -> Result<serde_json::Value, Error> {
        let access_token = self.session.require(TokenKind::Access)?;
        self.provider
            .fetch_user_info(&self.http_client, &access_token)
            .await
    }

    /// Introspection payload for the held token of `kind`, unmodified.
    #[instrument(skip(self))]
    pub async fn introspect(&self, kind: TokenKind) -> Result<serde_json::Value, Error> {
        let token = self.session.require(kind)?;
        self.provider
            .introspect_token(&self.http_client, &token, kind)
            .await
    }

    /// Revokes the held token of `kind`. The session keeps the value; it is
    /// only marked revoked, which moves the session to
    /// [`SessionPhase::Stale`].
    #[instrument(skip(self))]
    pub async fn revoke(&self, kind: TokenKind) -> Result<serde_json::Value, Error> {
        let token = self.session.require(kind)?;
        let result = self
            .provider
            .revoke_token(&self.http_client, &token, kind)
            .await?;

        self.session.mark_revoked(kind);
        info!(%kind, "token revoked at provider");
        Ok(result)
    }

    /// Introspection of both tokens. Requires both to be held; checks both
    /// before any call is made.
    #[instrument(skip_all)]
    pub async fn token_info(&self) -> Result<serde_json::Value, Error> {
        let access_token = self.session.require(TokenKind::Access)?;
        let refresh_token = self.session.require(TokenKind::Refresh)?;

        let access = self
            .provider
            .introspect_token(&self.http_client, &access_token, TokenKind::Access)
            .await?;
        let refresh = self
            .provider
            .introspect_token(&self.http_client, &refresh_token, TokenKind::Refresh)
            .await?;

        Ok(serde_json::json!({
            "access_token": access,
            "refresh_token": refresh,
        }))
    }
}

/// The payload shown after a successful callback: the provider's token
/// response plus the decoded ID token claims when there is a readable one.
pub fn callback_payload(tokens: OAuth2Tokens) -> serde_json::Value {
    let claims = match tokens.id_token() {
        Ok(id_token) => decode_id_token(id_token)
            .inspect_err(|err| debug!(error = %err, "id token not decodable"))
            .ok(),
        Err(_) => None,
    };

    let mut payload = serde_json::json!({ "tokens": tokens.into_data() });
    if let Some(claims) = claims {
        payload["id_token_claims"] = claims;
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse, Method};
    use crate::session::TokenSet;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockHttpClient {
        responses: Mutex<Vec<HttpResponse>>,
        recorded: Mutex<Vec<HttpRequest>>,
    }

    impl MockHttpClient {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses),
                recorded: Mutex::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<HttpRequest> {
            self.recorded.lock().unwrap().clone()
        }
    }

    impl HttpClient for MockHttpClient {
        async fn send(
            &self,
            request: HttpRequest,
        ) -> Result<HttpResponse, Box<dyn std::error::Error + Send + Sync>> {
            self.recorded.lock().unwrap().push(request);
            let response = self.responses.lock().unwrap().remove(0);
            Ok(response)
        }
    }

    fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    fn parse_form_body(request: &HttpRequest) -> Vec<(String, String)> {
        url::form_urlencoded::parse(&request.body)
            .into_owned()
            .collect()
    }

    fn make_flow(verifier: Option<&str>, responses: Vec<HttpResponse>) -> AuthFlow<MockHttpClient> {
        let provider = Provider::from_base_url(
            &Url::parse("https://idp.example.com/oauth2/default").unwrap(),
            "cid",
            Some("secret".into()),
            "http://localhost:8080/callback",
        )
        .unwrap();
        AuthFlow::new(
            provider,
            Session::from_parts("abc123", verifier.map(String::from)),
            MockHttpClient::new(responses),
            vec!["openid".into(), "profile".into()],
        )
    }

    fn token_response() -> HttpResponse {
        json_response(
            200,
            json!({ "access_token": "A", "refresh_token": "R", "id_token": "I", "token_type": "Bearer" }),
        )
    }

    async fn authenticated(responses: Vec<HttpResponse>) -> AuthFlow<MockHttpClient> {
        let mut all = vec![token_response()];
        all.extend(responses);
        let flow = make_flow(None, all);
        flow.handle_callback("xyz", "abc123").await.unwrap();
        flow
    }

    #[test]
    fn authorization_url_carries_state_and_challenge() {
        let flow = make_flow(Some("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"), vec![]);
        let url = flow.authorization_url();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "cid".into())));
        assert!(pairs.contains(&("state".into(), "abc123".into())));
        assert!(pairs.contains(&("scope".into(), "openid profile".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://localhost:8080/callback".into()
        )));
        assert!(pairs.contains(&(
            "code_challenge".into(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into()
        )));
        assert!(pairs.contains(&("code_challenge_method".into(), "S256".into())));
    }

    #[test]
    fn authorization_url_is_stable_across_attempts() {
        let flow = make_flow(Some("verifier"), vec![]);
        assert_eq!(flow.authorization_url(), flow.authorization_url());
    }

    #[tokio::test]
    async fn callback_with_matching_state_sets_tokens() {
        let flow = make_flow(None, vec![token_response()]);

        flow.handle_callback("xyz", "abc123").await.unwrap();

        assert_eq!(
            flow.session().tokens(),
            TokenSet {
                access_token: Some("A".into()),
                refresh_token: Some("R".into()),
                id_token: Some("I".into()),
            }
        );
        assert_eq!(flow.phase(), SessionPhase::Authenticated);

        let body = parse_form_body(&flow.http_client.recorded()[0]);
        assert!(body.contains(&("code".into(), "xyz".into())));
        assert!(!body.iter().any(|(k, _)| k == "code_verifier"));
    }

    #[tokio::test]
    async fn callback_sends_stored_code_verifier() {
        let flow = make_flow(Some("the-verifier"), vec![token_response()]);

        flow.handle_callback("xyz", "abc123").await.unwrap();

        let body = parse_form_body(&flow.http_client.recorded()[0]);
        assert!(body.contains(&("code_verifier".into(), "the-verifier".into())));
    }

    #[tokio::test]
    async fn callback_with_wrong_state_makes_no_call() {
        let flow = make_flow(Some("v"), vec![token_response()]);

        let err = flow.handle_callback("xyz", "wrong").await.unwrap_err();

        assert!(matches!(err, Error::StateMismatch));
        assert!(flow.http_client.recorded().is_empty());
        assert!(flow.session().tokens().is_empty());
    }

    #[tokio::test]
    async fn failed_exchange_leaves_session_untouched() {
        let flow = make_flow(
            None,
            vec![json_response(400, json!({ "error": "invalid_grant" }))],
        );

        let err = flow.handle_callback("xyz", "abc123").await.unwrap_err();

        assert_eq!(err.provider_body(), Some(json!({ "error": "invalid_grant" })));
        assert!(flow.session().tokens().is_empty());
        assert_eq!(flow.phase(), SessionPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn lifecycle_operations_short_circuit_without_tokens() {
        let flow = make_flow(None, vec![]);

        assert!(matches!(flow.refresh().await, Err(Error::NoToken(TokenKind::Refresh))));
        assert!(matches!(flow.user_info().await, Err(Error::NoToken(TokenKind::Access))));
        assert!(matches!(
            flow.introspect(TokenKind::Access).await,
            Err(Error::NoToken(TokenKind::Access))
        ));
        assert!(matches!(
            flow.introspect(TokenKind::Refresh).await,
            Err(Error::NoToken(TokenKind::Refresh))
        ));
        assert!(matches!(
            flow.revoke(TokenKind::Access).await,
            Err(Error::NoToken(TokenKind::Access))
        ));
        assert!(matches!(
            flow.revoke(TokenKind::Refresh).await,
            Err(Error::NoToken(TokenKind::Refresh))
        ));
        assert!(matches!(flow.token_info().await, Err(Error::NoToken(_))));
        assert!(flow.http_client.recorded().is_empty());
    }

    #[tokio::test]
    async fn token_info_requires_both_tokens() {
        let flow = make_flow(None, vec![json_response(200, json!({ "access_token": "A" }))]);
        flow.handle_callback("xyz", "abc123").await.unwrap();

        let err = flow.token_info().await.unwrap_err();

        assert!(matches!(err, Error::NoToken(TokenKind::Refresh)));
        assert_eq!(flow.http_client.recorded().len(), 1);
    }

    #[tokio::test]
    async fn user_info_sends_bearer_access_token() {
        let claims = json!({ "sub": "00u1", "name": "Jane" });
        let flow = authenticated(vec![json_response(200, claims.clone())]).await;

        assert_eq!(flow.user_info().await.unwrap(), claims);

        let request = &flow.http_client.recorded()[1];
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "https://idp.example.com/oauth2/default/v1/userinfo");
        assert_eq!(request.header("Authorization"), Some("Bearer A"));
    }

    #[tokio::test]
    async fn refresh_sends_held_refresh_token_and_updates_session() {
        let flow = authenticated(vec![json_response(200, json!({ "access_token": "A2" }))]).await;

        flow.refresh().await.unwrap();

        let body = parse_form_body(&flow.http_client.recorded()[1]);
        assert!(body.contains(&("grant_type".into(), "refresh_token".into())));
        assert!(body.contains(&("refresh_token".into(), "R".into())));
        let tokens = flow.session().tokens();
        assert_eq!(tokens.access_token.as_deref(), Some("A2"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("R"));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_tokens() {
        let flow =
            authenticated(vec![json_response(400, json!({ "error": "invalid_grant" }))]).await;

        assert!(flow.refresh().await.is_err());
        assert_eq!(flow.session().token(TokenKind::Access).as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn introspect_sends_hint_and_passes_payload_through() {
        let payload = json!({ "active": true, "token_type": "refresh_token", "uid": "00u1" });
        let flow = authenticated(vec![json_response(200, payload.clone())]).await;

        assert_eq!(flow.introspect(TokenKind::Refresh).await.unwrap(), payload);

        let request = &flow.http_client.recorded()[1];
        assert_eq!(request.url, "https://idp.example.com/oauth2/default/v1/introspect");
        let body = parse_form_body(request);
        assert!(body.contains(&("token".into(), "R".into())));
        assert!(body.contains(&("token_type_hint".into(), "refresh_token".into())));
        assert!(request.header("Authorization").unwrap().starts_with("Basic "));
    }

    #[tokio::test]
    async fn revoke_marks_session_stale_but_keeps_token() {
        let flow = authenticated(vec![HttpResponse {
            status: 200,
            body: vec![],
        }])
        .await;

        flow.revoke(TokenKind::Access).await.unwrap();

        assert_eq!(flow.phase(), SessionPhase::Stale);
        assert_eq!(flow.session().token(TokenKind::Access).as_deref(), Some("A"));
        let body = parse_form_body(&flow.http_client.recorded()[1]);
        assert!(body.contains(&("token".into(), "A".into())));
        assert!(body.contains(&("token_type_hint".into(), "access_token".into())));
    }

    #[tokio::test]
    async fn failed_revoke_does_not_mark_stale() {
        let flow =
            authenticated(vec![json_response(400, json!({ "error": "invalid_request" }))]).await;

        assert!(flow.revoke(TokenKind::Refresh).await.is_err());
        assert_eq!(flow.phase(), SessionPhase::Authenticated);
    }

    #[tokio::test]
    async fn token_info_introspects_both_tokens() {
        let flow = authenticated(vec![
            json_response(200, json!({ "active": true, "token_type": "Bearer" })),
            json_response(200, json!({ "active": false })),
        ])
        .await;

        let info = flow.token_info().await.unwrap();

        assert_eq!(
            info,
            json!({
                "access_token": { "active": true, "token_type": "Bearer" },
                "refresh_token": { "active": false },
            })
        );
        let recorded = flow.http_client.recorded();
        assert!(parse_form_body(&recorded[1]).contains(&("token".into(), "A".into())));
        assert!(parse_form_body(&recorded[2]).contains(&("token".into(), "R".into())));
    }

    #[test]
    fn callback_payload_includes_decoded_claims() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"00u1","email":"jane@example.com"}"#);
        let id_token = format!("eyJhbGciOiJSUzI1NiJ9.{payload}.sig");
        let tokens = OAuth2Tokens::new(json!({ "access_token": "A", "id_token": id_token }));

        let body = callback_payload(tokens);

        assert_eq!(body["tokens"]["access_token"], "A");
        assert_eq!(body["id_token_claims"]["sub"], "00u1");
    }

    #[test]
    fn callback_payload_skips_unreadable_id_token() {
        let tokens = OAuth2Tokens::new(json!({ "access_token": "A", "id_token": "I" }));

        let body = callback_payload(tokens);

        assert_eq!(body["tokens"]["id_token"], "I");
        assert!(body.get("id_token_claims").is_none());
    }
}
