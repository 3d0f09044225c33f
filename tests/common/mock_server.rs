#![allow(dead_code)]

use base64::Engine;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A `wiremock` identity provider laid out like an Okta authorization
/// server: every endpoint hangs off `/v1/`.
pub struct MockProvider {
    server: MockServer,
}

impl MockProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to hand to `Provider::from_base_url`.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    async fn mount(&self, verb: &str, endpoint: &str, response: ResponseTemplate) {
        Mock::given(method(verb))
            .and(path(format!("/v1/{endpoint}")))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_token_success(&self, response: serde_json::Value) {
        self.mount("POST", "token", ResponseTemplate::new(200).set_body_json(response))
            .await;
    }

    /// Token endpoint answers 400 with an RFC 6749 error object.
    pub async fn mock_token_error(&self, error_code: &str, description: &str) {
        let body = serde_json::json!({
            "error": error_code,
            "error_description": description,
        });
        self.mount("POST", "token", ResponseTemplate::new(400).set_body_json(body))
            .await;
    }

    /// Fails verification on drop if the token endpoint is hit.
    pub async fn expect_no_token_request(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Userinfo only answers when presented `Bearer {token}`.
    pub async fn mock_userinfo(&self, token: &str, claims: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/v1/userinfo"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(claims))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_introspection(&self, response: serde_json::Value) {
        self.mount(
            "POST",
            "introspect",
            ResponseTemplate::new(200).set_body_json(response),
        )
        .await;
    }

    /// Revocation answers 200 with an empty body, as RFC 7009 allows.
    pub async fn mock_revocation_success(&self) {
        self.mount("POST", "revoke", ResponseTemplate::new(200)).await;
    }

    async fn received(&self) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .expect("request recording enabled")
    }

    pub async fn request_count(&self) -> usize {
        self.received().await.len()
    }

    async fn last_request(&self) -> Request {
        self.received()
            .await
            .pop()
            .expect("expected at least one request")
    }

    /// Asserts every `(key, value)` pair is present in the last request's
    /// form body.
    pub async fn verify_last_form(&self, expected: &[(&str, &str)]) {
        let last = self.last_request().await;
        let form: Vec<(String, String)> = url::form_urlencoded::parse(&last.body)
            .into_owned()
            .collect();

        for (key, value) in expected {
            assert!(
                form.iter().any(|(k, v)| k == key && v == value),
                "missing form param {key}={value}; body was {form:?}"
            );
        }
    }

    pub async fn verify_basic_auth(&self, client_id: &str, client_secret: &str) {
        let last = self.last_request().await;
        let sent = last
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .expect("expected Authorization header");
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{client_id}:{client_secret}"));

        assert_eq!(sent, format!("Basic {credentials}"));
    }
}
