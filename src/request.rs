use base64::Engine;
use serde_json::Value;

use crate::Error;
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::tokens::OAuth2Tokens;

const USER_AGENT: &str = concat!("authcode-session/", env!("CARGO_PKG_VERSION"));
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

fn common_headers() -> Vec<(String, String)> {
    vec![
        ("Accept".into(), "application/json".into()),
        ("User-Agent".into(), USER_AGENT.into()),
    ]
}

/// Form-encoded POST to a provider endpoint (token, introspection,
/// revocation).
pub fn create_oauth2_request(endpoint: &str, body: &[(String, String)]) -> HttpRequest {
    let form = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(body)
        .finish();

    let mut headers = vec![("Content-Type".into(), FORM_CONTENT_TYPE.into())];
    headers.extend(common_headers());

    HttpRequest {
        method: Method::Post,
        url: endpoint.into(),
        headers,
        body: form.into_bytes(),
    }
}

/// GET carrying `Authorization: Bearer <token>`.
pub fn create_bearer_request(endpoint: &str, token: &str) -> HttpRequest {
    let mut headers = vec![("Authorization".into(), format!("Bearer {token}"))];
    headers.extend(common_headers());

    HttpRequest {
        method: Method::Get,
        url: endpoint.into(),
        headers,
        body: Vec::new(),
    }
}

/// `Basic <base64(client_id:client_secret)>`, as sent by a confidential
/// client.
pub fn encode_basic_credentials(client_id: &str, client_secret: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{client_id}:{client_secret}"));
    format!("Basic {encoded}")
}

/// Sends a grant request. A 2xx JSON answer becomes [`OAuth2Tokens`].
pub async fn send_token_request(
    client: &(impl HttpClient + ?Sized),
    request: HttpRequest,
) -> Result<OAuth2Tokens, Error> {
    let response = send_checked(client, request).await?;
    parse_body(&response).map(OAuth2Tokens::new)
}

/// Sends a request whose answer is opaque provider JSON (userinfo,
/// introspection, revocation) and returns it unmodified. An empty 2xx
/// body reads as `{}`.
pub async fn send_json_request(
    client: &(impl HttpClient + ?Sized),
    request: HttpRequest,
) -> Result<Value, Error> {
    let response = send_checked(client, request).await?;
    if is_blank(&response.body) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    parse_body(&response)
}

async fn send_checked(
    client: &(impl HttpClient + ?Sized),
    request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let response = client.send(request).await?;
    if response.is_success() {
        Ok(response)
    } else {
        Err(error_from_response(&response))
    }
}

fn parse_body(response: &HttpResponse) -> Result<Value, Error> {
    serde_json::from_slice(&response.body).map_err(|_| unreadable(response))
}

fn unreadable(response: &HttpResponse) -> Error {
    Error::UnexpectedErrorBody {
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    }
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

/// Maps a non-2xx provider answer to an [`Error`]:
///
/// | body | error |
/// |------|-------|
/// | empty | `UnexpectedResponse` |
/// | JSON with a string `error` | `OAuthRequest`, body kept verbatim |
/// | other JSON | `Provider`, body kept verbatim |
/// | not JSON | `UnexpectedErrorBody` |
pub fn error_from_response(response: &HttpResponse) -> Error {
    let status = response.status;
    if is_blank(&response.body) {
        return Error::UnexpectedResponse { status };
    }

    let Ok(json) = serde_json::from_slice::<Value>(&response.body) else {
        return unreadable(response);
    };

    let text = |key: &str| json.get(key).and_then(Value::as_str).map(String::from);
    let Some(code) = text("error") else {
        return Error::Provider { status, body: json };
    };
    let description = text("error_description");
    let uri = text("error_uri");

    Error::OAuthRequest {
        status,
        code,
        description,
        uri,
        body: json,
    }
}
