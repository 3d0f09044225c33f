//! HTTP surface of the demo.
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/` | page with the authorization link |
//! | GET | `/callback` | provider redirect; completes the code exchange |
//! | GET | `/refresh` | refresh the access token |
//! | GET | `/userinfo` | profile claims for the access token |
//! | GET | `/introspect/{access,refresh}` | introspect a token |
//! | GET | `/revoke/{access,refresh}` | revoke a token |
//! | GET | `/tokeninfo` | introspect both tokens |
//!
//! A missing token is answered with `200` and a JSON error object; a state
//! mismatch with `400` plain text; a provider failure with the provider's
//! status and body.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, warn};

use crate::error::Error;
use crate::flow::{AuthFlow, callback_payload};
use crate::http::HttpClient;
use crate::tokens::TokenKind;

type SharedFlow<H> = Arc<AuthFlow<H>>;

pub fn router<H>(flow: SharedFlow<H>) -> Router
where
    H: HttpClient + 'static,
{
    Router::new()
        .route("/", get(index::<H>))
        .route("/callback", get(callback::<H>))
        .route("/refresh", get(refresh::<H>))
        .route("/userinfo", get(user_info::<H>))
        .route("/introspect/{kind}", get(introspect::<H>))
        .route("/revoke/{kind}", get(revoke::<H>))
        .route("/tokeninfo", get(token_info::<H>))
        .with_state(flow)
}

/// Query of the provider redirect. Providers send `error` instead of
/// `code` when the user denies consent.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn index<H: HttpClient + 'static>(State(flow): State<SharedFlow<H>>) -> Html<String> {
    let url = flow.authorization_url();
    let phase = flow.phase().as_str();
    let pkce = if flow.session().pkce_enabled() {
        "enabled"
    } else {
        "disabled"
    };
    let revoked: String = [TokenKind::Access, TokenKind::Refresh]
        .into_iter()
        .filter(|kind| flow.session().is_revoked(*kind))
        .map(|kind| format!("<p>{kind} revoked at the provider</p>\n"))
        .collect();

    Html(format!(
        r#"<!doctype html>
<html>
<head><title>OAuth 2.0 authorization code flow</title></head>
<body>
<h1>OAuth 2.0 authorization code flow</h1>
<p>Session: <strong>{phase}</strong> (PKCE {pkce})</p>
{revoked}<p><a href="{href}">Log in with the provider</a></p>
<ul>
<li><a href="/refresh">Refresh access token</a></li>
<li><a href="/userinfo">User info</a></li>
<li><a href="/introspect/access">Introspect access token</a></li>
<li><a href="/introspect/refresh">Introspect refresh token</a></li>
<li><a href="/revoke/access">Revoke access token</a></li>
<li><a href="/revoke/refresh">Revoke refresh token</a></li>
<li><a href="/tokeninfo">Token info</a></li>
</ul>
</body>
</html>
"#,
        href = escape_attr(url.as_str()),
    ))
}

async fn callback<H: HttpClient + 'static>(
    State(flow): State<SharedFlow<H>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(code) = params.error {
        warn!(error = %code, "provider redirected with an error");
        let text = match params.error_description {
            Some(description) => format!("Authorization failed: {code}: {description}"),
            None => format!("Authorization failed: {code}"),
        };
        return (StatusCode::BAD_REQUEST, text).into_response();
    }

    let (Some(code), Some(state)) = (params.code, params.state) else {
        return (StatusCode::BAD_REQUEST, "Missing code or state").into_response();
    };

    match flow.handle_callback(&code, &state).await {
        Ok(tokens) => Json(callback_payload(tokens)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn refresh<H: HttpClient + 'static>(State(flow): State<SharedFlow<H>>) -> Response {
    json_result(flow.refresh().await.map(|tokens| tokens.into_data()))
}

async fn user_info<H: HttpClient + 'static>(State(flow): State<SharedFlow<H>>) -> Response {
    json_result(flow.user_info().await)
}

async fn introspect<H: HttpClient + 'static>(
    State(flow): State<SharedFlow<H>>,
    Path(kind): Path<TokenKind>,
) -> Response {
    json_result(flow.introspect(kind).await)
}

async fn revoke<H: HttpClient + 'static>(
    State(flow): State<SharedFlow<H>>,
    Path(kind): Path<TokenKind>,
) -> Response {
    json_result(flow.revoke(kind).await)
}

async fn token_info<H: HttpClient + 'static>(State(flow): State<SharedFlow<H>>) -> Response {
    json_result(flow.token_info().await)
}

fn json_result(result: Result<serde_json::Value, Error>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: Error) -> Response {
    match err {
        Error::StateMismatch => (StatusCode::BAD_REQUEST, "State mismatch").into_response(),
        Error::NoToken(kind) => Json(serde_json::json!({
            "error": "no_token",
            "error_description": format!("No {kind} available"),
        }))
        .into_response(),
        err => {
            if let Some(body) = err.provider_body() {
                let status = err
                    .provider_status()
                    .and_then(|status| StatusCode::from_u16(status).ok())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                return (status, Json(body)).into_response();
            }

            error!(error = %err, "provider call failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": "provider_unavailable",
                    "error_description": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
