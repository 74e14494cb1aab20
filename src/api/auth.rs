use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, Uri, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;

use crate::{
    api::{
        AppState, WebError,
        session::{expired_session_cookie, session_cookie, session_id},
    },
    spotify, utils, warning,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// `GET /api/auth/login`: starts the authorization code flow.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let auth_state = utils::generate_state();
    let auth_url = spotify::auth::authorize_url(&auth_state, None)?;

    let id = state.sessions.ensure(&headers).await;
    state
        .sessions
        .update(&id, |session| session.auth_state = Some(auth_state))
        .await;

    Ok((
        [(SET_COOKIE, session_cookie(&id))],
        Json(json!({ "auth_url": auth_url })),
    )
        .into_response())
}

/// `GET /api/auth/callback`: verifies `state` and stores the token.
///
/// Every outcome is a redirect to the frontend, failures carry the reason in
/// the `error` query parameter.
pub async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    if let Some(error) = params.error {
        return Redirect::to(&error_location(&error));
    }

    let Some(code) = params.code.filter(|code| !code.is_empty()) else {
        return Redirect::to(&error_location("no_code"));
    };

    let Some(id) = session_id(&headers) else {
        return Redirect::to(&error_location("invalid_state"));
    };

    let expected = state.sessions.take_auth_state(&id).await;
    if expected.is_none() || expected != params.state {
        return Redirect::to(&error_location("invalid_state"));
    }

    match spotify::auth::exchange_code(&code).await {
        Ok(token) => {
            state
                .sessions
                .update(&id, |session| session.token = Some(token))
                .await;
            Redirect::to("/")
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            Redirect::to(&error_location(&e.to_string()))
        }
    }
}

/// `GET /callback`: the redirect URI registered with Spotify, forwarded to
/// `/api/auth/callback` with the query intact.
pub async fn callback_redirect(uri: Uri) -> Redirect {
    match uri.query() {
        Some(query) => Redirect::to(&format!("/api/auth/callback?{query}")),
        None => Redirect::to("/api/auth/callback"),
    }
}

/// `POST /api/auth/logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        state.sessions.remove(&id).await;
    }

    (
        [(SET_COOKIE, expired_session_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response()
}

/// `GET /api/auth/status`
pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let authenticated = match session_id(&headers) {
        Some(id) => state
            .sessions
            .get(&id)
            .await
            .is_some_and(|session| session.token.is_some()),
        None => false,
    };

    Json(json!({ "authenticated": authenticated }))
}

fn error_location(reason: &str) -> String {
    Url::parse_with_params("http://localhost/", &[("error", reason)])
        .ok()
        .and_then(|url| url.query().map(|query| format!("/?{query}")))
        .unwrap_or_else(|| "/?error=unknown".to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use axum::http::{
        HeaderValue, StatusCode,
        header::{COOKIE, LOCATION},
    };

    use super::*;

    fn app_state() -> AppState {
        AppState::new(PathBuf::from("frontend"))
    }

    fn cookie(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("plexport_session={id}")).unwrap(),
        );
        headers
    }

    fn params(code: Option<&str>, state: Option<&str>, error: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            error: error.map(str::to_string),
        }
    }

    async fn callback_location(
        state: AppState,
        headers: HeaderMap,
        params: CallbackParams,
    ) -> String {
        let response = auth_callback(State(state), headers, Query(params))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        response.headers()[LOCATION].to_str().unwrap().to_string()
    }

    /// Session with a login in flight whose `state` is `expected`.
    async fn pending_login(state: &AppState, expected: &str) -> String {
        let id = state.sessions.ensure(&HeaderMap::new()).await;
        let expected = expected.to_string();
        state
            .sessions
            .update(&id, |session| session.auth_state = Some(expected))
            .await;
        id
    }

    #[tokio::test]
    async fn test_callback_passes_provider_error_through() {
        let state = app_state();
        let id = pending_login(&state, "xyz").await;

        let location = callback_location(
            state,
            cookie(&id),
            params(None, Some("xyz"), Some("access_denied")),
        )
        .await;
        assert_eq!(location, "/?error=access_denied");
    }

    #[tokio::test]
    async fn test_callback_without_code() {
        let state = app_state();
        let id = pending_login(&state, "xyz").await;

        let location =
            callback_location(state.clone(), cookie(&id), params(None, Some("xyz"), None)).await;
        assert_eq!(location, "/?error=no_code");

        let location =
            callback_location(state, cookie(&id), params(Some(""), Some("xyz"), None)).await;
        assert_eq!(location, "/?error=no_code");
    }

    #[tokio::test]
    async fn test_callback_rejects_mismatched_state() {
        let state = app_state();
        let id = pending_login(&state, "expected").await;

        let location = callback_location(
            state.clone(),
            cookie(&id),
            params(Some("code"), Some("other"), None),
        )
        .await;
        assert_eq!(location, "/?error=invalid_state");

        // the pending state was consumed by the failed attempt
        assert!(state.sessions.get(&id).await.unwrap().auth_state.is_none());
    }

    #[tokio::test]
    async fn test_callback_rejects_session_without_pending_state() {
        let state = app_state();
        let id = state.sessions.ensure(&HeaderMap::new()).await;

        let location = callback_location(
            state.clone(),
            cookie(&id),
            params(Some("code"), None, None),
        )
        .await;
        assert_eq!(location, "/?error=invalid_state");

        let location = callback_location(
            state.clone(),
            cookie(&id),
            params(Some("code"), Some("anything"), None),
        )
        .await;
        assert_eq!(location, "/?error=invalid_state");
    }

    #[tokio::test]
    async fn test_callback_rejects_missing_or_unknown_cookie() {
        let state = app_state();

        let location = callback_location(
            state.clone(),
            HeaderMap::new(),
            params(Some("code"), Some("xyz"), None),
        )
        .await;
        assert_eq!(location, "/?error=invalid_state");

        let location = callback_location(
            state,
            cookie("forged"),
            params(Some("code"), Some("xyz"), None),
        )
        .await;
        assert_eq!(location, "/?error=invalid_state");
    }

    #[tokio::test]
    async fn test_callback_redirect_keeps_query() {
        let response = callback_redirect(Uri::from_static("/callback?code=abc&state=xyz"))
            .await
            .into_response();
        assert_eq!(
            response.headers()[LOCATION],
            "/api/auth/callback?code=abc&state=xyz"
        );

        let response = callback_redirect(Uri::from_static("/callback"))
            .await
            .into_response();
        assert_eq!(response.headers()[LOCATION], "/api/auth/callback");
    }

    #[tokio::test]
    async fn test_status_and_logout() {
        let state = app_state();
        let id = pending_login(&state, "xyz").await;

        let Json(body) = status(State(state.clone()), cookie(&id)).await;
        assert_eq!(body, json!({ "authenticated": false }));

        let Json(body) = status(State(state.clone()), HeaderMap::new()).await;
        assert_eq!(body, json!({ "authenticated": false }));

        let response = logout(State(state.clone()), cookie(&id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[SET_COOKIE]
                .to_str()
                .unwrap()
                .ends_with("Max-Age=0")
        );
        assert!(state.sessions.get(&id).await.is_none());
    }

    #[test]
    fn test_error_location_encodes_reason() {
        assert_eq!(error_location("no_code"), "/?error=no_code");
        assert_eq!(error_location("access_denied"), "/?error=access_denied");
        assert_eq!(
            error_location("bad request & more"),
            "/?error=bad+request+%26+more"
        );
    }
}
