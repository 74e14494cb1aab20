use std::{sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    config,
    server::start_callback_server,
    spotify::AuthError,
    types::{PkceToken, Token},
    utils, warning,
};

/// How long the CLI waits for the browser to hit the callback route.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Builds the Spotify authorization URL.
///
/// `state` is echoed back on the callback for CSRF protection. When a PKCE
/// `code_challenge` is given, the S256 challenge parameters are added.
pub fn authorize_url(state: &str, code_challenge: Option<&str>) -> Result<String, AuthError> {
    let client_id = config::spotify_client_id()
        .ok_or(AuthError::MissingConfig("SPOTIFY_API_AUTH_CLIENT_ID"))?;
    let redirect_uri = config::spotify_redirect_uri();
    let scope = config::spotify_scope();

    let mut params = vec![
        ("client_id", client_id.as_str()),
        ("response_type", "code"),
        ("redirect_uri", redirect_uri.as_str()),
        ("scope", scope.as_str()),
        ("state", state),
    ];
    if let Some(challenge) = code_challenge {
        params.push(("code_challenge_method", "S256"));
        params.push(("code_challenge", challenge));
    }

    let url = Url::parse_with_params(&config::spotify_apiauth_url(), &params)
        .map_err(|_| AuthError::MissingConfig("a valid SPOTIFY_API_AUTH_URL"))?;
    Ok(url.to_string())
}

/// Runs the interactive PKCE flow for the CLI.
///
/// Starts the local callback server, opens the browser and waits until the
/// callback stored a token in `shared_state`. The token only lives in memory.
pub async fn auth(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Result<Token, String> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);
    let state = utils::generate_state();

    let auth_url = authorize_url(&state, Some(&code_challenge)).map_err(|e| e.to_string())?;

    // Store verifier in shared state before redirect
    {
        let mut lock = shared_state.lock().await;
        *lock = Some(PkceToken {
            code_verifier,
            state,
            token: None,
        });
    }

    let server_state = Arc::clone(&shared_state);
    let server = tokio::spawn(async move {
        if let Err(e) = start_callback_server(server_state).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let token = wait_for_token(shared_state).await;
    server.abort();

    token.ok_or_else(|| "Authentication failed or timed out.".to_string())
}

async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let start = Instant::now();

    while start.elapsed() < CALLBACK_TIMEOUT {
        let lock = shared_state.lock().await;
        if let Some(pkce_token) = lock.as_ref() {
            if let Some(token) = &pkce_token.token {
                return Some(token.clone());
            }
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Exchanges an authorization code using the client secret (web flow).
pub async fn exchange_code(code: &str) -> Result<Token, AuthError> {
    let redirect_uri = config::spotify_redirect_uri();
    let basic = basic_credentials()?;

    let res = Client::new()
        .post(config::spotify_apitoken_url())
        .header(reqwest::header::AUTHORIZATION, basic)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await?;

    token_from_response(res, None).await
}

/// Exchanges an authorization code using the PKCE verifier (CLI flow).
pub async fn exchange_code_pkce(code: &str, verifier: &str) -> Result<Token, AuthError> {
    let client_id = config::spotify_client_id()
        .ok_or(AuthError::MissingConfig("SPOTIFY_API_AUTH_CLIENT_ID"))?;
    let redirect_uri = config::spotify_redirect_uri();

    let res = Client::new()
        .post(config::spotify_apitoken_url())
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await?;

    token_from_response(res, None).await
}

/// Refreshes an access token with the client secret.
///
/// Spotify may omit the refresh token in the response, in which case the old
/// one stays valid and is carried over.
pub async fn refresh_token(refresh_token: &str) -> Result<Token, AuthError> {
    let basic = basic_credentials()?;

    let res = Client::new()
        .post(config::spotify_apitoken_url())
        .header(reqwest::header::AUTHORIZATION, basic)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await?;

    token_from_response(res, Some(refresh_token)).await
}

fn basic_credentials() -> Result<String, AuthError> {
    let client_id = config::spotify_client_id()
        .ok_or(AuthError::MissingConfig("SPOTIFY_API_AUTH_CLIENT_ID"))?;
    let client_secret = config::spotify_client_secret()
        .ok_or(AuthError::MissingConfig("SPOTIFY_API_AUTH_CLIENT_SECRET"))?;
    Ok(format!(
        "Basic {}",
        STANDARD.encode(format!("{client_id}:{client_secret}"))
    ))
}

async fn token_from_response(
    res: reqwest::Response,
    previous_refresh: Option<&str>,
) -> Result<Token, AuthError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(AuthError::Rejected { status, body });
    }

    let json: Value = res.json().await?;
    token_from_json(&json, previous_refresh)
}

pub(crate) fn token_from_json(
    json: &Value,
    previous_refresh: Option<&str>,
) -> Result<Token, AuthError> {
    let access_token = json["access_token"]
        .as_str()
        .ok_or(AuthError::MissingField("access_token"))?;

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: json["refresh_token"]
            .as_str()
            .or(previous_refresh)
            .map(str::to_string),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_token_from_json() {
        let token = token_from_json(
            &json!({
                "access_token": "BQC",
                "refresh_token": "AQD",
                "scope": "user-library-read",
                "expires_in": 1800
            }),
            None,
        )
        .unwrap();

        assert_eq!(token.access_token, "BQC");
        assert_eq!(token.refresh_token.as_deref(), Some("AQD"));
        assert_eq!(token.expires_in, 1800);
    }

    #[test]
    fn test_token_from_json_keeps_previous_refresh_token() {
        let token = token_from_json(&json!({"access_token": "new"}), Some("old")).unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("old"));
        assert_eq!(token.expires_in, 3600);
    }

    #[test]
    fn test_token_from_json_requires_access_token() {
        let err = token_from_json(&json!({"error": "invalid_grant"}), None).unwrap_err();
        assert!(matches!(err, AuthError::MissingField("access_token")));
    }
}
