use std::sync::Arc;

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::Mutex;

use crate::{
    api::auth::CallbackParams, spotify::auth::exchange_code_pkce, types::PkceToken, warning,
};

/// `GET /callback` on the CLI's temporary server: completes the PKCE flow
/// and hands the token to the waiting `auth` future through `shared_state`.
pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(shared_state): Extension<Arc<Mutex<Option<PkceToken>>>>,
) -> Html<&'static str> {
    if let Some(error) = params.error {
        warning!("Spotify denied authorization: {}", error);
        return Html("<h4>Login failed.</h4>");
    }

    let Some(code) = params.code else {
        return Html("<h4>Missing authorization code.</h4>");
    };

    let mut state = shared_state.lock().await;
    let Some(pkce_state) = state.as_mut() else {
        return Html("<h4>Missing PKCE code verifier.</h4>");
    };

    if params.state.as_deref() != Some(pkce_state.state.as_str()) {
        return Html("<h4>Invalid state.</h4>");
    }

    match exchange_code_pkce(&code, &pkce_state.code_verifier).await {
        Ok(token) => {
            pkce_state.token = Some(token);
            Html("<h2>Authentication successful.</h2><p>You can close this window.</p>")
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            Html("<h4>Login failed.</h4>")
        }
    }
}
