use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config, error,
    export::resolve_user,
    spotify::{self, SpotifyClient},
    success,
    types::{AccessToken, PkceToken, UserIdentity},
};

/// Runs the browser login and prints who the token belongs to.
///
/// The token is not persisted; `export` logs in again unless a token is
/// passed to it.
pub async fn auth(shared_state: Arc<Mutex<Option<PkceToken>>>) {
    let token = match spotify::auth::auth(shared_state).await {
        Ok(token) => token,
        Err(e) => error!("Authentication failed. Err: {}", e),
    };

    match current_user(token.access()).await {
        Ok(user) => success!("Authenticated as {} ({})", user.display_name, user.id),
        Err(e) => error!("Cannot resolve Spotify user. Err: {}", e),
    }
}

pub(crate) async fn current_user(token: AccessToken) -> Result<UserIdentity, String> {
    tokio::task::spawn_blocking(move || {
        let api = SpotifyClient::new(config::spotify_apiurl(), token);
        resolve_user(&api).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}
