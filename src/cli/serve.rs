use crate::{config, error, server, warning};

pub async fn serve() {
    if config::spotify_client_secret().is_none() {
        warning!("SPOTIFY_API_AUTH_CLIENT_SECRET is not set, browser logins will fail");
    }

    if let Err(e) = server::start_web_server().await {
        error!("Web server stopped. Err: {}", e);
    }
}
