use reqwest::{
    StatusCode,
    blocking::{Client, Response},
    header::{HeaderMap, RETRY_AFTER},
};
use serde_json::Value;

use crate::{
    spotify::{ApiError, SpotifyApi},
    types::AccessToken,
};

/// Blocking Spotify Web API client bound to one access token.
///
/// Every export run builds its own client, so a token is never shared
/// between users.
pub struct SpotifyClient {
    http: Client,
    base_url: String,
    token: AccessToken,
}

impl SpotifyClient {
    pub fn new(base_url: impl Into<String>, token: AccessToken) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let api_url = format!("{uri}{path}", uri = self.base_url, path = path);
        let response = self
            .http
            .get(&api_url)
            .bearer_auth(self.token.secret())
            .query(query)
            .send()?;

        let response = check_status(response)?;
        Ok(response.json::<Value>()?)
    }

    fn page_query(limit: u32, offset: u32) -> Vec<(&'static str, String)> {
        vec![("limit", limit.to_string()), ("offset", offset.to_string())]
    }
}

impl SpotifyApi for SpotifyClient {
    fn current_user(&self) -> Result<Value, ApiError> {
        self.get("/me", &[])
    }

    fn current_user_playlists(&self, limit: u32, offset: u32) -> Result<Value, ApiError> {
        self.get("/me/playlists", &Self::page_query(limit, offset))
    }

    fn current_user_saved_tracks(&self, limit: u32, offset: u32) -> Result<Value, ApiError> {
        self.get("/me/tracks", &Self::page_query(limit, offset))
    }

    fn playlist_items(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Value, ApiError> {
        let mut query = Self::page_query(limit, offset);
        // episodes are requested too and filtered out by the exporter
        query.push(("additional_types", "track,episode".to_string()));
        self.get(&format!("/playlists/{playlist_id}/tracks"), &query)
    }
}

fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RateLimited {
            retry_after: parse_retry_after(response.headers()),
        });
    }

    let body = response.text().unwrap_or_default();
    Err(ApiError::Status {
        status,
        message: error_message(&body),
    })
}

/// Reads `Retry-After` as (possibly fractional) seconds.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
}

/// Pulls `error.message` out of a Spotify error body, falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
