use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderName, header::CACHE_CONTROL},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use tokio::sync::mpsc;

use crate::{
    api::{AppState, WebError, session::session_id},
    config,
    export::{Exporter, ProgressEvent, ThreadSleeper},
    spotify::SpotifyClient,
    types::Token,
};

/// Events buffered between the export thread and the HTTP stream.
const PROGRESS_BUFFER: usize = 16;

/// `GET /api/export/progress`: runs an export and streams its progress as
/// Server-Sent Events. The last event is the completion or the failure.
pub async fn export_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, WebError> {
    let token = session_token(&state, &headers).await?;

    let (tx, mut rx) = mpsc::channel::<ProgressEvent>(PROGRESS_BUFFER);
    tokio::task::spawn_blocking(move || {
        let api = SpotifyClient::new(config::spotify_apiurl(), token.access());
        let exporter = Exporter::new(&api, &ThreadSleeper, config::pacing());
        let mut sink = |event: ProgressEvent| {
            // A closed channel means the browser went away. The event is
            // dropped and the export still runs to its end.
            let _ = tx.blocking_send(event);
        };
        exporter.run_streaming(&mut sink);
    });

    let stream = async_stream::stream! {
        while let Some(progress) = rx.recv().await {
            let is_terminal = progress.is_terminal();

            if let Ok(event) = Event::default().json_data(&progress) {
                yield Ok::<Event, Infallible>(event);
            }

            if is_terminal {
                break;
            }
        }
    };

    Ok((
        [
            (CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    ))
}

/// `GET /api/export`: runs an export and answers with the completion payload.
pub async fn export(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProgressEvent>, WebError> {
    let token = session_token(&state, &headers).await?;

    let result = tokio::task::spawn_blocking(move || {
        let api = SpotifyClient::new(config::spotify_apiurl(), token.access());
        Exporter::new(&api, &ThreadSleeper, config::pacing()).run()
    })
    .await??;

    Ok(Json(ProgressEvent::Completed(result)))
}

async fn session_token(state: &AppState, headers: &HeaderMap) -> Result<Token, WebError> {
    let id = session_id(headers).ok_or(WebError::NotAuthenticated)?;
    state
        .sessions
        .valid_token(&id)
        .await
        .ok_or(WebError::NotAuthenticated)
}
