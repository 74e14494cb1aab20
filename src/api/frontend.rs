use std::path::{Component, Path, PathBuf};

use axum::{
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};

use crate::api::AppState;

const ALLOWED_EXTENSIONS: [&str; 13] = [
    "html", "css", "js", "json", "png", "jpg", "jpeg", "gif", "svg", "ico", "woff", "woff2", "ttf",
];

/// Serves the static frontend for every path no API route matched.
pub async fn serve_frontend(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(relative) = resolve_path(uri.path()) else {
        return not_found();
    };

    let path = state.frontend_dir.join(&relative);
    match async_fs::read(&path).await {
        Ok(data) => serve_asset(&path, data),
        Err(_) => not_found(),
    }
}

/// Maps a request path to a file below the frontend directory.
///
/// `/` maps to `index.html`. Returns `None` for anything that would leave the
/// directory or whose extension is not whitelisted.
pub fn resolve_path(request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    let relative = if trimmed.is_empty() {
        "index.html"
    } else {
        trimmed
    };

    let mut path = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(path)
}

fn serve_asset(path: &Path, data: Vec<u8>) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    ([(header::CONTENT_TYPE, mime.to_string())], data).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_serves_index() {
        assert_eq!(resolve_path("/"), Some(PathBuf::from("index.html")));
        assert_eq!(resolve_path(""), Some(PathBuf::from("index.html")));
    }

    #[test]
    fn test_nested_assets() {
        assert_eq!(resolve_path("/script.js"), Some(PathBuf::from("script.js")));
        assert_eq!(
            resolve_path("/fonts/./Inter.WOFF2"),
            Some(PathBuf::from("fonts/Inter.WOFF2"))
        );
    }

    #[test]
    fn test_rejects_traversal() {
        assert_eq!(resolve_path("/../secret.json"), None);
        assert_eq!(resolve_path("/css/../../.env.html"), None);
    }

    #[test]
    fn test_rejects_other_extensions() {
        assert_eq!(resolve_path("/.env"), None);
        assert_eq!(resolve_path("/backend/app.py"), None);
        assert_eq!(resolve_path("/api/unknown"), None);
    }

    #[test]
    fn test_serve_asset_content_type() {
        let response = serve_asset(Path::new("style.css"), b"body{}".to_vec());
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
    }
}
