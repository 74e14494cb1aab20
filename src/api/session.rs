use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::http::{HeaderMap, header::COOKIE};
use tokio::sync::Mutex;

use crate::{spotify, types::Token, utils, warning};

pub const SESSION_COOKIE: &str = "plexport_session";

/// How long a session without a token (a login in flight) is kept.
pub const LOGIN_TTL: Duration = Duration::from_secs(10 * 60);

/// How long an authenticated session may sit unused.
pub const IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on sessions held at once.
pub const MAX_SESSIONS: usize = 10_000;

/// Per-browser state of the web service. Lives in memory only.
#[derive(Debug, Clone)]
pub struct Session {
    /// CSRF `state` of a login in flight, consumed by the callback.
    pub auth_state: Option<String>,
    pub token: Option<Token>,
    last_seen: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            auth_state: None,
            token: None,
            last_seen: Instant::now(),
        }
    }
}

impl Session {
    /// Whether the session can be dropped at `now`.
    ///
    /// Sessions without a token expire after [`LOGIN_TTL`]. Authenticated
    /// sessions expire after [`IDLE_TTL`] without use, or as soon as their
    /// token has expired and cannot be refreshed.
    fn is_stale(&self, now: Instant) -> bool {
        let idle = now.saturating_duration_since(self.last_seen);
        match &self.token {
            None => idle > LOGIN_TTL,
            Some(token) => {
                idle > IDLE_TTL || (token.is_expired() && token.refresh_token.is_none())
            }
        }
    }
}

/// In-memory session table keyed by the session cookie value.
///
/// Stale sessions are pruned whenever a new one is created, and the table
/// never holds more than `max_sessions` entries: at the limit the least
/// recently used session goes, unauthenticated ones first.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limit(MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding at most `max_sessions` sessions (at least one).
    pub fn with_limit(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the session id of the request, creating a session when the
    /// request has none or an unknown one.
    ///
    /// # Arguments
    ///
    /// * `headers` - Request headers, searched for the session cookie
    ///
    /// # Returns
    ///
    /// The id of a session that exists in the store when this returns.
    /// Creating a session first prunes stale ones and evicts the least
    /// recently used one if the store is full.
    pub async fn ensure(&self, headers: &HeaderMap) -> String {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        if let Some(id) = session_id(headers) {
            if let Some(session) = sessions.get_mut(&id) {
                session.last_seen = now;
                return id;
            }
        }

        prune_stale(&mut sessions, now);
        while sessions.len() >= self.max_sessions {
            if !evict_least_recent(&mut sessions) {
                break;
            }
        }

        let id = utils::generate_state();
        sessions.insert(id.clone(), Session::default());
        id
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Applies `f` to an existing session. Unknown ids are ignored.
    pub async fn update(&self, id: &str, f: impl FnOnce(&mut Session)) {
        if let Some(session) = self.sessions.lock().await.get_mut(id) {
            session.last_seen = Instant::now();
            f(session);
        }
    }

    /// Takes the pending login `state`; it can only be matched once.
    pub async fn take_auth_state(&self, id: &str) -> Option<String> {
        self.sessions
            .lock()
            .await
            .get_mut(id)
            .and_then(|session| session.auth_state.take())
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.lock().await.remove(id);
    }

    /// Token of the session, refreshed first if it is about to expire.
    ///
    /// An expired token that cannot be refreshed is dropped from the session.
    pub async fn valid_token(&self, id: &str) -> Option<Token> {
        let token = self.get(id).await?.token?;
        if !token.is_expired() {
            return Some(token);
        }

        let refreshed = match token.refresh_token.as_deref() {
            Some(refresh) => match spotify::auth::refresh_token(refresh).await {
                Ok(token) => Some(token),
                Err(e) => {
                    warning!("Token refresh failed: {}", e);
                    None
                }
            },
            None => None,
        };

        self.update(id, |session| session.token = refreshed.clone())
            .await;
        refreshed
    }
}

fn prune_stale(sessions: &mut HashMap<String, Session>, now: Instant) {
    sessions.retain(|_, session| !session.is_stale(now));
}

/// Removes the least recently used session, preferring ones without a token.
fn evict_least_recent(sessions: &mut HashMap<String, Session>) -> bool {
    let victim = sessions
        .iter()
        .min_by_key(|(_, session)| (session.token.is_some(), session.last_seen))
        .map(|(id, _)| id.clone());

    match victim {
        Some(id) => sessions.remove(&id).is_some(),
        None => false,
    }
}

/// Reads the session id from the `Cookie` headers.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::Utc;

    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn fresh_token() -> Token {
        Token {
            access_token: "BQC".to_string(),
            refresh_token: None,
            scope: String::new(),
            expires_in: 3600,
            obtained_at: Utc::now().timestamp() as u64,
        }
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        assert_eq!(
            session_id(&headers("theme=dark; plexport_session=abc123; lang=en")),
            Some("abc123".to_string())
        );
        assert_eq!(session_id(&headers("plexport_session=")), None);
        assert_eq!(session_id(&headers("other=1")), None);
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookies() {
        assert_eq!(
            session_cookie("abc"),
            "plexport_session=abc; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(expired_session_cookie().ends_with("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_ensure_reuses_known_session() {
        let store = SessionStore::new();
        let id = store.ensure(&HeaderMap::new()).await;

        let again = store.ensure(&headers(&format!("plexport_session={id}"))).await;
        assert_eq!(again, id);

        let unknown = store.ensure(&headers("plexport_session=forged")).await;
        assert_ne!(unknown, "forged");
    }

    #[tokio::test]
    async fn test_auth_state_is_single_use() {
        let store = SessionStore::new();
        let id = store.ensure(&HeaderMap::new()).await;
        store
            .update(&id, |s| s.auth_state = Some("xyz".to_string()))
            .await;

        assert_eq!(store.take_auth_state(&id).await.as_deref(), Some("xyz"));
        assert_eq!(store.take_auth_state(&id).await, None);
    }

    #[tokio::test]
    async fn test_valid_token() {
        let store = SessionStore::new();
        let id = store.ensure(&HeaderMap::new()).await;
        assert!(store.valid_token(&id).await.is_none());

        store.update(&id, |s| s.token = Some(fresh_token())).await;
        assert_eq!(store.valid_token(&id).await.unwrap().access_token, "BQC");

        // expired without refresh token
        store
            .update(&id, |s| {
                if let Some(token) = s.token.as_mut() {
                    token.obtained_at -= 7200;
                }
            })
            .await;
        assert!(store.valid_token(&id).await.is_none());
        assert!(store.get(&id).await.unwrap().token.is_none());

        store.remove(&id).await;
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_anonymous_logins_stay_bounded() {
        let store = SessionStore::with_limit(100);
        for _ in 0..10_000 {
            let id = store.ensure(&HeaderMap::new()).await;
            store
                .update(&id, |s| s.auth_state = Some(utils::generate_state()))
                .await;
        }

        assert_eq!(store.sessions.lock().await.len(), 100);
    }

    #[tokio::test]
    async fn test_eviction_keeps_authenticated_sessions() {
        let store = SessionStore::with_limit(2);
        let signed_in = store.ensure(&HeaderMap::new()).await;
        store
            .update(&signed_in, |s| s.token = Some(fresh_token()))
            .await;

        let pending = store.ensure(&HeaderMap::new()).await;
        let newest = store.ensure(&HeaderMap::new()).await;

        assert!(store.get(&signed_in).await.is_some());
        assert!(store.get(&pending).await.is_none());
        assert!(store.get(&newest).await.is_some());
    }

    #[tokio::test]
    async fn test_stale_sessions_are_pruned() {
        let store = SessionStore::new();
        let pending = store.ensure(&HeaderMap::new()).await;
        let signed_in = store.ensure(&HeaderMap::new()).await;
        store
            .update(&signed_in, |s| s.token = Some(fresh_token()))
            .await;

        let mut sessions = store.sessions.lock().await;
        prune_stale(&mut sessions, Instant::now());
        assert_eq!(sessions.len(), 2);

        prune_stale(&mut sessions, Instant::now() + LOGIN_TTL + Duration::from_secs(1));
        assert!(!sessions.contains_key(&pending));
        assert!(sessions.contains_key(&signed_in));

        prune_stale(&mut sessions, Instant::now() + IDLE_TTL + Duration::from_secs(1));
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_expired_token_without_refresh_is_stale() {
        let mut token = fresh_token();
        token.obtained_at -= 7200;
        let session = Session {
            token: Some(token.clone()),
            ..Session::default()
        };
        assert!(session.is_stale(Instant::now()));

        token.refresh_token = Some("AQD".to_string());
        let session = Session {
            token: Some(token),
            ..Session::default()
        };
        assert!(!session.is_stale(Instant::now()));
    }

    #[tokio::test]
    async fn test_update_ignores_unknown_sessions() {
        let store = SessionStore::new();
        store
            .update("forged", |s| s.token = Some(fresh_token()))
            .await;
        assert!(store.get("forged").await.is_none());
    }
}
