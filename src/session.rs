use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::http::{header, HeaderMap, HeaderValue};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{HubError, HubResult},
    portals::{Credentials, PortalCookies},
};

pub const SESSION_COOKIE: &str = "sessionid";

/// Idle time after which a session is forgotten
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// What the hub remembers about a logged in client
#[derive(Clone, Debug)]
pub struct StudentSession {
    pub credentials: Credentials,
    pub blackboard: Option<PortalCookies>,
    pub myudc: Option<PortalCookies>,
}

impl StudentSession {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            blackboard: None,
            myudc: None,
        }
    }
}

struct Entry {
    session: StudentSession,
    last_seen: Instant,
}

/// In-memory sessions, dropped after `ttl` without use or when the process exits
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    fn is_stale(&self, entry: &Entry) -> bool {
        entry.last_seen.elapsed() >= self.ttl
    }

    /// Stores `session` under a fresh id, dropping stale sessions on the way
    pub async fn save(&self, session: StudentSession) -> String {
        let id = Uuid::new_v4().simple().to_string();
        info!("Saving session for {}", session.credentials.sid);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_stale(entry));
        if sessions.len() < before {
            debug!("Dropped {} expired sessions", before - sessions.len());
        }

        sessions.insert(
            id.clone(),
            Entry {
                session,
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// Live session under `id`; using it resets its idle timer
    pub async fn get(&self, id: &str) -> Option<StudentSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;

        if self.is_stale(entry) {
            sessions.remove(id);
            return None;
        }

        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn set_blackboard(&self, id: &str, cookies: PortalCookies) {
        if let Some(entry) = self.sessions.write().await.get_mut(id) {
            entry.session.blackboard = Some(cookies);
        }
    }

    pub async fn set_myudc(&self, id: &str, cookies: PortalCookies) {
        if let Some(entry) = self.sessions.write().await.get_mut(id) {
            entry.session.myudc = Some(cookies);
        }
    }

    /// Session id named by the request's cookie, if it is a live session
    pub async fn current_id(&self, headers: &HeaderMap) -> Option<String> {
        let id = session_id(headers)?;
        self.get(&id).await.map(|_| id)
    }

    /// The request's session, or `NotLoggedIn`
    pub async fn require(&self, headers: &HeaderMap) -> HubResult<(String, StudentSession)> {
        let id = session_id(headers).ok_or(HubError::NotLoggedIn)?;
        let session = self.get(&id).await.ok_or(HubError::NotLoggedIn)?;
        Ok((id, session))
    }
}

/// Reads the session id out of the `Cookie` header
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(id: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"))
        .unwrap_or_else(|_| HeaderValue::from_static("sessionid=; Path=/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn session_id_among_other_cookies() {
        let headers = headers_with_cookie("csrftoken=x; sessionid=abc; theme=dark");
        assert_eq!(session_id(&headers).as_deref(), Some("abc"));
        assert_eq!(session_id(&headers_with_cookie("sessionid=")), None);
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn require_needs_a_live_session() {
        let store = SessionStore::new();
        let headers = headers_with_cookie("sessionid=unknown");
        assert!(matches!(store.require(&headers).await, Err(HubError::NotLoggedIn)));

        let id = store.save(StudentSession::new(Credentials::new("u1", "pin"))).await;
        let headers = headers_with_cookie(&format!("sessionid={id}"));
        let (found, session) = store.require(&headers).await.unwrap();
        assert_eq!(found, id);
        assert_eq!(session.credentials.sid, "u1");
        assert_eq!(store.current_id(&headers).await, Some(id));
    }

    #[tokio::test]
    async fn myudc_cookies_are_remembered() {
        let store = SessionStore::new();
        let id = store.save(StudentSession::new(Credentials::new("u1", "pin"))).await;
        let cookies = PortalCookies(vec![("SESSID".to_string(), "42".to_string())]);

        store.set_myudc(&id, cookies.clone()).await;
        assert_eq!(store.get(&id).await.unwrap().myudc, Some(cookies));
    }

    #[tokio::test]
    async fn every_save_gets_a_new_id() {
        let store = SessionStore::new();
        let first = store.save(StudentSession::new(Credentials::new("u1", "a"))).await;
        let second = store.save(StudentSession::new(Credentials::new("u1", "a"))).await;
        assert_ne!(first, second);

        assert!(store.remove(&first).await);
        assert!(!store.remove(&first).await);
        assert!(store.get(&first).await.is_none());
        assert!(store.get(&second).await.is_some());
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = SessionStore::with_ttl(Duration::ZERO);
        let id = store.save(StudentSession::new(Credentials::new("u1", "pin"))).await;

        assert!(store.get(&id).await.is_none());
        assert_eq!(store.len().await, 0);

        let headers = headers_with_cookie(&format!("sessionid={id}"));
        assert!(matches!(store.require(&headers).await, Err(HubError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn saving_sweeps_expired_sessions() {
        let store = SessionStore::with_ttl(Duration::ZERO);
        store.save(StudentSession::new(Credentials::new("u1", "pin"))).await;
        store.save(StudentSession::new(Credentials::new("u2", "pin"))).await;

        assert_eq!(store.len().await, 1);
    }
}
