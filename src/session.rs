use std::fs;
use std::path::PathBuf;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{ApiError, Transport};

/// One session token persisted in a plain file, the desktop analogue of
/// the portal's single local-storage key. A missing or unreadable file
/// means "no session".
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Option<String> {
        fs::read_to_string(&self.path)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    pub fn save(&self, token: &str) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&self.path, token) {
            warn!("failed to persist session token: {e}");
        }
    }

    pub fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Posts credentials; on success caches the returned token (when the
/// server hands one out) so the next start can reauthenticate silently.
pub async fn login<T: Transport + ?Sized>(
    transport: &T,
    store: &TokenStore,
    user_name: &str,
    passwd: &str,
) -> Result<(), ApiError> {
    let payload = json!({ "userName": user_name, "passwd": passwd });
    let response = transport.send(Method::POST, "/login", Some(payload)).await?;

    if let Some(token) = response.token() {
        store.save(token);
    }

    info!(user = user_name, "logged in");
    Ok(())
}

/// Silent reauthentication with the stored token. Failure is the
/// expected path for first-time or long-gone users, so it only logs.
pub async fn auto_login<T: Transport + ?Sized>(transport: &T, store: &TokenStore) -> bool {
    let Some(token) = store.load() else {
        debug!("no session stored");
        return false;
    };

    let payload = json!({ "session": token });
    match transport.send(Method::PUT, "/login", Some(payload)).await {
        Ok(response) => {
            if let Some(refreshed) = response.token() {
                store.save(refreshed);
            }
            info!("session refreshed");
            true
        }
        Err(e) => {
            debug!("auto-login failed: {e}");
            false
        }
    }
}

/// Purely client-side: forget the cached token. The server will expire
/// its side on its own schedule.
pub fn logout(store: &TokenStore) {
    store.clear();
    info!("logged out");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{outcome, ApiResponse, Body};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
        calls: Mutex<Vec<(Method, String, Option<Value>)>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<ApiResponse, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(Method, String, Option<Value>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            method: Method,
            path: &str,
            body: Option<Value>,
        ) -> Result<ApiResponse, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push((method, path.to_string(), body));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    fn temp_store() -> (tempfile::TempDir, TokenStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("session"));
        (dir, store)
    }

    #[test]
    fn token_store_round_trip() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load(), None);

        store.save("abc123");
        assert_eq!(store.load(), Some("abc123".to_string()));

        store.clear();
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn login_posts_credentials_and_stores_the_token() {
        let (_dir, store) = temp_store();
        let transport = ScriptedTransport::new(vec![outcome(
            200,
            Body::parse(r#"{"token":"abc123"}"#),
        )]);

        login(&transport, &store, "alice", "secret").await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Method::POST);
        assert_eq!(calls[0].1, "/login");
        assert_eq!(
            calls[0].2,
            Some(json!({ "userName": "alice", "passwd": "secret" }))
        );
        assert_eq!(store.load(), Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn login_without_token_in_response_still_succeeds() {
        let (_dir, store) = temp_store();
        let transport =
            ScriptedTransport::new(vec![outcome(200, Body::Text("ok".to_string()))]);

        login(&transport, &store, "alice", "secret").await.unwrap();
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn login_failure_propagates_the_server_message() {
        let (_dir, store) = temp_store();
        let transport = ScriptedTransport::new(vec![outcome(
            400,
            Body::Text("Invalid user name or password.".to_string()),
        )]);

        let err = login(&transport, &store, "alice", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid user name or password.");
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn auto_login_without_stored_token_skips_the_network() {
        let (_dir, store) = temp_store();
        let transport = ScriptedTransport::new(vec![]);

        assert!(!auto_login(&transport, &store).await);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn auto_login_refreshes_and_stores_the_new_token() {
        let (_dir, store) = temp_store();
        store.save("old-token");
        let transport = ScriptedTransport::new(vec![outcome(
            200,
            Body::parse(r#"{"token":"new-token"}"#),
        )]);

        assert!(auto_login(&transport, &store).await);

        let calls = transport.calls();
        assert_eq!(calls[0].0, Method::PUT);
        assert_eq!(calls[0].1, "/login");
        assert_eq!(calls[0].2, Some(json!({ "session": "old-token" })));
        assert_eq!(store.load(), Some("new-token".to_string()));
    }

    #[tokio::test]
    async fn auto_login_failure_is_silent() {
        let (_dir, store) = temp_store();
        store.save("stale");
        let transport = ScriptedTransport::new(vec![outcome(
            401,
            Body::Text("Session expired.".to_string()),
        )]);

        assert!(!auto_login(&transport, &store).await);
    }
}
