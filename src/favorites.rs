//! Authoritative local view of the user's favorites.
//!
//! Mutations are confirmed remotely before local state changes; a failed
//! call leaves the list exactly as it was. Membership questions are always
//! answered from the local list; this store is the single source of truth
//! between loads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::api::{self, FavoriteRecord};
use crate::auth::SessionState;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::media::MediaItem;

/// Result of a toggle: what the remote call ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum Toggle {
    Added(FavoriteRecord),
    /// Carries the removed relation's id.
    Removed(String),
}

pub struct FavoritesStore {
    api: ApiClient,
    session: Arc<SessionState>,
    records: Mutex<Vec<FavoriteRecord>>,
    toggling: AtomicBool,
}

impl FavoritesStore {
    pub fn new(api: ApiClient) -> Self {
        let session = api.session();
        Self { api, session, records: Mutex::new(Vec::new()), toggling: AtomicBool::new(false) }
    }

    /// Fetch the complete remote list and replace local state wholesale.
    /// A no-op until a user session exists.
    pub async fn load(&self) -> Result<()> {
        if self.session.user().is_none() {
            tracing::debug!("skipping favorites load, no user session");
            return Ok(());
        }
        let list = api::fetch_favorites(&self.api).await?;
        tracing::debug!(count = list.len(), "loaded favorites");
        *self.lock_records() = list;
        Ok(())
    }

    pub fn records(&self) -> Vec<FavoriteRecord> {
        self.lock_records().clone()
    }

    pub fn favorite_ids(&self) -> Vec<String> {
        self.lock_records().iter().map(|r| r.media_id.clone()).collect()
    }

    /// Local membership check; reflects the latest completed mutation.
    pub fn is_favorited(&self, media_id: &str) -> bool {
        self.lock_records().iter().any(|r| r.media_id == media_id)
    }

    /// Create or delete the favorite for `media`, deciding by local
    /// membership. Requires a user session; only one toggle may be in
    /// flight at a time, and a second attempt is rejected, not queued.
    pub async fn toggle(&self, media: &MediaItem) -> Result<Toggle> {
        if self.session.user().is_none() {
            return Err(Error::Unauthenticated);
        }
        if self.toggling.swap(true, Ordering::SeqCst) {
            return Err(Error::ToggleInFlight);
        }
        let _guard = TogglingGuard(&self.toggling);

        let existing =
            self.lock_records().iter().find(|r| r.media_id == media.id).cloned();

        match existing {
            Some(record) => {
                api::remove_favorite(&self.api, &record.id).await?;
                self.lock_records().retain(|r| r.id != record.id);
                Ok(Toggle::Removed(record.id))
            }
            None => {
                let record = api::add_favorite(&self.api, media).await?;
                self.lock_records().push(record.clone());
                Ok(Toggle::Added(record))
            }
        }
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, Vec<FavoriteRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct TogglingGuard<'a>(&'a AtomicBool);

impl Drop for TogglingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;
    use crate::http::testing::{session_with_tokens, FakeTransport};
    use crate::http::{RawRequest, RawResponse, Transport};
    use crate::media::MediaUrls;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    fn media(id: &str) -> MediaItem {
        MediaItem {
            id: id.into(),
            alt_description: String::new(),
            author_name: "Unknown".into(),
            urls: MediaUrls::Image { small: "s.jpg".into(), regular: "r.jpg".into() },
        }
    }

    fn created(favorite_id: &str, media_id: &str) -> serde_json::Value {
        json!({
            "_id": favorite_id,
            "imageId": media_id,
            "media": {
                "type": "image",
                "urls": { "small": "s.jpg", "regular": "r.jpg" },
                "user": { "name": "Unknown" }
            }
        })
    }

    fn store_with(
        transport: Arc<FakeTransport>,
        logged_in: bool,
    ) -> (FavoritesStore, Arc<SessionState>) {
        let session = session_with_tokens(Some("T1"), Some("R1"));
        if logged_in {
            session.set_user(Some(User { username: "ada".into(), email: String::new() }));
        }
        let api = ApiClient::new(transport, "http://backend/api", session.clone());
        (FavoritesStore::new(api), session)
    }

    #[tokio::test]
    async fn toggle_without_a_session_is_rejected_untouched() {
        let transport = FakeTransport::scripted(vec![]);
        let (store, _) = store_with(transport.clone(), false);

        let err = store.toggle(&media("x42")).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
        assert!(store.records().is_empty());
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn toggling_a_new_item_appends_the_server_record() {
        let transport = FakeTransport::scripted(vec![FakeTransport::ok(created("f1", "x42"))]);
        let (store, _) = store_with(transport, true);

        let result = store.toggle(&media("x42")).await.unwrap();
        match result {
            Toggle::Added(record) => assert_eq!(record.id, "f1"),
            other => panic!("expected Added, got {other:?}"),
        }
        assert!(store.is_favorited("x42"));
    }

    #[tokio::test]
    async fn toggle_twice_returns_to_the_original_membership() {
        let transport = FakeTransport::scripted(vec![
            FakeTransport::ok(created("f1", "x42")),
            FakeTransport::ok(json!({ "message": "deleted" })),
        ]);
        let (store, _) = store_with(transport.clone(), true);

        assert!(matches!(store.toggle(&media("x42")).await.unwrap(), Toggle::Added(_)));
        assert!(store.is_favorited("x42"));

        let removed = store.toggle(&media("x42")).await.unwrap();
        assert_eq!(removed, Toggle::Removed("f1".into()));
        assert!(!store.is_favorited("x42"));

        // delete targeted the relation id, not the media id
        let seen = transport.seen();
        assert!(seen[1].url.path().ends_with("/favorites/f1"));
    }

    #[tokio::test]
    async fn a_failed_delete_leaves_the_record_in_place() {
        let transport = FakeTransport::scripted(vec![
            FakeTransport::ok(created("f1", "x42")),
            FakeTransport::status(500),
        ]);
        let (store, _) = store_with(transport, true);

        store.toggle(&media("x42")).await.unwrap();
        let err = store.toggle(&media("x42")).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
        assert!(store.is_favorited("x42"));
    }

    #[tokio::test]
    async fn a_failed_create_leaves_the_list_empty() {
        let transport = FakeTransport::scripted(vec![FakeTransport::status(500)]);
        let (store, _) = store_with(transport, true);

        assert!(store.toggle(&media("x42")).await.is_err());
        assert!(!store.is_favorited("x42"));
        assert!(store.records().is_empty());
    }

    /// Holds the single scripted response until released.
    struct GatedTransport {
        entered: Notify,
        release: Notify,
        response: RawResponse,
        requests: Mutex<usize>,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn execute(&self, _req: RawRequest) -> crate::error::Result<RawResponse> {
            *self.requests.lock().unwrap() += 1;
            self.entered.notify_one();
            self.release.notified().await;
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn a_second_toggle_while_one_is_in_flight_is_rejected() {
        let transport = Arc::new(GatedTransport {
            entered: Notify::new(),
            release: Notify::new(),
            response: FakeTransport::ok(created("f1", "x42")),
            requests: Mutex::new(0),
        });
        let session = session_with_tokens(Some("T1"), Some("R1"));
        session.set_user(Some(User { username: "ada".into(), email: String::new() }));
        let api = ApiClient::new(transport.clone(), "http://backend/api", session);
        let store = Arc::new(FavoritesStore::new(api));

        let worker = {
            let store = store.clone();
            tokio::spawn(async move { store.toggle(&media("x42")).await })
        };
        transport.entered.notified().await;

        // rapid second click: rejected outright, no duplicate create
        let err = store.toggle(&media("x42")).await.unwrap_err();
        assert!(matches!(err, Error::ToggleInFlight));

        transport.release.notify_one();
        assert!(matches!(worker.await.unwrap().unwrap(), Toggle::Added(_)));
        assert_eq!(*transport.requests.lock().unwrap(), 1);
        assert!(store.is_favorited("x42"));
    }

    #[tokio::test]
    async fn load_is_a_noop_without_a_user_and_wholesale_with_one() {
        let transport = FakeTransport::scripted(vec![FakeTransport::ok(json!({
            "favorites": [created("f1", "x1"), created("f2", "x2")]
        }))]);
        let (store, session) = store_with(transport.clone(), false);

        store.load().await.unwrap();
        assert!(transport.seen().is_empty());

        session.set_user(Some(User { username: "ada".into(), email: String::new() }));
        store.load().await.unwrap();
        assert_eq!(store.records().len(), 2);
        assert!(store.is_favorited("x1"));
        assert!(store.is_favorited("x2"));
    }
}
