pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod favorites;
pub mod http;
pub mod media;
pub mod normalize;
pub mod providers;
pub mod search;
pub mod storage;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::api::{FavoriteRecord, TokenPair};
    pub use crate::auth::{AuthManager, User};
    pub use crate::config::MedleyConfig;
    pub use crate::error::Error;
    pub use crate::favorites::{FavoritesStore, Toggle};
    pub use crate::media::{MediaItem, MediaKind, MediaUrls};
    pub use crate::search::{PageOutcome, SearchEngine, SearchFilters, SessionKey};
    pub use crate::Medley;
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::auth::{AuthManager, SessionState, User};
use crate::config::MedleyConfig;
use crate::favorites::FavoritesStore;
use crate::http::{ApiClient, HttpTransport, Transport};
use crate::media::{MediaItem, MediaKind};
use crate::normalize::normalize;
use crate::providers::{ImageProvider, VideoProvider};
use crate::search::{BackendVideoSource, ImageSearchSource, QueryDebouncer, SearchEngine};
use crate::storage::{FileStore, StateStore, KEY_TUTORIAL_SHOWN};

/// Library entry point. Owns the auth session, the favorites store, the
/// provider clients, and the search engine, wired together in that order.
pub struct Medley {
    config: MedleyConfig,
    auth: Arc<AuthManager>,
    favorites: Arc<FavoritesStore>,
    images: Arc<ImageProvider>,
    videos: Arc<VideoProvider>,
    engine: Arc<SearchEngine>,
    api: ApiClient,
    store: Arc<dyn StateStore>,
}

impl Medley {
    /// Build the service graph and bring the session up: persisted tokens
    /// are resolved into a user first, then the favorites list is loaded
    /// for that user. Neither step failing prevents startup; the client
    /// just comes up unauthenticated.
    pub async fn init(config: MedleyConfig) -> Result<Self> {
        let store: Arc<dyn StateStore> = match &config.state_file {
            Some(path) => Arc::new(FileStore::open(path.clone())?),
            None => Arc::new(FileStore::open_default()?),
        };
        Self::init_with(config, store).await
    }

    /// Same wiring with an explicit state store (in-memory sessions,
    /// tests).
    pub async fn init_with(config: MedleyConfig, store: Arc<dyn StateStore>) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
        let session = Arc::new(SessionState::new(store.clone()));
        let api = ApiClient::new(transport.clone(), &config.backend_url, session);

        let auth = Arc::new(AuthManager::new(api.clone()));
        auth.resolve().await;

        let favorites = Arc::new(FavoritesStore::new(api.clone()));
        if let Err(e) = favorites.load().await {
            tracing::warn!(error = %e, "initial favorites load failed");
        }

        let images = Arc::new(ImageProvider::new(
            transport.clone(),
            &config.image_api_url,
            config.image_access_key.clone(),
        ));
        let videos = Arc::new(VideoProvider::new(
            transport,
            &config.video_api_url,
            config.video_api_key.clone(),
        ));

        let engine = Arc::new(SearchEngine::new(
            Arc::new(ImageSearchSource::new(images.clone())),
            Arc::new(BackendVideoSource::new(api.clone())),
            config.page_size,
        ));

        Ok(Self { config, auth, favorites, images, videos, engine, api, store })
    }

    pub fn config(&self) -> &MedleyConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn images(&self) -> &ImageProvider {
        &self.images
    }

    pub fn videos(&self) -> &VideoProvider {
        &self.videos
    }

    pub fn search(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn current_user(&self) -> Option<User> {
        self.auth.current_user()
    }

    /// Debouncer wired to the configured quiet window.
    pub fn query_debouncer(
        &self,
    ) -> (QueryDebouncer, tokio::sync::mpsc::UnboundedReceiver<String>) {
        QueryDebouncer::new(Duration::from_millis(self.config.debounce_ms))
    }

    /// Trending photos from the image provider, normalized. Returns the
    /// items plus whether another page may follow.
    pub async fn trending(&self, page: u32) -> Result<(Vec<MediaItem>, bool), crate::error::Error> {
        let per_page = self.config.trending_page_size;
        let raw = self.images.trending(page, per_page).await?;
        let has_more = raw.len() as u32 == per_page;
        let items =
            raw.iter().filter_map(|v| normalize(v, Some(MediaKind::Image))).collect();
        Ok((items, has_more))
    }

    /// Trending search keywords from the backend.
    pub async fn trending_keywords(&self) -> Result<Vec<String>, crate::error::Error> {
        api::trending_keywords(&self.api).await
    }

    // --- Tutorial flag ---

    pub fn tutorial_shown(&self) -> bool {
        self.store
            .get(KEY_TUTORIAL_SHOWN)
            .ok()
            .flatten()
            .map_or(false, |v| v == "true")
    }

    pub fn mark_tutorial_shown(&self) {
        if let Err(e) = self.store.put(KEY_TUTORIAL_SHOWN, "true") {
            tracing::warn!(error = %e, "failed to persist tutorial flag");
        }
    }
}
