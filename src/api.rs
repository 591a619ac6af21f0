//! Typed surface over the backend REST contract. One free function per
//! route, all flowing through [`ApiClient`] and therefore through the
//! refresh-retry pipeline.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::User;
use crate::error::{Error, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::media::{MediaItem, MediaPayload};
use crate::normalize::normalize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// A persisted favorite: the server-assigned relation id, the media id it
/// references, and the denormalized media snapshot taken at favorite time.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteRecord {
    pub id: String,
    pub media_id: String,
    pub media: MediaItem,
}

#[derive(Debug, Deserialize)]
struct WireFavorite {
    #[serde(rename = "_id", alias = "favoriteId")]
    id: String,
    #[serde(rename = "imageId")]
    media_id: String,
    #[serde(default)]
    media: Value,
}

impl WireFavorite {
    /// Interpret the stored snapshot; records that cannot render are
    /// dropped by the caller.
    fn into_record(self) -> Option<FavoriteRecord> {
        let mut media = normalize(&self.media, None)?;
        // membership is keyed on the relation's media id, not the snapshot's
        media.id = self.media_id.clone();
        Some(FavoriteRecord { id: self.id, media_id: self.media_id, media })
    }
}

#[derive(Debug, Deserialize)]
struct FavoritesEnvelope {
    #[serde(default)]
    favorites: Vec<WireFavorite>,
}

// --- Favorites ---

pub async fn fetch_favorites(api: &ApiClient) -> Result<Vec<FavoriteRecord>> {
    let resp = api.send(ApiRequest::get("/favorites")).await?;
    let envelope: FavoritesEnvelope = resp.json()?;
    let mut records = Vec::with_capacity(envelope.favorites.len());
    for wire in envelope.favorites {
        let id = wire.id.clone();
        match wire.into_record() {
            Some(rec) => records.push(rec),
            None => tracing::warn!(favorite_id = %id, "dropping favorite with unusable media snapshot"),
        }
    }
    Ok(records)
}

pub async fn add_favorite(api: &ApiClient, media: &MediaItem) -> Result<FavoriteRecord> {
    // Full snapshot, type-specific URL slots included; the snapshot's own
    // id travels as `imageId`.
    let mut payload = MediaPayload::from(media.clone());
    payload.id = None;
    let body = json!({ "imageId": media.id, "media": payload });

    let resp = api.send(ApiRequest::post("/favorites").json(body)).await?;
    let wire: WireFavorite = resp.json()?;
    wire.into_record()
        .ok_or_else(|| Error::InvalidMedia("created favorite has no usable media snapshot".into()))
}

pub async fn remove_favorite(api: &ApiClient, favorite_id: &str) -> Result<()> {
    api.send(ApiRequest::delete(&format!("/favorites/{favorite_id}"))).await?;
    Ok(())
}

// --- Auth ---

pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<TokenPair> {
    let body = json!({ "email": email, "password": password });
    let resp = api.send(ApiRequest::post("/auth/login").json(body).public()).await?;
    resp.json()
}

pub async fn register(api: &ApiClient, username: &str, email: &str, password: &str) -> Result<()> {
    let body = json!({ "username": username, "email": email, "password": password });
    api.send(ApiRequest::post("/auth/register").json(body).public()).await?;
    Ok(())
}

pub async fn forgot_password(api: &ApiClient, email: &str) -> Result<String> {
    let resp = api
        .send(ApiRequest::post("/auth/forgot-password").json(json!({ "email": email })).public())
        .await?;
    Ok(resp
        .body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("If this email is registered, you will receive reset instructions.")
        .to_string())
}

pub async fn reset_password(api: &ApiClient, token: &str, password: &str) -> Result<()> {
    let body = json!({ "token": token, "password": password });
    api.send(ApiRequest::post("/auth/reset-password").json(body).public()).await?;
    Ok(())
}

pub async fn verify_email(api: &ApiClient, token: &str) -> Result<()> {
    api.send(ApiRequest::get("/auth/verify-email").query("token", token).public()).await?;
    Ok(())
}

// --- Users ---

pub async fn me(api: &ApiClient) -> Result<User> {
    let resp = api.send(ApiRequest::get("/users/me")).await?;
    resp.json()
}

pub async fn update_password(api: &ApiClient, current: &str, new: &str) -> Result<()> {
    let body = json!({ "currentPassword": current, "newPassword": new });
    api.send(ApiRequest::put("/users/update-password").json(body)).await?;
    Ok(())
}

// --- Discovery ---

pub async fn trending_keywords(api: &ApiClient) -> Result<Vec<String>> {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(default)]
        keywords: Vec<String>,
    }
    let resp = api.send(ApiRequest::get("/trending-keywords")).await?;
    let env: Envelope = resp.json()?;
    Ok(env.keywords)
}

/// Video search via the backend proxy to the video provider.
pub async fn search_videos(
    api: &ApiClient,
    query: &str,
    page: u32,
    per_page: u32,
) -> Result<Vec<Value>> {
    let resp = api
        .send(
            ApiRequest::get("/pexels/videos/search")
                .query("query", query)
                .query("page", page)
                .query("per_page", per_page),
        )
        .await?;
    Ok(resp
        .body
        .get("videos")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}
