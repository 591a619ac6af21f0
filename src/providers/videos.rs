use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::http::Transport;

use super::{build_url, get_json};

/// Video provider client. The key goes raw into the `Authorization`
/// header; there are no filter parameters on video search.
pub struct VideoProvider {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
}

impl VideoProvider {
    pub fn new(transport: Arc<dyn Transport>, base_url: &str, api_key: Option<String>) -> Self {
        Self { transport, base_url: base_url.to_string(), api_key }
    }

    fn headers(&self) -> Vec<(String, String)> {
        match &self.api_key {
            Some(key) => vec![("Authorization".to_string(), key.clone())],
            None => Vec::new(),
        }
    }

    /// `GET /search`: returns the raw `videos` entries.
    pub async fn search(&self, query: &str, page: u32, per_page: u32) -> Result<Vec<Value>> {
        let params = [
            ("query", query.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        let url = build_url(&self.base_url, "/search", &params)?;
        let body = get_json(&self.transport, url, self.headers()).await?;
        Ok(body.get("videos").and_then(Value::as_array).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeTransport;
    use serde_json::json;

    #[tokio::test]
    async fn search_parses_videos_and_sends_the_raw_key() {
        let transport = FakeTransport::scripted(vec![FakeTransport::ok(
            json!({ "videos": [{ "id": 1 }, { "id": 2 }, { "id": 3 }] }),
        )]);
        let provider =
            VideoProvider::new(transport.clone(), "https://videos.example", Some("VKEY".into()));

        let results = provider.search("surf", 1, 12).await.unwrap();
        assert_eq!(results.len(), 3);

        let seen = transport.seen();
        assert_eq!(seen[0].headers[0].1, "VKEY");
        assert!(seen[0].url.query().unwrap().contains("query=surf"));
    }
}
