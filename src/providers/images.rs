use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::http::Transport;

use super::{build_url, get_json};

/// Image provider client. Search supports orientation/color/minimum-width
/// filters; the trending feed is the provider's popular ordering.
pub struct ImageProvider {
    transport: Arc<dyn Transport>,
    base_url: String,
    access_key: Option<String>,
}

impl ImageProvider {
    pub fn new(transport: Arc<dyn Transport>, base_url: &str, access_key: Option<String>) -> Self {
        Self { transport, base_url: base_url.to_string(), access_key }
    }

    fn headers(&self) -> Vec<(String, String)> {
        match &self.access_key {
            Some(key) => vec![("Authorization".to_string(), format!("Client-ID {key}"))],
            None => Vec::new(),
        }
    }

    /// `GET /search/photos`: returns the raw `results` entries. Filter
    /// parameters are attached only when set.
    pub async fn search_photos(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
        orientation: Option<&str>,
        color: Option<&str>,
        min_width: Option<u32>,
    ) -> Result<Vec<Value>> {
        let mut params = vec![
            ("query", query.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(o) = orientation {
            params.push(("orientation", o.to_string()));
        }
        if let Some(c) = color {
            params.push(("color", c.to_string()));
        }
        if let Some(w) = min_width {
            params.push(("width", w.to_string()));
        }

        let url = build_url(&self.base_url, "/search/photos", &params)?;
        let body = get_json(&self.transport, url, self.headers()).await?;
        Ok(body.get("results").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    /// `GET /photos?order_by=popular`: the trending feed. The body is a
    /// bare array of photo payloads.
    pub async fn trending(&self, page: u32, per_page: u32) -> Result<Vec<Value>> {
        let params = [
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
            ("order_by", "popular".to_string()),
        ];
        let url = build_url(&self.base_url, "/photos", &params)?;
        let body = get_json(&self.transport, url, self.headers()).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeTransport;
    use serde_json::json;

    #[tokio::test]
    async fn search_sends_key_and_only_set_filters() {
        let transport =
            FakeTransport::scripted(vec![FakeTransport::ok(json!({ "results": [{ "id": "a" }] }))]);
        let provider = ImageProvider::new(
            transport.clone(),
            "https://images.example",
            Some("KEY".to_string()),
        );

        let results = provider
            .search_photos("mountains", 1, 12, Some("landscape"), None, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        let seen = transport.seen();
        let query = seen[0].url.query().unwrap();
        assert!(query.contains("query=mountains"));
        assert!(query.contains("orientation=landscape"));
        assert!(!query.contains("color="));
        assert!(!query.contains("width="));
        assert_eq!(seen[0].headers[0].1, "Client-ID KEY");
    }

    #[tokio::test]
    async fn trending_parses_the_bare_array() {
        let transport =
            FakeTransport::scripted(vec![FakeTransport::ok(json!([{ "id": "a" }, { "id": "b" }]))]);
        let provider = ImageProvider::new(transport.clone(), "https://images.example", None);

        let results = provider.trending(1, 15).await.unwrap();
        assert_eq!(results.len(), 2);
        let query = transport.seen()[0].url.query().unwrap().to_string();
        assert!(query.contains("order_by=popular"));
        assert!(query.contains("per_page=15"));
    }
}
