//! Direct clients for the third-party media providers. Each provider keeps
//! its own base URL and credential header; both share the process-wide
//! [`Transport`](crate::http::Transport).

pub mod images;
pub mod videos;

pub use images::ImageProvider;
pub use videos::VideoProvider;

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::http::{RawRequest, Transport};

/// GET a provider URL and return the parsed JSON body, mapping non-2xx
/// statuses into the shared error taxonomy.
pub(crate) async fn get_json(
    transport: &Arc<dyn Transport>,
    url: Url,
    headers: Vec<(String, String)>,
) -> Result<Value> {
    let req = RawRequest { method: reqwest::Method::GET, url, headers, body: None };
    let resp = transport.execute(req).await?;
    if !(200..300).contains(&resp.status) {
        tracing::warn!(status = resp.status, "provider request failed");
        return Err(Error::Api {
            status: resp.status,
            message: resp
                .body
                .get("errors")
                .and_then(Value::as_array)
                .and_then(|a| a.first())
                .or_else(|| resp.body.get("error"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    Ok(resp.body)
}

/// Join a path onto a provider base and attach query parameters.
pub(crate) fn build_url(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&joined)?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
}
