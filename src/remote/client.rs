//! Remote highlight peer
//!
//! The peer keeps the canonical highlight list per page:
//!
//! | Method | Path                          | Body          | Response        |
//! |--------|-------------------------------|---------------|-----------------|
//! | GET    | `/highlights/{page}`          |               | `[Highlight]`   |
//! | PUT    | `/highlights/{page}`          | `[Highlight]` | `[Highlight]`   |
//! | PUT    | `/highlights/{id}/blacklist`  |               |                 |
//! | PUT    | `/highlights/{id}/upvote`     |               |                 |

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::highlights::Highlight;

/// Transport failures talking to the peer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Peer returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Operations the engine needs from the peer
#[async_trait]
pub trait HighlightsApi: Send + Sync {
    /// Canonical highlights for a page
    async fn fetch(&self, page: u32) -> Result<Vec<Highlight>, TransportError>;

    /// Submit new highlights; returns the page's canonical list afterwards
    async fn upsert(&self, page: u32, batch: &[Highlight]) -> Result<Vec<Highlight>, TransportError>;

    /// Record that the user suppressed a highlight
    async fn blacklist(&self, id: i64) -> Result<(), TransportError>;

    /// Record that the user upvoted a highlight
    async fn upvote(&self, id: i64) -> Result<(), TransportError>;
}

/// HTTP client for the peer
#[derive(Debug, Clone)]
pub struct HttpHighlightsApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpHighlightsApi {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/highlights/{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HighlightsApi for HttpHighlightsApi {
    async fn fetch(&self, page: u32) -> Result<Vec<Highlight>, TransportError> {
        let response = Self::send(self.request(reqwest::Method::GET, &page.to_string())).await?;
        Ok(response.json().await?)
    }

    async fn upsert(&self, page: u32, batch: &[Highlight]) -> Result<Vec<Highlight>, TransportError> {
        let builder = self.request(reqwest::Method::PUT, &page.to_string()).json(batch);
        let response = Self::send(builder).await?;
        Ok(response.json().await?)
    }

    async fn blacklist(&self, id: i64) -> Result<(), TransportError> {
        Self::send(self.request(reqwest::Method::PUT, &format!("{}/blacklist", id))).await?;
        Ok(())
    }

    async fn upvote(&self, id: i64) -> Result<(), TransportError> {
        Self::send(self.request(reqwest::Method::PUT, &format!("{}/upvote", id))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use crate::routes;
    use crate::state::AppState;

    async fn spawn_peer(api_key: Option<&str>) -> String {
        let mut config = Config::default();
        config.server.api_key = api_key.map(str::to_string);
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        let app = routes::app(AppState::new(config, pool));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_round_trip_against_peer() {
        let base = spawn_peer(None).await;
        let api = HttpHighlightsApi::new(&base, None).unwrap();

        assert!(api.fetch(42).await.unwrap().is_empty());

        let batch = vec![
            Highlight::new("BODY/P[1]", 4, 7, "cat"),
            Highlight::new("BODY/P[2]", 0, 3, "dog"),
        ];
        let canonical = api.upsert(42, &batch).await.unwrap();
        assert_eq!(canonical.len(), 2);
        assert!(canonical.iter().all(|h| h.id.is_some()));

        let fetched = api.fetch(42).await.unwrap();
        assert_eq!(fetched, canonical);

        let id = canonical[0].id.unwrap();
        api.upvote(id).await.unwrap();
        api.blacklist(id).await.unwrap();
        assert!(matches!(
            api.upvote(9999).await,
            Err(TransportError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let base = spawn_peer(Some("secret")).await;

        let anonymous = HttpHighlightsApi::new(&base, None).unwrap();
        assert!(matches!(
            anonymous.fetch(1).await,
            Err(TransportError::Status { status: 401, .. })
        ));

        let authorized = HttpHighlightsApi::new(&format!("{}/", base), Some("secret".into())).unwrap();
        assert!(authorized.fetch(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let api = HttpHighlightsApi::new("http://127.0.0.1:1", None).unwrap();
        assert!(matches!(api.fetch(1).await, Err(TransportError::Request(_))));
    }
}
