//! Client for the service's JSON metadata API.
//!
//! Two requests are supported: a chapter record (`chapter/{id}`), which
//! carries everything needed to fetch the chapter's pages, and a title record
//! (`manga/{id}?include=chapters`), which lists the title's chapters in a
//! single response.

mod error;
mod types;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

pub use error::ApiError;
pub use types::{ChapterRecord, ChapterSummary, TitleRecord};

use crate::download::{DownloadError, HttpClient};
use types::{ChapterDto, EXTERNAL_STATUS, Envelope, TitleDto};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://mangadex.org/api/v2/";

/// Metadata client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base: Url,
}

impl ApiClient {
    /// Creates a client for `base_url`. A trailing slash is added if missing
    /// so relative paths join below it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn new(http: HttpClient, base_url: &str) -> Result<Self, ApiError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized).map_err(|_| ApiError::InvalidUrl {
            url: base_url.to_string(),
        })?;
        Ok(Self { http, base })
    }

    /// Underlying HTTP client, shared with page fetches.
    #[must_use]
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Fetches a chapter record.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::External`] for chapters hosted elsewhere, the
    /// status-derived variants for non-200 responses, and transport or
    /// decode errors otherwise.
    #[instrument(skip(self))]
    pub async fn fetch_chapter(&self, chapter_id: u64) -> Result<ChapterRecord, ApiError> {
        let url = self.endpoint(&format!("chapter/{chapter_id}"))?;
        let dto: ChapterDto = self.get_json("chapter", chapter_id, &url).await?;
        if dto.status.eq_ignore_ascii_case(EXTERNAL_STATUS) {
            warn!(chapter_id, "chapter is hosted outside the service");
            return Err(ApiError::External { id: chapter_id });
        }
        debug!(chapter_id, pages = dto.pages.len(), "chapter record received");
        Ok(dto.into())
    }

    /// Fetches a title record with its chapter list.
    ///
    /// # Errors
    ///
    /// Returns the status-derived variants for non-200 responses, and
    /// transport or decode errors otherwise.
    #[instrument(skip(self))]
    pub async fn fetch_title(&self, title_id: u64) -> Result<TitleRecord, ApiError> {
        let mut url = self.endpoint(&format!("manga/{title_id}"))?;
        url.query_pairs_mut().append_pair("include", "chapters");
        let dto: TitleDto = self.get_json("title", title_id, &url).await?;
        debug!(title_id, chapters = dto.chapters.len(), "title record received");
        Ok(dto.into())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|_| ApiError::InvalidUrl {
            url: format!("{}{path}", self.base),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        id: u64,
        url: &Url,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .get(url.as_str())
            .await
            .map_err(|e| ApiError::transport(url.as_str(), e))?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(ApiError::from_status(kind, id, url.as_str(), status));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(url.as_str(), DownloadError::network(url.as_str(), e)))?;
        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::decode(url.as_str(), e))?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(HttpClient::new(), &format!("{}/api/v2", server.uri())).unwrap()
    }

    fn chapter_body(status: &str) -> serde_json::Value {
        serde_json::json!({
            "code": 200,
            "status": "OK",
            "data": {
                "id": 1001,
                "hash": "abc123",
                "mangaId": 47,
                "mangaTitle": "Title",
                "volume": "3",
                "chapter": "12.5",
                "title": "",
                "language": "gb",
                "groups": [{"id": 9, "name": "Scan Team"}],
                "pages": ["x1.png"],
                "server": "https://s2.example.org/data/",
                "status": status
            }
        })
    }

    #[test]
    fn test_new_rejects_relative_url() {
        let err = ApiClient::new(HttpClient::new(), "not/absolute").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_fetch_chapter_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/chapter/1001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chapter_body("OK")))
            .mount(&server)
            .await;

        let record = client(&server).fetch_chapter(1001).await.unwrap();
        assert_eq!(record.metadata.chapter, "12.5");
        assert_eq!(record.metadata.groups, vec!["Scan Team"]);
        assert_eq!(record.manga_title, "Title");
    }

    #[tokio::test]
    async fn test_fetch_chapter_external() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/chapter/1001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chapter_body("external")))
            .mount(&server)
            .await;

        let err = client(&server).fetch_chapter(1001).await.unwrap_err();
        assert!(matches!(err, ApiError::External { id: 1001 }));
    }

    #[tokio::test]
    async fn test_fetch_chapter_status_mapping() {
        let server = MockServer::start().await;
        for (id, status) in [(1u64, 300u16), (2, 451), (3, 500)] {
            Mock::given(method("GET"))
                .and(path(format!("/api/v2/chapter/{id}")))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }
        let api = client(&server);

        assert!(matches!(
            api.fetch_chapter(1).await.unwrap_err(),
            ApiError::Unavailable { status: 300, .. }
        ));
        assert!(matches!(
            api.fetch_chapter(2).await.unwrap_err(),
            ApiError::Restricted { status: 451, .. }
        ));
        assert!(matches!(
            api.fetch_chapter(3).await.unwrap_err(),
            ApiError::Status { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_chapter_malformed_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_chapter(1).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_title_requests_chapters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/manga/47"))
            .and(query_param("include", "chapters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "data": {
                    "manga": {"id": 47, "title": "Title", "isHentai": true},
                    "chapters": [
                        {"id": 1, "volume": "1", "chapter": "1", "title": "", "language": "gb", "groups": [9]}
                    ],
                    "groups": [{"id": 9, "name": "Scan Team"}]
                }
            })))
            .mount(&server)
            .await;

        let record = client(&server).fetch_title(47).await.unwrap();
        assert!(record.is_hentai);
        assert_eq!(record.chapters.len(), 1);
        assert_eq!(record.chapters[0].groups, vec!["Scan Team"]);
    }
}
