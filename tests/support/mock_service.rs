//! Mock metadata API and image server for pipeline tests.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mdownloader_core::{
    ApiClient, ChapterMetadata, CompareMode, DownloadOptions, HttpClient, RetryPolicy,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use zip::ZipArchive;

/// One chapter served by the mock service.
#[derive(Debug, Clone)]
pub struct ChapterFixture {
    pub id: u64,
    pub volume: &'static str,
    pub chapter: &'static str,
    pub language: &'static str,
    pub hash: String,
    pub pages: Vec<&'static str>,
}

impl ChapterFixture {
    pub fn new(id: u64, volume: &'static str, chapter: &'static str, pages: &[&'static str]) -> Self {
        Self {
            id,
            volume,
            chapter,
            language: "gb",
            hash: format!("hash{id}"),
            pages: pages.to_vec(),
        }
    }

    pub fn in_language(mut self, language: &'static str) -> Self {
        self.language = language;
        self
    }

    /// Page body served for `page`.
    pub fn body(&self, page: &str) -> Vec<u8> {
        format!("{}/{page}", self.hash).into_bytes()
    }

    /// Chapter metadata pointing at `server`'s image paths.
    pub fn metadata(&self, server: &MockServer) -> ChapterMetadata {
        ChapterMetadata {
            id: self.id,
            manga_id: 47,
            volume: self.volume.to_string(),
            chapter: self.chapter.to_string(),
            title: String::new(),
            language: self.language.to_string(),
            groups: vec!["Scan Team".to_string()],
            pages: self.pages.iter().map(|p| (*p).to_string()).collect(),
            hash: self.hash.clone(),
            server: format!("{}/data/", server.uri()),
        }
    }

    fn page_path(&self, page: &str) -> String {
        format!("/data/{}/{page}", self.hash)
    }
}

/// Mounts the title record for `title_id`.
pub async fn mount_title(
    server: &MockServer,
    title_id: u64,
    title: &str,
    chapters: &[ChapterFixture],
) {
    let listing: Vec<_> = chapters
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "volume": c.volume,
                "chapter": c.chapter,
                "title": "",
                "language": c.language,
                "groups": [9]
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/manga/{title_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 200,
            "status": "OK",
            "data": {
                "manga": {"id": title_id, "title": title, "isHentai": false},
                "chapters": listing,
                "groups": [{"id": 9, "name": "Scan Team"}]
            }
        })))
        .mount(server)
        .await;
}

/// Mounts the chapter record of `fixture`, expected to be requested
/// `expected` times.
pub async fn mount_chapter(server: &MockServer, fixture: &ChapterFixture, title: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/chapter/{}", fixture.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 200,
            "status": "OK",
            "data": {
                "id": fixture.id,
                "hash": fixture.hash,
                "mangaId": 47,
                "mangaTitle": title,
                "volume": fixture.volume,
                "chapter": fixture.chapter,
                "title": "",
                "language": fixture.language,
                "groups": [{"id": 9, "name": "Scan Team"}],
                "pages": fixture.pages,
                "server": format!("{}/data/", server.uri()),
                "status": "OK"
            }
        })))
        .expect(expected)
        .mount(server)
        .await;
}

/// Serves every page of `fixture`.
pub async fn mount_pages(server: &MockServer, fixture: &ChapterFixture) {
    for page in &fixture.pages {
        Mock::given(method("GET"))
            .and(path(fixture.page_path(page)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(fixture.body(page)))
            .mount(server)
            .await;
    }
}

/// Serves one page with a custom responder.
pub async fn mount_page_with<R: Respond + 'static>(
    server: &MockServer,
    fixture: &ChapterFixture,
    page: &str,
    responder: R,
) {
    Mock::given(method("GET"))
        .and(path(fixture.page_path(page)))
        .respond_with(responder)
        .mount(server)
        .await;
}

/// Responder that fails the first `fail_count` requests with 503, then
/// returns 200 with `body`.
pub struct FlakyResponder {
    pub requests: Arc<AtomicUsize>,
    pub fail_count: usize,
    pub body: Vec<u8>,
}

impl FlakyResponder {
    pub fn new(fail_count: usize, body: Vec<u8>) -> (Self, Arc<AtomicUsize>) {
        let requests = Arc::new(AtomicUsize::new(0));
        let responder = Self {
            requests: Arc::clone(&requests),
            fail_count,
            body,
        };
        (responder, requests)
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.requests.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(503)
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.body.clone())
        }
    }
}

pub fn api_client(server: &MockServer) -> ApiClient {
    ApiClient::new(HttpClient::new(), &format!("{}/api/v2", server.uri()))
        .expect("mock API URL is valid")
}

/// Options rooted at `dir` with no pauses between units.
pub fn options(dir: &Path, mode: CompareMode) -> DownloadOptions {
    DownloadOptions {
        compare_mode: mode,
        output_dir: dir.to_path_buf(),
        chapter_delay: Duration::ZERO,
        title_delay: Duration::ZERO,
        ..DownloadOptions::default()
    }
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(5))
}

pub fn archive_entries(path: &Path) -> BTreeSet<String> {
    let archive = ZipArchive::new(File::open(path).expect("open archive")).expect("read archive");
    archive.file_names().map(str::to_string).collect()
}

/// Files in `dir` with extension `ext`, sorted.
pub fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    files.sort();
    files
}
