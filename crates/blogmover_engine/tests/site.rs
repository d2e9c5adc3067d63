use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use blogmover_engine::{
    migrate_site, EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, FetchSettings,
    Fetcher, JobId, LogProgressSink, MigrateConfig, PageError, ProgressSink, ReqwestFetcher,
    RunError,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct CompletionSink {
    completed: Mutex<Vec<bool>>,
}

impl ProgressSink for CompletionSink {
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::PageCompleted { result, .. } = event {
            self.completed.lock().unwrap().push(result.is_ok());
        }
    }
}

fn entry(permalink: &str) -> String {
    format!(
        r#"<div class="idno-entry"><div class="permalink"><a class="u-url" href="{permalink}">link</a></div></div>"#
    )
}

fn index_page(entries: &[String], older: Option<&str>) -> String {
    let older = older
        .map(|href| format!(r#"<div class="older"><a href="{href}">Older</a></div>"#))
        .unwrap_or_default();
    format!("<html><body>{}{older}</body></html>", entries.concat())
}

fn home_page(site: &str) -> String {
    format!(
        r#"<html><head><meta property="og:image" content="{site}/gfx/logo.png"></head><body></body></html>"#
    )
}

fn post_with_attachments(site: &str) -> String {
    format!(
        r##"<html><head><meta property="og:image" content="{site}/file/abc/thumb.jpg"></head><body>
<div class="idno-entry">
<div class="idno-body">
<h2 class="p-name"><a href="{site}/2020/moving-on">Moving on</a></h2>
<div class="e-content">
<p>See <a href="{site}/2019/older">this</a>.</p>
<p><a href="{site}/file/abc/thumb.jpg"><img src="{site}/file/abc/thumb.jpg"></a></p>
<p><a href="{site}/file/def/notes.pdf">notes</a></p>
</div>
</div>
<div class="permalink"><a class="u-url" href="{site}/2020/moving-on">permalink</a><time class="dt-published" datetime="2020-03-17T19:58:16+0000">Mar 17 2020</time></div>
<div class="annotations">
<div class="idno-annotation">
<div class="idno-annotation-image"><img src="https://pics.example/bob.png"></div>
<div class="idno-annotation-content">
<p><a href="https://bob.example/">Bob</a> liked this post</p>
<p><a href="https://bob.example/like/1">Mar 18 2020</a> <a href="#">delete</a></p>
</div>
</div>
</div>
</div>
</body></html>"##
    )
}

fn plain_post(site: &str) -> String {
    format!(
        r#"<html><head><meta property="og:image" content="{site}/gfx/logo.png"></head><body>
<div class="idno-body"><h2 class="p-name"><a href="{site}/2019/third">Third</a></h2><div class="e-content"><p>Plain.</p></div></div>
<div class="permalink"><a class="u-url" href="{site}/2019/third">permalink</a><time class="dt-published" datetime="2019-05-01T08:00:00+0200">May 01 2019</time></div>
</body></html>"#
    )
}

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

async fn mount_site() -> MockServer {
    blogmover_logging::initialize_for_tests();
    let server = MockServer::start().await;
    let site = server.uri();

    mount_html(
        &server,
        "/content/posts",
        index_page(
            &[entry(&format!("{site}/2020/moving-on")), entry(&format!("{site}/2020/broken"))],
            Some("/content/posts/2"),
        ),
    )
    .await;
    mount_html(
        &server,
        "/content/posts/2",
        index_page(&[entry(&format!("{site}/2019/third"))], Some("/content/posts")),
    )
    .await;
    mount_html(&server, "/", home_page(&site)).await;
    mount_html(&server, "/2020/moving-on", post_with_attachments(&site)).await;
    mount_html(&server, "/2019/third", plain_post(&site)).await;
    Mock::given(method("GET"))
        .and(path("/2020/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"PNG".to_vec(), "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file/def/notes.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"PDF".to_vec(), "application/pdf"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn site_is_migrated_with_failures_aggregated() {
    let server = mount_site().await;
    let output = TempDir::new().unwrap();
    let config = MigrateConfig {
        output_dir: output.path().to_path_buf(),
        website: server.uri(),
        section: "/content/posts".to_string(),
        concurrency: 2,
        ..MigrateConfig::default()
    };
    let fetcher: Arc<dyn Fetcher> =
        Arc::new(ReqwestFetcher::new(FetchSettings::default()).with_repair(server.uri()));
    let sink = Arc::new(CompletionSink::default());

    let report = migrate_site(&config, fetcher, sink.clone()).await.unwrap();

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failures.len(), 1);
    match &report.failures[0] {
        PageError::Fetch { url, source } => {
            assert_eq!(url, &format!("{}/2020/broken", server.uri()));
            assert_eq!(source.kind, FailureKind::HttpStatus(500));
        }
        other => panic!("unexpected failure: {other}"),
    }
    let mut completed = sink.completed.lock().unwrap().clone();
    completed.sort_unstable();
    assert_eq!(completed, vec![false, true, true]);

    let post_dir = output.path().join("2020").join("moving-on");
    let document = fs::read_to_string(post_dir.join("index.md")).unwrap();
    assert!(document.contains("aliases = [\"/2020/moving-on\"]\n"));
    assert!(document.contains("featured_image = \"image0\"\n"));
    assert!(document.contains("(/2019/older)"));
    assert_eq!(fs::read(post_dir.join("image0")).unwrap(), b"PNG");
    assert_eq!(fs::read(post_dir.join("2notes.pdf")).unwrap(), b"PDF");

    let feed: serde_json::Value =
        serde_json::from_slice(&fs::read(post_dir.join("webmentions.json")).unwrap()).unwrap();
    assert_eq!(feed["children"][0]["wm-property"], "like-of");
    assert_eq!(feed["children"][0]["wm-received"], "2020-03-18");

    let plain_dir = output.path().join("2019").join("third");
    let plain = fs::read_to_string(plain_dir.join("index.md")).unwrap();
    assert!(plain.contains("featured_image = \"\"\n"));
    assert!(!plain_dir.join("webmentions.json").exists());
}

#[tokio::test]
async fn unreachable_index_yields_empty_report() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let config = MigrateConfig {
        output_dir: output.path().to_path_buf(),
        website: server.uri(),
        ..MigrateConfig::default()
    };
    let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(FetchSettings::default()));

    let report = migrate_site(&config, fetcher, Arc::new(CompletionSink::default()))
        .await
        .unwrap();
    assert!(report.written.is_empty());
    assert!(report.is_clean());
}

#[tokio::test]
async fn post_directory_creation_failure_aborts_the_site_run() {
    let server = mount_site().await;
    let output = TempDir::new().unwrap();
    fs::write(output.path().join("2020"), "x").unwrap();
    let config = MigrateConfig {
        output_dir: output.path().to_path_buf(),
        website: server.uri(),
        concurrency: 1,
        ..MigrateConfig::default()
    };
    let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(FetchSettings::default()));

    let err = migrate_site(&config, fetcher, Arc::new(LogProgressSink))
        .await
        .unwrap_err();
    match err {
        RunError::OutputDir { path, .. } => {
            assert_eq!(path, output.path().join("2020").join("moving-on"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

const SITE: &str = "http://blog.example";

/// Serves a two-post site from memory and panics while fetching `/2020/a`.
struct PanickingFetcher;

fn page(url: &str, html: String) -> FetchOutput {
    FetchOutput {
        metadata: FetchMetadata {
            original_url: url.to_string(),
            requested_url: url.to_string(),
            final_url: url.to_string(),
            redirect_count: 0,
            content_type: Some("text/html; charset=utf-8".to_string()),
            byte_len: html.len() as u64,
        },
        bytes: html.into_bytes(),
    }
}

#[async_trait]
impl Fetcher for PanickingFetcher {
    async fn fetch(
        &self,
        _job_id: JobId,
        url: &str,
        _sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        match url.strip_prefix(SITE) {
            Some("/content/posts") => {
                let entries = [
                    entry(&format!("{SITE}/2020/a")),
                    entry(&format!("{SITE}/2019/third")),
                ];
                Ok(page(url, index_page(&entries, None)))
            }
            Some("/2020/a") => panic!("extractor blew up"),
            Some("/2019/third") => Ok(page(url, plain_post(SITE))),
            _ => Ok(page(url, home_page(SITE))),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Ok(url.as_bytes().to_vec())
    }
}

#[tokio::test]
async fn panicking_page_task_is_reported_as_a_failure() {
    blogmover_logging::initialize_for_tests();
    let output = TempDir::new().unwrap();
    let config = MigrateConfig {
        output_dir: output.path().to_path_buf(),
        website: SITE.to_string(),
        ..MigrateConfig::default()
    };
    let sink = Arc::new(CompletionSink::default());

    let report = migrate_site(&config, Arc::new(PanickingFetcher), sink.clone())
        .await
        .unwrap();

    assert_eq!(
        report.written.len() + report.skipped.len() + report.failures.len(),
        2
    );
    assert_eq!(report.written.len(), 1);
    assert!(!report.is_clean());
    match &report.failures[0] {
        PageError::Task { url, .. } => assert_eq!(url, &format!("{SITE}/2020/a")),
        other => panic!("unexpected failure: {other}"),
    }
    let mut completed = sink.completed.lock().unwrap().clone();
    completed.sort_unstable();
    assert_eq!(completed, vec![false, true]);
}
