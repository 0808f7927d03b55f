//! Integration tests for HTML book entries: mirror, per-page conversion,
//! and concatenation, with the converter tools faked in-process.

use std::path::PathBuf;
use std::sync::Arc;

use specfetch_core::mirror::Mirror;
use specfetch_core::{
    CommandRunner, EntryStatus, FetchOptions, HttpClient, Manifest, ManifestEntry,
};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::fake_tools::FakeTools;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};
use support::{ephemeral_context, fetcher_with, persistent_context};

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return socket_skip_return();
        };
        mock_server
    }};
}

async fn mount_html(mock_server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(mock_server)
        .await;
}

/// A small book under `/gabi/latest/` with one link leaving the directory.
async fn mount_book(mock_server: &MockServer) {
    mount_html(
        mock_server,
        "/gabi/latest/contents.html",
        r#"<html><head><link rel="stylesheet" href="style.css"></head><body>
            <a href="ch1.html">Introduction</a>
            <a href="ch2.html#sections">Sections</a>
            <a href="../2003/old.html">Older edition</a>
            <a href="https://elsewhere.invalid/x.html">Elsewhere</a>
            <img src="figures/fig1.gif">
        </body></html>"#,
    )
    .await;
    mount_html(
        mock_server,
        "/gabi/latest/ch1.html",
        r#"<a href="contents.html">Contents</a> <a href="ch3.html">Next</a>"#,
    )
    .await;
    mount_html(mock_server, "/gabi/latest/ch2.html", "<p>Sections</p>").await;
    mount_html(mock_server, "/gabi/latest/ch3.html", "<p>Symbols</p>").await;

    Mock::given(method("GET"))
        .and(path("/gabi/latest/style.css"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("body {}", "text/css"))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gabi/latest/figures/fig1.gif"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"GIF89a".to_vec()))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gabi/2003/old.html"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(mock_server)
        .await;
}

fn book_manifest(mock_server: &MockServer) -> Manifest {
    Manifest::new(vec![ManifestEntry::html_book(
        "gabi",
        format!("{}/gabi/latest/contents.html", mock_server.uri()),
        "gabi.pdf",
    )])
    .unwrap()
}

fn runner(tools: &Arc<FakeTools>) -> Arc<dyn CommandRunner> {
    Arc::clone(tools) as Arc<dyn CommandRunner>
}

#[tokio::test]
async fn test_book_pages_concatenated_in_crawl_order() {
    let mock_server = require_mock_server!();
    mount_book(&mock_server).await;

    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new());
    let fetcher = fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default());
    let ctx = ephemeral_context(out.path());

    let report = fetcher.run(&book_manifest(&mock_server), &ctx).await;

    let outcome = report.get("gabi").unwrap();
    assert!(outcome.is_success(), "{outcome:?}");
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(
        std::fs::read_to_string(out.path().join("gabi.pdf")).unwrap(),
        "<page:contents.html>\n<page:ch1.html>\n<page:ch2.html>\n<page:ch3.html>"
    );
    assert_eq!(tools.subcommands("pdfunite").len(), 1);
    assert!(!out.path().join("gabi.pdf.part").exists());
}

#[tokio::test]
async fn test_book_order_follows_discovery_not_names() {
    let mock_server = require_mock_server!();
    mount_html(
        &mock_server,
        "/book/index.html",
        r#"<a href="zeta.html">Z</a><a href="alpha.html">A</a>"#,
    )
    .await;
    mount_html(&mock_server, "/book/zeta.html", "<p>first chapter</p>").await;
    mount_html(&mock_server, "/book/alpha.html", "<p>second chapter</p>").await;

    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new());
    let fetcher = fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default());
    let ctx = ephemeral_context(out.path());
    let manifest = Manifest::new(vec![ManifestEntry::html_book(
        "book",
        format!("{}/book/index.html", mock_server.uri()),
        "book.pdf",
    )])
    .unwrap();

    fetcher.run(&manifest, &ctx).await;

    let concat = tools
        .commands()
        .into_iter()
        .find(|c| c.program() == "pdfunite")
        .unwrap();
    let inputs: Vec<_> = concat.get_args()[..3]
        .iter()
        .map(|a| a.rsplit('/').next().unwrap().to_string())
        .collect();
    assert_eq!(inputs, vec!["0000-index.pdf", "0001-zeta.pdf", "0002-alpha.pdf"]);
    assert_eq!(
        std::fs::read_to_string(out.path().join("book.pdf")).unwrap(),
        "<page:index.html>\n<page:zeta.html>\n<page:alpha.html>"
    );
}

#[tokio::test]
async fn test_failed_page_is_omitted_with_warning() {
    let mock_server = require_mock_server!();
    mount_book(&mock_server).await;

    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new().failing_page("ch2.html"));
    let fetcher = fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default());
    let ctx = ephemeral_context(out.path());

    let report = fetcher.run(&book_manifest(&mock_server), &ctx).await;

    let outcome = report.get("gabi").unwrap();
    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("ch2.html"), "{:?}", outcome.warnings);
    assert_eq!(
        std::fs::read_to_string(out.path().join("gabi.pdf")).unwrap(),
        "<page:contents.html>\n<page:ch1.html>\n<page:ch3.html>"
    );
}

#[tokio::test]
async fn test_missing_resource_is_skipped_with_warning() {
    let mock_server = require_mock_server!();
    mount_html(
        &mock_server,
        "/book/index.html",
        r#"<a href="gone.html">Gone</a><a href="here.html">Here</a>"#,
    )
    .await;
    mount_html(&mock_server, "/book/here.html", "<p>here</p>").await;
    Mock::given(method("GET"))
        .and(path("/book/gone.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new());
    let fetcher = fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default());
    let ctx = ephemeral_context(out.path());
    let manifest = Manifest::new(vec![ManifestEntry::html_book(
        "book",
        format!("{}/book/index.html", mock_server.uri()),
        "book.pdf",
    )])
    .unwrap();

    let report = fetcher.run(&manifest, &ctx).await;

    let outcome = report.get("book").unwrap();
    assert!(outcome.is_success(), "{outcome:?}");
    assert!(outcome.warnings.iter().any(|w| w.contains("gone.html")));
    assert_eq!(
        std::fs::read_to_string(out.path().join("book.pdf")).unwrap(),
        "<page:index.html>\n<page:here.html>"
    );
}

#[tokio::test]
async fn test_unreachable_root_fails_entry() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/gabi/latest/contents.html"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new());
    let fetcher = fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default());
    let ctx = ephemeral_context(out.path());

    let report = fetcher.run(&book_manifest(&mock_server), &ctx).await;

    match &report.get("gabi").unwrap().status {
        EntryStatus::Failed { error } => assert!(error.contains("503"), "{error}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(tools.commands().is_empty());
    assert!(!out.path().join("gabi.pdf").exists());
}

#[tokio::test]
async fn test_every_page_failing_fails_entry() {
    let mock_server = require_mock_server!();
    mount_html(&mock_server, "/solo/index.html", "<p>only page</p>").await;

    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new().failing_page("index.html"));
    let fetcher = fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default());
    let ctx = ephemeral_context(out.path());
    let manifest = Manifest::new(vec![ManifestEntry::html_book(
        "solo",
        format!("{}/solo/index.html", mock_server.uri()),
        "solo.pdf",
    )])
    .unwrap();

    let report = fetcher.run(&manifest, &ctx).await;

    assert!(report.get("solo").unwrap().is_failure());
    assert!(tools.subcommands("pdfunite").is_empty());
}

#[tokio::test]
async fn test_page_cap_truncates_with_warning() {
    let mock_server = require_mock_server!();
    mount_book(&mock_server).await;

    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new());
    let options = FetchOptions {
        max_pages: 2,
        ..FetchOptions::default()
    };
    let fetcher = fetcher_with(runner(&tools), "http://127.0.0.1:9", options);
    let ctx = ephemeral_context(out.path());

    let report = fetcher.run(&book_manifest(&mock_server), &ctx).await;

    let outcome = report.get("gabi").unwrap();
    assert!(outcome.is_success(), "{outcome:?}");
    assert!(outcome.warnings.iter().any(|w| w.contains("stopped after 2 pages")));
    assert_eq!(
        std::fs::read_to_string(out.path().join("gabi.pdf")).unwrap(),
        "<page:contents.html>\n<page:ch1.html>"
    );
}

#[tokio::test]
async fn test_intermediate_tree_removed_from_work_dir() {
    let mock_server = require_mock_server!();
    mount_book(&mock_server).await;

    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new());
    let fetcher = fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default());
    let ctx = persistent_context(out.path(), work.path());

    let report = fetcher.run(&book_manifest(&mock_server), &ctx).await;

    assert!(report.get("gabi").unwrap().is_success());
    assert!(!work.path().join("gabi").join("tree").exists());
    assert!(!work.path().join("gabi").join("pdf").exists());
}

#[tokio::test]
async fn test_unsaveable_resource_is_skipped_with_warning() {
    let mock_server = require_mock_server!();
    mount_html(
        &mock_server,
        "/book/index.html",
        r#"<a href="sub">Part</a><a href="sub/ch.html">Chapter</a><a href="ok.html">Ok</a>"#,
    )
    .await;
    mount_html(&mock_server, "/book/sub", "<p>part</p>").await;
    mount_html(&mock_server, "/book/sub/ch.html", "<p>chapter</p>").await;
    mount_html(&mock_server, "/book/ok.html", "<p>ok</p>").await;

    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new());
    let fetcher = fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default());
    let ctx = ephemeral_context(out.path());
    let manifest = Manifest::new(vec![ManifestEntry::html_book(
        "book",
        format!("{}/book/index.html", mock_server.uri()),
        "book.pdf",
    )])
    .unwrap();

    let report = fetcher.run(&manifest, &ctx).await;

    let outcome = report.get("book").unwrap();
    assert!(outcome.is_success(), "{outcome:?}");
    assert!(
        outcome.warnings.iter().any(|w| w.contains("sub/ch.html")),
        "{:?}",
        outcome.warnings
    );
    assert_eq!(
        std::fs::read_to_string(out.path().join("book.pdf")).unwrap(),
        "<page:index.html>\n<page:sub>\n<page:ok.html>"
    );
}

#[tokio::test]
async fn test_redirected_directory_resolves_links_from_final_url() {
    let mock_server = require_mock_server!();
    mount_html(&mock_server, "/book/index.html", r#"<a href="part1">Part one</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/book/part1"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/book/part1/"))
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/book/part1/", r#"<a href="ch.html">Chapter</a>"#).await;
    mount_html(&mock_server, "/book/part1/ch.html", "<p>chapter</p>").await;
    Mock::given(method("GET"))
        .and(path("/book/ch.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&mock_server)
        .await;

    let tree = TempDir::new().unwrap();
    let http = HttpClient::new();
    let root = Url::parse(&format!("{}/book/index.html", mock_server.uri())).unwrap();

    let report = Mirror::new(&http).mirror(&root, tree.path()).await.unwrap();

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    let paths: Vec<_> = report
        .pages
        .iter()
        .map(|p| p.path.strip_prefix(tree.path()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        paths,
        vec![
            PathBuf::from("index.html"),
            PathBuf::from("part1/index.html"),
            PathBuf::from("part1/ch.html"),
        ]
    );
    assert_eq!(report.pages[1].url.path(), "/book/part1/");
}
