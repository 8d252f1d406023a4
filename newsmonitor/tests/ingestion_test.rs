use chrono::{Duration as ChronoDuration, Utc};
use common::FeedSource;
use newsmonitor::ingestion::{FeedFetcher, HttpFeedFetcher};
use newsmonitor::output::ConsoleSink;
use newsmonitor::scraping::{Enricher, ReadabilityExtractor};
use newsmonitor::{FeedProcessor, MonitorError, RunContext, Runner, SeenStore};
use std::sync::Arc;
use std::time::Duration;

fn rss(items: &[(&str, &str, String)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, link, date)| {
            format!(
                "<item><title>{}</title><link>{}</link><pubDate>{}</pubDate></item>",
                title, link, date
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Mock</title><link>https://mock.example/</link><description>mock</description>{}</channel></rss>"#,
        body
    )
}

fn fetcher() -> HttpFeedFetcher {
    HttpFeedFetcher::new(5, "NewsMonitor-test/0.1").unwrap()
}

#[tokio::test]
async fn fetches_and_maps_entries() {
    let mut server = mockito::Server::new_async().await;
    let xml = rss(&[
        ("One", "https://mock.example/1", "Sat, 03 May 2025 10:15:00 GMT".to_string()),
        ("Two", "https://mock.example/2", "Sat, 03 May 2025 11:15:00 GMT".to_string()),
    ]);
    let mock = server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(xml)
        .create_async()
        .await;

    let entries = fetcher().fetch(&format!("{}/feed.xml", server.url())).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].link, "https://mock.example/1");
    assert_eq!(entries[1].title.as_deref(), Some("Two"));
    assert!(entries[0].published.is_some());
    mock.assert_async().await;
}

#[tokio::test]
async fn lenient_publication_dates_are_kept() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_body(rss(&[
            ("Naive", "https://mock.example/naive", "2025-05-03 10:15:00".to_string()),
            ("French", "https://mock.example/fr", "le 3 mai 2025".to_string()),
        ]))
        .create_async()
        .await;

    let entries = fetcher().fetch(&format!("{}/feed.xml", server.url())).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].published.as_deref(), Some("2025-05-03T10:15:00+00:00"));
    assert_eq!(entries[1].published, None);
}

#[tokio::test]
async fn empty_feed_is_not_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/empty.xml")
        .with_status(200)
        .with_body(rss(&[]))
        .create_async()
        .await;

    let entries = fetcher().fetch(&format!("{}/empty.xml", server.url())).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn server_error_is_a_source_fetch_failure() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/feed.xml")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let err = fetcher().fetch(&format!("{}/feed.xml", server.url())).await.unwrap_err();
    assert!(matches!(err, MonitorError::SourceFetch { ref reason, .. } if reason.contains("503")));
    // no retries
    mock.assert_async().await;
}

#[tokio::test]
async fn malformed_xml_is_a_source_fetch_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_body("<html><body>Not a feed</body>")
        .create_async()
        .await;

    let err = fetcher().fetch(&format!("{}/feed.xml", server.url())).await.unwrap_err();
    assert!(matches!(err, MonitorError::SourceFetch { .. }));
}

#[tokio::test]
async fn full_run_over_http() {
    let mut server = mockito::Server::new_async().await;
    let recent = (Utc::now() - ChronoDuration::hours(2)).to_rfc2822();
    let stale = (Utc::now() - ChronoDuration::hours(40)).to_rfc2822();
    let fresh_link = format!("{}/articles/fresh", server.url());
    let stale_link = format!("{}/articles/stale", server.url());

    let _feed = server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_body(rss(&[
            ("Fresh", fresh_link.as_str(), recent),
            ("Stale", stale_link.as_str(), stale),
        ]))
        .expect(2)
        .create_async()
        .await;
    let article = server
        .mock("GET", "/articles/fresh")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            "<html><body><article><p>Fresh news paragraph that is long enough to be picked up as the main content of the page.</p></article></body></html>",
        )
        .expect(1)
        .create_async()
        .await;
    let never = server
        .mock("GET", "/articles/stale")
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("seen.json");
    let build = || {
        let extractor = ReadabilityExtractor::new(5, "NewsMonitor-test/0.1").unwrap();
        let processor = FeedProcessor::new(Box::new(fetcher()), Arc::new(ConsoleSink))
            .with_enricher(Some(Enricher::new(Box::new(extractor), 150, Duration::from_secs(5))));
        Runner::new(
            processor,
            vec![FeedSource::new(format!("{}/feed.xml", server.url()), "Mock")],
            Duration::ZERO,
        )
    };

    let mut ctx = RunContext::new(SeenStore::load(&state).await.unwrap(), Utc::now(), 18).unwrap();
    let stats = build().run(&mut ctx).await.unwrap();
    assert_eq!(stats.total_new, 1);
    assert!(ctx.store.contains(&fresh_link));
    assert!(!ctx.store.contains(&stale_link));

    let mut ctx = RunContext::new(SeenStore::load(&state).await.unwrap(), Utc::now(), 18).unwrap();
    let stats = build().run(&mut ctx).await.unwrap();
    assert_eq!(stats.total_new, 0);

    article.assert_async().await;
    never.assert_async().await;
}
