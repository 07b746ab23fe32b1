//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the storefronts. The HTTP client
//! resolves `myket.ir` and `cafebazaar.ir` to the mock server, so URLs keep
//! their real hosts and store classification works unchanged.

use reqwest::Client;
use std::path::Path;
use storefront_crawler::config::{Config, HttpConfig, RetryConfig};
use storefront_crawler::crawler::{
    client_builder, discover_list_urls, run_crawl_with_context, CrawlContext, RetryPolicy,
};
use storefront_crawler::storage::{
    game_id, CounterStore, DocumentStore, FrontierStore, SqliteStorage,
};
use storefront_crawler::Store;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pinned_client(server: &MockServer) -> Client {
    client_builder(&HttpConfig::default())
        .resolve("cafebazaar.ir", *server.address())
        .resolve("myket.ir", *server.address())
        .build()
        .unwrap()
}

fn storefront_url(server: &MockServer, host: &str, path: &str) -> String {
    format!("http://{}:{}{}", host, server.address().port(), path)
}

/// Fast single-worker configuration seeded with `seeds`
fn test_config(seeds: Vec<String>) -> Config {
    let mut config = Config::default();
    config.crawler.concurrency = 1;
    config.crawler.politeness_delay_ms = 0;
    config.crawler.idle_poll_ms = 10;
    config.crawler.max_idle_polls = 2;
    config.retry = RetryConfig {
        max_attempts: 3,
        base_delay_ms: 1,
        multiplier: 2.0,
        max_delay_ms: 5,
    };
    config.seeds.urls = seeds;
    config
}

fn detail_page(name: &str, rating: f64) -> String {
    format!(
        r#"<html><head>
        <script type="application/ld+json">
          {{"@type":"MobileApplication","name":"{}",
            "applicationCategory":"GameApplication",
            "aggregateRating":{{"ratingValue":{},"ratingCount":120}}}}
        </script>
        <meta property="og:image" content="https://cdn.example/{}.png">
        </head><body><h1>{}</h1></body></html>"#,
        name, rating, name, name
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn open(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("crawl.db")).unwrap()
}

#[tokio::test]
async fn test_list_page_hint_flows_into_detail_genre() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/cat/strategy",
        r#"<html><body>
            <a href="/app/com.empire">Empire</a>
            <a href="/app/com.empire#reviews">Empire reviews</a>
           </body></html>"#
            .to_string(),
    )
    .await;
    mount_page(&server, "/app/com.empire", detail_page("Empire", 4.1)).await;

    let dir = TempDir::new().unwrap();
    let seed = storefront_url(&server, "cafebazaar.ir", "/cat/strategy");
    let ctx = CrawlContext::with_client(test_config(vec![seed]), open(&dir), pinned_client(&server));

    let summary = run_crawl_with_context(ctx.clone()).await.unwrap();
    assert_eq!(summary.seeded, 1);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.indexed, 1);

    let id = game_id(Store::Bazaar, "com.empire");
    let game = ctx.with_storage(|s| Ok(s.get_game(&id)?)).unwrap().unwrap();
    assert_eq!(game.title, "Empire");
    assert_eq!(game.genre, "strategy");
    assert_eq!(game.rating, Some(4.1));
    assert!(game.source_list_url.unwrap().ends_with("/cat/strategy"));

    let counters = ctx.with_storage(|s| Ok(s.load_counters()?)).unwrap();
    assert_eq!(counters.pages_crawled, 2);
    assert_eq!(counters.apps_indexed, 1);

    let assets = ctx
        .with_storage(|s| Ok(s.get_assets(Store::Bazaar, "com.empire")?))
        .unwrap();
    assert_eq!(assets.len(), 1);
}

#[tokio::test]
async fn test_detail_without_genre_signals_is_unknown() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/app/com.foo.bar",
        r#"<html><head><script type="application/ld+json">
            {"@type":"MobileApplication","name":"Foo",
             "aggregateRating":{"ratingValue":4.6,"ratingCount":120}}
            </script></head><body></body></html>"#
            .to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let seed = storefront_url(&server, "myket.ir", "/app/com.foo.bar");
    let ctx = CrawlContext::with_client(test_config(vec![seed]), open(&dir), pinned_client(&server));

    run_crawl_with_context(ctx.clone()).await.unwrap();

    let id = game_id(Store::Myket, "com.foo.bar");
    let game = ctx.with_storage(|s| Ok(s.get_game(&id)?)).unwrap().unwrap();
    assert_eq!(game.title, "Foo");
    assert_eq!(game.rating, Some(4.6));
    assert_eq!(game.ratings_count, Some(120));
    assert_eq!(game.genre, "unknown");
}

#[tokio::test]
async fn test_recrawl_overwrites_single_document() {
    let server = MockServer::start().await;
    mount_page(&server, "/app/com.foo", detail_page("Foo", 4.2)).await;

    let dir = TempDir::new().unwrap();
    let seed = storefront_url(&server, "myket.ir", "/app/com.foo");

    let ctx = CrawlContext::with_client(
        test_config(vec![seed.clone()]),
        open(&dir),
        pinned_client(&server),
    );
    run_crawl_with_context(ctx).await.unwrap();

    // Same as --fresh: forget the frontier, keep the documents
    {
        let mut storage = open(&dir);
        storage.reset_frontier().unwrap();
        storage.reset_counters().unwrap();
    }
    server.reset().await;
    mount_page(&server, "/app/com.foo", detail_page("Foo", 4.5)).await;

    let ctx = CrawlContext::with_client(test_config(vec![seed]), open(&dir), pinned_client(&server));
    run_crawl_with_context(ctx.clone()).await.unwrap();

    let (count, game) = ctx
        .with_storage(|s| {
            let count = s.count_games(Some(Store::Myket))?;
            let game = s.get_game(&game_id(Store::Myket, "com.foo"))?;
            Ok((count, game))
        })
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(game.unwrap().rating, Some(4.5));
}

#[tokio::test]
async fn test_unavailable_page_is_retried_then_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/com.down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seed = storefront_url(&server, "cafebazaar.ir", "/app/com.down");
    let ctx = CrawlContext::with_client(test_config(vec![seed]), open(&dir), pinned_client(&server));

    let summary = run_crawl_with_context(ctx.clone()).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.indexed, 0);

    let (games, frontier) = ctx
        .with_storage(|s| Ok((s.count_games(None)?, s.frontier_len()?)))
        .unwrap();
    assert_eq!(games, 0);
    assert_eq!(frontier, 0);
}

#[tokio::test]
async fn test_app_quota_stops_workers() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/games/action",
        r#"<a href="/app/com.one">1</a><a href="/app/com.two">2</a><a href="/app/com.three">3</a>"#
            .to_string(),
    )
    .await;
    for name in ["com.one", "com.two", "com.three"] {
        mount_page(&server, &format!("/app/{}", name), detail_page(name, 4.0)).await;
    }

    let dir = TempDir::new().unwrap();
    let seed = storefront_url(&server, "myket.ir", "/games/action");
    let mut config = test_config(vec![seed]);
    config.crawler.max_apps = 2;
    let ctx = CrawlContext::with_client(config, open(&dir), pinned_client(&server));

    let summary = run_crawl_with_context(ctx.clone()).await.unwrap();
    assert_eq!(summary.indexed, 2);

    let (games, frontier) = ctx
        .with_storage(|s| Ok((s.count_games(None)?, s.frontier_len()?)))
        .unwrap();
    assert_eq!(games, 2);
    assert_eq!(frontier, 1);
}

#[tokio::test]
async fn test_restart_resumes_existing_frontier() {
    let server = MockServer::start().await;
    mount_page(&server, "/app/com.queued", detail_page("Queued", 3.9)).await;

    let dir = TempDir::new().unwrap();
    {
        let mut storage = open(&dir);
        let item = storefront_crawler::FrontierItem::seed(storefront_url(
            &server,
            "myket.ir",
            "/app/com.queued",
        ));
        storage.enqueue(&item, false).unwrap();
    }

    // The configured seed is ignored because the frontier is not empty
    let seed = storefront_url(&server, "myket.ir", "/games/never-fetched");
    let ctx = CrawlContext::with_client(test_config(vec![seed]), open(&dir), pinned_client(&server));
    let summary = run_crawl_with_context(ctx).await.unwrap();

    assert_eq!(summary.seeded, 0);
    assert_eq!(summary.pages, 1);
    assert_eq!(summary.indexed, 1);
}

#[tokio::test]
async fn test_discovery_stays_within_budget() {
    let server = MockServer::start().await;
    let categories: String = (0..20)
        .map(|i| format!(r#"<a href="/cat/genre-{}">g{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/pages/game", categories.clone()).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(categories))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.discovery.max_lists = 5;
    config.discovery.max_page = 3;

    let root = Url::parse(&storefront_url(&server, "cafebazaar.ir", "/pages/game")).unwrap();
    let lists = discover_list_urls(
        &pinned_client(&server),
        &root,
        &config.discovery,
        &RetryPolicy::none(),
    )
    .await;

    assert!(!lists.is_empty());
    assert!(lists.len() <= 5);
    assert_eq!(lists[0], root.to_string());
    assert!(lists.iter().any(|u| u.ends_with("/cat/genre-0?page=2")));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() <= 5);
}

#[tokio::test]
async fn test_discovery_falls_back_to_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let root = Url::parse(&storefront_url(&server, "myket.ir", "/games")).unwrap();
    let lists = discover_list_urls(
        &pinned_client(&server),
        &root,
        &Config::default().discovery,
        &RetryPolicy::none(),
    )
    .await;

    assert_eq!(lists, vec![root.to_string()]);
}

#[tokio::test]
async fn test_database_path_is_shared_between_runs() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nested").join("crawl.db");
    let storage = storefront_crawler::storage::open_storage(Path::new(&db)).unwrap();
    drop(storage);

    let mut reopened = SqliteStorage::new(&db).unwrap();
    assert_eq!(reopened.increment_counter("pages_crawled", 1).unwrap(), 1);
}

fn review_block(i: usize) -> String {
    format!(
        r#"<div class="review-item"><span class="review-author">user{}</span><p class="review-text">review {}</p></div>"#,
        i, i
    )
}

#[tokio::test]
async fn test_supplemental_reviews_top_up_to_cap() {
    let server = MockServer::start().await;
    let on_page: String = (0..3).map(review_block).collect();
    mount_page(
        &server,
        "/app/com.foo",
        format!(
            r#"<html><head><title>Foo</title></head><body>{}</body></html>"#,
            on_page
        ),
    )
    .await;
    // The review pages start with the three reviews already on the detail page
    mount_page(
        &server,
        "/app/com.foo/reviews",
        (0..10).map(review_block).collect(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let seed = storefront_url(&server, "myket.ir", "/app/com.foo");
    let mut config = test_config(vec![seed]);
    config.enrichment.review_cap = 5;
    config.enrichment.supplemental_reviews = true;
    let ctx = CrawlContext::with_client(config, open(&dir), pinned_client(&server));

    run_crawl_with_context(ctx.clone()).await.unwrap();

    let reviews = ctx
        .with_storage(|s| Ok(s.get_reviews(Store::Myket, "com.foo")?))
        .unwrap();
    assert_eq!(reviews.len(), 5);
}

#[tokio::test]
async fn test_failed_enrichment_writes_keep_game() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/app/com.lonely",
        format!(
            r#"<html><head><title>Lonely</title>
               <meta property="og:image" content="https://cdn.example/lonely.png">
               </head><body>{}</body></html>"#,
            review_block(1)
        ),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    {
        let conn = rusqlite::Connection::open(dir.path().join("crawl.db")).unwrap();
        conn.execute_batch("DROP TABLE reviews; DROP TABLE assets;")
            .unwrap();
    }

    let seed = storefront_url(&server, "myket.ir", "/app/com.lonely");
    let ctx = CrawlContext::with_client(test_config(vec![seed]), storage, pinned_client(&server));
    let summary = run_crawl_with_context(ctx.clone()).await.unwrap();
    assert_eq!(summary.indexed, 1);
    assert_eq!(summary.failed, 0);

    let game = ctx
        .with_storage(|s| Ok(s.get_game(&game_id(Store::Myket, "com.lonely"))?))
        .unwrap()
        .unwrap();
    assert_eq!(game.title, "Lonely");
}

#[tokio::test]
async fn test_concurrent_workers_fetch_each_detail_once() {
    let server = MockServer::start().await;
    let names: Vec<String> = (0..12).map(|i| format!("com.game{}", i)).collect();
    let links: String = names
        .iter()
        .map(|n| format!(r#"<a href="/app/{}">{}</a>"#, n, n))
        .collect();
    // Each link appears twice; the seen-set must still admit it once
    Mock::given(method("GET"))
        .and(path("/games/puzzle"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}{}", links, links)))
        .expect(1)
        .mount(&server)
        .await;
    for name in &names {
        Mock::given(method("GET"))
            .and(path(format!("/app/{}", name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(name, 4.0)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let seed = storefront_url(&server, "myket.ir", "/games/puzzle");
    let mut config = test_config(vec![seed]);
    config.crawler.concurrency = 4;
    config.crawler.max_idle_polls = 20;
    let ctx = CrawlContext::with_client(config, open(&dir), pinned_client(&server));

    let summary = run_crawl_with_context(ctx.clone()).await.unwrap();
    assert_eq!(summary.workers, 4);
    assert_eq!(summary.pages, 13);
    assert_eq!(summary.indexed, 12);

    let (games, seen, frontier) = ctx
        .with_storage(|s| Ok((s.count_games(None)?, s.seen_count()?, s.frontier_len()?)))
        .unwrap();
    assert_eq!(games, 12);
    assert_eq!(seen, 13);
    assert_eq!(frontier, 0);

    let counters = ctx.with_storage(|s| Ok(s.load_counters()?)).unwrap();
    assert_eq!(counters.apps_indexed, 12);
}
