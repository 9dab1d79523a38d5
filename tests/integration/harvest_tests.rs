//! Integration tests for the harvest loop
//!
//! These tests drive the loop with a scripted browser serving static HTML
//! and a SQLite store on disk, and check what ends up in the table.

use async_trait::async_trait;
use hadith_harvest::config::{parse_config, Config};
use hadith_harvest::driver::{DriverError, DriverResult, PageDriver};
use hadith_harvest::harvest::{run_harvest, Harvester};
use hadith_harvest::store::{HadithPage, HadithStore, SqliteStore, StoreResult, StoredHadith};
use hadith_harvest::{HadithRecord, HarvestError};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENTRYPOINT: &str = "https://hadith.test/tirmidzi";
const PAGE_TWO: &str = "https://hadith.test/tirmidzi?page=2";

/// Observable side effects of a harvest, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Navigate(String),
    Snapshot(String),
    Insert(String),
    Click,
    CloseStore,
    CloseBrowser,
}

type EventLog = Arc<Mutex<Vec<Event>>>;

/// Resolves the href of the first element matching `selector` against `base`
fn link_target(html: &str, selector: &Selector, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let href = document
        .select(selector)
        .next()?
        .value()
        .attr("href")?
        .trim()
        .to_string();

    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    base.join(&href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}

/// A browser that serves pages from a map and follows `href`s on click
struct StaticSiteDriver {
    pages: HashMap<String, String>,
    current: Option<Url>,
    events: EventLog,
}

impl StaticSiteDriver {
    fn new(pages: &[(&str, String)], events: EventLog) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), html.clone()))
                .collect(),
            current: None,
            events,
        }
    }

    fn current_html(&self) -> String {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url.as_str()))
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string())
    }

    fn matches(&self, selector: &str) -> bool {
        let selector = Selector::parse(selector).unwrap();
        let document = Html::parse_document(&self.current_html());
        let found = document.select(&selector).next().is_some();
        found
    }
}

#[async_trait]
impl PageDriver for StaticSiteDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.events.lock().unwrap().push(Event::Navigate(url.to_string()));
        self.current = Some(Url::parse(url).unwrap());
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> DriverResult<()> {
        if self.matches(selector) {
            Ok(())
        } else {
            Err(DriverError::SelectorTimeout {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    async fn content(&mut self) -> DriverResult<String> {
        let url = self.current.as_ref().map(|u| u.to_string()).unwrap_or_default();
        self.events.lock().unwrap().push(Event::Snapshot(url));
        Ok(self.current_html())
    }

    async fn elements_exist(&mut self, selector: &str) -> DriverResult<bool> {
        Ok(self.matches(selector))
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        self.events.lock().unwrap().push(Event::Click);
        let base = self.current.clone().unwrap();
        let target = link_target(
            &self.current_html(),
            &Selector::parse(selector).unwrap(),
            &base,
        )
        .ok_or_else(|| DriverError::ElementNotFound(selector.to_string()))?;
        self.current = Some(target);
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.events.lock().unwrap().push(Event::CloseBrowser);
        Ok(())
    }
}

/// A SQLite store that reports inserts and closes to the event log
struct RecordingStore {
    inner: SqliteStore,
    events: EventLog,
}

#[async_trait]
impl HadithStore for RecordingStore {
    async fn ping(&self) -> StoreResult<DateTime<Utc>> {
        self.inner.ping().await
    }

    async fn insert(&self, record: &HadithRecord) -> StoreResult<StoredHadith> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Insert(record.number.clone()));
        self.inner.insert(record).await
    }

    async fn count_by_book(&self, book_id: i32) -> StoreResult<u64> {
        self.inner.count_by_book(book_id).await
    }

    async fn find_by_book(
        &self,
        book_id: i32,
        offset: u32,
        limit: u32,
    ) -> StoreResult<HadithPage> {
        self.inner.find_by_book(book_id, offset, limit).await
    }

    async fn close(&self) -> StoreResult<()> {
        self.events.lock().unwrap().push(Event::CloseStore);
        self.inner.close().await
    }
}

/// A database file holding an empty `hadiths` table
struct TestDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl TestDatabase {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hadith.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE hadiths (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                book_id INTEGER NOT NULL,
                number TEXT NOT NULL CHECK (number <> ''),
                arabic TEXT NOT NULL,
                indonesian TEXT NOT NULL
            );",
        )
        .unwrap();
        Self { _dir: dir, path }
    }

    fn store(&self, events: &EventLog) -> RecordingStore {
        RecordingStore {
            inner: SqliteStore::open(&self.path, "hadiths").unwrap(),
            events: events.clone(),
        }
    }

    fn rows(&self) -> Vec<(i32, String, String, String)> {
        let conn = Connection::open(&self.path).unwrap();
        let mut stmt = conn
            .prepare("SELECT book_id, number, arabic, indonesian FROM hadiths ORDER BY id")
            .unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        rows
    }
}

fn create_test_config(db_path: &Path) -> Config {
    parse_config(&format!(
        r#"
[harvest]
entrypoint = "{}"
book-id = 9
selector-timeout-ms = 500

[store]
backend = "sqlite"
database = "{}"
"#,
        ENTRYPOINT,
        db_path.display()
    ))
    .expect("test config must be valid")
}

fn panel(number: &str, arabic: Option<&str>) -> String {
    let arabic = arabic
        .map(|text| format!(r#"<p class="arabic">{}</p>"#, text))
        .unwrap_or_default();
    format!(
        r#"<div class="panel panel-default">
            <div class="panel-heading"><h3 class="title-header">Hadits No. {number}</h3></div>
            <div class="panel-body">{arabic}<p>Terjemahan hadits {number}</p></div>
        </div>"#
    )
}

fn listing_page(panels: &[String], next_href: Option<&str>) -> String {
    let next = next_href
        .map(|href| format!(r#"<ul class="pagination"><li><a rel="next" href="{}">»</a></li></ul>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>Tirmidzi</title></head><body>
        <div class="container"><div class="row">{}</div>{}</div>
        </body></html>"#,
        panels.concat(),
        next
    )
}

fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn test_link_target_resolution() {
    let base = Url::parse(ENTRYPOINT).unwrap();
    let next = Selector::parse(r#"a[rel="next"]"#).unwrap();

    assert_eq!(
        link_target(r#"<a rel="next" href="/tirmidzi?page=2">›</a>"#, &next, &base)
            .map(|u| u.to_string()),
        Some(PAGE_TWO.to_string())
    );
    assert!(link_target(r#"<a href="/x">x</a>"#, &next, &base).is_none());
    assert!(link_target(r#"<a rel="next">x</a>"#, &next, &base).is_none());
    assert!(link_target(r##"<a rel="next" href="#">x</a>"##, &next, &base).is_none());
    assert!(link_target(r#"<a rel="next" href="mailto:a@b.c">x</a>"#, &next, &base).is_none());
}

#[tokio::test]
async fn test_two_page_harvest_end_to_end() {
    let db = TestDatabase::new();
    let events = new_log();

    let pages = [
        (
            ENTRYPOINT,
            listing_page(
                &[panel("1", Some("نص ١")), panel("2", Some("نص ٢"))],
                Some("/tirmidzi?page=2"),
            ),
        ),
        (PAGE_TWO, listing_page(&[panel("3", Some("نص ٣"))], None)),
    ];
    let driver = StaticSiteDriver::new(&pages, events.clone());
    let store = db.store(&events);

    let harvester = Harvester::new(create_test_config(&db.path), driver, store).unwrap();
    let stats = harvester.run().await.expect("Harvest failed");

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.rows_inserted, 3);

    let log = events.lock().unwrap().clone();
    assert_eq!(
        log,
        vec![
            Event::Navigate(ENTRYPOINT.to_string()),
            Event::Snapshot(ENTRYPOINT.to_string()),
            Event::Insert("1".to_string()),
            Event::Insert("2".to_string()),
            Event::Click,
            Event::Snapshot(PAGE_TWO.to_string()),
            Event::Insert("3".to_string()),
            Event::CloseStore,
            Event::CloseBrowser,
        ]
    );

    let rows = db.rows();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|(book_id, ..)| *book_id == 9));
    assert_eq!(
        rows[2],
        (
            9,
            "3".to_string(),
            "نص ٣".to_string(),
            "Terjemahan hadits 3".to_string()
        )
    );
}

#[tokio::test]
async fn test_page_without_next_link_is_not_left() {
    let db = TestDatabase::new();
    let events = new_log();

    let pages = [(ENTRYPOINT, listing_page(&[panel("10", Some("نص"))], None))];
    let driver = StaticSiteDriver::new(&pages, events.clone());

    let harvester = Harvester::new(create_test_config(&db.path), driver, db.store(&events)).unwrap();
    let stats = harvester.run().await.unwrap();

    assert_eq!(stats.pages, 1);
    let log = events.lock().unwrap().clone();
    assert!(!log.contains(&Event::Click));
    assert_eq!(
        log.iter()
            .filter(|e| matches!(e, Event::Navigate(_)))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_incomplete_panels_are_not_persisted() {
    let db = TestDatabase::new();
    let events = new_log();

    let pages = [(
        ENTRYPOINT,
        listing_page(
            &[
                panel("1", Some("نص")),
                panel("2", None),
                panel("3", Some("نص")),
            ],
            None,
        ),
    )];
    let driver = StaticSiteDriver::new(&pages, events.clone());

    let harvester = Harvester::new(create_test_config(&db.path), driver, db.store(&events)).unwrap();
    let stats = harvester.run().await.unwrap();

    assert_eq!(stats.rows_inserted, 2);
    let numbers: Vec<String> = db.rows().into_iter().map(|(_, number, ..)| number).collect();
    assert_eq!(numbers, vec!["1".to_string(), "3".to_string()]);
    assert!(!events
        .lock()
        .unwrap()
        .contains(&Event::Insert("2".to_string())));
}

#[tokio::test]
async fn test_rerun_inserts_duplicate_rows() {
    let db = TestDatabase::new();
    let pages = [(
        ENTRYPOINT,
        listing_page(&[panel("1", Some("نص")), panel("2", Some("نص"))], None),
    )];

    for _ in 0..2 {
        let events = new_log();
        let driver = StaticSiteDriver::new(&pages, events.clone());
        let harvester =
            Harvester::new(create_test_config(&db.path), driver, db.store(&events)).unwrap();
        harvester.run().await.unwrap();
    }

    // No deduplication: the second run stores the same hadiths again
    let numbers: Vec<String> = db.rows().into_iter().map(|(_, number, ..)| number).collect();
    assert_eq!(numbers, vec!["1", "2", "1", "2"]);
}

#[tokio::test]
async fn test_failed_insert_aborts_run_and_keeps_committed_rows() {
    let db = TestDatabase::new();
    let events = new_log();

    // The header of the second panel has no digits, so its number is empty
    // and the table's CHECK constraint rejects it
    let broken = panel("1", Some("نص")).replace("Hadits No. 1", "Hadits");
    let pages = [
        (
            ENTRYPOINT,
            listing_page(&[panel("1", Some("نص")), broken, panel("3", Some("نص"))], Some("/tirmidzi?page=2")),
        ),
        (PAGE_TWO, listing_page(&[panel("4", Some("نص"))], None)),
    ];
    let driver = StaticSiteDriver::new(&pages, events.clone());

    let harvester = Harvester::new(create_test_config(&db.path), driver, db.store(&events)).unwrap();
    let result = harvester.run().await;

    assert!(matches!(result, Err(HarvestError::Store(_))));

    let numbers: Vec<String> = db.rows().into_iter().map(|(_, number, ..)| number).collect();
    assert_eq!(numbers, vec!["1".to_string(), "3".to_string()]);

    let log = events.lock().unwrap().clone();
    assert!(!log.contains(&Event::Click));
    assert!(!log.contains(&Event::CloseStore));
    assert!(!log.contains(&Event::CloseBrowser));
}

#[tokio::test]
async fn test_missing_panels_fail_the_run() {
    let db = TestDatabase::new();
    let events = new_log();

    let pages = [
        (
            ENTRYPOINT,
            listing_page(&[panel("1", Some("نص"))], Some("/tirmidzi?page=2")),
        ),
        (
            PAGE_TWO,
            "<html><body><p>Maintenance</p></body></html>".to_string(),
        ),
    ];
    let driver = StaticSiteDriver::new(&pages, events.clone());

    let harvester = Harvester::new(create_test_config(&db.path), driver, db.store(&events)).unwrap();
    let result = harvester.run().await;

    assert!(matches!(
        result,
        Err(HarvestError::Driver(DriverError::SelectorTimeout { .. }))
    ));
    assert_eq!(db.rows().len(), 1);
}

#[tokio::test]
async fn test_unreachable_store_is_a_connectivity_error() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("missing").join("hadith.db");

    let result = run_harvest(create_test_config(&db_path)).await;

    match result {
        Err(e) => assert!(e.is_connectivity(), "unexpected error: {}", e),
        Ok(_) => panic!("harvest must not start without a store"),
    }
}

#[tokio::test]
async fn test_missing_database_file_is_a_connectivity_error() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("hadihts.db");

    let result = run_harvest(create_test_config(&db_path)).await;

    match result {
        Err(e) => assert!(e.is_connectivity(), "unexpected error: {}", e),
        Ok(_) => panic!("harvest must not start without a store"),
    }
    assert!(!db_path.exists());
}

#[tokio::test]
async fn test_harvested_rows_are_listed_page_by_page() {
    let db = TestDatabase::new();
    let events = new_log();

    let pages = [
        (
            ENTRYPOINT,
            listing_page(
                &[panel("1", Some("نص")), panel("2", Some("نص"))],
                Some("/tirmidzi?page=2"),
            ),
        ),
        (
            PAGE_TWO,
            listing_page(&[panel("10", Some("نص")), panel("3", Some("نص"))], None),
        ),
    ];
    let driver = StaticSiteDriver::new(&pages, events.clone());
    let harvester = Harvester::new(create_test_config(&db.path), driver, db.store(&events)).unwrap();
    harvester.run().await.unwrap();

    let store = SqliteStore::open(&db.path, "hadiths").unwrap();
    let page = store.find_by_book(9, 1, 2).await.unwrap();

    let numbers: Vec<&str> = page.items.iter().map(|h| h.number.as_str()).collect();
    assert_eq!(numbers, vec!["2", "3"]);
    assert_eq!(page.total, 4);
    assert_eq!(page.items[1].indonesian, "Terjemahan hadits 3");

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["offset"], 1);
    assert_eq!(json["limit"], 2);
    assert_eq!(json["items"][0]["number"], "2");
}

/// Runs the real browser against a local site
///
/// Requires Chrome or Chromium; run with `cargo test -- --ignored`.
#[tokio::test]
#[ignore]
async fn test_chromium_harvest_against_local_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/tirmidzi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(
                    &[panel("1", Some("نص ١")), panel("2", Some("نص ٢"))],
                    Some("/tirmidzi/2"),
                ))
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tirmidzi/2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[panel("3", Some("نص ٣"))], None))
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let db = TestDatabase::new();
    let mut config = create_test_config(&db.path);
    config.harvest.entrypoint = format!("{}/tirmidzi", base_url);
    config.harvest.selector_timeout_ms = 10_000;

    let stats = run_harvest(config).await.expect("Harvest failed");
    assert!(stats.pages >= 2);

    // The click does not wait for navigation, so page one may be read twice
    let mut numbers: Vec<String> = db.rows().into_iter().map(|(_, number, ..)| number).collect();
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers, vec!["1", "2", "3"]);
}
