//! Harvest coordinator - the page-by-page extract-and-load loop
//!
//! One harvest session owns one browser tab and one store handle. For each
//! listing page it:
//! - waits for the listing panels to render
//! - snapshots the DOM and extracts the complete panels
//! - inserts every record of the page at once and waits for all of them
//! - follows the "next page" anchor, or stops when there is none

use crate::config::Config;
use crate::driver::{ChromiumDriver, PageDriver};
use crate::harvest::extract::{extract_records, HadithRecord, PanelSelectors};
use crate::store::{self, HadithStore, StoreResult, StoredHadith};
use crate::HarvestError;
use futures::future::join_all;
use std::time::{Duration, Instant};

/// Counters reported at the end of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Listing pages visited, including the entrypoint
    pub pages: u64,

    /// Rows inserted across all pages
    pub rows_inserted: u64,
}

/// Main harvest session structure
pub struct Harvester<D, S> {
    config: Config,
    selectors: PanelSelectors,
    driver: D,
    store: S,
}

impl<D: PageDriver, S: HadithStore> Harvester<D, S> {
    /// Creates a new harvest session
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `driver` - An open browser session
    /// * `store` - A store that has already answered its liveness query
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Session ready to run
    /// * `Err(HarvestError)` - A configured selector does not parse
    pub fn new(config: Config, driver: D, store: S) -> Result<Self, HarvestError> {
        let selectors = PanelSelectors::from_config(&config.selectors)?;
        Ok(Self {
            config,
            selectors,
            driver,
            store,
        })
    }

    /// Runs the session to completion
    ///
    /// Navigates to the entrypoint, harvests pages until one renders without
    /// a "next page" anchor, then closes the store and the browser, in that
    /// order. Any error ends the session immediately; nothing is closed on
    /// the error path and rows already inserted stay inserted.
    pub async fn run(mut self) -> Result<HarvestStats, HarvestError> {
        let started = Instant::now();
        let mut stats = HarvestStats::default();

        tracing::info!("Navigating to {}", self.config.harvest.entrypoint);
        self.driver
            .navigate(&self.config.harvest.entrypoint)
            .await?;

        let mut has_next_page = true;
        while has_next_page {
            let inserted = self.harvest_page().await?;
            stats.pages += 1;
            stats.rows_inserted += inserted;

            tracing::info!(
                "Page {}: {} rows inserted ({} total)",
                stats.pages,
                inserted,
                stats.rows_inserted
            );

            has_next_page = self
                .driver
                .elements_exist(&self.config.selectors.next)
                .await?;

            if has_next_page {
                tracing::debug!("Following next page link");
                self.driver.click(&self.config.selectors.next).await?;
            }
        }

        self.store.close().await?;
        self.driver.close().await?;

        tracing::info!(
            "Harvest completed: {} pages, {} rows in {:?}",
            stats.pages,
            stats.rows_inserted,
            started.elapsed()
        );

        Ok(stats)
    }

    /// Harvests the page currently shown in the browser
    ///
    /// Returns the number of rows inserted.
    async fn harvest_page(&mut self) -> Result<u64, HarvestError> {
        let timeout = Duration::from_millis(self.config.harvest.selector_timeout_ms);
        self.driver
            .wait_for_selector(&self.config.selectors.panel, timeout)
            .await?;

        let html = self.driver.content().await?;
        let records = extract_records(&html, &self.selectors, self.config.harvest.book_id);

        let rows = persist_batch(&self.store, &records).await?;
        log_inserted(&rows);

        Ok(rows.len() as u64)
    }
}

/// Logs each returned row: a summary at info, the full row at debug
fn log_inserted(rows: &[StoredHadith]) {
    for row in rows {
        tracing::info!(
            "Inserted hadith {} (book {}, {} chars)",
            row.number,
            row.book_id,
            row.indonesian.chars().count()
        );
        tracing::debug!("Inserted row: {:?}", row);
    }
}

/// Inserts a batch of records concurrently
///
/// Every insert is started at once and all of them run to completion. The
/// rows come back in record order. If any insert failed, the first failure
/// in record order is returned instead; the inserts that succeeded are not
/// rolled back.
pub async fn persist_batch<S: HadithStore + ?Sized>(
    store: &S,
    records: &[HadithRecord],
) -> StoreResult<Vec<StoredHadith>> {
    let results = join_all(records.iter().map(|record| store.insert(record))).await;
    results.into_iter().collect()
}

/// Runs a complete harvest session
///
/// This is the main entry point for a harvest. It will:
/// 1. Connect to the store and run the liveness query
/// 2. Launch the browser
/// 3. Walk the listing pages from the entrypoint
/// 4. Close the store and the browser
///
/// Store failures in step 1 are reported as [`HarvestError::Connectivity`].
///
/// # Example
///
/// ```no_run
/// use hadith_harvest::config::load_config;
/// use hadith_harvest::harvest::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let stats = run_harvest(config).await?;
/// println!("{} rows", stats.rows_inserted);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config) -> Result<HarvestStats, HarvestError> {
    let store = store::connect(&config.store)
        .await
        .map_err(HarvestError::Connectivity)?;
    let server_time = store.ping().await.map_err(HarvestError::Connectivity)?;
    tracing::info!("Store reachable (server time: {})", server_time);

    let driver = ChromiumDriver::launch(&config.browser).await?;

    Harvester::new(config, driver, store)?.run().await
}
