//! Harvest module for walking and extracting listing pages
//!
//! This module contains the core harvesting logic, including:
//! - Panel extraction from DOM snapshots
//! - Concurrent persistence of each page's records
//! - The pagination loop that ties browser and store together

mod coordinator;
mod extract;

pub use coordinator::{persist_batch, run_harvest, HarvestStats, Harvester};
pub use extract::{
    complete_records, digits_only, extract_panels, extract_records, HadithRecord, PanelFields,
    PanelSelectors,
};
