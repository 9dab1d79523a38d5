//! Panel extraction from a listing-page DOM snapshot
//!
//! Each listing page contains repeated panels, one per hadith. A panel is
//! turned into a record only when its header, Arabic paragraph, and
//! translation paragraph are all present; anything else is dropped without
//! a trace.

use crate::config::{parse_selector, SelectorConfig};
use crate::ConfigResult;
use scraper::{ElementRef, Html, Selector};

/// One hadith ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HadithRecord {
    pub book_id: i32,
    /// Digits of the panel header; may be empty if the header had none
    pub number: String,
    pub arabic_text: String,
    pub translated_text: String,
}

/// The three fields read from a single panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelFields {
    pub number: String,
    pub arabic_text: String,
    pub translated_text: String,
}

/// Compiled selectors for panel extraction
#[derive(Debug, Clone)]
pub struct PanelSelectors {
    pub panel: Selector,
    pub header: Selector,
    pub arabic: Selector,
    pub translation: Selector,
}

impl PanelSelectors {
    /// Compiles the panel selectors from configuration
    pub fn from_config(config: &SelectorConfig) -> ConfigResult<Self> {
        Ok(Self {
            panel: parse_selector("panel", &config.panel)?,
            header: parse_selector("header", &config.header)?,
            arabic: parse_selector("arabic", &config.arabic)?,
            translation: parse_selector("translation", &config.translation)?,
        })
    }
}

/// Evaluates the panel selector against a DOM snapshot
///
/// Returns one entry per matched panel in document order. Panels missing any
/// of the three fields yield `None` in their position.
///
/// # Example
///
/// ```
/// use hadith_harvest::config::SelectorConfig;
/// use hadith_harvest::harvest::{extract_panels, PanelSelectors};
///
/// let html = r#"<div class="row"><div class="panel panel-default">
///     <h3 class="title-header">Hadits No. 7</h3>
///     <p class="arabic">نص</p>
///     <p>Terjemahan</p>
/// </div></div>"#;
/// let selectors = PanelSelectors::from_config(&SelectorConfig::default()).unwrap();
/// let panels = extract_panels(html, &selectors);
/// assert_eq!(panels[0].as_ref().unwrap().number, "7");
/// ```
pub fn extract_panels(html: &str, selectors: &PanelSelectors) -> Vec<Option<PanelFields>> {
    let document = Html::parse_document(html);

    document
        .select(&selectors.panel)
        .map(|panel| extract_panel(panel, selectors))
        .collect()
}

/// Reads the three fields of one panel
fn extract_panel(panel: ElementRef<'_>, selectors: &PanelSelectors) -> Option<PanelFields> {
    let header = panel.select(&selectors.header).next()?;
    let arabic = panel.select(&selectors.arabic).next()?;
    let translation = panel.select(&selectors.translation).next()?;

    Some(PanelFields {
        number: digits_only(&element_text(header)),
        arabic_text: element_text(arabic),
        translated_text: element_text(translation),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Removes every character that is not an ASCII digit
///
/// ```
/// use hadith_harvest::harvest::digits_only;
///
/// assert_eq!(digits_only("Hadits No. 1234"), "1234");
/// ```
pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Keeps the complete panels and stamps them with the session's book id
pub fn complete_records(book_id: i32, panels: Vec<Option<PanelFields>>) -> Vec<HadithRecord> {
    panels
        .into_iter()
        .flatten()
        .map(|fields| HadithRecord {
            book_id,
            number: fields.number,
            arabic_text: fields.arabic_text,
            translated_text: fields.translated_text,
        })
        .collect()
}

/// Extracts the persistable records from a DOM snapshot
pub fn extract_records(html: &str, selectors: &PanelSelectors, book_id: i32) -> Vec<HadithRecord> {
    complete_records(book_id, extract_panels(html, selectors))
}
