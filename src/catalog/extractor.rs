//! Listing page extraction: listing nodes in, deduplicated entries and pagination depth out.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::categories::is_category_label;
use super::error::ExtractError;
use super::field_parser::{ListingItem, parse_item, parse_year};
use super::model::{AudioTrack, CatalogEntry, CatalogPage, Language};
use super::urls::{is_absolute_http_url, is_placeholder_link, slugify};

/// items on a full listing page, below this a page without page links is taken as the last one
pub const NOMINAL_PAGE_SIZE: usize = 10;
/// guess used when a full page has no page links at all
pub const ESTIMATED_PAGE_COUNT: u32 = 50;

const UNKNOWN_YEAR: &str = "unknown";

static LISTING_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article.movie-item",
        ".movie-item",
        "article",
        ".item-movie",
        "[class*='movie']",
        "[class*='item']",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static selector should parse"))
    .collect()
});

static PAGE_ANCHORS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href*='/page/'], .pagination a, .page-numbers a, nav a[href*='page']")
        .expect("static selector should parse")
});

static PAGE_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/page/(\d+)").expect("static regex should compile"));
static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("static regex should compile"));
static LANGUAGE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:hindi|english)\b").expect("static regex should compile"));
static BARE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}$").expect("static regex should compile"));

/// parses one listing page
///
/// never fails, items that can't be read are skipped and logged at debug level
pub fn extract(html: &str, page_origin: &str) -> CatalogPage {
    let document = Html::parse_document(html);
    let nodes = listing_nodes(&document);

    let mut entries: Vec<CatalogEntry> = Vec::new();
    let mut by_key: HashMap<(String, String), usize> = HashMap::new();

    for (index, node) in nodes.iter().enumerate() {
        let item = match parse_item(node, page_origin) {
            Ok(item) => item,
            Err(e) => {
                debug!("Skipping listing item {}: {}", index, e);
                continue;
            }
        };

        let year = parse_year(&item.raw_title);
        let title = canonical_title(&item.raw_title);
        let language = detect_language(&item);
        let key = (
            title.to_lowercase(),
            year.clone().unwrap_or_else(|| UNKNOWN_YEAR.to_string()),
        );

        if let Some(&existing) = by_key.get(&key) {
            let entry = &mut entries[existing];
            let added = entry.add_audio_track(AudioTrack::new(language, &item.detail_url));
            if entry.image_url.is_none() {
                entry.image_url = item.image_url;
            }
            debug!(
                "Merged '{}' into entry {} (track {} added: {})",
                item.raw_title,
                entry.id,
                language.label(),
                added
            );
            continue;
        }

        by_key.insert(key, entries.len());
        entries.push(CatalogEntry {
            id: entry_id(&item.detail_url),
            title,
            year,
            image_url: item.image_url,
            audio_tracks: vec![AudioTrack::new(language, &item.detail_url)],
            detail_url: item.detail_url,
            rating: item.rating,
            runtime: item.runtime,
            genres: item.genres,
        });
    }

    entries.retain(|entry| match validate(entry) {
        Ok(()) => true,
        Err(e) => {
            debug!("Dropping entry '{}': {}", entry.title, e);
            false
        }
    });

    let (max_page, max_page_estimated) = detect_max_page(&document, nodes.len());

    CatalogPage {
        entries,
        max_page,
        max_page_estimated,
    }
}

/// listing nodes from the first selector in the chain that matches anything
fn listing_nodes(document: &Html) -> Vec<ElementRef<'_>> {
    LISTING_SELECTORS
        .iter()
        .map(|selector| document.select(selector).collect::<Vec<_>>())
        .find(|nodes| !nodes.is_empty())
        .unwrap_or_default()
}

/// highest page number linked from the page, or the fixed estimate for full pages without links
///
/// returns `(max_page, estimated)`
pub fn detect_max_page(document: &Html, listing_nodes: usize) -> (u32, bool) {
    let mut found = false;
    let mut max_page = 1;

    for anchor in document.select(&PAGE_ANCHORS) {
        let from_href = anchor
            .value()
            .attr("href")
            .and_then(|href| PAGE_HREF.captures(href))
            .and_then(|caps| caps.get(1))
            .and_then(|n| n.as_str().parse::<u32>().ok());

        let text = anchor.text().collect::<String>();
        let text = text.trim();
        let from_text = if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
            text.parse::<u32>().ok()
        } else {
            None
        };

        for page in [from_href, from_text].into_iter().flatten() {
            found = true;
            max_page = max_page.max(page);
        }
    }

    if !found && listing_nodes >= NOMINAL_PAGE_SIZE {
        return (ESTIMATED_PAGE_COUNT, true);
    }

    (max_page.max(1), false)
}

/// display title without parenthetical groups or language tags
pub fn canonical_title(raw_title: &str) -> String {
    let without_groups = PARENTHETICAL.replace_all(raw_title, " ");
    let without_language = LANGUAGE_TOKEN.replace_all(&without_groups, " ");
    without_language
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn detect_language(item: &ListingItem) -> Language {
    let slug = slugify(&item.raw_title);
    Language::detect(&[&item.raw_title, &item.detail_url, &slug]).unwrap_or(Language::DEFAULT)
}

/// `entry-` plus a short digest of the first link seen for the title, stable across merges
fn entry_id(detail_url: &str) -> String {
    let digest = Sha256::digest(detail_url.as_bytes());
    format!("entry-{}", &hex::encode(digest)[..16])
}

fn validate(entry: &CatalogEntry) -> Result<(), ExtractError> {
    let title = entry.title.trim();
    if title.chars().count() <= 2 {
        return Err(ExtractError::InvalidTitle("too short".to_string()));
    }
    if BARE_YEAR.is_match(title) {
        return Err(ExtractError::InvalidTitle("bare year".to_string()));
    }
    if is_category_label(title) {
        return Err(ExtractError::InvalidTitle("category label".to_string()));
    }
    if is_placeholder_link(&entry.detail_url) || !is_absolute_http_url(&entry.detail_url) {
        return Err(ExtractError::InvalidLink(entry.detail_url.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_title_drops_noise() {
        assert_eq!(canonical_title("Troll 2 (2025) Hindi"), "Troll 2");
        assert_eq!(canonical_title("  Troll   2 (Dual Audio) ENGLISH "), "Troll 2");
        assert_eq!(canonical_title("Englishman Abroad"), "Englishman Abroad");
        assert_eq!(canonical_title("Heat 1995"), "Heat 1995");
    }

    #[test]
    fn entry_id_is_stable() {
        let a = entry_id("https://catalog.example/troll-2/");
        assert_eq!(a, entry_id("https://catalog.example/troll-2/"));
        assert_ne!(a, entry_id("https://catalog.example/troll-3/"));
        assert!(a.starts_with("entry-"));
        assert_eq!(a.len(), "entry-".len() + 16);
    }

    #[test]
    fn validation_rules() {
        let mut entry = CatalogEntry {
            id: "entry-x".to_string(),
            title: "Troll 2".to_string(),
            year: None,
            image_url: None,
            detail_url: "https://catalog.example/troll-2/".to_string(),
            rating: None,
            runtime: None,
            genres: Vec::new(),
            audio_tracks: vec![AudioTrack::new(Language::DEFAULT, "https://catalog.example")],
        };
        assert_eq!(validate(&entry), Ok(()));

        entry.title = "2025".to_string();
        assert!(validate(&entry).is_err());
        entry.title = "Up".to_string();
        assert!(validate(&entry).is_err());
        entry.title = "Thriller".to_string();
        assert!(validate(&entry).is_err());

        entry.title = "Troll 2".to_string();
        entry.detail_url = "/troll-2/".to_string();
        assert!(matches!(validate(&entry), Err(ExtractError::InvalidLink(_))));
    }

    #[test]
    fn page_links_set_max_page() {
        let doc = Html::parse_document(
            r#"<nav class="pagination">
                <a href="/page/2/">2</a><a href="/page/3/">3</a><a href="/page/7/">Last</a>
               </nav>"#,
        );
        assert_eq!(detect_max_page(&doc, 20), (7, false));
    }

    #[test]
    fn full_page_without_links_is_estimated() {
        let doc = Html::parse_document("<div></div>");
        assert_eq!(detect_max_page(&doc, NOMINAL_PAGE_SIZE), (ESTIMATED_PAGE_COUNT, true));
        assert_eq!(detect_max_page(&doc, 3), (1, false));
    }
}
