//! Field extraction for a single listing item.
//!
//! Every field is read through an ordered list of probes, most specific first, and the first
//! probe that yields a non-empty value wins. Nothing here fails the whole page: optional fields
//! come back as `None`, and only a missing title or link rejects the item.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::error::ExtractError;
use super::urls::resolve_url;

/// raw values read from one listing item, before any cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub raw_title: String,
    pub detail_url: String,
    pub image_url: Option<String>,
    pub rating: Option<String>,
    pub runtime: Option<String>,
    pub genres: Vec<String>,
}

type Probe = fn(&ElementRef, &str) -> Option<String>;

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|s| Selector::parse(s).expect("static selector should parse"))
        .collect()
}

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        ".movie-title",
        ".title",
        "h2",
        "h3",
        "[class*='title']",
        "a",
    ])
});

static RATING_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[".rating", ".imdb", "[class*='rating']", "[class*='score']"])
});

static RUNTIME_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[".duration", ".time", "[class*='duration']", "[class*='time']"])
});

static GENRE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[class*='genre'] a",
        ".genre",
        ".genres",
        "[class*='category']",
    ])
});

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("static selector should parse"));
static LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector should parse"));
static BACKGROUND: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[style*='background-image']").expect("static selector should parse")
});

static BACKGROUND_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*['"]?(.*?)['"]?\s*\)"#).expect("static regex should compile")
});
static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("static regex should compile"));

const IMAGE_PROBES: &[Probe] = &[image_from_img, image_from_background];
const LINK_PROBES: &[Probe] = &[link_from_anchor, link_from_self];

/// reads every field out of one listing item
///
/// # Errors
/// `MissingTitle` / `MissingLink` when the item can't be identified at all
pub fn parse_item(element: &ElementRef, origin: &str) -> Result<ListingItem, ExtractError> {
    let raw_title = first_text(element, &TITLE_SELECTORS).ok_or(ExtractError::MissingTitle)?;
    let detail_url = first_probe(element, origin, LINK_PROBES).ok_or(ExtractError::MissingLink)?;

    Ok(ListingItem {
        raw_title,
        detail_url,
        image_url: first_probe(element, origin, IMAGE_PROBES),
        rating: first_text(element, &RATING_SELECTORS),
        runtime: first_text(element, &RUNTIME_SELECTORS),
        genres: first_text_list(element, &GENRE_SELECTORS),
    })
}

/// four digit 19xx/20xx year anywhere in the title
pub fn parse_year(raw_title: &str) -> Option<String> {
    YEAR.find(raw_title).map(|m| m.as_str().to_string())
}

fn first_probe(element: &ElementRef, origin: &str, probes: &[Probe]) -> Option<String> {
    probes.iter().find_map(|probe| probe(element, origin))
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(element: &ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        element
            .select(selector)
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
    })
}

fn first_text_list(element: &ElementRef, selectors: &[Selector]) -> Vec<String> {
    selectors
        .iter()
        .map(|selector| {
            element
                .select(selector)
                .map(|el| element_text(&el))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
        })
        .find(|texts| !texts.is_empty())
        .unwrap_or_default()
}

fn non_empty_attr(element: &ElementRef, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        element
            .value()
            .attr(name)
            .map(str::trim)
            // inline data uris are lazy loading stand ins, not the poster
            .filter(|value| !value.is_empty() && !value.starts_with("data:"))
            .map(str::to_string)
    })
}

fn image_from_img(element: &ElementRef, origin: &str) -> Option<String> {
    let img = element.select(&IMG).next()?;
    let raw = non_empty_attr(&img, &["src", "data-src", "data-lazy-src"])?;
    resolve_url(&raw, origin)
}

fn image_from_background(element: &ElementRef, origin: &str) -> Option<String> {
    let styled = element.select(&BACKGROUND).next()?;
    let style = styled.value().attr("style")?;
    let raw = BACKGROUND_URL.captures(style)?.get(1)?.as_str();
    resolve_url(raw, origin)
}

fn link_from_anchor(element: &ElementRef, origin: &str) -> Option<String> {
    element
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| resolve_url(href, origin))
}

fn link_from_self(element: &ElementRef, origin: &str) -> Option<String> {
    element
        .value()
        .attr("href")
        .and_then(|href| resolve_url(href, origin))
}
