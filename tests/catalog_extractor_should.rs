use cinerelay::catalog::extractor::{ESTIMATED_PAGE_COUNT, extract};
use cinerelay::catalog::model::{Language, sort_by_year_desc};

const ORIGIN: &str = "https://catalog.example";

fn item(href: &str, title: &str, image: Option<&str>) -> String {
    let img = image
        .map(|src| format!(r#"<img src="{}" alt="">"#, src))
        .unwrap_or_default();
    format!(
        r#"<article class="movie-item"><a href="{}">{}</a><h2 class="movie-title">{}</h2></article>"#,
        href, img, title
    )
}

fn page(items: &[String], pagination: &str) -> String {
    format!(
        "<html><body><main>{}</main>{}</body></html>",
        items.join("\n"),
        pagination
    )
}

#[test]
fn merge_language_variants_into_one_entry() {
    let html = page(
        &[
            item("/troll-2-2025-hindi/", "Troll 2 (2025) Hindi", Some("/wp/troll.jpg")),
            item("/troll-2-2025-english/", "Troll 2 (2025) English", Some("/wp/troll-en.jpg")),
        ],
        "",
    );

    let result = extract(&html, ORIGIN);

    assert_eq!(result.entries.len(), 1);
    let entry = &result.entries[0];
    assert_eq!(entry.title, "Troll 2");
    assert_eq!(entry.year.as_deref(), Some("2025"));
    assert_eq!(entry.detail_url, "https://catalog.example/troll-2-2025-hindi/");
    assert_eq!(entry.image_url.as_deref(), Some("https://catalog.example/wp/troll.jpg"));

    let languages: Vec<Language> = entry.audio_tracks.iter().map(|t| t.language).collect();
    assert_eq!(languages, vec![Language::Hindi, Language::English]);
    assert_eq!(
        entry.audio_tracks[1].source_url,
        "https://catalog.example/troll-2-2025-english/"
    );
}

#[test]
fn merge_language_variants_sharing_one_detail_page() {
    let html = page(
        &[
            item("/troll-2-2025/", "Troll 2 (2025) Hindi", Some("/wp/troll.jpg")),
            item("/troll-2-2025/", "Troll 2 (2025) English", None),
        ],
        "",
    );

    let result = extract(&html, ORIGIN);

    assert_eq!(result.entries.len(), 1);
    let entry = &result.entries[0];
    assert_eq!(entry.title, "Troll 2");
    assert_eq!(entry.year.as_deref(), Some("2025"));
    assert_eq!(entry.detail_url, "https://catalog.example/troll-2-2025/");

    let tracks: Vec<(Language, &str)> = entry
        .audio_tracks
        .iter()
        .map(|t| (t.language, t.source_url.as_str()))
        .collect();
    assert_eq!(
        tracks,
        vec![
            (Language::Hindi, "https://catalog.example/troll-2-2025/"),
            (Language::English, "https://catalog.example/troll-2-2025/"),
        ]
    );
}

#[test]
fn language_comes_from_link_when_title_has_none() {
    let html = page(&[item("/heat-1995-hindi/", "Heat (1995)", None)], "");

    let result = extract(&html, ORIGIN);

    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].title, "Heat");
    assert_eq!(result.entries[0].audio_tracks[0].language, Language::Hindi);
}

#[test]
fn untagged_duplicate_does_not_add_a_second_track() {
    let html = page(
        &[
            item("/heat/", "Heat (1995)", None),
            item("/heat-again/", "Heat (1995)", Some("/wp/heat.jpg")),
        ],
        "",
    );

    let result = extract(&html, ORIGIN);

    assert_eq!(result.entries.len(), 1);
    let entry = &result.entries[0];
    assert_eq!(entry.audio_tracks.len(), 1);
    assert_eq!(entry.audio_tracks[0].language, Language::English);
    // the first item had no poster, so the later one's is adopted
    assert_eq!(entry.image_url.as_deref(), Some("https://catalog.example/wp/heat.jpg"));
}

#[test]
fn same_title_different_year_stays_separate() {
    let html = page(
        &[
            item("/dune-1984/", "Dune (1984)", None),
            item("/dune-2021/", "Dune (2021)", None),
        ],
        "",
    );

    assert_eq!(extract(&html, ORIGIN).entries.len(), 2);
}

#[test]
fn drop_entries_that_are_not_titles() {
    let html = page(
        &[
            item("/drama/", "Drama", None),
            item("/2024/", "2024", None),
            item("/up/", "Up", None),
            item("/latest/", "Latest Movies", None),
            item("#", "Placeholder Film", None),
            item("javascript:void(0)", "Script Film", None),
            item("/real-film/", "Real Film (2020)", None),
        ],
        "",
    );

    let result = extract(&html, ORIGIN);

    let titles: Vec<&str> = result.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Real Film"]);
    for entry in &result.entries {
        assert!(!entry.title.chars().all(|c| c.is_ascii_digit()));
        assert!(entry.detail_url.starts_with("https://"));
    }
}

#[test]
fn fall_back_to_looser_listing_selectors() {
    let html = r#"
        <div class="item-movie"><a href="/a-film/">A Film (2001)</a></div>
        <div class="item-movie"><a href="/b-film/">B Film (2002)</a></div>
    "#;

    let result = extract(html, ORIGIN);

    let titles: Vec<&str> = result.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["A Film", "B Film"]);
}

#[test]
fn take_max_page_from_pagination_links() {
    let html = page(
        &[item("/a-film/", "A Film", None)],
        r#"<nav class="pagination">
            <a href="https://catalog.example/page/2/">2</a>
            <a href="/page/3/">3</a>
            <a href="/page/7/">7</a>
            <a href="/page/2/">Next &raquo;</a>
        </nav>"#,
    );

    let result = extract(&html, ORIGIN);

    assert_eq!(result.max_page, 7);
    assert!(!result.max_page_estimated);
}

#[test]
fn estimate_depth_for_full_page_without_links() {
    let items: Vec<String> = (1..=12)
        .map(|n| item(&format!("/film-{}/", n), &format!("Film Number {}", n), None))
        .collect();

    let result = extract(&page(&items, ""), ORIGIN);

    assert_eq!(result.entries.len(), 12);
    assert_eq!(result.max_page, ESTIMATED_PAGE_COUNT);
    assert!(result.max_page_estimated);
}

#[test]
fn short_page_without_links_is_the_only_page() {
    let result = extract(&page(&[item("/a-film/", "A Film", None)], ""), ORIGIN);

    assert_eq!(result.max_page, 1);
    assert!(!result.max_page_estimated);
}

#[test]
fn keep_document_order_until_sorted_by_year() {
    let html = page(
        &[
            item("/old/", "Old Film (1999)", None),
            item("/undated/", "Undated Film", None),
            item("/new/", "New Film (2024)", None),
            item("/mid/", "Mid Film (2010)", None),
        ],
        "",
    );

    let mut entries = extract(&html, ORIGIN).entries;
    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Old Film", "Undated Film", "New Film", "Mid Film"]);

    sort_by_year_desc(&mut entries);
    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["New Film", "Mid Film", "Old Film", "Undated Film"]);
}

#[test]
fn ids_survive_merging() {
    let hindi_only = extract(
        &page(&[item("/troll-2-2025-hindi/", "Troll 2 (2025) Hindi", None)], ""),
        ORIGIN,
    );
    let merged = extract(
        &page(
            &[
                item("/troll-2-2025-hindi/", "Troll 2 (2025) Hindi", None),
                item("/troll-2-2025-english/", "Troll 2 (2025) English", None),
            ],
            "",
        ),
        ORIGIN,
    );

    assert_eq!(hindi_only.entries[0].id, merged.entries[0].id);
}
