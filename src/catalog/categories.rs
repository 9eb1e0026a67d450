/// a browsable section of the listing site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    /// empty for the front page listing
    pub slug: &'static str,
}

pub const ALL_CATEGORY_ID: &str = "all";

// the site's own menu, slugs match its urls
pub const KNOWN_CATEGORIES: &[Category] = &[
    Category { id: ALL_CATEGORY_ID, name: "All Movies", slug: "" },
    Category { id: "drama", name: "Drama", slug: "drama" },
    Category { id: "action", name: "Action", slug: "action" },
    Category { id: "comedy", name: "Comedy", slug: "comedy" },
    Category { id: "romance", name: "Romance", slug: "romance" },
    Category { id: "thriller", name: "Thriller", slug: "thriller" },
    Category { id: "crime", name: "Crime", slug: "crime" },
    Category { id: "horror", name: "Horror", slug: "horror" },
    Category { id: "adventure", name: "Adventure", slug: "adventure" },
    Category { id: "science-fiction", name: "Science Fiction", slug: "science-fiction" },
    Category { id: "mystery", name: "Mystery", slug: "mystery" },
    Category { id: "fantasy", name: "Fantasy", slug: "fantasy" },
    Category { id: "family", name: "Family", slug: "family" },
    Category { id: "tv-show", name: "TV Show", slug: "tv-show" },
    Category { id: "action-adventure", name: "Action & Adventure", slug: "action-adventure" },
    Category { id: "history", name: "History", slug: "history" },
    Category { id: "war", name: "War", slug: "war" },
    Category { id: "music", name: "Music", slug: "music" },
    Category { id: "biography", name: "Biography", slug: "biography" },
    Category { id: "documentary", name: "Documentary", slug: "documentary" },
    Category { id: "sci-fi-fantasy", name: "Sci-Fi & Fantasy", slug: "sci-fi-fantasy" },
    Category { id: "animation", name: "Animation", slug: "animation" },
    Category { id: "sports", name: "Sports", slug: "sports" },
    Category { id: "western", name: "Western", slug: "western" },
    Category { id: "war-politics", name: "War & Politics", slug: "war-politics" },
];

// menu and heading texts that the generic item selectors tend to pick up as titles
const GENERIC_LABELS: &[&str] = &[
    "movie",
    "film",
    "video",
    "item",
    "genre",
    "genres",
    "category",
    "categories",
    "latest movies",
    "year",
    "all movies",
];

pub fn find_category(id: &str) -> Option<&'static Category> {
    KNOWN_CATEGORIES.iter().find(|c| c.id == id)
}

/// true when `text` is a category name or a generic section label, ignoring case
pub fn is_category_label(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    KNOWN_CATEGORIES
        .iter()
        .any(|c| c.name.to_lowercase() == lowered)
        || GENERIC_LABELS.contains(&lowered.as_str())
}
