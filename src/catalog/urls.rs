//! URL and slug helpers shared by the field parser and the video locator.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex should compile"));

/// links that exist only to be clicked by scripts
pub fn is_placeholder_link(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.to_lowercase().starts_with("javascript:")
}

/// resolves `raw` against `origin`, handling protocol relative (`//host/x`) and root relative
/// (`/x`) forms. `origin` is expected without a trailing slash.
pub fn resolve_url(raw: &str, origin: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_placeholder_link(trimmed) {
        return None;
    }

    let origin = origin.trim_end_matches('/');
    let resolved = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{}", rest)
    } else if trimmed.starts_with('/') {
        format!("{}{}", origin, trimmed)
    } else {
        format!("{}/{}", origin, trimmed)
    };

    Some(resolved)
}

/// absolute http(s) url with a host
pub fn is_absolute_http_url(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// `scheme://host[:port]` of a url, without a trailing slash
pub fn origin_of(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization())
}

/// lower case, runs of anything non alphanumeric collapsed to `-`
pub fn slugify(text: &str) -> String {
    NON_SLUG_CHARS
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// `troll-2` -> `Troll-2`, the casing the media origin uses for file names
pub fn title_case_slug(slug: &str) -> String {
    slug.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://catalog.example";

    #[test]
    fn resolves_relative_forms() {
        assert_eq!(
            resolve_url("//cdn.example/a.jpg", ORIGIN).as_deref(),
            Some("https://cdn.example/a.jpg")
        );
        assert_eq!(
            resolve_url("/troll-2/", ORIGIN).as_deref(),
            Some("https://catalog.example/troll-2/")
        );
        assert_eq!(
            resolve_url("troll-2/", ORIGIN).as_deref(),
            Some("https://catalog.example/troll-2/")
        );
        assert_eq!(
            resolve_url("http://x.example/a", ORIGIN).as_deref(),
            Some("http://x.example/a")
        );
    }

    #[test]
    fn placeholders_do_not_resolve() {
        assert_eq!(resolve_url("#", ORIGIN), None);
        assert_eq!(resolve_url("  ", ORIGIN), None);
        assert_eq!(resolve_url("javascript:void(0)", ORIGIN), None);
    }

    #[test]
    fn slug_and_title_case() {
        assert_eq!(slugify("Troll 2: The Return!"), "troll-2-the-return");
        assert_eq!(title_case_slug("troll-2-the-return"), "Troll-2-The-Return");
    }

    #[test]
    fn origin_strips_path() {
        assert_eq!(
            origin_of("https://media.example:8443/movies/x.mp4").as_deref(),
            Some("https://media.example:8443")
        );
        assert_eq!(origin_of("not a url"), None);
    }
}
