use serde::Deserialize;
use validator::Validate;

use crate::catalog::model::Language;
use crate::server::services::media_services::MediaLookup;

#[derive(Debug, Deserialize, Validate)]
pub struct MediaQuery {
    #[validate(url)]
    pub url: String,

    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(equal = 4))]
    pub year: Option<String>,

    /// comma separated, e.g. `Hindi,English`
    pub languages: Option<String>,
}

impl MediaQuery {
    pub fn into_lookup(self) -> MediaLookup {
        let languages = self
            .languages
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|raw| Language::detect(&[raw]))
            .fold(Vec::new(), |mut acc, language| {
                if !acc.contains(&language) {
                    acc.push(language);
                }
                acc
            });

        MediaLookup {
            detail_url: self.url,
            title: self.title,
            year: self.year,
            languages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_are_parsed_in_order() {
        let query = MediaQuery {
            url: "https://catalog.example/troll-2/".to_string(),
            title: Some("Troll 2".to_string()),
            year: None,
            languages: Some("hindi, English,klingon,Hindi".to_string()),
        };
        let lookup = query.into_lookup();
        assert_eq!(lookup.languages, vec![Language::Hindi, Language::English]);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let query = MediaQuery {
            url: "not a url".to_string(),
            title: None,
            year: Some("25".to_string()),
            languages: None,
        };
        assert!(query.validate().is_err());
    }
}
