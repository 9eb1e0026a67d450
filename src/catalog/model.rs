use serde::{Deserialize, Serialize};

/// audio languages the listing site publishes separate uploads for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Hindi,
    English,
}

impl Language {
    /// assumed when nothing in the title or link names a language
    pub const DEFAULT: Language = Language::English;

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hindi => "Hindi",
            Self::English => "English",
        }
    }

    /// ISO 639-1 code, used for subtitle tracks
    pub fn code(&self) -> &'static str {
        match self {
            Self::Hindi => "hi",
            Self::English => "en",
        }
    }

    /// hindi wins when both show up, same as the site's own tagging
    pub fn detect(haystacks: &[&str]) -> Option<Language> {
        let lowered: Vec<String> = haystacks.iter().map(|h| h.to_lowercase()).collect();

        if lowered.iter().any(|h| h.contains("hindi")) {
            Some(Self::Hindi)
        } else if lowered.iter().any(|h| h.contains("english")) {
            Some(Self::English)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub language: Language,
    pub source_url: String,
    pub label: String,
}

impl AudioTrack {
    pub fn new(language: Language, source_url: impl Into<String>) -> Self {
        Self {
            language,
            source_url: source_url.into(),
            label: language.label().to_string(),
        }
    }
}

/// one deduplicated piece of browsable content
///
/// built once per listing parse, only `audio_tracks` and a missing `image_url` are touched while
/// later duplicates of the same title are folded in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub year: Option<String>,
    pub image_url: Option<String>,
    pub detail_url: String,
    pub rating: Option<String>,
    pub runtime: Option<String>,
    pub genres: Vec<String>,
    pub audio_tracks: Vec<AudioTrack>,
}

impl CatalogEntry {
    pub fn has_language(&self, language: Language) -> bool {
        self.audio_tracks.iter().any(|t| t.language == language)
    }

    /// adds a track unless that language is already present, returns whether it was added
    pub fn add_audio_track(&mut self, track: AudioTrack) -> bool {
        if self.has_language(track.language) {
            return false;
        }
        self.audio_tracks.push(track);
        true
    }

    /// missing or obviously placeholder poster art
    pub fn needs_poster(&self) -> bool {
        match self.image_url.as_deref() {
            None => true,
            Some(url) => url.contains("placeholder") || url.contains("No Image"),
        }
    }
}

/// result of one listing page parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    pub entries: Vec<CatalogEntry>,
    pub max_page: u32,
    /// true when `max_page` is the fixed guess used for pages without page links
    pub max_page_estimated: bool,
}

/// the order entries are shown in, newest year first, yearless entries last
///
/// stable, so ties keep document order
pub fn sort_by_year_desc(entries: &mut [CatalogEntry]) {
    entries.sort_by(|a, b| {
        let a_year = a.year.as_deref().and_then(|y| y.parse::<u16>().ok());
        let b_year = b.year.as_deref().and_then(|y| y.parse::<u16>().ok());
        match (a_year, b_year) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// a direct media file was found
    Stream,
    /// nothing playable, the client should open the detail page instead
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    pub url: String,
    pub language: String,
    pub label: String,
}

impl SubtitleTrack {
    /// language comes from the `-Hindi` / `-English` file name convention
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let (language, label) = if url.contains("-Hindi") {
            (Language::Hindi.code(), Language::Hindi.label())
        } else if url.contains("-English") {
            (Language::English.code(), Language::English.label())
        } else {
            (Language::English.code(), "Subtitles")
        };

        Self {
            url,
            language: language.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAudioTrack {
    pub language: Language,
    pub label: String,
    pub source_url: String,
    pub media_url: String,
}

/// playable target for one entry, built on demand and never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaReference {
    pub media_url: String,
    pub kind: MediaKind,
    pub subtitle_urls: Vec<SubtitleTrack>,
    pub audio_tracks: Vec<ResolvedAudioTrack>,
}

impl MediaReference {
    /// every url the client will be handed, for rewriting into relay links
    pub fn map_urls(mut self, rewrite: impl Fn(&str) -> String) -> Self {
        // link kind points at the detail page, which the client opens as is
        let is_stream = self.kind == MediaKind::Stream;

        if is_stream {
            self.media_url = rewrite(&self.media_url);
        }
        for subtitle in &mut self.subtitle_urls {
            subtitle.url = rewrite(&subtitle.url);
        }
        for track in &mut self.audio_tracks {
            if is_stream {
                track.media_url = rewrite(&track.media_url);
            }
        }
        self
    }
}

/// a poster generated after the page was already handed out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterUpdate {
    pub entry_id: String,
    pub image_url: String,
}
