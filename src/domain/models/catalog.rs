use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive range of release years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Era {
    pub from_year: i32,
    pub to_year: i32,
}

impl Era {
    pub fn new(from_year: i32, to_year: i32) -> Self {
        Self {
            from_year: from_year.min(to_year),
            to_year: from_year.max(to_year),
        }
    }

    pub fn year(year: i32) -> Self {
        Self::new(year, year)
    }

    pub fn decade(start: i32) -> Self {
        let start = start - start.rem_euclid(10);
        Self::new(start, start + 9)
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.from_year..=self.to_year).contains(&year)
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from_year == self.to_year {
            write!(f, "{}", self.from_year)
        } else if self.from_year % 10 == 0 && self.to_year == self.from_year + 9 {
            write!(f, "the {}s", self.from_year)
        } else {
            write!(f, "{}-{}", self.from_year, self.to_year)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    #[default]
    Tracks,
    Albums,
}

/// Criteria for a catalog lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
    text: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    track: Option<String>,
    genre: Option<String>,
    era: Option<Era>,
    similar_to_artist: Option<String>,
    wants_similar: bool,
    kind: CatalogKind,
    limit: usize,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogQuery {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn new() -> Self {
        Self {
            text: None,
            artist: None,
            album: None,
            track: None,
            genre: None,
            era: None,
            similar_to_artist: None,
            wants_similar: false,
            kind: CatalogKind::Tracks,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = non_blank(text.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = non_blank(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = non_blank(album.into());
        self
    }

    pub fn with_track(mut self, track: impl Into<String>) -> Self {
        self.track = non_blank(track.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = non_blank(genre.into());
        self
    }

    pub fn with_era(mut self, era: Era) -> Self {
        self.era = Some(era);
        self
    }

    /// Recommendations: tracks sharing a genre with `artist`, by other artists.
    /// Replaces any plain artist filter, which would contradict it.
    pub fn similar_to(mut self, artist: impl Into<String>) -> Self {
        self.similar_to_artist = non_blank(artist.into());
        self.artist = None;
        self.wants_similar = true;
        self
    }

    /// Marks the query as a request for recommendations whose reference
    /// artist still has to come from conversation context.
    pub fn wanting_similar(mut self) -> Self {
        self.wants_similar = true;
        self
    }

    pub fn with_kind(mut self, kind: CatalogKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn track(&self) -> Option<&str> {
        self.track.as_deref()
    }

    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    pub fn era(&self) -> Option<Era> {
        self.era
    }

    pub fn similar_to_artist(&self) -> Option<&str> {
        self.similar_to_artist.as_deref()
    }

    pub fn wants_similar(&self) -> bool {
        self.wants_similar
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn has_criteria(&self) -> bool {
        self.text.is_some()
            || self.artist.is_some()
            || self.album.is_some()
            || self.track.is_some()
            || self.genre.is_some()
            || self.era.is_some()
            || self.similar_to_artist.is_some()
    }

    /// Short human description used in replies, e.g. `rock tracks by Queen`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(genre) = &self.genre {
            out.push_str(genre);
            out.push(' ');
        }
        out.push_str(match self.kind {
            CatalogKind::Tracks => "tracks",
            CatalogKind::Albums => "albums",
        });
        if let Some(artist) = &self.similar_to_artist {
            out.push_str(&format!(" similar to {}", artist));
        }
        if let Some(artist) = &self.artist {
            out.push_str(&format!(" by {}", artist));
        }
        if let Some(album) = &self.album {
            out.push_str(&format!(" from \"{}\"", album));
        }
        if let Some(track) = &self.track {
            out.push_str(&format!(" named \"{}\"", track));
        }
        if let Some(era) = &self.era {
            out.push_str(&format!(" from {}", era));
        }
        if let Some(text) = &self.text {
            out.push_str(&format!(" matching \"{}\"", text));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub track_id: i64,
    pub name: String,
    pub album_title: String,
    pub artist_name: String,
    pub genre: Option<String>,
    pub milliseconds: i64,
    pub unit_price: f64,
    pub release_year: Option<i32>,
}

impl TrackSummary {
    /// `m:ss`
    pub fn duration(&self) -> String {
        let seconds = self.milliseconds.max(0) / 1000;
        format!("{}:{:02}", seconds / 60, seconds % 60)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub album_id: i64,
    pub title: String,
    pub artist_name: String,
    pub release_year: Option<i32>,
    pub track_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEntry {
    Track(TrackSummary),
    Album(AlbumSummary),
}

impl CatalogEntry {
    pub fn artist_name(&self) -> &str {
        match self {
            CatalogEntry::Track(track) => &track.artist_name,
            CatalogEntry::Album(album) => &album.artist_name,
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
