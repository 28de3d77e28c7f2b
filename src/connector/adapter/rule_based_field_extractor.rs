use std::ops::Range;

use async_trait::async_trait;
use regex::{Captures, Regex};
use tracing::debug;

use crate::application::FieldExtractor;
use crate::domain::{CatalogKind, CatalogQuery, DomainError, Era, RefundFields};

const LINE_IDS: &str = r"(?i)\b(?:invoice\s+)?lines?\s*(?:ids?|numbers?|nos?\.?)?\s*#?\s*(\d+(?:\s*(?:,|&|and|\s)\s*#?\d+)*)";
const INVOICE_ID: &str = r"(?i)\binvoice\s*(?:id|number|no\.?|num)?\s*(?:is|:)?\s*#?\s*(\d+)";
const HASH_ID: &str = r"#\s*(\d+)";
const ISO_DATE: &str = r"\b(\d{4}-\d{2}-\d{2})\b";
const PHONE: &str = r"\+?\(?\d[\d\s().-]{5,}\d";
const NAME_INTRO: &str = r"(?i)\b(?:my name is|my name's|name is|name:)\s+([a-z][a-z'-]*(?:\s+[a-z][a-z'-]*){0,3})";
const SELF_INTRO: &str = r"\b(?:[Ii] am|I'm|[Tt]his is|[Ii]t's)\s+([A-Z][a-zA-Z'-]*(?:\s+[A-Z][a-zA-Z'-]*){1,3})";
const CLAUSE_NAME: &str = r"(?:^|[,;:])\s*([A-Z][a-zA-Z'-]*(?:\s+[A-Z][a-zA-Z'-]*){1,3})\b";
const OWNED_ARTIST: &str = r"\b(?i:the|my|those|these|all the|all my)\s+([A-Z0-9][\w'&./-]*(?:\s+[A-Z0-9][\w'&./-]*){0,3})\s+(?i:songs?|tracks?|albums?|music|purchases?)\b";
const BY_ARTIST: &str = r"(?i)\bby\s+(.+?)(?:\s+(?:from|in|released|between|during|that|which|and|or|please)\b|[,;!?]|\.\s|\.$|$)";
const SIMILAR_TO: &str = r"(?i)\b(?:similar to|sounds? like|music like|songs like|tracks like|artists like|bands like|such as)\s+(.+?)(?:\s+(?:from|in|released|between|during|that|which|and|or|please)\b|[,;!?]|\.\s|\.$|$)";
const WANTS_SIMILAR: &str = r"(?i)\b(similar|recommend\w*|suggest\w*|something like|more like)\b";
const ALBUM_TITLE: &str = r#"(?i)\b(?:from|on|off)\s+(?:the\s+)?album\s+["“]?(.+?)["”]?(?:\s+(?:by|from|in|and|please)\b|[,;!?]|\.\s|\.$|$)"#;
const TRACK_TITLE: &str = r#"(?i)\b(?:song|track)\s+(?:called|named|titled)\s+["“]?(.+?)["”]?(?:\s+(?:by|from|on|in|and|please)\b|[,;!?]|\.\s|\.$|$)"#;
const QUOTED: &str = r#"["“]([^"”]+)["”]"#;
const YEAR_RANGE: &str = r"(?i)\b((?:19|20)\d{2})\s*(?:-|to|and|until|through)\s*((?:19|20)\d{2})\b";
const DECADE: &str = r"(?i)\b((?:19|20)?\d)0'?s\b";
const YEAR: &str = r"\b((?:19|20)\d{2})\b";
const ALBUMS: &str = r"(?i)\balbums\b|\b(?:which|what|any|some)\s+albums?\b";

/// Genres recognised in free text, mapped to the catalog's spelling.
const GENRES: &[(&str, &str)] = &[
    ("heavy metal", "Metal"),
    ("metal", "Metal"),
    ("hard rock", "Rock"),
    ("rock", "Rock"),
    ("jazz", "Jazz"),
    ("pop", "Pop"),
    ("blues", "Blues"),
    ("classical", "Classical"),
    ("reggae", "Reggae"),
    ("latin", "Latin"),
    ("alternative", "Alternative"),
    ("hip hop", "Hip Hop/Rap"),
    ("rap", "Hip Hop/Rap"),
    ("soundtrack", "Soundtrack"),
    ("electronic", "Electronica/Dance"),
];

/// Capitalised words that start sentences but never a customer's name.
const NOT_NAMES: &[&str] = &[
    "yes", "yeah", "yep", "no", "nope", "never", "mind", "please", "thanks", "thank", "hi", "hello", "hey",
    "refund", "refunds", "cancel", "stop", "ok", "okay", "sure", "sorry", "the", "my", "i", "i'm", "invoice",
    "line", "lines", "phone", "number", "can", "could", "would", "what", "which", "who", "find", "show",
    "recommend", "just", "only", "all", "both", "it", "this", "that", "and", "but", "also", "then",
];

/// Filler stripped from catalog questions before the rest is used as
/// free-text search. Longest phrases first.
const FILLER_PHRASES: &[&str] = &[
    "do you have any",
    "do you have",
    "can you find me",
    "can you find",
    "can you show me",
    "i'm looking for",
    "i am looking for",
    "i want to hear",
    "i'd like to hear",
    "what are some",
    "what are",
    "are there any",
    "is there any",
    "show me",
    "find me",
    "give me",
    "look up",
    "search for",
    "tell me about",
];

const STOP_WORDS: &[&str] = &[
    "find", "show", "get", "give", "list", "search", "look", "what", "which", "who", "any", "some", "all",
    "the", "a", "an", "of", "for", "from", "in", "on", "to", "with", "by", "and", "or", "is", "are", "do",
    "you", "have", "me", "i", "please", "song", "songs", "track", "tracks", "album", "albums", "music",
    "artist", "artists", "band", "bands", "something", "anything", "good", "great", "best", "new", "more",
];

/// A [`FieldExtractor`] built from regular expressions and keyword lists.
///
/// Refund details: invoice ids (`invoice #256`, `#256`), invoice lines
/// (`lines 270 and 271`), phone numbers of seven digits or more, names given
/// as "my name is ..." or as the capitalised words a reply starts with, the
/// artist of "the Queen songs", quoted track titles and ISO dates.
///
/// Catalog criteria: `by <artist>`, `similar to <artist>`, genres from a
/// fixed list, decades (`80s`, `1980s`), years and year ranges, album or
/// track titles, and whether albums rather than tracks are wanted. Whatever
/// remains after stripping filler becomes free text when nothing structured
/// was found.
pub struct RuleBasedFieldExtractor {
    line_ids: Regex,
    invoice_id: Regex,
    hash_id: Regex,
    iso_date: Regex,
    phone: Regex,
    name_intro: Regex,
    self_intro: Regex,
    clause_name: Regex,
    owned_artist: Regex,
    by_artist: Regex,
    similar_to: Regex,
    wants_similar: Regex,
    album_title: Regex,
    track_title: Regex,
    quoted: Regex,
    year_range: Regex,
    decade: Regex,
    year: Regex,
    albums: Regex,
    digits: Regex,
}

impl RuleBasedFieldExtractor {
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self {
            line_ids: compile(LINE_IDS)?,
            invoice_id: compile(INVOICE_ID)?,
            hash_id: compile(HASH_ID)?,
            iso_date: compile(ISO_DATE)?,
            phone: compile(PHONE)?,
            name_intro: compile(NAME_INTRO)?,
            self_intro: compile(SELF_INTRO)?,
            clause_name: compile(CLAUSE_NAME)?,
            owned_artist: compile(OWNED_ARTIST)?,
            by_artist: compile(BY_ARTIST)?,
            similar_to: compile(SIMILAR_TO)?,
            wants_similar: compile(WANTS_SIMILAR)?,
            album_title: compile(ALBUM_TITLE)?,
            track_title: compile(TRACK_TITLE)?,
            quoted: compile(QUOTED)?,
            year_range: compile(YEAR_RANGE)?,
            decade: compile(DECADE)?,
            year: compile(YEAR)?,
            albums: compile(ALBUMS)?,
            digits: compile(r"\d+")?,
        })
    }

    fn refund_fields(&self, utterance: &str) -> RefundFields {
        let mut fields = RefundFields::new();
        let mut masked = utterance.to_string();

        if let Some((ids, range)) = first_group(&self.line_ids, &masked) {
            fields.invoice_line_ids = self.numbers(&ids);
            blank(&mut masked, range);
        }
        if let Some((id, range)) = first_group(&self.invoice_id, &masked).or_else(|| first_group(&self.hash_id, &masked)) {
            match id.parse() {
                Ok(invoice_id) => fields.invoice_id = Some(invoice_id),
                Err(_) => fields.invoice_reference = Some(id),
            }
            blank(&mut masked, range);
        }
        if let Some((date, range)) = first_group(&self.iso_date, &masked) {
            fields.purchase_date = Some(date);
            blank(&mut masked, range);
        }
        let phone = self
            .phone
            .find_iter(&masked)
            .find(|m| m.as_str().chars().filter(char::is_ascii_digit).count() >= 7)
            .map(|m| (m.as_str().trim().to_string(), m.range()));
        if let Some((phone, range)) = phone {
            fields.phone = Some(phone);
            blank(&mut masked, range);
        }

        fields.customer_name = self.customer_name(&masked);
        fields.track_name = first_group(&self.quoted, &masked)
            .or_else(|| first_group(&self.track_title, &masked))
            .map(|(track, _)| track);
        fields.album_title = first_group(&self.album_title, &masked).map(|(album, _)| album);
        fields.artist_name = first_group(&self.owned_artist, &masked)
            .or_else(|| first_group(&self.by_artist, &masked))
            .map(|(artist, _)| artist);
        fields
    }

    /// First plausible name: an introduction wins over capitalised words
    /// opening the message or one of its comma-separated parts.
    fn customer_name(&self, text: &str) -> Option<String> {
        [&self.name_intro, &self.self_intro, &self.clause_name]
            .into_iter()
            .flat_map(|re| {
                re.captures_iter(text)
                    .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
                    .collect::<Vec<_>>()
            })
            .find_map(|candidate| name_from(&candidate))
    }

    fn catalog_query(&self, utterance: &str) -> CatalogQuery {
        let mut query = CatalogQuery::new();
        let mut masked = utterance.to_string();

        let similar_reference = first_group(&self.similar_to, &masked).map(|(reference, range)| {
            blank(&mut masked, range);
            reference
        });
        let wants_similar = similar_reference.is_some() || self.wants_similar.is_match(utterance);

        if let Some((album, range)) = first_group(&self.album_title, &masked) {
            query = query.with_album(album);
            blank(&mut masked, range);
        }
        if let Some((track, range)) = first_group(&self.track_title, &masked).or_else(|| first_group(&self.quoted, &masked)) {
            query = query.with_track(track);
            blank(&mut masked, range);
        }
        if let Some((artist, range)) = first_group(&self.by_artist, &masked) {
            query = query.with_artist(artist);
            blank(&mut masked, range);
        }

        let range_years = self.year_range.captures(&masked).map(|caps| {
            (caps[1].parse::<i32>().ok(), caps[2].parse::<i32>().ok(), span(&caps))
        });
        if let Some((from, to, range)) = range_years {
            if let (Some(from), Some(to)) = (from, to) {
                query = query.with_era(Era::new(from, to));
            }
            blank(&mut masked, range);
        } else if let Some((prefix, range)) = first_group(&self.decade, &masked) {
            if let Some(start) = decade_start(&prefix) {
                query = query.with_era(Era::decade(start));
            }
            blank(&mut masked, range);
        } else if let Some((year, range)) = first_group(&self.year, &masked) {
            if let Ok(year) = year.parse() {
                query = query.with_era(Era::year(year));
            }
            blank(&mut masked, range);
        }

        let lowered = masked.to_lowercase();
        if let Some((keyword, genre)) = GENRES.iter().find(|(keyword, _)| contains_word(&lowered, keyword)) {
            query = query.with_genre(*genre);
            masked = remove_word(&masked, keyword);
        }

        if self.albums.is_match(utterance) {
            query = query.with_kind(CatalogKind::Albums);
        }

        if let Some(reference) = similar_reference {
            query = query.similar_to(reference);
        } else if wants_similar {
            query = query.wanting_similar();
        }

        if !query.has_criteria() && !query.wants_similar() {
            if let Some(text) = free_text(&masked) {
                query = query.with_text(text);
            }
        }
        query
    }

    fn numbers(&self, text: &str) -> Vec<i64> {
        self.digits
            .find_iter(text)
            .filter_map(|m| m.as_str().parse().ok())
            .collect()
    }
}

fn compile(pattern: &str) -> Result<Regex, DomainError> {
    Regex::new(pattern).map_err(|e| DomainError::internal(format!("Failed to compile pattern {}: {}", pattern, e)))
}

fn span(caps: &Captures<'_>) -> Range<usize> {
    caps.get(0).map(|m| m.range()).unwrap_or(0..0)
}

/// The trimmed first capture group and the span of the whole match.
fn first_group(re: &Regex, text: &str) -> Option<(String, Range<usize>)> {
    let caps = re.captures(text)?;
    let group = caps.get(1)?.as_str().trim().to_string();
    Some((group, span(&caps)))
}

/// Overwrites a byte range with spaces, keeping every other offset valid.
fn blank(text: &mut String, range: Range<usize>) {
    if range.end <= text.len() && text.is_char_boundary(range.start) && text.is_char_boundary(range.end) {
        let width = range.end - range.start;
        text.replace_range(range, &" ".repeat(width));
    }
}

/// At least two leading words that are not greetings, answers or keywords.
fn name_from(candidate: &str) -> Option<String> {
    let words: Vec<&str> = candidate
        .split_whitespace()
        .take_while(|word| !NOT_NAMES.contains(&word.to_lowercase().as_str()))
        .collect();
    if words.len() < 2 {
        return None;
    }
    Some(words.iter().map(|w| capitalize(w)).collect::<Vec<_>>().join(" "))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `"8"` is the 1980s, `"198"` too, `"0"`/`"1"`/`"2"` are this century.
fn decade_start(prefix: &str) -> Option<i32> {
    let value: i32 = prefix.parse().ok()?;
    Some(match prefix.len() {
        1 if value <= 2 => 2000 + value * 10,
        1 => 1900 + value * 10,
        _ => value * 10,
    })
}

fn contains_word(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(at, _)| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn remove_word(text: &str, phrase: &str) -> String {
    let lowered = text.to_lowercase();
    match lowered.find(phrase) {
        Some(at) if lowered.len() == text.len() => {
            format!("{}{}", &text[..at], &text[at + phrase.len()..])
        }
        _ => text.to_string(),
    }
}

fn free_text(text: &str) -> Option<String> {
    let mut lowered = format!(" {} ", text.to_lowercase());
    for phrase in FILLER_PHRASES {
        lowered = lowered.replace(&format!(" {} ", phrase), " ");
    }
    let words: Vec<&str> = lowered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

#[async_trait]
impl FieldExtractor for RuleBasedFieldExtractor {
    async fn extract_refund_fields(&self, utterance: &str) -> Result<RefundFields, DomainError> {
        let fields = self.refund_fields(utterance);
        debug!("RuleBasedFieldExtractor refund fields: {:?}", fields);
        Ok(fields)
    }

    async fn extract_catalog_criteria(&self, utterance: &str) -> Result<CatalogQuery, DomainError> {
        let query = self.catalog_query(utterance);
        debug!("RuleBasedFieldExtractor catalog criteria: {}", query.describe());
        Ok(query)
    }
}
