use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::application::IntentClassifier;
use crate::domain::{Classification, DomainError, FollowUp, Intent, Turn};

const REFUND_PATTERN: &str = r"(?i)\b(refunds?|refunded|refunding|money back|reimburse\w*|charged? ?back|return(?:ing)? (?:my|the|a|an|these|those)|unhappy with|wrong purchase|bought by mistake)\b";

const MUSIC_PATTERN: &str = r"(?i)\b(songs?|tracks?|albums?|artists?|bands?|singers?|genres?|music|catalog(?:ue)?|playlist|recommend\w*|suggest\w*|similar|listen\w*|rock|metal|jazz|pop|blues|classical|reggae|latin|hip hop|(?:19|20)?\d0'?s|who (?:sang|sings|wrote|recorded))\b";

/// Clause boundaries inside one message: sentence punctuation and the
/// connectives customers use to chain two requests.
const CLAUSE_PATTERN: &str = r"(?i)[.;!?]+\s+|\s*,?\s*\b(?:and then|and also|and|also|then|plus|after that)\b\s*";

/// An [`IntentClassifier`] driven by keyword rules, so the assistant runs
/// without any model.
///
/// The message is cut into clauses. A clause mentioning refunds or returns is a
/// refund request; one naming songs, artists, genres or eras is a catalog
/// question; anything else (greetings, thanks, "what can you do?") is general.
/// When both kinds of clause are present the refund comes first and the
/// catalog clauses become the follow-up.
pub struct RuleBasedIntentClassifier {
    refund: Regex,
    music: Regex,
    clauses: Regex,
}

impl RuleBasedIntentClassifier {
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self {
            refund: compile(REFUND_PATTERN, "refund")?,
            music: compile(MUSIC_PATTERN, "music")?,
            clauses: compile(CLAUSE_PATTERN, "clause")?,
        })
    }

    fn label(&self, clause: &str) -> Option<Intent> {
        if self.refund.is_match(clause) {
            Some(Intent::Refund)
        } else if self.music.is_match(clause) {
            Some(Intent::MusicQuery)
        } else {
            None
        }
    }

    fn split<'a>(&self, utterance: &'a str) -> Vec<&'a str> {
        self.clauses
            .split(utterance)
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .collect()
    }

    fn classify_text(&self, utterance: &str) -> Classification {
        let labelled: Vec<(Intent, &str)> = self
            .split(utterance)
            .into_iter()
            .filter_map(|clause| self.label(clause).map(|intent| (intent, clause)))
            .collect();

        let has_refund = labelled.iter().any(|(intent, _)| *intent == Intent::Refund);
        let music: Vec<&str> = labelled
            .iter()
            .filter(|(intent, _)| *intent == Intent::MusicQuery)
            .map(|(_, clause)| *clause)
            .collect();

        match (has_refund, music.is_empty()) {
            (true, false) => Classification::new(Intent::Refund)
                .with_follow_up(FollowUp::new(Intent::MusicQuery, music.join(" and "))),
            (true, true) => Classification::new(Intent::Refund),
            (false, false) => Classification::new(Intent::MusicQuery),
            (false, true) => Classification::new(Intent::General),
        }
    }
}

fn compile(pattern: &str, name: &str) -> Result<Regex, DomainError> {
    Regex::new(pattern).map_err(|e| DomainError::internal(format!("Failed to compile {} pattern: {}", name, e)))
}

#[async_trait]
impl IntentClassifier for RuleBasedIntentClassifier {
    async fn classify(&self, utterance: &str, _history: &[Turn]) -> Result<Classification, DomainError> {
        let classification = self.classify_text(utterance);
        debug!(
            "RuleBasedIntentClassifier: '{}' -> {} (follow-up: {:?})",
            utterance,
            classification.intent(),
            classification.follow_up().map(|f| f.intent)
        );
        Ok(classification)
    }
}
