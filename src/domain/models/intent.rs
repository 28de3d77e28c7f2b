use std::fmt;

use serde::{Deserialize, Serialize};

/// What the customer is trying to do in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Refund,
    MusicQuery,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Refund => "refund",
            Intent::MusicQuery => "music_query",
            Intent::General => "general",
        }
    }

    /// Lenient parse of a label produced by a classifier.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "refund" | "refunds" | "return" => Some(Intent::Refund),
            "music_query" | "music" | "catalog" | "question_answering" => Some(Intent::MusicQuery),
            "general" | "hello" | "greeting" | "other" => Some(Intent::General),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secondary sub-intent split off a mixed-intent utterance, kept until the
/// primary intent resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub intent: Intent,
    pub text: String,
}

impl FollowUp {
    pub fn new(intent: Intent, text: impl Into<String>) -> Self {
        Self {
            intent,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    intent: Intent,
    follow_up: Option<FollowUp>,
}

impl Classification {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            follow_up: None,
        }
    }

    pub fn with_follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn follow_up(&self) -> Option<&FollowUp> {
        self.follow_up.as_ref()
    }

    pub fn into_parts(self) -> (Intent, Option<FollowUp>) {
        (self.intent, self.follow_up)
    }

    /// Puts a refund sub-intent first. The other half becomes the follow-up
    /// and keeps its own text; the refund itself is extracted from the whole
    /// utterance, so `utterance` stands in for the displaced primary.
    pub fn refund_first(self, utterance: &str) -> Self {
        match self.follow_up {
            Some(follow_up) if follow_up.intent == Intent::Refund && self.intent != Intent::Refund => {
                Self {
                    intent: Intent::Refund,
                    follow_up: Some(FollowUp::new(self.intent, utterance)),
                }
            }
            follow_up => Self {
                intent: self.intent,
                follow_up,
            },
        }
    }
}
