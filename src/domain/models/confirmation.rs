/// A yes/no answer to a question the assistant asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Affirm,
    Decline,
}

const DECLINE_PHRASES: &[&str] = &[
    "never mind",
    "nevermind",
    "forget it",
    "don't bother",
    "do not bother",
    "not anymore",
];

const DECLINE_WORDS: &[&str] = &["no", "nope", "nah", "cancel", "stop", "abort"];

const AFFIRM_PHRASES: &[&str] = &["go ahead", "do it", "please do", "that's right", "sounds good"];

const AFFIRM_WORDS: &[&str] = &[
    "yes", "yeah", "yep", "yup", "sure", "ok", "okay", "confirm", "confirmed", "correct", "please",
];

impl Confirmation {
    /// Reads a yes/no out of a short reply. Declines are checked first so
    /// "no, cancel that, yes I'm sure" is treated as a decline.
    pub fn detect(utterance: &str) -> Option<Self> {
        let lowered = utterance.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect();

        if DECLINE_PHRASES.iter().any(|p| lowered.contains(p))
            || words.iter().any(|w| DECLINE_WORDS.contains(w))
        {
            return Some(Confirmation::Decline);
        }
        if AFFIRM_PHRASES.iter().any(|p| lowered.contains(p))
            || words.iter().any(|w| AFFIRM_WORDS.contains(w))
        {
            return Some(Confirmation::Affirm);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_plain_answers() {
        assert_eq!(Confirmation::detect("Yes please"), Some(Confirmation::Affirm));
        assert_eq!(Confirmation::detect("ok, go ahead"), Some(Confirmation::Affirm));
        assert_eq!(Confirmation::detect("No."), Some(Confirmation::Decline));
        assert_eq!(Confirmation::detect("never mind"), Some(Confirmation::Decline));
    }

    #[test]
    fn decline_wins_over_affirm() {
        assert_eq!(Confirmation::detect("no, cancel it"), Some(Confirmation::Decline));
        assert_eq!(Confirmation::detect("yes... actually no"), Some(Confirmation::Decline));
    }

    #[test]
    fn substrings_do_not_count() {
        assert_eq!(Confirmation::detect("I know the invoice"), None);
        assert_eq!(Confirmation::detect("Aaron Mitchell"), None);
    }
}
