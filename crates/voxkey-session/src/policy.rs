//! Submission policy: key-phrase matching and duplicate suppression.
//!
//! A key phrase submits only when the whole finalized utterance matches it
//! exactly, compared case-insensitively. Duplicate suppression tracks the
//! last finalized text and applies uniformly in every mode; a phrase match
//! always submits even when its display is suppressed.

use std::collections::HashSet;

use voxkey_core::types::ListenMode;

/// Default key phrases.
pub const DEFAULT_PHRASES: &[&str] = &["Send it", "I'm done talking", "That's it"];

/// Case-insensitive set of key phrases.
#[derive(Debug, Clone, Default)]
pub struct KeyPhraseSet {
    phrases: HashSet<String>,
}

impl KeyPhraseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        for phrase in DEFAULT_PHRASES {
            set.add(phrase);
        }
        set
    }

    pub fn from_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for phrase in phrases {
            set.add(phrase.as_ref());
        }
        set
    }

    /// Add a phrase. Stored lowercased and trimmed; blank phrases are
    /// ignored.
    pub fn add(&mut self, phrase: &str) {
        let normalized = phrase.trim().to_lowercase();
        if !normalized.is_empty() {
            self.phrases.insert(normalized);
        }
    }

    /// Whether the whole utterance matches a phrase exactly
    /// (case-insensitive). Utterances that merely contain a phrase do not
    /// match.
    pub fn matches(&self, utterance: &str) -> bool {
        self.phrases.contains(&utterance.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

/// What to do with one finalized utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    /// Deliver this text, if any.
    pub display: Option<String>,
    /// Run the submit action after delivery.
    pub submit: bool,
    /// The utterance matched a key phrase.
    pub phrase_matched: bool,
    /// The utterance repeated the previous one and its display was
    /// suppressed.
    pub duplicate: bool,
}

/// Decides display and submission for finalized utterances.
#[derive(Debug, Default)]
pub struct SubmissionPolicy {
    /// Whether a matched phrase is also typed out before submitting.
    pub show_phrase: bool,
    last_final: Option<String>,
}

impl SubmissionPolicy {
    pub fn new(show_phrase: bool) -> Self {
        Self {
            show_phrase,
            last_final: None,
        }
    }

    /// Evaluate one finalized utterance under the active mode.
    ///
    /// Expects text already normalized by the decoder (trimmed,
    /// lowercased).
    pub fn evaluate(
        &mut self,
        text: &str,
        mode: ListenMode,
        phrases: &KeyPhraseSet,
    ) -> PolicyOutcome {
        let phrase_matched = mode == ListenMode::KeyPhrase && phrases.matches(text);
        let duplicate = self.last_final.as_deref() == Some(text);
        self.last_final = Some(text.to_string());

        if phrase_matched {
            // A phrase always submits; display follows show_phrase and the
            // duplicate rule.
            let display = if self.show_phrase && !duplicate {
                Some(text.to_string())
            } else {
                None
            };
            return PolicyOutcome {
                display,
                submit: true,
                phrase_matched: true,
                duplicate,
            };
        }

        if duplicate {
            return PolicyOutcome {
                display: None,
                submit: false,
                phrase_matched: false,
                duplicate: true,
            };
        }

        PolicyOutcome {
            display: Some(text.to_string()),
            submit: false,
            phrase_matched: false,
            duplicate: false,
        }
    }

    /// Forget the last utterance, e.g. when a new recording session starts.
    pub fn reset(&mut self) {
        self.last_final = None;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_match_case_insensitive() {
        let phrases = KeyPhraseSet::with_defaults();
        assert!(phrases.matches("send it"));
        assert!(phrases.matches("SEND IT"));
        assert!(phrases.matches("  Send It  "));
        assert!(phrases.matches("i'm done talking"));
    }

    #[test]
    fn test_containment_is_not_a_match() {
        let phrases = KeyPhraseSet::with_defaults();
        assert!(!phrases.matches("please send it now"));
        assert!(!phrases.matches("send"));
    }

    #[test]
    fn test_blank_phrases_ignored() {
        let mut phrases = KeyPhraseSet::new();
        phrases.add("   ");
        phrases.add("");
        assert!(phrases.is_empty());
    }

    #[test]
    fn test_phrase_submits_with_display() {
        let phrases = KeyPhraseSet::with_defaults();
        let mut policy = SubmissionPolicy::new(true);

        let outcome = policy.evaluate("send it", ListenMode::KeyPhrase, &phrases);
        assert!(outcome.submit);
        assert!(outcome.phrase_matched);
        assert_eq!(outcome.display, Some("send it".to_string()));
    }

    #[test]
    fn test_phrase_submits_without_display_when_hidden() {
        let phrases = KeyPhraseSet::with_defaults();
        let mut policy = SubmissionPolicy::new(false);

        let outcome = policy.evaluate("send it", ListenMode::KeyPhrase, &phrases);
        assert!(outcome.submit);
        assert_eq!(outcome.display, None);
    }

    #[test]
    fn test_phrase_only_matches_in_key_phrase_mode() {
        let phrases = KeyPhraseSet::with_defaults();
        let mut policy = SubmissionPolicy::new(true);

        let outcome = policy.evaluate("send it", ListenMode::Default, &phrases);
        assert!(!outcome.submit);
        assert!(!outcome.phrase_matched);
        // Delivered as ordinary text instead.
        assert_eq!(outcome.display, Some("send it".to_string()));
    }

    #[test]
    fn test_duplicate_suppressed() {
        let phrases = KeyPhraseSet::new();
        let mut policy = SubmissionPolicy::new(true);

        let first = policy.evaluate("hello world", ListenMode::Default, &phrases);
        assert_eq!(first.display, Some("hello world".to_string()));

        let second = policy.evaluate("hello world", ListenMode::Default, &phrases);
        assert!(second.duplicate);
        assert_eq!(second.display, None);
    }

    #[test]
    fn test_duplicate_after_intervening_text_is_delivered() {
        let phrases = KeyPhraseSet::new();
        let mut policy = SubmissionPolicy::new(true);

        policy.evaluate("hello", ListenMode::Default, &phrases);
        policy.evaluate("world", ListenMode::Default, &phrases);
        let third = policy.evaluate("hello", ListenMode::Default, &phrases);
        assert!(!third.duplicate);
        assert_eq!(third.display, Some("hello".to_string()));
    }

    #[test]
    fn test_duplicate_phrase_still_submits() {
        let phrases = KeyPhraseSet::with_defaults();
        let mut policy = SubmissionPolicy::new(true);

        policy.evaluate("send it", ListenMode::KeyPhrase, &phrases);
        let second = policy.evaluate("send it", ListenMode::KeyPhrase, &phrases);
        assert!(second.submit);
        assert!(second.duplicate);
        // Suppressed display, but the submit still fires.
        assert_eq!(second.display, None);
    }

    #[test]
    fn test_suppression_uniform_across_modes() {
        let phrases = KeyPhraseSet::with_defaults();
        let mut policy = SubmissionPolicy::new(true);

        policy.evaluate("hello", ListenMode::Default, &phrases);
        let repeat = policy.evaluate("hello", ListenMode::KeyPhrase, &phrases);
        assert!(repeat.duplicate);
        assert_eq!(repeat.display, None);
    }

    #[test]
    fn test_reset_forgets_last_utterance() {
        let phrases = KeyPhraseSet::new();
        let mut policy = SubmissionPolicy::new(true);

        policy.evaluate("hello", ListenMode::Default, &phrases);
        policy.reset();
        let outcome = policy.evaluate("hello", ListenMode::Default, &phrases);
        assert!(!outcome.duplicate);
        assert_eq!(outcome.display, Some("hello".to_string()));
    }
}
