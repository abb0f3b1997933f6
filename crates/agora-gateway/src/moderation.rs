//! Profanity filter. Pure text classification and redaction.

use std::collections::HashSet;

const BANNED_WORDS: &[&str] = &[
    "arse", "arsehole", "asshole", "bastard", "bitch", "bollocks", "bullshit", "cock", "crap",
    "cunt", "damn", "dick", "douche", "fag", "faggot", "fuck", "fucker", "fucking", "motherfucker",
    "nigger", "piss", "prick", "pussy", "retard", "shit", "slut", "twat", "wanker", "whore",
];

const MAX_USERNAME_CHARS: usize = 32;

/// Outcome of filtering one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    pub flagged: bool,
    /// Input with each banned word replaced by asterisks of the same length.
    pub cleaned: String,
}

#[derive(Debug, Clone)]
pub struct Moderator {
    banned: HashSet<String>,
}

impl Default for Moderator {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl Moderator {
    /// Built-in word list plus `extra` (case-insensitive).
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut banned: HashSet<String> = BANNED_WORDS.iter().map(|w| w.to_string()).collect();
        banned.extend(
            extra
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
        Self { banned }
    }

    pub fn filter(&self, text: &str) -> Filtered {
        let mut cleaned = String::with_capacity(text.len());
        let mut flagged = false;
        let mut word_start: Option<usize> = None;

        for (idx, ch) in text.char_indices() {
            if ch.is_alphanumeric() {
                word_start.get_or_insert(idx);
                continue;
            }
            if let Some(start) = word_start.take() {
                flagged |= self.push_word(&mut cleaned, &text[start..idx]);
            }
            cleaned.push(ch);
        }
        if let Some(start) = word_start {
            flagged |= self.push_word(&mut cleaned, &text[start..]);
        }

        Filtered { flagged, cleaned }
    }

    /// Usernames must be short and plain, and none of their words may be
    /// banned. Words are split at separators, digits and camel-case humps,
    /// so "big_shit" and "BigShit" are refused but "Dickens" is not.
    pub fn is_username_safe(&self, username: &str) -> bool {
        let len = username.chars().count();
        if len == 0 || len > MAX_USERNAME_CHARS {
            return false;
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return false;
        }
        !name_words(username).any(|word| self.is_banned(word))
    }

    fn push_word(&self, out: &mut String, word: &str) -> bool {
        if self.is_banned(word) {
            out.extend(std::iter::repeat_n('*', word.chars().count()));
            true
        } else {
            out.push_str(word);
            false
        }
    }

    fn is_banned(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        if self.banned.contains(&lower) {
            return true;
        }
        // plain plurals
        ["s", "es"].iter().any(|suffix| {
            lower
                .strip_suffix(*suffix)
                .is_some_and(|stem| self.banned.contains(stem))
        })
    }
}

fn name_words(name: &str) -> impl Iterator<Item = &str> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;
    let mut prev_lower = false;

    for (idx, ch) in name.char_indices() {
        if !ch.is_alphabetic() {
            if let Some(s) = start.take() {
                words.push(&name[s..idx]);
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            if let Some(s) = start.replace(idx) {
                words.push(&name[s..idx]);
            }
        }
        start.get_or_insert(idx);
        prev_lower = ch.is_lowercase();
    }
    if let Some(s) = start {
        words.push(&name[s..]);
    }
    words.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_passes_through() {
        let m = Moderator::default();
        let out = m.filter("hello there, class!");
        assert!(!out.flagged);
        assert_eq!(out.cleaned, "hello there, class!");
    }

    #[test]
    fn banned_span_is_masked_in_place() {
        let m = Moderator::default();
        let input = "well SHIT, that broke";
        let out = m.filter(input);
        assert!(out.flagged);
        assert_eq!(out.cleaned, "well ****, that broke");
        assert_eq!(out.cleaned.len(), input.len());
    }

    #[test]
    fn words_inside_other_words_are_not_masked() {
        let m = Moderator::default();
        // "class" and "Scunthorpe" contain banned substrings but are not banned words
        let out = m.filter("Scunthorpe class");
        assert!(!out.flagged);
    }

    #[test]
    fn plurals_and_extra_words() {
        let m = Moderator::new(["Frack"]);
        let out = m.filter("bitches and fracks");
        assert!(out.flagged);
        assert_eq!(out.cleaned, "******* and ******");
    }

    #[test]
    fn username_rules() {
        let m = Moderator::default();
        assert!(m.is_username_safe("alice_99"));
        assert!(!m.is_username_safe(""));
        assert!(!m.is_username_safe("has space"));
        assert!(!m.is_username_safe(&"a".repeat(33)));
    }

    #[test]
    fn usernames_are_judged_word_by_word() {
        let m = Moderator::default();
        for ok in ["Parsec", "peacock", "Dickens", "scrappy", "Cassandra", "MrClass"] {
            assert!(m.is_username_safe(ok), "{ok} should be allowed");
        }
        for bad in ["fuck", "shit_lord", "BigShit", "big.shits", "dick99", "CRAP"] {
            assert!(!m.is_username_safe(bad), "{bad} should be refused");
        }
    }

    #[test]
    fn name_words_split_on_separators_digits_and_humps() {
        let words: Vec<_> = name_words("xXDarkLord_99.king").collect();
        assert_eq!(words, vec!["x", "XDark", "Lord", "king"]);
    }
}
