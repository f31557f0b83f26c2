//! TextRewriter: splices substitutes back into a text span.
//!
//! Edits are collected against the original span text and applied in one
//! pass, leftmost-longest, so a substitute written by one edit is never
//! picked up by another. Matching is on the escaped surface text with an
//! explicit whole-word check on each hit; adjacent punctuation is never part
//! of a match and so survives untouched.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::normalizer::{NormalizedName, Possessive, PossessiveForm};
use super::pool::Companion;
use crate::error::Result;

/// A pending replacement of `text[start..end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

#[derive(Debug, Default)]
pub struct TextRewriter {
    edits: Vec<Edit>,
}

impl TextRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a replacement for every whole-word occurrence of
    /// `name.surface` in `text`. Returns how many were queued.
    ///
    /// A non-possessive surface directly followed by `'s` takes the
    /// possessive along, so "Frodo's" never turns into "Legolas's".
    pub fn rewrite_name(&mut self, text: &str, name: &NormalizedName, substitute: Companion) -> Result<usize> {
        let pattern = Regex::new(&regex::escape(&name.surface))?;
        let mut queued = 0;
        for m in pattern.find_iter(text) {
            if !is_whole_word(text, m.start(), m.end()) {
                continue;
            }
            let trailing = match name.possessive {
                None => possessive_after(text, m.end(), false),
                Some(_) => None,
            };
            let edit = match trailing {
                Some((len, p)) => Edit {
                    start: m.start(),
                    end: m.end() + len,
                    replacement: format!("{}{}", name.title, substitute.possessive(p.apostrophe)),
                },
                None => Edit {
                    start: m.start(),
                    end: m.end(),
                    replacement: name.render(substitute),
                },
            };
            self.edits.push(edit);
            queued += 1;
        }
        Ok(queued)
    }

    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply queued edits to `text`. Overlaps resolve leftmost-longest.
    /// Returns `None` when nothing changed.
    pub fn apply(mut self, text: &str) -> Option<String> {
        if self.edits.is_empty() {
            return None;
        }
        self.edits.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| (b.end - b.start).cmp(&(a.end - a.start)))
        });

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for edit in &self.edits {
            if edit.start < cursor {
                continue;
            }
            out.push_str(&text[cursor..edit.start]);
            out.push_str(&edit.replacement);
            cursor = edit.end;
        }
        out.push_str(&text[cursor..]);

        (out != text).then_some(out)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True if `text[start..end]` is not glued to a word character on either side.
pub fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Possessive marker starting at byte `at`, as `(byte_len, marker)`.
///
/// `'s` always counts. A bare `'` only counts when `allow_bare` is set
/// (the preceding word ends in `s`), otherwise it is taken to be a closing
/// quote.
pub fn possessive_after(text: &str, at: usize, allow_bare: bool) -> Option<(usize, Possessive)> {
    let mut chars = text[at..].chars();
    let apostrophe = chars.next().filter(|c| *c == '\'' || *c == '\u{2019}')?;
    let a_len = apostrophe.len_utf8();
    let next = chars.next();

    if next == Some('s') && !chars.next().is_some_and(is_word_char) {
        return Some((a_len + 1, Possessive { form: PossessiveForm::S, apostrophe }));
    }
    if allow_bare && !next.is_some_and(is_word_char) {
        return Some((a_len, Possessive { form: PossessiveForm::Bare, apostrophe }));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::normalizer::normalize;

    fn rewrite(text: &str, raw: &str, substitute: Companion) -> String {
        let name = normalize(raw, 2).unwrap();
        let mut rw = TextRewriter::new();
        rw.rewrite_name(text, &name, substitute).unwrap();
        rw.apply(text).unwrap_or_else(|| text.to_string())
    }

    #[test]
    fn test_possessive_rewrites() {
        assert_eq!(rewrite("Frodo's ring", "Frodo's", Companion::Sam), "Sam's ring");
        assert_eq!(rewrite("Gandalf's staff", "Gandalf's", Companion::Pippin), "Pippin's staff");
        assert_eq!(rewrite("Frodo's ring", "Frodo's", Companion::Legolas), "Legolas' ring");
    }

    #[test]
    fn test_bare_possessive_input() {
        assert_eq!(rewrite("James' hat", "James'", Companion::Sam), "Sam's hat");
        assert_eq!(rewrite("James' hat", "James'", Companion::Boromir), "Boromir's hat");
        assert_eq!(rewrite("James' hat", "James'", Companion::Legolas), "Legolas' hat");
    }

    #[test]
    fn test_title_preserved() {
        assert_eq!(
            rewrite("Today Dr. Jane Smith spoke.", "Dr. Jane Smith", Companion::Merry),
            "Today Dr. Merry spoke."
        );
    }

    #[test]
    fn test_trailing_punctuation_preserved() {
        assert_eq!(rewrite("Jane Smith, hello", "Jane Smith,", Companion::Merry), "Merry, hello");
        assert_eq!(rewrite("Who? Jane Smith!", "Jane Smith", Companion::Merry), "Who? Merry!");
        assert_eq!(rewrite("(Jane Smith)", "Jane Smith", Companion::Merry), "(Merry)");
    }

    #[test]
    fn test_every_occurrence_replaced() {
        assert_eq!(
            rewrite("Bob met Bob; Bob left.", "Bob", Companion::Gimli),
            "Gimli met Gimli; Gimli left."
        );
    }

    #[test]
    fn test_whole_word_only() {
        assert_eq!(rewrite("Bobby and Bob", "Bob", Companion::Gimli), "Bobby and Gimli");
        assert_eq!(rewrite("JimBob", "Bob", Companion::Gimli), "JimBob");
    }

    #[test]
    fn test_special_characters_are_escaped() {
        assert_eq!(
            rewrite("Mr. (J.) Doe+ arrived", "Mr. (J.) Doe+", Companion::Sam),
            "Mr. Sam arrived"
        );
        assert_eq!(rewrite("MrX Doe", "Mr. Doe", Companion::Sam), "MrX Doe");
    }

    #[test]
    fn test_bare_mention_takes_following_possessive() {
        assert_eq!(rewrite("Frodo's ring", "Frodo", Companion::Legolas), "Legolas' ring");
        assert_eq!(rewrite("Frodo's ring", "Frodo", Companion::Sam), "Sam's ring");
    }

    #[test]
    fn test_closing_quote_is_not_possessive() {
        assert_eq!(rewrite("'Frodo' he said", "Frodo", Companion::Sam), "'Sam' he said");
    }

    #[test]
    fn test_overlapping_edits_leftmost_longest() {
        let text = "Jane Smith and Smith";
        let mut rw = TextRewriter::new();
        rw.rewrite_name(text, &normalize("Smith", 2).unwrap(), Companion::Gimli).unwrap();
        rw.rewrite_name(text, &normalize("Jane Smith", 2).unwrap(), Companion::Merry).unwrap();
        assert_eq!(rw.apply(text).unwrap(), "Merry and Gimli");
    }

    #[test]
    fn test_substitute_not_rewritten_again() {
        // "Bob" → "Sam", and "Sam" (a real person) → "Frodo": one pass, no chaining
        let text = "Bob and Sam";
        let mut rw = TextRewriter::new();
        rw.rewrite_name(text, &normalize("Bob", 2).unwrap(), Companion::Sam).unwrap();
        rw.rewrite_name(text, &normalize("Sam", 2).unwrap(), Companion::Frodo).unwrap();
        assert_eq!(rw.apply(text).unwrap(), "Sam and Frodo");
    }

    #[test]
    fn test_no_edits_is_none() {
        assert!(TextRewriter::new().apply("unchanged").is_none());
        let mut rw = TextRewriter::new();
        assert_eq!(rw.rewrite_name("nobody here", &normalize("Bob", 2).unwrap(), Companion::Sam).unwrap(), 0);
        assert!(rw.apply("nobody here").is_none());
    }

    #[test]
    fn test_possessive_after() {
        assert_eq!(possessive_after("'s x", 0, false).map(|p| p.0), Some(2));
        assert_eq!(possessive_after("'sx", 0, false), None);
        assert_eq!(possessive_after("' x", 0, false), None);
        assert_eq!(possessive_after("' x", 0, true).map(|p| p.1.form), Some(PossessiveForm::Bare));
        assert_eq!(possessive_after("\u{2019}s", 0, false).map(|p| p.0), Some(4));
        assert_eq!(possessive_after("x", 0, true), None);
        assert_eq!(possessive_after("", 0, true), None);
    }
}
