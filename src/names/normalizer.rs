//! NameNormalizer: turns a raw detector match into a canonical lookup key.
//!
//! A tiny deterministic parser rather than a pile of regexes:
//! 1. trim, drop trailing sentence punctuation the detector swallowed
//! 2. strip a possessive suffix (`'s` or bare `'`)
//! 3. split off a leading title from a closed set
//! 4. trim the remainder; that is the key
//!
//! "Dr. Jane Smith's," → key "Jane Smith", title "Dr. ", possessive `'s`,
//! surface "Dr. Jane Smith's".

use serde::{Deserialize, Serialize};

use super::pool::Companion;

/// Closed title set, compared case-insensitively.
pub const TITLES: &[&str] = &[
    "Mr.", "Mrs.", "Ms.", "Miss", "Dr.", "Doctor", "President", "Professor", "Prof.", "Sir",
    "Lady", "Lord", "Dame", "Pope", "Queen", "King", "Prince", "Princess",
];

const TRAILING_PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '?'];
const APOSTROPHES: &[char] = &['\'', '\u{2019}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PossessiveForm {
    /// `Frodo's`
    S,
    /// `James'`
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Possessive {
    pub form: PossessiveForm,
    /// The apostrophe the page used, reused on the way out.
    pub apostrophe: char,
}

/// A detector match split into its decorations and canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedName {
    /// Text to locate in the span: title + name + possessive, without
    /// trailing punctuation.
    pub surface: String,
    /// Canonical lookup key.
    pub key: String,
    /// Title including its original trailing whitespace, or empty.
    pub title: String,
    pub possessive: Option<Possessive>,
}

impl NormalizedName {
    /// Final token for a resolved substitute.
    pub fn render(&self, substitute: Companion) -> String {
        let name = match self.possessive {
            Some(p) => substitute.possessive(p.apostrophe),
            None => substitute.as_str().to_string(),
        };
        format!("{}{}", self.title, name)
    }

    pub fn is_possessive(&self) -> bool {
        self.possessive.is_some()
    }
}

/// Check whether `token` is one of the closed-set titles.
pub fn is_title(token: &str) -> bool {
    TITLES.iter().any(|t| t.eq_ignore_ascii_case(token))
}

/// Normalize a raw match. `None` means "leave it alone": too short after
/// stripping, a bare title, or nothing left at all.
pub fn normalize(raw: &str, min_len: usize) -> Option<NormalizedName> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_title(trimmed) {
        return None;
    }

    let surface = trimmed.trim_end_matches(TRAILING_PUNCTUATION).trim_end();
    if surface.is_empty() {
        return None;
    }

    let (body, possessive) = strip_possessive(surface);
    let (title, remainder) = split_title(body);
    let key = remainder.trim();

    if key.chars().count() < min_len || is_title(key) || is_title(&format!("{}.", key)) {
        return None;
    }

    Some(NormalizedName {
        surface: surface.to_string(),
        key: key.to_string(),
        title: title.to_string(),
        possessive,
    })
}

fn strip_possessive(text: &str) -> (&str, Option<Possessive>) {
    let mut chars = text.char_indices().rev();
    match chars.next() {
        Some((s_idx, 's')) => {
            if let Some((a_idx, a)) = chars.next() {
                if APOSTROPHES.contains(&a) {
                    debug_assert_eq!(a_idx + a.len_utf8(), s_idx);
                    return (
                        &text[..a_idx],
                        Some(Possessive { form: PossessiveForm::S, apostrophe: a }),
                    );
                }
            }
            (text, None)
        }
        Some((a_idx, a)) if APOSTROPHES.contains(&a) => (
            &text[..a_idx],
            Some(Possessive { form: PossessiveForm::Bare, apostrophe: a }),
        ),
        _ => (text, None),
    }
}

/// Split a leading title off `text`. The title keeps the whitespace that
/// followed it; the remainder must be non-empty.
fn split_title(text: &str) -> (&str, &str) {
    let Some(ws) = text.find(char::is_whitespace) else {
        return ("", text);
    };
    let token = &text[..ws];
    if !is_title(token) {
        return ("", text);
    }
    let rest_start = text[ws..]
        .find(|c: char| !c.is_whitespace())
        .map(|off| ws + off)
        .unwrap_or(text.len());
    if rest_start == text.len() {
        return ("", text);
    }
    (&text[..rest_start], &text[rest_start..])
}
