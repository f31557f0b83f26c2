//! NameDetector: the narrow seam in front of the NLP library.
//!
//! The core only needs `detect_people(text) -> spans`. In the browser this is
//! a JS callback (e.g. `text => nlp(text).people().json()`); natively it is
//! [`HeuristicDetector`] or any closure.

use serde::{Deserialize, Serialize};

use super::normalizer::is_title;
use crate::error::{FellowshipError, Result};

/// A person-name match reported by a detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSpan {
    pub text: String,
    /// Offset of the match in the detector's input. Informational only:
    /// rewriting locates matches by text.
    #[serde(default)]
    pub position: usize,
}

impl NameSpan {
    pub fn new(text: impl Into<String>, position: usize) -> Self {
        Self { text: text.into(), position }
    }
}

/// Anything that can find person names in a string.
pub trait PersonDetector {
    fn detect_people(&self, text: &str) -> Result<Vec<NameSpan>>;
}

impl<F> PersonDetector for F
where
    F: Fn(&str) -> Result<Vec<NameSpan>>,
{
    fn detect_people(&self, text: &str) -> Result<Vec<NameSpan>> {
        self(text)
    }
}

/// Reject spans that cannot have come from `text`. One bad span poisons the
/// whole node: the caller leaves it untouched.
pub fn validate_spans(text: &str, spans: &[NameSpan]) -> Result<()> {
    for span in spans {
        let needle = span.text.trim();
        if needle.is_empty() || !text.contains(needle) {
            return Err(FellowshipError::MalformedSpan {
                text: span.text.clone(),
                position: span.position,
            });
        }
    }
    Ok(())
}

/// Span shapes accepted from JS: bare strings or `{ text, position? }`
/// objects (extra fields such as compromise's `terms` are ignored).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawSpan {
    Text(String),
    Span {
        text: String,
        #[serde(default)]
        position: usize,
    },
}

impl From<RawSpan> for NameSpan {
    fn from(raw: RawSpan) -> Self {
        match raw {
            RawSpan::Text(text) => NameSpan { text, position: 0 },
            RawSpan::Span { text, position } => NameSpan { text, position },
        }
    }
}

// =============================================================================
// HeuristicDetector
// =============================================================================

/// Words that start sentences or look like names but are not.
const NOT_NAMES: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "it", "he", "she", "we", "they", "i",
    "you", "in", "on", "at", "to", "for", "of", "and", "or", "but", "if", "when", "while",
    "then", "there", "here", "my", "your", "his", "her", "our", "their", "its", "what", "who",
    "why", "how", "where", "yes", "no", "not", "all", "some", "many", "after", "before",
    "with", "from", "by", "as", "so", "do", "did", "is", "was", "are", "were", "be", "been",
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "monday", "tuesday", "wednesday", "thursday",
    "friday", "saturday", "sunday",
    // Sentence openers that are capitalised only by position.
    "yesterday", "today", "tomorrow", "tonight", "later", "earlier", "meanwhile", "however",
    "also", "now", "still", "finally", "suddenly", "perhaps", "maybe", "once", "soon",
    "first", "next", "last", "again", "although", "because", "since", "though", "until",
    "unless", "instead", "indeed", "therefore", "thus", "during", "about", "over", "under",
    "between", "without", "would", "could", "should", "can", "must", "might", "let",
    "every", "each", "never", "always", "sometimes", "often", "oh", "well", "please",
    "thanks", "hello", "hi", "dear",
];

/// Finds runs of capitalised words, optionally led by a title.
///
/// "When Dr. Jane Smith met Bob." → ["Dr. Jane Smith", "Bob"]
///
/// Capitalised sentence starters ("The", "Yesterday", "However") are only
/// dropped when they are in the stop list, so this still over-reports on
/// unusual openers; the normalizer and the minimum length filter handle the
/// rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDetector;

impl HeuristicDetector {
    pub fn new() -> Self {
        Self
    }

    fn scan(&self, text: &str) -> Vec<NameSpan> {
        let mut spans = Vec::new();
        let mut run: Vec<Token> = Vec::new();

        for (offset, chunk) in chunks(text) {
            let token = Token::parse(chunk, offset);
            let extends = token.as_ref().is_some_and(|t| {
                run.last().map_or(true, |prev| prev.continues_into(t, text))
            });
            if !extends {
                flush_run(text, &mut run, &mut spans);
            }
            if let Some(t) = token {
                run.push(t);
            }
        }
        flush_run(text, &mut run, &mut spans);
        spans
    }
}

impl PersonDetector for HeuristicDetector {
    fn detect_people(&self, text: &str) -> Result<Vec<NameSpan>> {
        Ok(self.scan(text))
    }
}

/// Whitespace-delimited chunks with their byte offsets.
fn chunks(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_whitespace()
        .map(move |chunk| (chunk.as_ptr() as usize - text.as_ptr() as usize, chunk))
}

/// A capitalised word (or title) inside a candidate run.
#[derive(Debug, Clone)]
struct Token {
    /// Byte range of the word itself in the source text.
    start: usize,
    end: usize,
    title: bool,
    /// Trailing punctuation or a possessive ends the run after this token.
    closes_run: bool,
}

impl Token {
    fn parse(chunk: &str, offset: usize) -> Option<Token> {
        let lead = chunk.len() - chunk.trim_start_matches(|c: char| "\"'(“‘[".contains(c)).len();
        let body = &chunk[lead..];

        if is_title(body) {
            return Some(Token {
                start: offset + lead,
                end: offset + chunk.len(),
                title: true,
                closes_run: false,
            });
        }

        let word = body.trim_end_matches(|c: char| ",.;:!?\")”]".contains(c));
        let closes_by_punct = word.len() < body.len();
        let (stem, possessive) = match word
            .strip_suffix("'s")
            .or_else(|| word.strip_suffix("\u{2019}s"))
        {
            Some(stem) => (stem, true),
            None => match word.strip_suffix('\'').or_else(|| word.strip_suffix('\u{2019}')) {
                Some(stem) => (stem, true),
                None => (word, false),
            },
        };

        if !looks_like_name(stem) {
            return None;
        }
        Some(Token {
            start: offset + lead,
            end: offset + lead + word.len(),
            title: false,
            closes_run: closes_by_punct || possessive,
        })
    }

    fn continues_into(&self, next: &Token, text: &str) -> bool {
        !self.closes_run
            && !next.title
            && text[self.end..next.start].chars().all(|c| c == ' ' || c == '\u{a0}')
    }
}

fn looks_like_name(word: &str) -> bool {
    let Some(first) = word.chars().next() else {
        return false;
    };
    first.is_uppercase()
        && word.chars().any(|c| c.is_lowercase())
        && word.chars().all(|c| c.is_alphabetic() || c == '-' || c == '\'')
}

fn flush_run(text: &str, run: &mut Vec<Token>, spans: &mut Vec<NameSpan>) {
    // Drop stop words at the front ("The", "When") and dangling titles.
    let first_word = run
        .iter()
        .position(|t| !t.title && !is_stop_word(&text[t.start..t.end]))
        .unwrap_or(run.len());
    let leading_titles = run[..first_word].iter().rev().take_while(|t| t.title).count();
    let begin = first_word - leading_titles;
    let words = &run[begin..];

    if words.iter().any(|t| !t.title) {
        if let (Some(first), Some(last)) = (words.first(), words.last()) {
            spans.push(NameSpan::new(&text[first.start..last.end], first.start));
        }
    }
    run.clear();
}

fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    NOT_NAMES.contains(&lower.as_str())
}

// =============================================================================
// JS callback detector (browser build)
// =============================================================================

#[cfg(target_arch = "wasm32")]
pub use js::JsDetector;

#[cfg(target_arch = "wasm32")]
mod js {
    use super::*;
    use wasm_bindgen::JsValue;

    /// Calls a JS function `(text: string) => Array<string | {text, position?}>`.
    pub struct JsDetector {
        callback: js_sys::Function,
    }

    impl JsDetector {
        pub fn new(callback: js_sys::Function) -> Self {
            Self { callback }
        }
    }

    impl PersonDetector for JsDetector {
        fn detect_people(&self, text: &str) -> Result<Vec<NameSpan>> {
            let value = self
                .callback
                .call1(&JsValue::NULL, &JsValue::from_str(text))
                .map_err(|e| FellowshipError::Detection(format!("{:?}", e)))?;
            if value.is_null() || value.is_undefined() {
                return Ok(Vec::new());
            }
            let raw: Vec<RawSpan> = serde_wasm_bindgen::from_value(value)
                .map_err(|e| FellowshipError::Detection(format!("unreadable spans: {}", e)))?;
            Ok(raw.into_iter().map(NameSpan::from).collect())
        }
    }
}
