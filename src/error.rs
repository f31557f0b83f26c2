//! Error types shared across the crate.
//!
//! None of these are fatal to the page: the worst outcome of any of them is
//! that some names stay unreplaced.

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum FellowshipError {
    /// The name detector threw or could not be called for one text node.
    #[error("name detection failed: {0}")]
    Detection(String),

    /// The detector returned a span that does not fit the text it was given.
    #[error("malformed span {text:?} at {position}")]
    MalformedSpan { text: String, position: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Patterns are always built from escaped text, so this only surfaces
    /// if the regex engine itself rejects the (escaped) input.
    #[error("pattern construction failed: {0}")]
    Pattern(#[from] regex::Error),

    #[error("sweep automaton construction failed: {0}")]
    Automaton(#[from] aho_corasick::BuildError),

    /// The document has no body to walk yet.
    #[error("document has no content root")]
    NoRoot,
}

pub type Result<T> = std::result::Result<T, FellowshipError>;

impl From<FellowshipError> for JsValue {
    fn from(err: FellowshipError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
