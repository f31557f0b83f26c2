//! The substitute pool: nine fixed companion names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A substitute identity. The pool is closed, so it is an enum rather than
/// a list of strings; its order is the allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Companion {
    Frodo,
    Sam,
    Gandalf,
    Legolas,
    Gimli,
    Boromir,
    Pippin,
    Merry,
    Aragorn,
}

impl Companion {
    pub const COUNT: usize = 9;

    pub const ALL: [Companion; Companion::COUNT] = [
        Companion::Frodo,
        Companion::Sam,
        Companion::Gandalf,
        Companion::Legolas,
        Companion::Gimli,
        Companion::Boromir,
        Companion::Pippin,
        Companion::Merry,
        Companion::Aragorn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Companion::Frodo => "Frodo",
            Companion::Sam => "Sam",
            Companion::Gandalf => "Gandalf",
            Companion::Legolas => "Legolas",
            Companion::Gimli => "Gimli",
            Companion::Boromir => "Boromir",
            Companion::Pippin => "Pippin",
            Companion::Merry => "Merry",
            Companion::Aragorn => "Aragorn",
        }
    }

    /// Position in the pool.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Exact (case-sensitive) lookup of a pool name.
    pub fn from_name(name: &str) -> Option<Companion> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    /// Possessive surface form: `Legolas'` but `Sam's`.
    pub fn possessive(self, apostrophe: char) -> String {
        let name = self.as_str();
        if name.ends_with('s') {
            format!("{}{}", name, apostrophe)
        } else {
            format!("{}{}s", name, apostrophe)
        }
    }
}

impl fmt::Display for Companion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
