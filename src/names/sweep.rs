//! SweepPass: catch lone name parts the detector missed.
//!
//! After "Jane Smith" is resolved, a later out-of-context "Smith" or
//! "Smith's" may not be recognised as a person at all. The sweep matches
//! every part of every resolved multi-word name with one Aho-Corasick
//! automaton and rewrites whole-word hits, possessives included.
//!
//! `'s` (or `’s`) after a part is always a possessive. A bare `'` counts
//! only after a part ending in `s` ("Jones'"), so a closing quote after any
//! other part ("'Smith'") stays where it is.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use std::collections::BTreeMap;

use super::pool::Companion;
use super::resolver::{name_parts, IdentityResolver};
use super::rewriter::{is_whole_word, possessive_after, Edit, TextRewriter};
use crate::error::Result;

/// Result of sweeping one text span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    pub text: String,
    pub replacements: usize,
}

pub struct SweepPass {
    automaton: Option<AhoCorasick>,
    /// Pattern id → (part, substitute)
    targets: Vec<(String, Companion)>,
}

impl SweepPass {
    /// Build the matcher from the resolver's current state.
    ///
    /// A part takes the substitute the resolver would give it on its own:
    /// its exact record if it has one, else the full name it was first
    /// linked to. Parts that are themselves companion names are left out so
    /// the sweep never rewrites a substitute.
    pub fn build(resolver: &IdentityResolver) -> Result<Self> {
        let mut targets: BTreeMap<String, Companion> = BTreeMap::new();
        for (name, fallback) in resolver.multi_part_names() {
            for part in name_parts(name) {
                if Companion::from_name(part).is_some() || targets.contains_key(part) {
                    continue;
                }
                let substitute = resolver
                    .lookup(part)
                    .or_else(|| resolver.linked_name(part).and_then(|full| resolver.lookup(full)))
                    .unwrap_or(fallback);
                targets.insert(part.to_string(), substitute);
            }
        }

        let targets: Vec<(String, Companion)> = targets.into_iter().collect();
        let automaton = if targets.is_empty() {
            None
        } else {
            Some(
                AhoCorasickBuilder::new()
                    .match_kind(MatchKind::LeftmostLongest)
                    .build(targets.iter().map(|(part, _)| part.as_str()))?,
            )
        };

        Ok(Self { automaton, targets })
    }

    pub fn part_count(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Rewrite lone parts in `text`. `None` when nothing matched.
    pub fn sweep_text(&self, text: &str) -> Option<SweepOutcome> {
        let automaton = self.automaton.as_ref()?;
        let mut rewriter = TextRewriter::new();

        for mat in automaton.find_iter(text) {
            if !is_whole_word(text, mat.start(), mat.end()) {
                continue;
            }
            let (part, substitute) = &self.targets[mat.pattern().as_usize()];
            let edit = match possessive_after(text, mat.end(), part.ends_with('s')) {
                Some((len, p)) => Edit {
                    start: mat.start(),
                    end: mat.end() + len,
                    replacement: substitute.possessive(p.apostrophe),
                },
                None => Edit {
                    start: mat.start(),
                    end: mat.end(),
                    replacement: substitute.as_str().to_string(),
                },
            };
            rewriter.push(edit);
        }

        let replacements = rewriter.len();
        rewriter
            .apply(text)
            .map(|text| SweepOutcome { text, replacements })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::{AllocationPolicy, SubstituteAllocator};

    fn resolver_with(names: &[&str]) -> IdentityResolver {
        let mut r = IdentityResolver::new(SubstituteAllocator::new(AllocationPolicy::NonRepeating, 0));
        for n in names {
            r.resolve(n);
        }
        r
    }

    fn sweep(r: &IdentityResolver, text: &str) -> String {
        SweepPass::build(r)
            .unwrap()
            .sweep_text(text)
            .map(|o| o.text)
            .unwrap_or_else(|| text.to_string())
    }

    #[test]
    fn test_bare_parts_rewritten() {
        // Jane Smith → Frodo
        let r = resolver_with(&["Jane Smith"]);
        assert_eq!(sweep(&r, "Later, Smith said Jane was right."), "Later, Frodo said Frodo was right.");
    }

    #[test]
    fn test_possessive_parts() {
        // Jane Smith → Frodo, Tom Jones → Sam
        let r = resolver_with(&["Jane Smith", "Tom Jones"]);
        assert_eq!(sweep(&r, "Smith's car"), "Frodo's car");
        assert_eq!(sweep(&r, "Jones' dog"), "Sam's dog");
        assert_eq!(sweep(&r, "Jones's dog"), "Sam's dog");
    }

    #[test]
    fn test_possessive_for_substitute_ending_in_s() {
        // Fourth allocation is Legolas
        let r = resolver_with(&["A1", "B1", "C1", "Ann Lee"]);
        assert_eq!(r.lookup("Ann Lee"), Some(Companion::Legolas));
        assert_eq!(sweep(&r, "Lee's book"), "Legolas' book");
    }

    #[test]
    fn test_quoted_part_keeps_quote() {
        let r = resolver_with(&["Jane Smith"]);
        assert_eq!(sweep(&r, "they called her 'Jane' at home"), "they called her 'Frodo' at home");
    }

    #[test]
    fn test_bare_apostrophe_only_after_trailing_s() {
        // Jane Smith → Frodo, Tom Jones → Sam
        let r = resolver_with(&["Jane Smith", "Tom Jones"]);
        assert_eq!(sweep(&r, "the 'Smith' file"), "the 'Frodo' file");
        assert_eq!(sweep(&r, "the \u{2018}Smith\u{2019} file"), "the \u{2018}Frodo\u{2019} file");
        assert_eq!(sweep(&r, "the Jones' file"), "the Sam's file");
    }

    #[test]
    fn test_punctuation_preserved() {
        let r = resolver_with(&["Jane Smith"]);
        assert_eq!(sweep(&r, "Smith, Jane; Smith!"), "Frodo, Frodo; Frodo!");
    }

    #[test]
    fn test_whole_words_only() {
        let r = resolver_with(&["Jane Smith"]);
        assert_eq!(sweep(&r, "Smithson and Janet"), "Smithson and Janet");
    }

    #[test]
    fn test_exact_record_decides_part() {
        // "Smith" was seen alone first (Frodo), then "Jane Smith" (Sam)
        let r = resolver_with(&["Smith", "Jane Smith"]);
        assert_eq!(sweep(&r, "Smith"), "Frodo");
        assert_eq!(sweep(&r, "Jane"), "Sam");
    }

    #[test]
    fn test_companion_named_parts_not_swept() {
        // A real "Sam Jones" must not make the sweep rewrite substitutes
        let r = resolver_with(&["Sam Jones"]);
        assert_eq!(sweep(&r, "Sam and Jones"), "Sam and Frodo");
    }

    #[test]
    fn test_single_word_names_not_swept() {
        let r = resolver_with(&["Bob"]);
        let pass = SweepPass::build(&r).unwrap();
        assert!(pass.is_empty());
        assert!(pass.sweep_text("Bob").is_none());
    }

    #[test]
    fn test_counts_replacements() {
        let r = resolver_with(&["Jane Smith"]);
        let out = SweepPass::build(&r).unwrap().sweep_text("Jane, Smith and Smith's").unwrap();
        assert_eq!(out.replacements, 3);
        assert_eq!(out.text, "Frodo, Frodo and Frodo's");
    }
}
