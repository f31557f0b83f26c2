//! End-to-end tests: session, walker, ledger and name pipeline on an
//! `ArenaTree`, with a scripted detector standing in for the NLP library.


use std::cell::Cell;
use std::rc::Rc;

use crate::error::{FellowshipError, Result};
use crate::names::{NameSpan, PersonDetector};

/// Route `tracing` output through the test harness's captured stdout.
pub(crate) fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Reports each listed name the first time it occurs in the text, in list
/// order. Fails on any text containing `fail_on`.
pub(crate) struct StubDetector {
    names: Vec<&'static str>,
    fail_on: Option<&'static str>,
    calls: Rc<Cell<usize>>,
}

impl StubDetector {
    pub(crate) fn new(names: &[&'static str]) -> Self {
        Self {
            names: names.to_vec(),
            fail_on: None,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn failing_on(mut self, marker: &'static str) -> Self {
        self.fail_on = Some(marker);
        self
    }

    /// Shared call counter, still readable after the detector is boxed.
    pub(crate) fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl PersonDetector for StubDetector {
    fn detect_people(&self, text: &str) -> Result<Vec<NameSpan>> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_on.is_some_and(|marker| text.contains(marker)) {
            return Err(FellowshipError::Detection("stub failure".to_string()));
        }
        Ok(self
            .names
            .iter()
            .filter_map(|name| text.find(name).map(|pos| NameSpan::new(*name, pos)))
            .collect())
    }
}
