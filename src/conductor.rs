//! FellowshipConductor: lifecycle around a [`ResolutionSession`]
//!
//! # State machine
//! Idle → AwaitingRoot → Active, with Disabled reachable from anywhere.
//!
//! - `run()` starts a fresh session. Without a content root yet it parks in
//!   `AwaitingRoot` and the next `flush()` that finds one starts it.
//! - Mutation roots queue up via `enqueue()` and are processed as one batch
//!   by `flush()`.
//! - `{action: "toggle", enabled}` messages start a fresh session (true) or
//!   disable the conductor so the page can be reloaded (false).

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::config::SessionConfig;
use crate::dom::{ContentTree, NodeId};
use crate::error::{FellowshipError, Result};
use crate::names::{NameMapping, PersonDetector};
use crate::session::{PassStats, ResolutionSession};

// =============================================================================
// State Machine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Created, never run
    Idle,
    /// Asked to run before the document had a body
    AwaitingRoot,
    /// Session live, mutations are processed
    Active,
    /// Toggled off; nothing runs until re-enabled
    Disabled,
}

// =============================================================================
// Messages
// =============================================================================

/// Inbound message from the extension's background or popup script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub action: String,
    /// Missing means enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl ControlMessage {
    pub fn toggle(enabled: bool) -> Self {
        Self { action: "toggle".to_string(), enabled: Some(enabled) }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FellowshipError::InvalidMessage(e.to_string()))
    }

    pub fn from_js(value: JsValue) -> Result<Self> {
        serde_wasm_bindgen::from_value(value).map_err(|e| FellowshipError::InvalidMessage(e.to_string()))
    }
}

/// What handling a message did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageOutcome {
    /// A fresh session was started (stats are `None` while awaiting a root).
    Started(Option<PassStats>),
    /// Disabled; the caller should reload the page to undo rewrites.
    ReloadRequested,
    Ignored,
}

impl MessageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageOutcome::Started(_) => "started",
            MessageOutcome::ReloadRequested => "reload",
            MessageOutcome::Ignored => "ignored",
        }
    }
}

// =============================================================================
// FellowshipConductor
// =============================================================================

pub struct FellowshipConductor {
    config: SessionConfig,
    detector: Box<dyn PersonDetector>,
    session: Option<ResolutionSession>,
    pending: Vec<NodeId>,
    state: State,
    sessions_started: u32,
}

impl FellowshipConductor {
    pub fn new(config: SessionConfig, detector: Box<dyn PersonDetector>) -> Self {
        let state = if config.enabled { State::Idle } else { State::Disabled };
        Self {
            config,
            detector,
            session: None,
            pending: Vec::new(),
            state,
            sessions_started: 0,
        }
    }

    /// Start a fresh resolution session over the whole document.
    ///
    /// Safe to call repeatedly: each call replaces the previous session.
    /// Returns `None` when disabled or still waiting for a body.
    pub fn run<T: ContentTree + ?Sized>(&mut self, tree: &mut T) -> Option<PassStats> {
        if self.state == State::Disabled {
            tracing::debug!("run ignored while disabled");
            return None;
        }

        self.pending.clear();
        self.session = None;

        let mut session = ResolutionSession::new(self.config.clone());
        match session.run_full(tree, self.detector.as_ref()) {
            Ok(stats) => {
                self.session = Some(session);
                self.sessions_started += 1;
                self.state = State::Active;
                Some(stats)
            }
            Err(FellowshipError::NoRoot) => {
                tracing::debug!("no document body yet, waiting");
                self.state = State::AwaitingRoot;
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "session failed to start");
                None
            }
        }
    }

    /// Queue mutation roots for the next [`flush`](Self::flush).
    pub fn enqueue<I: IntoIterator<Item = NodeId>>(&mut self, roots: I) {
        if self.state == State::Active {
            self.pending.extend(roots);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Process whatever is queued. Starts the session if one was waiting
    /// for a root that now exists.
    pub fn flush<T: ContentTree + ?Sized>(&mut self, tree: &mut T) -> Option<PassStats> {
        match self.state {
            State::AwaitingRoot if tree.root().is_some() => self.run(tree),
            State::Active if !self.pending.is_empty() => {
                let roots = std::mem::take(&mut self.pending);
                let session = self.session.as_mut()?;
                Some(session.process_roots(tree, self.detector.as_ref(), &roots))
            }
            _ => None,
        }
    }

    pub fn handle_message<T: ContentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        message: &ControlMessage,
    ) -> MessageOutcome {
        if message.action != "toggle" {
            tracing::debug!(action = %message.action, "ignoring unknown action");
            return MessageOutcome::Ignored;
        }

        let enabled = message.enabled.unwrap_or(true);
        self.config.enabled = enabled;
        if enabled {
            self.state = State::Idle;
            MessageOutcome::Started(self.run(tree))
        } else {
            tracing::info!("disabled, reload requested");
            self.state = State::Disabled;
            self.session = None;
            self.pending.clear();
            MessageOutcome::ReloadRequested
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == State::Active
    }

    pub fn is_enabled(&self) -> bool {
        self.state != State::Disabled
    }

    /// Current state name (for debugging)
    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::Idle => "idle",
            State::AwaitingRoot => "awaiting_root",
            State::Active => "active",
            State::Disabled => "disabled",
        }
    }

    pub fn session(&self) -> Option<&ResolutionSession> {
        self.session.as_ref()
    }

    pub fn sessions_started(&self) -> u32 {
        self.sessions_started
    }

    /// Totals for the current session.
    pub fn stats(&self) -> PassStats {
        self.session.as_ref().map(|s| s.totals()).unwrap_or_default()
    }

    pub fn mappings(&self) -> Vec<NameMapping> {
        self.session.as_ref().map(|s| s.mappings()).unwrap_or_default()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ArenaTree;
    use crate::names::HeuristicDetector;

    fn make_conductor(config: SessionConfig) -> FellowshipConductor {
        FellowshipConductor::new(config, Box::new(HeuristicDetector::new()))
    }

    fn page(text: &str) -> (ArenaTree, NodeId) {
        let (mut tree, body) = ArenaTree::with_body();
        let p = tree.element(body, "p");
        let t = tree.text_node(p, text);
        (tree, t)
    }

    #[test]
    fn test_conductor_state_progression() {
        let mut conductor = make_conductor(SessionConfig::default());
        assert_eq!(conductor.state_name(), "idle");

        let (mut tree, _) = page("Alice met Bob.");
        assert!(conductor.run(&mut tree).is_some());
        assert_eq!(conductor.state_name(), "active");
        assert!(conductor.is_active());
    }

    #[test]
    fn test_conductor_disabled_by_config() {
        let config = SessionConfig { enabled: false, ..SessionConfig::default() };
        let mut conductor = make_conductor(config);
        let (mut tree, t) = page("Alice met Bob.");

        assert!(conductor.run(&mut tree).is_none());
        assert_eq!(conductor.state_name(), "disabled");
        assert_eq!(tree.text(t).as_deref(), Some("Alice met Bob."));
    }

    #[test]
    fn test_conductor_awaits_root() {
        let mut conductor = make_conductor(SessionConfig::default());
        let mut tree = ArenaTree::new();

        assert!(conductor.run(&mut tree).is_none());
        assert_eq!(conductor.state_name(), "awaiting_root");
        assert!(conductor.flush(&mut tree).is_none(), "still no body");

        let body = tree.create_element("body");
        let t = tree.text_node(body, "Alice smiled.");
        tree.set_root(body);

        let stats = conductor.flush(&mut tree).unwrap();
        assert_eq!(stats.text_nodes_rewritten, 1);
        assert_eq!(tree.text(t).as_deref(), Some("Frodo smiled."));
        assert!(conductor.is_active());
    }

    #[test]
    fn test_conductor_enqueue_only_when_active() {
        let mut conductor = make_conductor(SessionConfig::default());
        conductor.enqueue([NodeId(3)]);
        assert_eq!(conductor.pending_len(), 0);

        let (mut tree, _) = page("Alice");
        conductor.run(&mut tree);
        conductor.enqueue([NodeId(1), NodeId(2)]);
        assert_eq!(conductor.pending_len(), 2);
    }

    #[test]
    fn test_conductor_flush_processes_added_nodes() {
        let mut conductor = make_conductor(SessionConfig::default());
        let (mut tree, _) = page("Alice waved.");
        conductor.run(&mut tree);

        let root = tree.root().unwrap();
        let div = tree.element(root, "div");
        let t = tree.text_node(div, "Alice and Bob left.");
        conductor.enqueue([div]);

        let stats = conductor.flush(&mut tree).unwrap();
        assert_eq!(stats.text_nodes_rewritten, 1);
        assert_eq!(tree.text(t).as_deref(), Some("Frodo and Sam left."));
        assert_eq!(conductor.pending_len(), 0);
        assert!(conductor.flush(&mut tree).is_none(), "nothing queued");
    }

    #[test]
    fn test_rerun_starts_fresh_session() {
        let mut conductor = make_conductor(SessionConfig::default());
        let (mut tree, _) = page("Alice waved.");
        conductor.run(&mut tree);
        conductor.run(&mut tree);
        assert_eq!(conductor.sessions_started(), 2);
        assert_eq!(conductor.session().unwrap().pass_count(), 1);
    }

    // -------------------------------------------------------------------------
    // Toggle messages
    // -------------------------------------------------------------------------

    #[test]
    fn test_toggle_off_requests_reload() {
        let mut conductor = make_conductor(SessionConfig::default());
        let (mut tree, _) = page("Alice waved.");
        conductor.run(&mut tree);

        let outcome = conductor.handle_message(&mut tree, &ControlMessage::toggle(false));
        assert_eq!(outcome, MessageOutcome::ReloadRequested);
        assert!(!conductor.is_enabled());
        assert!(conductor.session().is_none());
        assert!(conductor.run(&mut tree).is_none());
    }

    #[test]
    fn test_toggle_on_starts_session() {
        let config = SessionConfig { enabled: false, ..SessionConfig::default() };
        let mut conductor = make_conductor(config);
        let (mut tree, t) = page("Alice waved.");

        let outcome = conductor.handle_message(&mut tree, &ControlMessage::toggle(true));
        assert!(matches!(outcome, MessageOutcome::Started(Some(_))));
        assert_eq!(outcome.as_str(), "started");
        assert_eq!(tree.text(t).as_deref(), Some("Frodo waved."));
    }

    #[test]
    fn test_toggle_without_flag_means_enabled() {
        let mut conductor = make_conductor(SessionConfig { enabled: false, ..SessionConfig::default() });
        let (mut tree, _) = page("Alice waved.");
        let msg = ControlMessage::from_json(r#"{"action": "toggle"}"#).unwrap();
        assert_eq!(msg.enabled, None);
        conductor.handle_message(&mut tree, &msg);
        assert!(conductor.is_active());
    }

    #[test]
    fn test_unknown_action_ignored() {
        let mut conductor = make_conductor(SessionConfig::default());
        let (mut tree, t) = page("Alice waved.");
        let msg = ControlMessage::from_json(r#"{"action": "ping"}"#).unwrap();
        assert_eq!(conductor.handle_message(&mut tree, &msg), MessageOutcome::Ignored);
        assert_eq!(conductor.state_name(), "idle");
        assert_eq!(tree.text(t).as_deref(), Some("Alice waved."));
    }

    #[test]
    fn test_malformed_message_rejected() {
        assert!(matches!(
            ControlMessage::from_json(r#"{"enabled": true}"#),
            Err(FellowshipError::InvalidMessage(_))
        ));
        assert!(matches!(
            ControlMessage::from_json("not json"),
            Err(FellowshipError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_stats_and_mappings_without_session() {
        let conductor = make_conductor(SessionConfig::default());
        assert_eq!(conductor.stats(), PassStats::default());
        assert!(conductor.mappings().is_empty());
    }
}
