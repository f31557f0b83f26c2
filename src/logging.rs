//! Console logging for the browser build.
//!
//! Events go through `tracing`; on wasm32 a small layer prints them to the
//! devtools console as `[component] message key=value`.

use std::fmt;
use tracing::field::{Field, Visit};

/// One formatted log line.
#[derive(Debug, Default)]
pub struct EventLine {
    message: String,
    fields: Vec<String>,
}

impl EventLine {
    /// Render with the last path segment of `target` as the component tag.
    pub fn render(&self, target: &str) -> String {
        let component = target.rsplit("::").next().unwrap_or(target);
        let mut line = format!("[{}] {}", component, self.message);
        for field in &self.fields {
            line.push(' ');
            line.push_str(field);
        }
        line
    }
}

impl Visit for EventLine {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod console {
    use super::EventLine;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};
    use wasm_bindgen::JsValue;
    use web_sys::console;

    pub struct ConsoleLayer;

    impl<S: Subscriber> Layer<S> for ConsoleLayer {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut line = EventLine::default();
            event.record(&mut line);
            let meta = event.metadata();
            let text = JsValue::from_str(&line.render(meta.target()));
            match *meta.level() {
                Level::ERROR => console::error_1(&text),
                Level::WARN => console::warn_1(&text),
                _ => console::log_1(&text),
            }
        }
    }
}

/// Install the console subscriber. Returns false if one was already set
/// (or on native targets, where nothing is installed).
#[cfg(target_arch = "wasm32")]
pub fn init(level: tracing::Level) -> bool {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(console::ConsoleLayer)
        .try_init()
        .is_ok()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init(_level: tracing::Level) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_last_target_segment() {
        let line = EventLine {
            message: "pass complete".to_string(),
            fields: vec!["visited=3".to_string(), "rewritten=1".to_string()],
        };
        assert_eq!(line.render("fellowship::session"), "[session] pass complete visited=3 rewritten=1");
        assert_eq!(line.render("plain"), "[plain] pass complete visited=3 rewritten=1");
    }

    #[test]
    fn test_native_init_is_noop() {
        assert!(!init(tracing::Level::DEBUG));
    }
}
