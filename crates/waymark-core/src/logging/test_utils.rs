//! Log capture for tests.
//!
//! Several engine behaviors are observable only through logs (a missing icon
//! is logged and replaced, an orphaned marker is reported). Tests install a
//! capturing subscriber with [`capture_logs`] and assert on the result.
//!
//! Field values are stored as text: strings and `%display` values verbatim,
//! integers in decimal, anything else through `Debug`.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// One captured tracing event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Event level.
    pub level: Level,
    /// Module the event came from.
    pub target: String,
    /// The message.
    pub message: String,
    /// Structured fields in recording order.
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Text of a recorded field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v.as_str()))
    }

    fn matches(&self, level: Level, message_contains: &str) -> bool {
        self.level == level && self.message.contains(message_contains)
    }
}

/// Handle on the events captured by one [`capture_logs`] call.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    fn lock(&self) -> MutexGuard<'_, Vec<CapturedEvent>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every event so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.lock().clone()
    }

    /// Whether an event at `level` has a message containing `message_contains`.
    pub fn has_event(&self, level: Level, message_contains: &str) -> bool {
        self.lock().iter().any(|e| e.matches(level, message_contains))
    }

    /// Events at `level` whose message contains `message_contains`.
    pub fn find(&self, level: Level, message_contains: &str) -> Vec<CapturedEvent> {
        self.lock()
            .iter()
            .filter(|e| e.matches(level, message_contains))
            .cloned()
            .collect()
    }

    /// Number of events at `level`.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.lock().iter().filter(|e| e.level == level).count()
    }
}

#[derive(Default)]
struct Recorder {
    message: String,
    fields: Vec<(String, String)>,
}

impl Recorder {
    fn put(&mut self, field: &Field, text: String) {
        if field.name() == "message" {
            self.message = text;
        } else {
            self.fields.push((field.name().to_owned(), text));
        }
    }
}

impl Visit for Recorder {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }
}

struct CaptureLayer(CapturedLogs);

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorder = Recorder::default();
        event.record(&mut recorder);
        let metadata = event.metadata();
        self.0.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_owned(),
            message: recorder.message,
            fields: recorder.fields,
        });
    }
}

/// Install a capturing subscriber for the current thread.
///
/// The subscriber is a thread default, so parallel tests do not see each
/// other's events. Keep the guard alive for the whole test.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(CaptureLayer(logs.clone()))
        .with(LevelFilter::TRACE)
        .set_default();
    (logs, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_message_and_fields() {
        let (logs, _guard) = capture_logs();
        let category = "tekkit.hp";
        tracing::error!(path = "icons/x.png", line = 12_u64, category = %category, "missing data file");
        let found = logs.find(Level::ERROR, "missing data file");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field("path"), Some("icons/x.png"));
        assert_eq!(found[0].field("line"), Some("12"));
        assert_eq!(found[0].field("category"), Some("tekkit.hp"));
        assert_eq!(found[0].field("absent"), None);
    }

    #[test]
    fn counts_by_level() {
        let (logs, _guard) = capture_logs();
        tracing::warn!("one");
        tracing::warn!("two");
        tracing::info!("three");
        assert_eq!(logs.count_at_level(Level::WARN), 2);
        assert_eq!(logs.count_at_level(Level::INFO), 1);
        assert!(logs.has_event(Level::INFO, "thr"));
        assert!(!logs.has_event(Level::WARN, "three"));
    }
}
