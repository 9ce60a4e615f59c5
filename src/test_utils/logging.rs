//! Tracing capture for tests: a layer that records events so tests can
//! assert on what the pipeline logged.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::Level;
use tracing::field::{Field, Visit};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const MAX_ENTRIES: usize = 2000;

static LOG_STORAGE: OnceLock<Arc<Mutex<LogStorage>>> = OnceLock::new();

/// Bounded ring of captured events.
#[derive(Default)]
pub struct LogStorage {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

impl LogStorage {
    #[must_use]
    pub const fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    #[must_use]
    pub const fn entries(&self) -> &VecDeque<LogEntry> {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn contains_message(&self, message: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(message))
    }

    #[must_use]
    pub fn for_target(&self, target: &str) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.target == target).collect()
    }

    #[must_use]
    pub fn count_level(&self, level: Level) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }
}

/// One captured event.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
    pub captured_at: Instant,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: Level, target: &str, message: &str) -> Self {
        Self {
            level,
            target: target.to_string(),
            message: message.to_string(),
            fields: Vec::new(),
            captured_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    /// Recorded value of a structured field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub fn get_log_storage() -> Arc<Mutex<LogStorage>> {
    Arc::clone(LOG_STORAGE.get_or_init(|| Arc::new(Mutex::new(LogStorage::new(MAX_ENTRIES)))))
}

pub fn clear_logs() {
    get_log_storage().lock().clear();
}

#[must_use]
pub fn get_logs() -> Vec<LogEntry> {
    get_log_storage().lock().entries().iter().cloned().collect()
}

#[must_use]
pub fn logs_contain(message: &str) -> bool {
    get_log_storage().lock().contains_message(message)
}

/// Captured events for one subsystem target (`retry`, `cache`, ...).
#[must_use]
pub fn logs_for_target(target: &str) -> Vec<LogEntry> {
    get_log_storage()
        .lock()
        .for_target(target)
        .into_iter()
        .cloned()
        .collect()
}

#[must_use]
pub fn format_logs_for_display() -> String {
    let logs = get_logs();
    if logs.is_empty() {
        return "No logs captured".to_string();
    }
    let mut out = format!("Captured {} log entries:\n", logs.len());
    for entry in logs {
        let _ = write!(out, "[{}] {}: {}", entry.level, entry.target, entry.message);
        for (key, value) in &entry.fields {
            let _ = write!(out, " {key}={value}");
        }
        out.push('\n');
    }
    out
}

struct EventVisitor<'a> {
    message: &'a mut String,
    fields: &'a mut Vec<(String, String)>,
}

impl Visit for EventVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            *self.message = rendered;
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }
}

/// Layer that stores every event it sees.
pub struct TestLogLayer {
    storage: Arc<Mutex<LogStorage>>,
}

impl TestLogLayer {
    #[must_use]
    pub const fn new(storage: Arc<Mutex<LogStorage>>) -> Self {
        Self { storage }
    }
}

impl<S> tracing_subscriber::Layer<S> for TestLogLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let metadata = event.metadata();
        let mut message = String::new();
        let mut fields = Vec::new();
        event.record(&mut EventVisitor {
            message: &mut message,
            fields: &mut fields,
        });

        let mut entry = LogEntry::new(*metadata.level(), metadata.target(), &message);
        entry.fields = fields;
        self.storage.lock().push(entry);
    }
}

/// Install the capture layer as the global subscriber (once per process)
/// and clear previously captured events.
///
/// The guard dumps the captured events if the test panics.
#[must_use]
pub fn init_test_logging(level: &str) -> TestLoggingGuard {
    clear_logs();
    let storage = get_log_storage();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(TestLogLayer::new(storage));
    let _ = tracing::subscriber::set_global_default(subscriber);

    TestLoggingGuard {
        started: Instant::now(),
    }
}

pub struct TestLoggingGuard {
    started: Instant,
}

impl Drop for TestLoggingGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            eprintln!("test failed after {:?}", self.started.elapsed());
            eprintln!("{}", format_logs_for_display());
        }
    }
}

/// Assert that an event with `level` whose message contains `message` was
/// captured.
#[macro_export]
macro_rules! assert_log_contains {
    ($level:expr, $message:expr) => {{
        let logs = $crate::test_utils::logging::get_logs();
        let found = logs
            .iter()
            .any(|e| e.level == $level && e.message.contains($message));
        assert!(
            found,
            "expected {} log containing '{}'\n{}",
            $level,
            $message,
            $crate::test_utils::logging::format_logs_for_display()
        );
    }};
}

/// Assert that `target` logged a message containing `message`.
#[macro_export]
macro_rules! assert_target_logged {
    ($target:expr, $message:expr) => {{
        let found = $crate::test_utils::logging::logs_for_target($target)
            .iter()
            .any(|e| e.message.contains($message));
        assert!(
            found,
            "expected '{}' log containing '{}'\n{}",
            $target,
            $message,
            $crate::test_utils::logging::format_logs_for_display()
        );
    }};
}
