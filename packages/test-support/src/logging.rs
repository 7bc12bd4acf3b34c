//! Test logging: a process-wide quiet subscriber, plus a thread-scoped
//! capture for asserting which events a piece of code emitted.

use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// `TEST_LOG`, then `RUST_LOG`, then `"warn"`.
fn filter_from_env() -> EnvFilter {
    std::env::var("TEST_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global test subscriber once per process. Later calls are no-ops.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        fmt()
            .with_env_filter(filter_from_env())
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

/// Levels of the events seen by a [`capture`] subscriber, in emission order.
#[derive(Clone, Default)]
pub struct CapturedEvents(Arc<Mutex<Vec<Level>>>);

impl CapturedEvents {
    pub fn levels(&self) -> Vec<Level> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, level: Level) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(level);
    }

    pub fn count(&self, level: Level) -> usize {
        self.levels().into_iter().filter(|l| *l == level).count()
    }
}

struct CaptureLayer(CapturedEvents);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.0.push(*event.metadata().level());
    }
}

/// Record every event emitted on this thread until the guard drops.
///
/// Works under `#[tokio::test]`, whose runtime runs on the test thread.
///
/// ```
/// use test_support::logging::capture;
/// use tracing::Level;
///
/// let (guard, events) = capture();
/// tracing::warn!("seen");
/// drop(guard);
/// tracing::warn!("not seen");
/// assert_eq!(events.count(Level::WARN), 1);
/// ```
pub fn capture() -> (DefaultGuard, CapturedEvents) {
    let events = CapturedEvents::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(events.clone()));
    (tracing::subscriber::set_default(subscriber), events)
}
