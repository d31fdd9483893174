use chrono::NaiveDate;
use sca_upload_core::credential::validate_key;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted events with their level.
struct EventCollector {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), format!("{:?}", event)));
    }
}

fn collect<F: FnOnce()>(f: F) -> Vec<(Level, String)> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(EventCollector {
        events: events.clone(),
    });
    tracing::subscriber::with_default(subscriber, f);
    let collected = events.lock().unwrap().clone();
    collected
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn key_expiring_soon_passes_with_warning_naming_the_date() {
    let mut status = None;
    let events = collect(|| {
        status = Some(validate_key("sca2026-10-29toolXYZ", day("2026-10-19")));
    });

    let status = status.unwrap().expect("key inside the warning window is still valid");
    assert!(status.expires_soon);
    assert!(
        events
            .iter()
            .any(|(level, msg)| *level == Level::WARN && msg.contains("2026-10-29")),
        "Expected a WARN event naming 2026-10-29, got: {:?}",
        events
    );
}

#[test]
fn key_far_from_expiry_emits_no_warning() {
    let events = collect(|| {
        validate_key("sca2099-01-01toolXYZ", day("2026-10-19")).unwrap();
    });

    assert!(
        events.iter().all(|(level, _)| *level != Level::WARN),
        "Unexpected WARN event: {:?}",
        events
    );
}
