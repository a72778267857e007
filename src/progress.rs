// Per-entity progress counters. Logging only; never affects control flow.

use tracing::info;

pub struct ProgressReporter {
    batch_size: u64,
    /// Labels in the order they were first ticked
    counters: Vec<(&'static str, u64)>,
}

impl ProgressReporter {
    pub fn new(batch_size: u64) -> Self {
        ProgressReporter {
            batch_size: batch_size.max(1),
            counters: Vec::new(),
        }
    }

    /// Count one processed record; logs on every full batch
    pub fn tick(&mut self, label: &'static str) -> u64 {
        let count = match self.counters.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                self.counters.push((label, 1));
                1
            }
        };

        if count % self.batch_size == 0 {
            info!(entity = label, processed = count, "progress");
        }
        count
    }

    /// Make `label` show up in the counts even if nothing was processed
    pub fn register(&mut self, label: &'static str) {
        if !self.counters.iter().any(|(l, _)| *l == label) {
            self.counters.push((label, 0));
        }
    }

    pub fn count(&self, label: &str) -> u64 {
        self.counters
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn counts(&self) -> &[(&'static str, u64)] {
        &self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Fields of one "progress" log line
    #[derive(Default)]
    struct ProgressLine {
        message: Option<String>,
        entity: Option<String>,
        processed: Option<u64>,
    }

    impl Visit for ProgressLine {
        fn record_u64(&mut self, field: &Field, value: u64) {
            if field.name() == "processed" {
                self.processed = Some(value);
            }
        }

        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "entity" {
                self.entity = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
            if field.name() == "message" {
                self.message = Some(format!("{:?}", value));
            }
        }
    }

    /// Collects (entity, processed) of every progress event
    struct ProgressCapture(Arc<Mutex<Vec<(String, u64)>>>);

    impl<S: Subscriber> Layer<S> for ProgressCapture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut line = ProgressLine::default();
            event.record(&mut line);
            if line.message.as_deref() == Some("progress") {
                if let (Some(entity), Some(processed)) = (line.entity, line.processed) {
                    self.0.lock().unwrap().push((entity, processed));
                }
            }
        }
    }

    #[test]
    fn test_counters_are_per_label_and_ordered() {
        let mut progress = ProgressReporter::new(10_000);
        progress.register("contact");
        progress.tick("address");
        progress.tick("address");
        progress.tick("contact");

        assert_eq!(progress.count("address"), 2);
        assert_eq!(progress.count("contact"), 1);
        assert_eq!(progress.count("phone"), 0);
        assert_eq!(progress.counts(), &[("contact", 1), ("address", 2)]);
    }

    #[test]
    fn test_tick_returns_running_count() {
        let mut progress = ProgressReporter::new(3);
        let seen: Vec<u64> = (0..7).map(|_| progress.tick("email")).collect();
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_logs_only_on_full_batches() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(ProgressCapture(lines.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let mut progress = ProgressReporter::new(3);
            for _ in 0..7 {
                progress.tick("email");
            }
            progress.tick("phone");
        });

        assert_eq!(
            *lines.lock().unwrap(),
            vec![("email".to_string(), 3), ("email".to_string(), 6)]
        );
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let mut progress = ProgressReporter::new(0);
        assert_eq!(progress.tick("email"), 1);
    }
}
