use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Default number of events retained by the log.
pub const EVENTS_MAX: usize = 500;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single entry of remediation activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(serialize_with = "serialize_time")]
    pub time: DateTime<Local>,
    pub message: String,
}

fn serialize_time<S: Serializer>(time: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&time.format(TIME_FORMAT))
}

/// Bounded, append-only record of remediation activity.
///
/// The watcher is the only writer; the status server takes snapshots.
/// Once `capacity` entries are held, each append evicts the oldest one.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    events: Mutex<VecDeque<Event>>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn append(&self, message: impl Into<String>) {
        let event = Event {
            time: Local::now(),
            message: message.into(),
        };
        info!("{}", event.message);

        let mut events = self.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Point-in-time copy of the log, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.lock().iter().cloned().collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panic while holding the lock cannot leave the deque half-written,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENTS_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn messages(log: &EventLog) -> Vec<String> {
        log.snapshot().into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let log = EventLog::new(10);
        log.append("first");
        log.append("second");
        log.append("third");
        assert_eq!(messages(&log), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_retains_most_recent_entries() {
        for capacity in [1, 3, 7] {
            for n in 0..20 {
                let log = EventLog::new(capacity);
                for i in 0..n {
                    log.append(format!("event-{}", i));
                }
                assert!(log.len() <= capacity);

                let kept = n.min(capacity);
                let expected: Vec<String> =
                    (n - kept..n).map(|i| format!("event-{}", i)).collect();
                assert_eq!(messages(&log), expected, "capacity={} n={}", capacity, n);
            }
        }
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let log = EventLog::new(0);
        assert_eq!(log.capacity(), 1);
        log.append("a");
        log.append("b");
        assert_eq!(messages(&log), vec!["b"]);
    }

    #[test]
    fn test_default_capacity() {
        let log = EventLog::default();
        assert_eq!(log.capacity(), EVENTS_MAX);
        assert!(log.is_empty());
    }

    #[test]
    fn test_event_serializes_human_readable_time() {
        let log = EventLog::new(5);
        log.append("hello");
        let json = serde_json::to_value(log.snapshot()).unwrap();
        let entry = &json[0];
        assert_eq!(entry["message"], "hello");

        let time = entry["time"].as_str().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(time, TIME_FORMAT).is_ok());
    }

    #[test]
    fn test_concurrent_append_and_snapshot() {
        let log = Arc::new(EventLog::new(50));

        let writer = {
            let log = log.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    log.append(format!("event-{:03}", i));
                }
            })
        };

        let reader = {
            let log = log.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let snapshot = log.snapshot();
                    assert!(snapshot.len() <= 50);
                    // Every snapshot is a contiguous, strictly increasing run.
                    let ids: Vec<usize> = snapshot
                        .iter()
                        .map(|e| e.message["event-".len()..].parse().unwrap())
                        .collect();
                    assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();

        let expected: Vec<String> = (50..100).map(|i| format!("event-{:03}", i)).collect();
        assert_eq!(messages(&log), expected);
    }
}
