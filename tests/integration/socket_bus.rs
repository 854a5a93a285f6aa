//! Socket bus delivery between independent subscribers.

use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

use flurry::coordinator::{MessageBus, SocketBus, ESCALATION_TOPIC};
use tempfile::TempDir;

fn forward(tx: mpsc::Sender<(usize, Option<String>)>, who: usize) -> Box<dyn Fn(Option<String>) + Send + Sync> {
    let tx = Mutex::new(tx);
    Box::new(move |payload| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send((who, payload));
        }
    })
}

#[test]
fn test_broadcast_reaches_every_subscriber() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let bus = SocketBus::new(temp_dir.path().join("bus"));
    let (tx, rx) = mpsc::channel();

    let _first = bus.subscribe(ESCALATION_TOPIC, forward(tx.clone(), 1)).unwrap();
    let _second = bus.subscribe(ESCALATION_TOPIC, forward(tx, 2)).unwrap();

    let sender = SocketBus::new(temp_dir.path().join("bus"));
    assert_eq!(sender.broadcast(ESCALATION_TOPIC, Some("/var/log/job.log")).unwrap(), 2);

    let mut seen: Vec<usize> = (0..2)
        .map(|_| {
            let (who, payload) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(payload.as_deref(), Some("/var/log/job.log"));
            who
        })
        .collect();
    seen.sort();
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn test_topics_are_separate() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let bus = SocketBus::new(temp_dir.path().join("bus"));
    let (tx, rx) = mpsc::channel();
    let _sub = bus.subscribe(ESCALATION_TOPIC, forward(tx, 1)).unwrap();

    assert_eq!(bus.broadcast("melt", None).unwrap(), 0);
    assert_eq!(bus.broadcast(ESCALATION_TOPIC, None).unwrap(), 1);
    let (_, payload) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(payload, None);
}

#[test]
fn test_dropped_subscription_stops_delivery() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let bus = SocketBus::new(temp_dir.path().join("bus"));
    let (tx, _rx) = mpsc::channel();

    let sub = bus.subscribe(ESCALATION_TOPIC, forward(tx, 1)).unwrap();
    drop(sub);
    assert_eq!(bus.broadcast(ESCALATION_TOPIC, None).unwrap(), 0);
}
