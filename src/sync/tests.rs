use std::time::Duration;

use super::*;

#[test]
fn fresh_subscriber_sees_current_value_once() {
    let (tx, mut rx) = state_channel(1);
    assert_eq!(rx.take_if_changed(), Some(1));
    assert_eq!(rx.take_if_changed(), None);

    tx.publish(2);
    tx.publish(3);
    assert_eq!(rx.take_if_changed(), Some(3));
    assert_eq!(rx.latest(), 3);
}

#[test]
fn late_subscriber_starts_from_latest() {
    let (tx, _rx) = state_channel("a");
    tx.publish("b");
    let mut late = tx.subscribe();
    assert_eq!(late.take_if_changed(), Some("b"));
}

#[test]
fn publish_without_subscribers_does_not_block() {
    let (tx, rx) = state_channel(0u32);
    drop(rx);
    for n in 0..1_000 {
        tx.publish(n);
    }
    assert_eq!(tx.subscribe().latest(), 999);
}

#[tokio::test]
async fn changed_ends_when_publisher_drops() {
    let (tx, mut rx) = state_channel(0);
    assert_eq!(rx.changed().await, Some(0));
    tx.publish(7);
    assert_eq!(rx.changed().await, Some(7));
    drop(tx);
    assert_eq!(rx.changed().await, None);
}

#[test]
fn event_slot_delivers_at_most_once() {
    let slot = EventSlot::new();
    assert_eq!(slot.emit("first"), None);
    let reader = slot.clone();
    assert_eq!(reader.try_take(), Some("first"));
    assert_eq!(slot.try_take(), None);
}

#[test]
fn event_slot_keeps_only_newest_pending() {
    let slot = EventSlot::new();
    slot.emit(1);
    assert_eq!(slot.emit(2), Some(1));
    assert_eq!(slot.try_take(), Some(2));
}

#[tokio::test]
async fn event_emitted_before_reader_waits_is_buffered() {
    let slot = EventSlot::new();
    slot.emit("tap");
    let got = tokio::time::timeout(Duration::from_secs(1), slot.recv()).await;
    assert_eq!(got.ok(), Some("tap"));
}

#[tokio::test]
async fn waiting_reader_wakes_on_emit() {
    let slot = EventSlot::new();
    let writer = slot.clone();
    let emitter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        writer.emit(42);
    });
    let got = tokio::time::timeout(Duration::from_secs(2), slot.recv()).await;
    emitter.join().unwrap();
    assert_eq!(got.ok(), Some(42));
}
