//! Integration tests for the handle tracing feature.
//!
//! These verify that the lifecycle events compile and emit without
//! panicking when the `tracing` feature is enabled.

#![cfg(feature = "tracing")]

use tandem_ptr::Shared;

#[test]
fn test_lifecycle_with_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();

    // Full lifecycle: allocation, value destruction, block free — each
    // emits one event.
    let s = Shared::new(vec![1_u8, 2, 3]);
    let w = Shared::downgrade(&s);
    drop(s);
    drop(w);
}

#[test]
fn test_upgrade_path_with_tracing() {
    let s = Shared::new(1_u64);
    let w = Shared::downgrade(&s);
    assert!(w.upgrade().is_some());
    drop(s);
    assert!(w.upgrade().is_none());
}
