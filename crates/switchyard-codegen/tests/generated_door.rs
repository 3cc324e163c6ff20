//! Run-time behaviour of generated code, exercised through the golden fixture.

#[path = "fixtures/door_machine.rs"]
#[allow(dead_code)]
mod door_machine;

use std::collections::HashSet;

use door_machine::*;

#[test]
fn apply_follows_edges_and_ignores_unknown_triggers() {
    let closed = DoorState::OPEN.apply(DoorTrigger::CLOSE);
    assert_eq!(closed, DoorState::CLOSED);

    let still_closed = closed.apply(DoorTrigger::CLOSE);
    assert_eq!(still_closed, DoorState::CLOSED);

    assert_eq!(still_closed.apply(DoorTrigger::OPEN), DoorState::OPEN);
}

#[test]
fn do_transition_reports_source_destination_and_trigger() {
    match DoorState::OPEN.do_transition(DoorTrigger::CLOSE) {
        DoorTransitionResult::Transition(t) => {
            assert_eq!(t.source, DoorState::OPEN);
            assert_eq!(t.destination, DoorState::CLOSED);
            assert_eq!(t.trigger, DoorTrigger::CLOSE);
        }
        other => panic!("expected a transition, got {other:?}"),
    }
}

#[test]
fn do_transition_reports_invalid_triggers() {
    let result = DoorState::OPEN.do_transition(DoorTrigger::OPEN);
    assert_eq!(
        result,
        DoorTransitionResult::InvalidTrigger(DoorInvalidTrigger::new(DoorState::OPEN, DoorTrigger::OPEN))
    );
}

#[test]
fn match_with_calls_the_handler_of_the_current_case() {
    let name = DoorState::CLOSED.match_with(|_| "open", |_| "closed");
    assert_eq!(name, "closed");
}

#[test]
fn unions_compare_hash_and_display_by_case() {
    let mut seen = HashSet::new();
    seen.insert(DoorState::OPEN);
    seen.insert(DoorState::OPEN.apply(DoorTrigger::CLOSE).apply(DoorTrigger::OPEN));
    seen.insert(DoorState::CLOSED);
    assert_eq!(seen.len(), 2);

    assert_eq!(DoorState::OPEN.to_string(), "Open");
    assert_eq!(DoorTrigger::CLOSE.to_string(), "Close");
}

#[tokio::test]
async fn async_match_family() {
    let opened = DoorState::CLOSED
        .match_with_async(|_| async { 1 }, |_| async { 2 })
        .await;
    assert_eq!(opened, 2);

    let deferred = DoorState::match_deferred(async { DoorState::OPEN }, |_| "open", |_| "closed").await;
    assert_eq!(deferred, "open");

    let both = DoorState::match_deferred_async(
        async { DoorState::OPEN.apply(DoorTrigger::CLOSE) },
        |_| async { "open" },
        |_| async { "closed" },
    )
    .await;
    assert_eq!(both, "closed");
}
