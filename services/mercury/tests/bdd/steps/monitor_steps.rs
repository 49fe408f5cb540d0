//! BDD step definitions for the status state machine feature

use cucumber::{given, then, when};

use mercury::monitor::{FetchPhase, StatusMonitor};
use mercury::{MercuryError, ScanResult, StatusPayload};

use crate::world::MercuryWorld;

const SCANNED_URL: &str = "https://status.test/job/1";

fn monitor(world: &mut MercuryWorld) -> &mut StatusMonitor {
    world.monitor.as_mut().expect("monitor not set")
}

/// Complete the most recent pending request of `phase`
fn complete_latest(
    world: &mut MercuryWorld,
    phase: FetchPhase,
    result: mercury::Result<StatusPayload>,
) {
    let index = world
        .pending
        .iter()
        .rposition(|r| r.phase == phase)
        .expect("no pending request for phase");
    let request = world.pending.remove(index);
    let outcome = monitor(world).on_fetch_completed(request.complete(result));
    world.last_outcome = Some(outcome);
}

#[given("a fresh status monitor")]
fn fresh_monitor(world: &mut MercuryWorld) {
    world.monitor = Some(StatusMonitor::new());
    world.pending.clear();
    world.last_outcome = None;
}

#[given(expr = "the monitor is Clear with {string}")]
fn monitor_is_clear(world: &mut MercuryWorld, body: String) {
    let mut monitor = StatusMonitor::new();
    let request = monitor.on_code_decoded(ScanResult::from(SCANNED_URL));
    monitor.on_fetch_completed(request.complete(StatusPayload::from_json(&body)));
    assert_eq!(monitor.state().to_string(), "Clear");
    world.monitor = Some(monitor);
}

#[when(expr = "the code {string} is decoded")]
fn code_decoded(world: &mut MercuryWorld, code: String) {
    let request = monitor(world).on_code_decoded(ScanResult::from(code));
    world.pending.push(request);
}

#[when(expr = "the first fetch returns {string}")]
fn first_fetch_returns(world: &mut MercuryWorld, body: String) {
    complete_latest(world, FetchPhase::Initial, StatusPayload::from_json(&body));
}

#[when("the first fetch fails")]
fn first_fetch_fails(world: &mut MercuryWorld) {
    complete_latest(
        world,
        FetchPhase::Initial,
        Err(MercuryError::Http("connection refused".to_string())),
    );
}

#[when(expr = "the first fetch of {string} returns {string}")]
fn first_fetch_of_returns(world: &mut MercuryWorld, url: String, body: String) {
    let index = world
        .pending
        .iter()
        .position(|r| r.phase == FetchPhase::Initial && r.target.as_str() == url)
        .expect("no pending initial fetch for url");
    let request = world.pending.remove(index);
    let outcome =
        monitor(world).on_fetch_completed(request.complete(StatusPayload::from_json(&body)));
    world.last_outcome = Some(outcome);
}

#[when(expr = "a poll returns {string}")]
fn poll_returns(world: &mut MercuryWorld, body: String) {
    let request = monitor(world).on_poll_tick().expect("polling not active");
    world.pending.push(request);
    complete_latest(world, FetchPhase::Poll, StatusPayload::from_json(&body));
}

#[when("a poll fails")]
fn poll_fails(world: &mut MercuryWorld) {
    let request = monitor(world).on_poll_tick().expect("polling not active");
    world.pending.push(request);
    complete_latest(
        world,
        FetchPhase::Poll,
        Err(MercuryError::Http("timeout".to_string())),
    );
}

#[when("a poll tick is issued")]
fn poll_tick_issued(world: &mut MercuryWorld) {
    let request = monitor(world).on_poll_tick().expect("polling not active");
    world.pending.push(request);
}

#[when(expr = "the pending poll returns {string}")]
fn pending_poll_returns(world: &mut MercuryWorld, body: String) {
    complete_latest(world, FetchPhase::Poll, StatusPayload::from_json(&body));
}

#[when("the monitor is reset")]
fn monitor_reset(world: &mut MercuryWorld) {
    monitor(world).reset();
}

#[then(expr = "the monitor state should be {string}")]
fn state_should_be(world: &mut MercuryWorld, expected: String) {
    assert_eq!(monitor(world).state().to_string(), expected);
}

#[then("no reason should be shown")]
fn no_reason(world: &mut MercuryWorld) {
    assert_eq!(monitor(world).reason(), None);
}

#[then(expr = "the reason should be {string}")]
fn reason_should_be(world: &mut MercuryWorld, expected: String) {
    assert_eq!(monitor(world).reason(), Some(expected));
}

#[then("polling should be active")]
fn polling_active(world: &mut MercuryWorld) {
    assert!(monitor(world).is_polling());
}

#[then("polling should not be active")]
fn polling_inactive(world: &mut MercuryWorld) {
    assert!(!monitor(world).is_polling());
}

#[then("a poll tick should request nothing")]
fn poll_tick_requests_nothing(world: &mut MercuryWorld) {
    assert!(monitor(world).on_poll_tick().is_none());
}

#[then(expr = "a poll tick should request {string}")]
fn poll_tick_requests(world: &mut MercuryWorld, url: String) {
    let request = monitor(world).on_poll_tick().expect("polling not active");
    assert_eq!(request.phase, FetchPhase::Poll);
    assert_eq!(request.target.as_str(), url);
}

#[then(expr = "the outcome should be {string}")]
fn outcome_should_be(world: &mut MercuryWorld, expected: String) {
    let outcome = world.last_outcome.expect("no outcome recorded");
    assert_eq!(format!("{:?}", outcome), expected);
}

#[then(expr = "the last payload should have {string} equal to {int}")]
fn last_payload_field(world: &mut MercuryWorld, field: String, expected: i64) {
    let payload = monitor(world).last_payload().expect("no last payload");
    assert_eq!(payload.get(&field), Some(&serde_json::json!(expected)));
}
