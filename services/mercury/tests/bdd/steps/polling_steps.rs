//! BDD step definitions for the periodic refresh feature

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use mercury::client::StatusClient;
use mercury::io::{HttpClient, HttpResponse};
use mercury::{Engine, MercuryError, MonitorHandle, ScanResult};

use crate::world::MercuryWorld;

/// An HTTP endpoint that plays back bodies in order and repeats the last one
#[derive(Debug, Default)]
pub struct ScriptedEndpoint {
    bodies: Mutex<Vec<Option<String>>>,
    calls: AtomicUsize,
}

impl ScriptedEndpoint {
    fn push(&self, body: Option<String>) {
        self.bodies.lock().unwrap().push(body);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HttpClient for ScriptedEndpoint {
    async fn get(&self, _url: &str) -> mercury::Result<HttpResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let body = {
            let bodies = self.bodies.lock().unwrap();
            bodies
                .get(call)
                .or_else(|| bodies.last())
                .cloned()
                .flatten()
        };
        match body {
            Some(body) => Ok(HttpResponse { status: 200, body }),
            None => Err(MercuryError::Http("connection refused".to_string())),
        }
    }
}

fn endpoint(world: &mut MercuryWorld) -> Arc<ScriptedEndpoint> {
    Arc::clone(world.endpoint.get_or_insert_with(Default::default))
}

fn handle(world: &MercuryWorld) -> &MonitorHandle {
    world.handle.as_ref().expect("engine not running")
}

#[given(expr = "a status endpoint that returns {string}")]
fn endpoint_returns(world: &mut MercuryWorld, body: String) {
    endpoint(world).push(Some(body));
}

#[given(expr = "the endpoint then returns {string}")]
fn endpoint_then_returns(world: &mut MercuryWorld, body: String) {
    endpoint(world).push(Some(body));
}

#[given("a status endpoint that fails")]
fn endpoint_fails(world: &mut MercuryWorld) {
    endpoint(world).push(None);
}

#[given(expr = "a running engine polling every {int} ms")]
fn running_engine(world: &mut MercuryWorld, interval_ms: u64) {
    let http: Arc<dyn HttpClient> = endpoint(world);
    let (engine, handle) = Engine::new(
        StatusClient::new(http),
        Duration::from_millis(interval_ms),
        CancellationToken::new(),
    );
    world.engine_task = Some(tokio::spawn(engine.run()));
    world.handle = Some(handle);
}

#[when(expr = "the code {string} is scanned")]
fn code_scanned(world: &mut MercuryWorld, code: String) {
    handle(world).code_decoded(ScanResult::from(code)).unwrap();
}

#[when("the engine is reset")]
fn engine_reset(world: &mut MercuryWorld) {
    handle(world).reset().unwrap();
}

#[when(expr = "{int} ms pass")]
async fn time_passes(_world: &mut MercuryWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "the engine state should become {string}")]
async fn engine_state_becomes(world: &mut MercuryWorld, expected: String) {
    let mut rx = handle(world).subscribe();
    rx.wait_for(|s| s.to_string() == expected)
        .await
        .expect("engine stopped");
}

#[then(expr = "the engine state should be {string}")]
fn engine_state_is(world: &mut MercuryWorld, expected: String) {
    assert_eq!(handle(world).state().to_string(), expected);
}

#[then(expr = "the endpoint should have been fetched {int} times")]
fn endpoint_fetched(world: &mut MercuryWorld, expected: usize) {
    let endpoint = world.endpoint.as_ref().expect("endpoint not set");
    assert_eq!(endpoint.calls(), expected);
}
