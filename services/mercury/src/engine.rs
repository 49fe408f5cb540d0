//! Engine: drives a `StatusMonitor` from decodes, poll ticks and fetch results
//!
//! Every input is an [`Event`] on a single channel and the engine task handles
//! them one at a time, so fetch completions never race each other.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::client::StatusClient;
use crate::monitor::{
    FetchCompletion, FetchPhase, FetchRequest, Generation, MonitorState, Outcome, StatusMonitor,
};
use crate::payload::ScanResult;
use crate::timer::PollTimer;
use crate::MercuryError;

/// Default refresh period once a status has been fetched
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(15_000);

/// Inputs processed by the engine
#[derive(Debug)]
pub enum Event {
    CodeDecoded(ScanResult),
    PollTick(Generation),
    FetchCompleted(FetchCompletion),
    Reset,
}

/// The engine owns the monitor, its poll timer and the fetch client
pub struct Engine {
    monitor: StatusMonitor,
    client: StatusClient,
    polling_interval: Duration,
    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
    state_tx: watch::Sender<MonitorState>,
    timer: Option<PollTimer>,
    poll_in_flight: Option<Generation>,
    cancel: CancellationToken,
}

/// Cloneable front end for a running engine
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    events: UnboundedSender<Event>,
    state: watch::Receiver<MonitorState>,
    cancel: CancellationToken,
}

impl MonitorHandle {
    /// Forward a decoded code. Starts a new session.
    pub fn code_decoded(&self, result: ScanResult) -> crate::Result<()> {
        self.send(Event::CodeDecoded(result))
    }

    /// Return the monitor to `Idle` and stop polling
    pub fn reset(&self) -> crate::Result<()> {
        self.send(Event::Reset)
    }

    /// Snapshot of the current state
    pub fn state(&self) -> MonitorState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.clone()
    }

    /// Stop the engine. In-flight fetches finish but are not applied.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn send(&self, event: Event) -> crate::Result<()> {
        self.events
            .send(event)
            .map_err(|_| MercuryError::Engine("engine is not running".to_string()))
    }
}

impl Engine {
    pub fn new(
        client: StatusClient,
        polling_interval: Duration,
        cancel: CancellationToken,
    ) -> (Self, MonitorHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(MonitorState::Idle);

        let handle = MonitorHandle {
            events: events_tx.clone(),
            state: state_rx,
            cancel: cancel.clone(),
        };

        let engine = Self {
            monitor: StatusMonitor::new(),
            client,
            polling_interval,
            events_tx,
            events_rx,
            state_tx,
            timer: None,
            poll_in_flight: None,
            cancel,
        };

        (engine, handle)
    }

    /// Process events until cancelled.
    ///
    /// The engine holds a sender of its own event channel, so the only way
    /// out of the loop is the cancellation token.
    pub async fn run(mut self) {
        tracing::debug!(
            "Engine running, polling interval {:?}",
            self.polling_interval
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Engine cancelled");
                    break;
                }
                Some(event) = self.events_rx.recv() => self.handle(event),
            }
        }

        self.stop_polling();
        tracing::debug!("Engine stopped");
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::CodeDecoded(result) => {
                self.stop_polling();
                let request = self.monitor.on_code_decoded(result);
                self.publish();
                self.spawn_fetch(request);
            }
            Event::PollTick(generation) => {
                if self.monitor.generation() != Some(generation) {
                    tracing::debug!("Ignoring tick from superseded timer {}", generation);
                    return;
                }
                if self.poll_in_flight == Some(generation) {
                    tracing::debug!("Poll for {} still running, skipping tick", generation);
                    return;
                }
                if let Some(request) = self.monitor.on_poll_tick() {
                    self.poll_in_flight = Some(request.generation);
                    self.spawn_fetch(request);
                }
            }
            Event::FetchCompleted(completion) => {
                let generation = completion.generation;
                if completion.phase == FetchPhase::Poll
                    && self.poll_in_flight == Some(generation)
                {
                    self.poll_in_flight = None;
                }
                match self.monitor.on_fetch_completed(completion) {
                    Outcome::PollingStarted => {
                        self.start_polling(generation);
                        self.publish();
                    }
                    Outcome::InitialFailed => {
                        self.stop_polling();
                        self.publish();
                    }
                    Outcome::Changed => self.publish(),
                    Outcome::Suppressed | Outcome::PollFailed | Outcome::Discarded => {}
                }
            }
            Event::Reset => {
                self.stop_polling();
                self.monitor.reset();
                self.publish();
            }
        }
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        let client = self.client.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.fetch(&request.target).await;
            if events
                .send(Event::FetchCompleted(request.complete(result)))
                .is_err()
            {
                tracing::debug!("Engine gone, dropping fetch result");
            }
        });
    }

    fn start_polling(&mut self, generation: Generation) {
        // Replacing the timer drops, and so cancels, any previous one
        self.timer = Some(PollTimer::start(
            generation,
            self.polling_interval,
            self.events_tx.clone(),
        ));
    }

    fn stop_polling(&mut self) {
        self.poll_in_flight = None;
        if let Some(timer) = self.timer.take() {
            tracing::debug!("Stopping poll timer for {}", timer.generation());
        }
    }

    fn publish(&self) {
        let next = self.monitor.state();
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == *next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        if changed {
            tracing::debug!("Published state {}", next);
        }
    }
}
