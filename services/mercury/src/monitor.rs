//! Fraud status state machine
//!
//! `StatusMonitor` is synchronous and owns no I/O. It hands out
//! [`FetchRequest`]s and consumes [`FetchCompletion`]s; the engine runs the
//! fetches and the poll timer around it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::payload::{ScanResult, StatusPayload};

/// Consecutive poll failures after which a warning is logged
pub const POLL_FAILURE_WARN_THRESHOLD: u32 = 5;

/// Identifies one scan session. Strictly increasing per monitor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which kind of fetch a request or completion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    /// The fetch triggered by the decode itself
    Initial,
    /// A refresh triggered by a poll tick
    Poll,
}

/// The current fraud status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "payload", rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    AwaitingFirstFetch,
    Fraud(StatusPayload),
    Clear(StatusPayload),
    FetchError,
}

impl MonitorState {
    fn from_payload(payload: StatusPayload) -> Self {
        if payload.is_fraud() {
            MonitorState::Fraud(payload)
        } else {
            MonitorState::Clear(payload)
        }
    }

    /// Human-readable reason, present only in `Fraud`
    pub fn reason(&self) -> Option<String> {
        match self {
            MonitorState::Fraud(payload) => Some(payload.fraud_reason()),
            _ => None,
        }
    }

    /// `true` once a payload has been fetched for the session
    pub fn has_payload(&self) -> bool {
        matches!(self, MonitorState::Fraud(_) | MonitorState::Clear(_))
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorState::Idle => write!(f, "Idle"),
            MonitorState::AwaitingFirstFetch => write!(f, "AwaitingFirstFetch"),
            MonitorState::Fraud(_) => write!(f, "Fraud"),
            MonitorState::Clear(_) => write!(f, "Clear"),
            MonitorState::FetchError => write!(f, "FetchError"),
        }
    }
}

/// A fetch the caller should perform on behalf of the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: Generation,
    pub phase: FetchPhase,
    pub target: ScanResult,
}

impl FetchRequest {
    /// Pair this request with the result of performing it
    pub fn complete(self, result: crate::Result<StatusPayload>) -> FetchCompletion {
        FetchCompletion {
            generation: self.generation,
            phase: self.phase,
            result,
        }
    }
}

/// The answer to a [`FetchRequest`]
#[derive(Debug)]
pub struct FetchCompletion {
    pub generation: Generation,
    pub phase: FetchPhase,
    pub result: crate::Result<StatusPayload>,
}

/// What a completion did to the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// First fetch succeeded; polling must start
    PollingStarted,
    /// First fetch failed; no polling
    InitialFailed,
    /// Poll produced a new state or payload
    Changed,
    /// Poll returned the same non-fraud payload
    Suppressed,
    /// Poll failed; state untouched
    PollFailed,
    /// Completion belongs to a superseded session or an unexpected phase
    Discarded,
}

#[derive(Debug)]
struct Session {
    generation: Generation,
    target: ScanResult,
    last_payload: Option<StatusPayload>,
    consecutive_poll_failures: u32,
}

/// Scan-then-poll fraud status monitor
#[derive(Debug)]
pub struct StatusMonitor {
    state: MonitorState,
    session: Option<Session>,
    last_generation: u64,
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMonitor {
    pub fn new() -> Self {
        Self {
            state: MonitorState::Idle,
            session: None,
            last_generation: 0,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn last_payload(&self) -> Option<&StatusPayload> {
        self.session.as_ref()?.last_payload.as_ref()
    }

    pub fn scanned_url(&self) -> Option<&ScanResult> {
        self.session.as_ref().map(|s| &s.target)
    }

    /// Generation of the current session, if any
    pub fn generation(&self) -> Option<Generation> {
        self.session.as_ref().map(|s| s.generation)
    }

    pub fn consecutive_poll_failures(&self) -> u32 {
        self.session
            .as_ref()
            .map(|s| s.consecutive_poll_failures)
            .unwrap_or(0)
    }

    /// Polling runs exactly while a payload is held
    pub fn is_polling(&self) -> bool {
        self.state.has_payload()
    }

    pub fn reason(&self) -> Option<String> {
        self.state.reason()
    }

    /// Start a session for a freshly decoded code.
    ///
    /// Any previous session is superseded and its in-flight responses will be
    /// discarded.
    pub fn on_code_decoded(&mut self, result: ScanResult) -> FetchRequest {
        self.last_generation += 1;
        let generation = Generation(self.last_generation);

        if let Some(previous) = &self.session {
            tracing::debug!(
                "Session {} superseded by {} before reset",
                previous.generation,
                generation
            );
        }
        tracing::info!("Session {} started for {}", generation, result);

        self.session = Some(Session {
            generation,
            target: result.clone(),
            last_payload: None,
            consecutive_poll_failures: 0,
        });
        self.state = MonitorState::AwaitingFirstFetch;

        FetchRequest {
            generation,
            phase: FetchPhase::Initial,
            target: result,
        }
    }

    /// Request a refresh of the scanned URL. `None` unless polling is active.
    pub fn on_poll_tick(&self) -> Option<FetchRequest> {
        if !self.is_polling() {
            tracing::debug!("Poll tick ignored in state {}", self.state);
            return None;
        }
        let session = self.session.as_ref()?;
        Some(FetchRequest {
            generation: session.generation,
            phase: FetchPhase::Poll,
            target: session.target.clone(),
        })
    }

    /// Apply the result of a fetch previously handed out by this monitor
    pub fn on_fetch_completed(&mut self, completion: FetchCompletion) -> Outcome {
        let FetchCompletion {
            generation,
            phase,
            result,
        } = completion;

        let Some(session) = self.session.as_mut() else {
            tracing::debug!("Dropping {:?} response for {}: no session", phase, generation);
            return Outcome::Discarded;
        };
        if session.generation != generation {
            tracing::debug!(
                "Dropping stale {:?} response for {} (current {})",
                phase,
                generation,
                session.generation
            );
            return Outcome::Discarded;
        }

        match phase {
            FetchPhase::Initial => {
                if self.state != MonitorState::AwaitingFirstFetch {
                    tracing::debug!("Dropping initial response in state {}", self.state);
                    return Outcome::Discarded;
                }
                match result {
                    Ok(payload) => {
                        session.last_payload = Some(payload.clone());
                        self.state = MonitorState::from_payload(payload);
                        tracing::info!("Session {} status: {}", generation, self.state);
                        Outcome::PollingStarted
                    }
                    Err(e) => {
                        tracing::warn!("Error fetching QR data for {}: {}", session.target, e);
                        self.state = MonitorState::FetchError;
                        Outcome::InitialFailed
                    }
                }
            }
            FetchPhase::Poll => {
                if !self.state.has_payload() {
                    tracing::debug!("Dropping poll response in state {}", self.state);
                    return Outcome::Discarded;
                }
                match result {
                    Ok(payload) => {
                        session.consecutive_poll_failures = 0;
                        if !payload.is_fraud() && session.last_payload.as_ref() == Some(&payload) {
                            tracing::debug!("Session {} status unchanged", generation);
                            return Outcome::Suppressed;
                        }
                        session.last_payload = Some(payload.clone());
                        let previous = std::mem::replace(
                            &mut self.state,
                            MonitorState::from_payload(payload),
                        );
                        tracing::info!(
                            "Session {} status: {} -> {}",
                            generation,
                            previous,
                            self.state
                        );
                        Outcome::Changed
                    }
                    Err(e) => {
                        session.consecutive_poll_failures += 1;
                        tracing::debug!("Error polling QR data for {}: {}", session.target, e);
                        if session.consecutive_poll_failures == POLL_FAILURE_WARN_THRESHOLD {
                            tracing::warn!(
                                "Polling {} has failed {} consecutive times",
                                session.target,
                                session.consecutive_poll_failures
                            );
                        }
                        Outcome::PollFailed
                    }
                }
            }
        }
    }

    /// Return to `Idle` and forget the session
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!("Session {} reset", session.generation);
        }
        self.state = MonitorState::Idle;
    }
}
