//! Owned, cancelable poll timer

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::engine::Event;
use crate::monitor::Generation;

/// Fixed-period tick source for one session.
///
/// The first tick fires one full period after `start`. Dropping the timer
/// cancels it; a fetch already running is left alone.
#[derive(Debug)]
pub struct PollTimer {
    generation: Generation,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollTimer {
    pub fn start(
        generation: Generation,
        period: Duration,
        events: UnboundedSender<Event>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tracing::debug!("Starting poll timer for {} every {:?}", generation, period);
        let first_tick = Instant::now() + period;
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Poll timer for {} cancelled", generation);
                        break;
                    }
                    _ = interval.tick() => {
                        if events.send(Event::PollTick(generation)).is_err() {
                            tracing::debug!("Engine gone, stopping poll timer for {}", generation);
                            break;
                        }
                    }
                }
            }
        });

        Self {
            generation,
            cancel,
            task,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
