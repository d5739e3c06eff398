//! Cancellable scheduled tasks for round timing

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::debug;

use crate::config::RoundConfig;

/// The round timers; at most one of each runs at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 1 s countdown ticks before a round
    Countdown,
    /// 1 s ticks while a round is active
    RoundClock,
    /// One-shot delay after a round ends
    Intermission,
}

impl TimerKind {
    pub fn schedule(self, round: &RoundConfig) -> Schedule {
        match self {
            TimerKind::Countdown | TimerKind::RoundClock => Schedule::Every(Duration::from_secs(1)),
            TimerKind::Intermission => Schedule::Once(round.intermission()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fire every period, first fire one period from now
    Every(Duration),
    /// Fire once after the delay
    Once(Duration),
}

/// A tick delivered to the session task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

struct Slot {
    generation: u64,
    repeating: bool,
    handle: JoinHandle<()>,
}

/// Owns the running timer tasks.
///
/// Each start gets a new generation. A tick already sitting in the channel
/// when its timer was cancelled carries an old generation and is refused by
/// [`Scheduler::accept`].
pub struct Scheduler {
    tx: mpsc::Sender<TimerFired>,
    slots: HashMap<TimerKind, Slot>,
    next_generation: u64,
}

impl Scheduler {
    pub fn new(tx: mpsc::Sender<TimerFired>) -> Self {
        Self {
            tx,
            slots: HashMap::new(),
            next_generation: 1,
        }
    }

    /// Start a timer, cancelling any running timer of the same kind first
    pub fn start(&mut self, kind: TimerKind, schedule: Schedule) -> u64 {
        self.cancel(kind);

        let generation = self.next_generation;
        self.next_generation += 1;

        let fired = TimerFired { kind, generation };
        let tx = self.tx.clone();
        let (handle, repeating) = match schedule {
            Schedule::Every(period) => {
                let handle = tokio::spawn(async move {
                    let mut ticker = interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        if tx.send(fired).await.is_err() {
                            break;
                        }
                    }
                });
                (handle, true)
            }
            Schedule::Once(delay) => {
                let handle = tokio::spawn(async move {
                    sleep(delay).await;
                    let _ = tx.send(fired).await;
                });
                (handle, false)
            }
        };

        debug!(?kind, generation, "Timer started");
        self.slots.insert(
            kind,
            Slot {
                generation,
                repeating,
                handle,
            },
        );
        generation
    }

    /// Stop a timer; returns false if none was running
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.slots.remove(&kind) {
            Some(slot) => {
                slot.handle.abort();
                debug!(?kind, generation = slot.generation, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether a tick belongs to the live timer of its kind
    pub fn accept(&mut self, fired: TimerFired) -> bool {
        let current = match self.slots.get(&fired.kind) {
            Some(slot) if slot.generation == fired.generation => slot.repeating,
            _ => return false,
        };
        if !current {
            self.slots.remove(&fired.kind);
        }
        true
    }

    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn cancel_all(&mut self) {
        for (_, slot) in self.slots.drain() {
            slot.handle.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
