use crate::Command;
use crate::TimerEvent;
use okey_core::TURN_CRITICAL_SECONDS;
use okey_core::TURN_SECONDS_MAX;
use okey_core::TURN_SECONDS_MIN;
use okey_core::TurnNumber;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::time::Instant;

/// Handle to a running turn timer.
///
/// The task holds the receiving half of a watch channel carrying the
/// deadline; replacing the value extends the turn, clearing it (or
/// dropping the handle) stops the task cooperatively. Stop is idempotent.
pub struct TimerHandle {
    deadline: watch::Sender<Option<Instant>>,
    turn: TurnNumber,
}

impl TimerHandle {
    pub fn turn(&self) -> TurnNumber {
        self.turn
    }
    /// Cancels the timer. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.deadline.send(None);
    }
    /// Atomically replaces the deadline with `deadline + additional`.
    pub fn extend(&self, additional: Duration) {
        self.deadline.send_modify(|deadline| {
            if let Some(d) = deadline.as_mut() {
                *d += additional;
            }
        });
    }
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .borrow()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// Starts the countdown for one turn.
///
/// Wakes every second; forwards a tick into the room when remaining time
/// is at or below the critical threshold or divisible by five, and a
/// single timeout when the deadline passes. Duration is clamped to the
/// configured bounds.
pub fn start(turn: TurnNumber, duration: Duration, commands: Sender<Command>) -> TimerHandle {
    let duration = duration.clamp(
        Duration::from_secs(TURN_SECONDS_MIN),
        Duration::from_secs(TURN_SECONDS_MAX),
    );
    let (tx, mut rx) = watch::channel(Some(Instant::now() + duration));
    tokio::spawn(async move {
        let second = Duration::from_secs(1);
        let mut ticker = tokio::time::interval_at(Instant::now() + second, second);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(deadline) = *rx.borrow() else { break };
                    let now = Instant::now();
                    if now >= deadline {
                        log::debug!("[timer] turn {} timed out", turn);
                        let _ = commands.send(Command::Timer(TimerEvent::Timeout { turn })).await;
                        break;
                    }
                    let remaining = deadline.duration_since(now).as_secs();
                    if remaining <= TURN_CRITICAL_SECONDS || remaining % 5 == 0 {
                        let _ = commands
                            .send(Command::Timer(TimerEvent::Tick { turn, remaining }))
                            .await;
                    }
                }
                changed = rx.changed() => {
                    if changed.is_err() || rx.borrow().is_none() {
                        break;
                    }
                }
            }
        }
    });
    TimerHandle { deadline: tx, turn }
}
