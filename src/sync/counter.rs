//! CounterAnimator: step a displayed integer toward a target value.
//!
//! The step count is capped at 50 regardless of the magnitude of the jump,
//! which bounds animation cost when a counter moves by thousands. The final
//! step is clamped so the displayed value never overshoots the target.
//!
//! Pacing never happens on the reconciler thread: the [`FrameScheduler`]
//! sleeps between frames on its own thread and feeds each frame back
//! through the sync bus, so store mutation is never delayed by cosmetic
//! animation.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::core::errors::{IrdError, Result};
use crate::sync::SyncMessage;
use crate::view::CounterKind;

/// Hard cap on discrete animation steps.
const MAX_STEPS: u64 = 50;

/// Interpolates displayed counters over a bounded duration.
#[derive(Debug, Clone, Copy)]
pub struct CounterAnimator {
    duration: Duration,
}

impl CounterAnimator {
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Animator whose frames carry no pacing delay (tests, headless runs).
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            duration: Duration::ZERO,
        }
    }

    /// Delay between consecutive frames for a plan of `frame_count` frames.
    #[must_use]
    pub fn step_delay(&self, frame_count: usize) -> Duration {
        if frame_count == 0 {
            return Duration::ZERO;
        }
        self.duration
            .checked_div(u32::try_from(frame_count).unwrap_or(u32::MAX))
            .unwrap_or(Duration::ZERO)
    }
}

/// Compute the frame sequence for one animation.
///
/// Steps: `min(50, |to-from|)`; increment: `max(1, floor(|to-from| / steps))`;
/// direction: `sign(to - from)`; final frame clamped to `to`. Empty when
/// `from == to`.
#[must_use]
pub fn plan_frames(from: i64, to: i64) -> Vec<i64> {
    let delta = to - from;
    if delta == 0 {
        return Vec::new();
    }
    let magnitude = delta.unsigned_abs();
    let steps = magnitude.min(MAX_STEPS);
    let increment = i64::try_from((magnitude / steps).max(1)).unwrap_or(i64::MAX);

    let mut frames = Vec::with_capacity(usize::try_from(steps).unwrap_or(usize::MAX));
    let mut value = from;
    for i in 1..=steps {
        if i == steps {
            value = to;
        } else if delta > 0 {
            value = (value.saturating_add(increment)).min(to);
        } else {
            value = (value.saturating_sub(increment)).max(to);
        }
        frames.push(value);
        if value == to {
            break;
        }
    }
    frames
}

// ──────────────────── frame scheduler ────────────────────

struct FrameBatch {
    counter: CounterKind,
    frames: Vec<i64>,
    step_delay: Duration,
    epoch: u64,
}

/// Paces animation frames on a dedicated thread.
///
/// Each scheduled batch is replayed onto the sync bus as
/// [`SyncMessage::CounterFrame`] messages with the batch's epoch; the
/// reconciler drops frames whose epoch has been superseded by a newer
/// animation for the same counter. There is no sleep after the final frame,
/// so the target value is never delayed by pacing.
pub struct FrameScheduler {
    tx: Sender<FrameBatch>,
}

impl FrameScheduler {
    /// Spawn the pacing thread. Exits when the scheduler is dropped or the
    /// bus receiver goes away.
    pub fn spawn(bus: Sender<SyncMessage>) -> Result<Self> {
        // Unbounded on purpose: scheduling must never block the reconciler,
        // and batches are bounded by the update rate at <= 50 frames each.
        let (tx, rx) = unbounded::<FrameBatch>();
        thread::Builder::new()
            .name("irdash-frames".to_string())
            .spawn(move || scheduler_thread_main(&rx, &bus))
            .map_err(|source| IrdError::Runtime {
                details: format!("failed to spawn frame scheduler: {source}"),
            })?;
        Ok(Self { tx })
    }

    /// Queue one animation for pacing.
    pub fn schedule(&self, counter: CounterKind, frames: Vec<i64>, step_delay: Duration, epoch: u64) {
        let _ = self.tx.send(FrameBatch {
            counter,
            frames,
            step_delay,
            epoch,
        });
    }
}

fn scheduler_thread_main(rx: &Receiver<FrameBatch>, bus: &Sender<SyncMessage>) {
    while let Ok(batch) = rx.recv() {
        let FrameBatch {
            counter,
            frames,
            step_delay,
            epoch,
        } = batch;
        let last = frames.len().saturating_sub(1);
        for (i, value) in frames.into_iter().enumerate() {
            if bus
                .send(SyncMessage::CounterFrame {
                    counter,
                    value,
                    epoch,
                })
                .is_err()
            {
                return;
            }
            if i < last && !step_delay.is_zero() {
                thread::sleep(step_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::time::Instant;

    #[test]
    fn equal_endpoints_produce_zero_steps() {
        assert!(plan_frames(5, 5).is_empty());
    }

    #[test]
    fn large_jump_is_capped_at_fifty_steps_and_lands_exactly() {
        let frames = plan_frames(0, 200);
        assert!(frames.len() <= 50, "got {} steps", frames.len());
        assert_eq!(*frames.last().expect("non-empty"), 200);
    }

    #[test]
    fn small_delta_steps_by_one() {
        assert_eq!(plan_frames(0, 3), vec![1, 2, 3]);
    }

    #[test]
    fn descending_animation_never_undershoots() {
        let frames = plan_frames(200, 0);
        assert!(frames.len() <= 50);
        assert_eq!(*frames.last().expect("non-empty"), 0);
        assert!(frames.iter().all(|v| *v >= 0));
        for pair in frames.windows(2) {
            assert!(pair[1] < pair[0], "must be strictly decreasing");
        }
    }

    #[test]
    fn non_divisible_delta_still_terminates_at_target() {
        // 137 / 50 floors to 2; the clamped final step covers the remainder.
        let frames = plan_frames(0, 137);
        assert!(frames.len() <= 50);
        assert_eq!(*frames.last().expect("non-empty"), 137);
        assert!(frames.iter().all(|v| *v <= 137));
    }

    #[test]
    fn step_delay_divides_the_duration_across_frames() {
        let animator = CounterAnimator::new(Duration::from_millis(1_000));
        assert_eq!(animator.step_delay(50), Duration::from_millis(20));
        assert_eq!(animator.step_delay(0), Duration::ZERO);
        assert_eq!(CounterAnimator::immediate().step_delay(10), Duration::ZERO);
    }

    #[test]
    fn scheduler_replays_frames_in_order_with_epoch() {
        let (bus_tx, bus_rx) = bounded::<SyncMessage>(16);
        let scheduler = FrameScheduler::spawn(bus_tx).expect("spawn scheduler");
        scheduler.schedule(
            CounterKind::Commands,
            vec![1, 2, 3],
            Duration::from_millis(10),
            7,
        );

        let started = Instant::now();
        for expected in [1i64, 2, 3] {
            let message = bus_rx
                .recv_timeout(Duration::from_secs(2))
                .expect("frame delivered");
            assert_eq!(
                message,
                SyncMessage::CounterFrame {
                    counter: CounterKind::Commands,
                    value: expected,
                    epoch: 7,
                }
            );
        }
        // Two inter-frame gaps of 10 ms each; no sleep after the last frame.
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn zero_delay_batch_delivers_all_frames_promptly() {
        let (bus_tx, bus_rx) = bounded::<SyncMessage>(16);
        let scheduler = FrameScheduler::spawn(bus_tx).expect("spawn scheduler");
        scheduler.schedule(CounterKind::Remotes, plan_frames(0, 4), Duration::ZERO, 1);
        let mut values = Vec::new();
        for _ in 0..4 {
            match bus_rx.recv_timeout(Duration::from_secs(2)) {
                Ok(SyncMessage::CounterFrame { value, .. }) => values.push(value),
                other => panic!("expected frame, got {other:?}"),
            }
        }
        assert_eq!(values, vec![1, 2, 3, 4]);
    }
}
