//! PollingRefresher: a named worker thread that fires a closure on a fixed
//! cadence until told to stop.
//!
//! Pollers are independent tasks with their own cadences; they are never
//! multiplexed onto one timer. The first tick fires immediately so a fresh
//! session does not wait a full interval for its first snapshot.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded, select, tick};

use crate::core::errors::{IrdError, Result};

/// What a tick closure tells the poller to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep polling on the configured cadence.
    Continue,
    /// Stop the worker; the condition that made polling useful is gone.
    Stop,
}

/// Handle to a running poller thread.
pub struct PollingRefresher {
    stop_tx: Option<crossbeam_channel::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl PollingRefresher {
    /// Spawn a poller named `name` firing `tick_fn` every `interval`.
    ///
    /// The closure runs once immediately, then on each tick. Returning
    /// [`TickOutcome::Stop`] ends the worker from inside.
    pub fn start<F>(name: &str, interval: Duration, mut tick_fn: F) -> Result<Self>
    where
        F: FnMut() -> TickOutcome + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let join = thread::Builder::new()
            .name(format!("irdash-poll-{name}"))
            .spawn(move || poller_thread_main(interval, &stop_rx, &mut tick_fn))
            .map_err(|source| IrdError::Runtime {
                details: format!("failed to spawn poller {name}: {source}"),
            })?;
        Ok(Self {
            stop_tx: Some(stop_tx),
            join: Some(join),
        })
    }

    /// Stop the worker and wait for it; no tick fires after this returns.
    pub fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for PollingRefresher {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
    }
}

fn poller_thread_main<F>(interval: Duration, stop_rx: &Receiver<()>, tick_fn: &mut F)
where
    F: FnMut() -> TickOutcome,
{
    if tick_fn() == TickOutcome::Stop {
        return;
    }
    let ticker = tick(interval);
    loop {
        select! {
            recv(stop_rx) -> _ => return,
            recv(ticker) -> _ => {
                if tick_fn() == TickOutcome::Stop {
                    return;
                }
            }
        }
    }
}
