//! Cancellable periodic tick for live elapsed-time display.
//!
//! A `DisplayTicker` is a scoped subscription: it is created when a view
//! becomes active and is cancelled when the handle is dropped or
//! `cancel` is called. No tick is delivered after cancellation returns.
//! Ticking is independent of the timer controller; the callback decides
//! what to recompute.

use log::debug;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default display refresh period.
pub const DISPLAY_TICK: Duration = Duration::from_secs(1);

/// Whether the ticker should keep running after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Handle for one running tick loop.
#[derive(Debug)]
pub struct DisplayTicker {
    cancel_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl DisplayTicker {
    /// Spawns a tick loop calling `on_tick(tick_number)` every `interval`.
    ///
    /// Tick numbers start at 1.
    ///
    /// # Errors
    /// - Returns an error when the worker thread cannot be spawned.
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> io::Result<Self>
    where
        F: FnMut(u64) -> TickControl + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let worker = thread::Builder::new()
            .name("display-ticker".to_string())
            .spawn(move || {
                let mut tick = 0_u64;
                loop {
                    match cancel_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            tick += 1;
                            if on_tick(tick) == TickControl::Stop {
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("event=ticker_exit module=timer status=ok ticks={tick}");
            })?;

        Ok(Self {
            cancel_tx: Some(cancel_tx),
            worker: Some(worker),
        })
    }

    /// Returns whether the tick loop has exited on its own.
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(true, |worker| worker.is_finished())
    }

    /// Stops ticking and waits for the worker to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for DisplayTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayTicker, TickControl};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn dropping_ticker_stops_further_ticks() {
        let ticks = Arc::new(AtomicU64::new(0));
        let observed = Arc::clone(&ticks);
        let ticker = DisplayTicker::spawn(Duration::from_millis(5), move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
            TickControl::Continue
        })
        .unwrap();

        thread::sleep(Duration::from_millis(60));
        drop(ticker);
        let after_drop = ticks.load(Ordering::SeqCst);
        assert!(after_drop > 0);

        thread::sleep(Duration::from_millis(40));
        assert_eq!(ticks.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn callback_can_end_the_loop() {
        let last = Arc::new(AtomicU64::new(0));
        let observed = Arc::clone(&last);
        let ticker = DisplayTicker::spawn(Duration::from_millis(2), move |tick| {
            observed.store(tick, Ordering::SeqCst);
            if tick == 3 {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        })
        .unwrap();

        while !ticker.is_finished() {
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(last.load(Ordering::SeqCst), 3);
        ticker.cancel();
    }
}
