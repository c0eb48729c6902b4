use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use super::shutdown::ShutdownSignal;

/// Process-wide "first cycle is over" switch. Starts false, flips to true
/// once and never back.
#[derive(Debug, Clone, Default)]
pub struct SteadyState {
    flag: Arc<AtomicBool>,
}

impl SteadyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_steady(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns `true` only for the call that performed the transition
    fn enter(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }
}

/// One-shot rendezvous for the first poll of every source.
///
/// The arrival that completes the rendezvous enters steady state before any
/// waiter is released.
#[derive(Debug)]
pub struct FirstCycleBarrier {
    parties: usize,
    arrivals: Mutex<usize>,
    released: watch::Sender<bool>,
    steady: SteadyState,
}

impl FirstCycleBarrier {
    pub fn new(parties: usize, steady: SteadyState) -> Self {
        let (released, _) = watch::channel(false);
        Self {
            parties,
            arrivals: Mutex::new(0),
            released,
            steady,
        }
    }

    /// Wait until all parties have arrived. Returns this caller's arrival
    /// ordinal (0-based), or `None` if shutdown was requested first.
    ///
    /// Must be called at most once per party.
    pub async fn await_first_cycle(&self, shutdown: &mut ShutdownSignal) -> Option<usize> {
        let ordinal = {
            let mut arrivals = self.arrivals.lock().unwrap_or_else(PoisonError::into_inner);
            let ordinal = *arrivals;
            assert!(
                ordinal < self.parties,
                "first-cycle barrier sized for {} parties got arrival #{}",
                self.parties,
                ordinal + 1
            );
            *arrivals += 1;

            if *arrivals == self.parties {
                if self.steady.enter() {
                    tracing::info!("All {} sources polled once, notifications enabled", self.parties);
                }
                self.released.send_replace(true);
            }
            ordinal
        };

        let mut released = self.released.subscribe();
        tokio::select! {
            biased;
            _ = released.wait_for(|done| *done) => Some(ordinal),
            _ = shutdown.cancelled() => None,
        }
    }
}
