// Background polling of the RAPL sampler
// One tokio task samples every socket on a fixed interval until cancelled

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::common::msr::{MsrHandle, RegisterHandle};
use crate::counters::rapl::RaplSampler;
use crate::error::{PowermonError, Result};
use crate::metrics::rapl::PowerSummary;

/// A running sampler with its polling task
///
/// The mutex makes the polling task the single writer per socket and lets
/// readers observe only fully rotated snapshots.
pub struct SamplerSession<H: RegisterHandle + 'static = MsrHandle> {
    sampler: Arc<Mutex<RaplSampler<H>>>,
    cancel_token: CancellationToken,
    handle: JoinHandle<Result<u64>>,
}

impl<H: RegisterHandle + 'static> SamplerSession<H> {
    /// Start polling `sampler` every `interval`
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin(sampler: RaplSampler<H>, interval: Duration) -> Self {
        tracing::info!(
            "Sampling {} socket(s) every {} ms",
            sampler.n_sockets(),
            interval.as_millis()
        );

        let sampler = Arc::new(Mutex::new(sampler));
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(
            Arc::clone(&sampler),
            interval,
            cancel_token.clone(),
        ));

        Self {
            sampler,
            cancel_token,
            handle,
        }
    }

    /// Resolves once the session is stopped, either by [`SamplerSession::end`]
    /// or because a sample failed
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.cancel_token.cancelled()
    }

    /// Stop polling and return the final summary
    ///
    /// Fails with the sampling error if the poller stopped on its own.
    pub async fn end(self) -> Result<PowerSummary> {
        self.cancel_token.cancel();

        let ticks = self.handle.await.map_err(|e| {
            PowermonError::RaplError(format!("sampling task did not complete: {e}"))
        })??;
        tracing::info!("Sampling stopped after {} ticks", ticks);

        Ok(self.sampler.lock().report().summary())
    }
}

async fn polling_loop<H: RegisterHandle>(
    sampler: Arc<Mutex<RaplSampler<H>>>,
    interval: Duration,
    cancel_token: CancellationToken,
) -> Result<u64> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; reset() already sampled
    ticker.tick().await;

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::debug!("Polling loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                let result = sampler.lock().sample();
                if let Err(e) = result {
                    tracing::error!("Sampling failed: {}", e);
                    cancel_token.cancel();
                    return Err(e);
                }
                ticks += 1;
            }
        }
    }

    Ok(ticks)
}
