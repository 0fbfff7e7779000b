// ── Periodic refresh ──

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Device;
use crate::config::SendOptions;
use crate::event::DeviceEvent;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Stops the polling task when [`stop`](Self::stop)ped or dropped.
#[derive(Debug)]
pub struct PollingHandle {
    cancel: CancellationToken,
}

impl PollingHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Device {
    /// Run [`get_info`](Self::get_info) every `interval`, first run
    /// immediately. Failures are published as
    /// [`DeviceEvent::PollingError`] and do not stop the timer.
    pub fn start_polling(&self, interval: Duration) -> PollingHandle {
        let cancel = CancellationToken::new();
        let device = self.clone();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                // An in-flight refresh is allowed to finish after stop().
                if let Err(e) = device.get_info(SendOptions::default()).await {
                    debug!(host = %device.host(), error = %e, "polling cycle failed");
                    device.emit(DeviceEvent::PollingError(Arc::new(e)));
                }
            }
            debug!(host = %device.host(), "polling stopped");
        });

        PollingHandle { cancel }
    }
}
