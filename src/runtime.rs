//! Tokio drivers for [`StreamAdapter`].
//!
//! [`spawn_cooperative`] calls [`StreamAdapter::tick`] on a fixed cadence
//! from one async task. [`spawn_split`] runs the transmit and receive
//! services on two blocking threads, paced by the port's bounded I/O
//! timeouts. Both stop when their [`CancellationToken`] is cancelled.

use std::{sync::Arc, thread, time::Duration};

use log::{info, warn};
use tokio::{
    select,
    task::{JoinError, JoinHandle},
    time::{self, MissedTickBehavior},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{adapter::StreamAdapter, port::SerialPort, transport::FramedTransport};

/// Shortest cadence accepted by [`spawn_cooperative`].
pub const MIN_CADENCE: Duration = Duration::from_millis(1);

/// Tick `adapter` every `cadence` until `shutdown` is cancelled.
///
/// Cadences below [`MIN_CADENCE`] are raised to it. Missed ticks are
/// delayed rather than bunched up.
#[must_use]
pub fn spawn_cooperative<T, P>(
    adapter: Arc<StreamAdapter<T, P>>,
    cadence: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    T: FramedTransport + 'static,
    P: SerialPort + 'static,
{
    let cadence = cadence.max(MIN_CADENCE);
    tokio::spawn(async move {
        let mut interval = time::interval(cadence);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => adapter.tick(),
            }
        }
        info!("cooperative adapter driver stopped");
    })
}

/// Handles of the two pump threads started by [`spawn_split`].
#[derive(Debug)]
pub struct SplitPumps {
    tracker: TaskTracker,
    transmit: JoinHandle<()>,
    receive: JoinHandle<()>,
}

impl SplitPumps {
    /// Wait for both pumps to stop.
    ///
    /// # Errors
    ///
    /// Returns the first [`JoinError`] if a pump thread panicked.
    pub async fn join(self) -> Result<(), JoinError> {
        self.tracker.close();
        let transmit = self.transmit.await;
        let receive = self.receive.await;
        for (name, result) in [("transmit", &transmit), ("receive", &receive)] {
            if let Err(e) = result {
                warn!("{name} pump failed: error={e}");
            }
        }
        self.tracker.wait().await;
        transmit.and(receive)
    }
}

/// Service `adapter` from two blocking threads until `shutdown` is
/// cancelled: one loops [`StreamAdapter::service_transmit`], the other
/// [`StreamAdapter::service_receive`].
///
/// The adapter should be configured with
/// [`PumpMode::Split`](crate::config::PumpMode::Split) so application
/// writes never run a pump themselves.
pub fn spawn_split<T, P>(adapter: Arc<StreamAdapter<T, P>>, shutdown: CancellationToken) -> SplitPumps
where
    T: FramedTransport + 'static,
    P: SerialPort + 'static,
{
    let tracker = TaskTracker::new();
    let transmit = tracker.spawn_blocking({
        let adapter = Arc::clone(&adapter);
        let shutdown = shutdown.clone();
        move || pump_until(&shutdown, || adapter.service_transmit())
    });
    let receive = tracker.spawn_blocking(move || pump_until(&shutdown, || adapter.service_receive()));
    SplitPumps {
        tracker,
        transmit,
        receive,
    }
}

fn pump_until(shutdown: &CancellationToken, mut service: impl FnMut()) {
    while !shutdown.is_cancelled() {
        service();
        thread::yield_now();
    }
}
