//! Polling scheduler.
//!
//! One task per configured sensor, each polling on the shared interval. A
//! slow or failing unit delays only itself; bus contention between tasks is
//! resolved by the bus registry, not here.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hlr_common::reading::Reading;

use crate::sensor::SensorUnit;

/// A reading stamped with the time its poll completed.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedReading {
    /// Epoch milliseconds at poll completion.
    pub timestamp: i64,
    pub reading: Reading,
}

impl QueuedReading {
    /// Stamp a reading with the current wall-clock time.
    pub fn stamped(reading: Reading) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            reading,
        }
    }
}

/// Polls every configured sensor on a fixed interval.
pub struct SensorPoller {
    sensors: Vec<SensorUnit>,
    tx: mpsc::UnboundedSender<QueuedReading>,
    interval: Duration,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl SensorPoller {
    pub fn new(
        sensors: Vec<SensorUnit>,
        tx: mpsc::UnboundedSender<QueuedReading>,
        interval: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            sensors,
            tx,
            interval,
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Spawn one polling task per sensor.
    ///
    /// Calling `start` on a poller that is already running is a no-op.
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            warn!("poller already running");
            return;
        }

        info!(
            sensors = self.sensors.len(),
            interval = ?self.interval,
            "starting sensor poller"
        );

        for mut sensor in self.sensors.drain(..) {
            let tx = self.tx.clone();
            let interval = self.interval;
            let mut shutdown = self.shutdown.subscribe();

            self.handles.push(tokio::spawn(async move {
                loop {
                    let reading = sensor.read_values().await;
                    debug!(
                        sensor = %reading.sensor_id,
                        degraded = reading.is_degraded(),
                        "sensor polled"
                    );

                    if tx.send(QueuedReading::stamped(reading)).is_err() {
                        debug!(sensor = sensor.name(), "reading channel closed");
                        break;
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                debug!(sensor = sensor.name(), "shutdown requested");
                                break;
                            }
                        }
                    }
                }
            }));
        }
    }

    /// Signal shutdown and wait for every polling task to finish.
    ///
    /// A poll in flight runs to its outcome first; shutdown takes effect at
    /// the next interval sleep.
    pub async fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        info!("stopping sensor poller");
        let _ = self.shutdown.send(true);

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hlr_common::SensorKind;

    use crate::bus::BusRegistry;
    use crate::sensor::test_support::sensor_config;
    use crate::sensor::InterlockSensor;

    /// A unit with no transport: polls complete immediately and degraded.
    fn null_unit(name: &str) -> SensorUnit {
        let config = sensor_config(SensorKind::Interlock, name, 5);
        SensorUnit::Interlock(InterlockSensor::with_transport(
            &config,
            Arc::new(BusRegistry::new()),
            None,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_readings_flow_to_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller = SensorPoller::new(
            vec![null_unit("a"), null_unit("b")],
            tx,
            Duration::from_secs(10),
        );
        poller.start();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();

        assert!(first.timestamp > 0);
        assert!(first.reading.is_degraded());
        let mut ids = vec![first.reading.sensor_id, second.reading.sensor_id];
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);

        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_repeat_on_interval() {
        let interval = Duration::from_secs(10);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller = SensorPoller::new(vec![null_unit("a")], tx, interval);

        let start = tokio::time::Instant::now();
        poller.start();

        rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), interval);

        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_is_noop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller = SensorPoller::new(vec![null_unit("a")], tx, Duration::from_secs(10));

        poller.start();
        poller.start();

        rx.recv().await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // One sensor, one poll per interval: a second reading would mean a
        // second set of tasks got spawned.
        assert!(rx.try_recv().is_err());

        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_tasks_and_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller = SensorPoller::new(vec![null_unit("a")], tx, Duration::from_secs(10));
        poller.start();

        rx.recv().await.unwrap();
        poller.stop().await;
        poller.stop().await; // idempotent

        // With the poller gone, no sender remains and the channel drains dry.
        drop(poller);
        assert!(rx.recv().await.is_none());
    }
}
