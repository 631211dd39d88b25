//! Mock reading generator.
//!
//! Emits fixture readings into the same channel the real drivers feed, so
//! the service and its consumers can run on a desk with no bus attached.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use hlr_common::reading::{InterlockPayload, Payload, Reading, SensorKind, TongdyPayload};

use crate::config::SensorConfig;
use crate::poller::QueuedReading;

/// Generate a mock interlock reading.
pub fn interlock_reading(name: &str) -> Reading {
    Reading::new(
        name,
        Payload::Interlock(InterlockPayload {
            temp_before_filter: Some(30.0),
            fan_speed: Some(50.0),
            temperature: Some(25.0),
            humid: Some(45.0),
            co2: Some(800),
            voc: Some(12.0),
            operation_mode: Some(2), // Scrubbing
        }),
    )
}

/// Generate a mock air-quality reading.
pub fn tongdy_reading(name: &str) -> Reading {
    Reading::new(
        name,
        Payload::Tongdy(TongdyPayload {
            temperature: Some(24.5),
            humid: Some(55.0),
            co2: Some(600),
        }),
    )
}

/// One mock reading per configured sensor.
pub fn readings(sensors: &[SensorConfig]) -> Vec<Reading> {
    sensors
        .iter()
        .map(|sensor| match sensor.kind {
            SensorKind::Interlock => interlock_reading(&sensor.name),
            SensorKind::Tongdy => tongdy_reading(&sensor.name),
        })
        .collect()
}

/// Feed mock readings into the channel on the poll interval until shutdown.
pub async fn run_feeder(
    sensors: Vec<SensorConfig>,
    tx: mpsc::UnboundedSender<QueuedReading>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(sensors = sensors.len(), "mock feeder running, no bus attached");

    loop {
        for reading in readings(&sensors) {
            debug!(sensor = %reading.sensor_id, "mock reading");
            if tx.send(QueuedReading::stamped(reading)).is_err() {
                return;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("mock feeder stopping");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::test_support::sensor_config;

    #[test]
    fn test_mock_readings_cover_all_sensors() {
        let sensors = vec![
            sensor_config(SensorKind::Interlock, "interlock_4c", 5),
            sensor_config(SensorKind::Tongdy, "before_exhaust", 1),
        ];

        let readings = readings(&sensors);

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].kind(), SensorKind::Interlock);
        assert_eq!(readings[1].kind(), SensorKind::Tongdy);
        assert!(readings.iter().all(|r| !r.is_degraded()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_feeder_sends_until_shutdown() {
        let sensors = vec![
            sensor_config(SensorKind::Interlock, "a", 5),
            sensor_config(SensorKind::Tongdy, "b", 1),
        ];
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let feeder = tokio::spawn(run_feeder(
            sensors,
            tx,
            Duration::from_secs(10),
            shutdown_rx,
        ));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.reading.sensor_id, "a");
        assert_eq!(second.reading.sensor_id, "b");
        assert!(first.timestamp > 0);

        shutdown_tx.send(true).unwrap();
        feeder.await.unwrap();

        // Feeder gone, sender dropped, channel drains dry.
        assert!(rx.recv().await.is_none());
    }
}
