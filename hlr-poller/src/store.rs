//! Reading persistence.
//!
//! Drains the reading channel and appends one flat row per reading to an
//! append-only table file per sensor type. Rows are JSON lines or CBOR;
//! downstream loaders pick the files up from the data directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use hlr_common::reading::{InterlockPayload, Payload, SensorKind, TongdyPayload};
use hlr_common::serialization::{Format, encode};

use crate::poller::QueuedReading;

/// Table file for interlock readings.
const TABLE_INTERLOCK: &str = "sensor_data_interlock";

/// Table file for air-quality probe readings.
const TABLE_EXHAUST: &str = "sensor_data_exhaust";

/// Flat row for one interlock reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterlockRow {
    pub timestamp: i64,
    pub sensor_type: SensorKind,
    pub sensor_id: String,
    pub temp: Option<f64>,
    pub humid: Option<f64>,
    pub co2: Option<i64>,
    pub operation_mode: Option<i64>,
    pub temp_before_filter: Option<f64>,
    pub fan_speed: Option<f64>,
    pub voc: Option<f64>,
}

impl InterlockRow {
    fn new(timestamp: i64, sensor_id: &str, payload: &InterlockPayload) -> Self {
        Self {
            timestamp,
            sensor_type: SensorKind::Interlock,
            sensor_id: sensor_id.to_string(),
            temp: payload.temperature,
            humid: payload.humid,
            co2: payload.co2,
            operation_mode: payload.operation_mode,
            temp_before_filter: payload.temp_before_filter,
            fan_speed: payload.fan_speed,
            voc: payload.voc,
        }
    }
}

/// Flat row for one air-quality probe reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhaustRow {
    pub timestamp: i64,
    pub sensor_type: SensorKind,
    pub sensor_id: String,
    pub co2: Option<i64>,
    pub temp: Option<f64>,
    pub humid: Option<f64>,
}

impl ExhaustRow {
    fn new(timestamp: i64, sensor_id: &str, payload: &TongdyPayload) -> Self {
        Self {
            timestamp,
            sensor_type: SensorKind::Tongdy,
            sensor_id: sensor_id.to_string(),
            co2: payload.co2,
            temp: payload.temperature,
            humid: payload.humid,
        }
    }
}

/// Appends reading rows to per-table files under a data directory.
pub struct ReadingStore {
    data_dir: PathBuf,
    format: Format,
}

impl ReadingStore {
    /// Create the store, creating the data directory if needed.
    pub fn new(data_dir: impl Into<PathBuf>, format: Format) -> hlr_common::Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir, format })
    }

    /// Path of the table file a reading of `kind` lands in.
    pub fn table_path(&self, kind: SensorKind) -> PathBuf {
        let table = match kind {
            SensorKind::Interlock => TABLE_INTERLOCK,
            SensorKind::Tongdy => TABLE_EXHAUST,
        };
        let ext = match self.format {
            Format::Json => "jsonl",
            Format::Cbor => "cbor",
        };
        self.data_dir.join(format!("{}.{}", table, ext))
    }

    /// Append one reading to its table file.
    pub async fn append(&self, queued: &QueuedReading) -> hlr_common::Result<()> {
        let reading = &queued.reading;
        let mut bytes = match &reading.payload {
            Payload::Interlock(payload) => encode(
                &InterlockRow::new(queued.timestamp, &reading.sensor_id, payload),
                self.format,
            )?,
            Payload::Tongdy(payload) => encode(
                &ExhaustRow::new(queued.timestamp, &reading.sensor_id, payload),
                self.format,
            )?,
        };
        if self.format == Format::Json {
            bytes.push(b'\n');
        }

        let path = self.table_path(reading.kind());
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&bytes).await?;
        // tokio file writes are buffered; flush before drop so the row is on
        // disk (and any write error surfaces) before append returns.
        file.flush().await?;

        debug!(path = %path.display(), sensor = %reading.sensor_id, "row appended");
        Ok(())
    }

    /// Drain the channel until every sender is gone, appending each reading.
    ///
    /// Write failures are logged and skipped; one bad row never stops the
    /// drain.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<QueuedReading>) {
        while let Some(queued) = rx.recv().await {
            if let Err(e) = self.append(&queued).await {
                error!(
                    sensor = %queued.reading.sensor_id,
                    error = %e,
                    "failed to persist reading"
                );
            }
        }
        info!("reading store drained");
    }
}
