//! Sensor drivers and the shared register-read pipeline.
//!
//! Each driver owns a transport for its unit and a handle to the bus
//! registry. A poll runs up to [`MAX_READ_ATTEMPTS`] attempts; every attempt
//! acquires the bus, reads the driver's full register map in order, and
//! releases the bus before any retry pause. A clean attempt short-circuits;
//! exhaustion degrades to an all-null reading instead of propagating an
//! error, so one misbehaving unit never takes the poll loop down.

mod interlock;
mod tongdy;

pub use interlock::InterlockSensor;
pub use tongdy::TongdySensor;

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, trace, warn};

use hlr_common::reading::{Reading, SensorKind};

use crate::bus::BusRegistry;
use crate::config::SensorConfig;
use crate::error::TransportError;
use crate::registers::RegisterDef;
use crate::transport::{RegisterReader, RtuTransport};

/// Attempts per poll before degrading to a null reading.
pub const MAX_READ_ATTEMPTS: u32 = 3;

/// Pause after each failed attempt.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// A configured sensor unit of any supported kind.
pub enum SensorUnit {
    Interlock(InterlockSensor),
    Tongdy(TongdySensor),
}

impl SensorUnit {
    /// Build the driver for `config`, opening its serial transport.
    pub fn connect(config: &SensorConfig, bus: Arc<BusRegistry>) -> Self {
        match config.kind {
            SensorKind::Interlock => SensorUnit::Interlock(InterlockSensor::connect(config, bus)),
            SensorKind::Tongdy => SensorUnit::Tongdy(TongdySensor::connect(config, bus)),
        }
    }

    /// Configured display name of the unit.
    pub fn name(&self) -> &str {
        match self {
            SensorUnit::Interlock(sensor) => sensor.name(),
            SensorUnit::Tongdy(sensor) => sensor.name(),
        }
    }

    /// Poll the unit once. Never fails; see the module docs.
    pub async fn read_values(&mut self) -> Reading {
        match self {
            SensorUnit::Interlock(sensor) => sensor.read_values().await,
            SensorUnit::Tongdy(sensor) => sensor.read_values().await,
        }
    }
}

/// Open the RTU transport for a configured sensor.
///
/// Open failures are terminal for the unit: the driver keeps running with no
/// transport and reports null readings on every poll.
pub(crate) fn open_transport(config: &SensorConfig) -> Option<RtuTransport> {
    match RtuTransport::open(
        &config.port,
        config.baud_rate,
        config.address,
        config.timeout(),
    ) {
        Ok(transport) => Some(transport),
        Err(e) => {
            error!(
                sensor = %config.name,
                port = %config.port,
                error = %e,
                "failed to open serial transport"
            );
            None
        }
    }
}

/// Run the retrying read pipeline for one poll.
///
/// Returns the raw register values in map order after the first clean
/// attempt, or `None` once all attempts are spent. The bus is held for the
/// span of one attempt at a time; the retry pause runs off-bus, and it also
/// runs after the final failed attempt, so a degraded poll always takes the
/// same time.
pub(crate) async fn read_with_retries<T: RegisterReader>(
    name: &str,
    bus: &BusRegistry,
    port: &str,
    pre_delay: Duration,
    transport: &mut T,
    registers: &[RegisterDef],
) -> Option<Vec<i32>> {
    for attempt in 1..=MAX_READ_ATTEMPTS {
        let result = {
            let _bus = bus.acquire(port, pre_delay).await;
            read_map_once(transport, registers).await
        };

        match result {
            Ok(raws) => return Some(raws),
            Err(e) => {
                warn!(sensor = name, attempt, error = %e, "register read failed");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }

    None
}

/// Read every register in the map, in order, failing on the first error.
async fn read_map_once<T: RegisterReader>(
    transport: &mut T,
    registers: &[RegisterDef],
) -> Result<Vec<i32>, TransportError> {
    let mut raws = Vec::with_capacity(registers.len());

    for register in registers {
        let raw = transport
            .read_register(register.address, register.function_code, register.signed)
            .await?;
        trace!(register = register.name, address = register.address, raw, "register read");
        raws.push(raw);
    }

    Ok(raws)
}
