//! HLR interlock unit driver.
//!
//! The interlock unit reports duct climate, fan speed, and its operation
//! mode as holding registers. Climate registers carry tenths of a unit.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use hlr_common::reading::{InterlockPayload, Payload, Reading, SensorKind};

use crate::bus::BusRegistry;
use crate::config::SensorConfig;
use crate::registers::{FUNCTION_READ_HOLDING, RegisterDef, round2, tenths};
use crate::sensor::{open_transport, read_with_retries};
use crate::transport::{RegisterReader, RtuTransport};

/// Register map of the interlock unit (offsets from the 4xxxx base).
const REGISTERS: [RegisterDef; 7] = [
    RegisterDef {
        name: "temp_before_filter",
        address: 0,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
    RegisterDef {
        name: "fan_speed",
        address: 2,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
    RegisterDef {
        name: "temperature",
        address: 3,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
    RegisterDef {
        name: "humid",
        address: 4,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
    RegisterDef {
        name: "co2",
        address: 5,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
    RegisterDef {
        name: "voc",
        address: 6,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
    RegisterDef {
        name: "operation_mode",
        address: 8,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
];

/// Driver for the HLR interlock unit.
pub struct InterlockSensor<T = RtuTransport> {
    name: String,
    port: String,
    pre_delay: Duration,
    bus: Arc<BusRegistry>,
    transport: Option<T>,
}

impl InterlockSensor {
    /// Open the unit's serial transport and build the driver.
    ///
    /// A transport that cannot be opened is recorded as permanently absent;
    /// the driver still exists and every poll returns the null reading.
    pub fn connect(config: &SensorConfig, bus: Arc<BusRegistry>) -> Self {
        let transport = open_transport(config);
        Self::with_transport(config, bus, transport)
    }
}

impl<T: RegisterReader> InterlockSensor<T> {
    /// Build the driver over an already-open transport. `None` marks a
    /// permanent construction failure.
    pub fn with_transport(
        config: &SensorConfig,
        bus: Arc<BusRegistry>,
        transport: Option<T>,
    ) -> Self {
        Self {
            name: config.name.clone(),
            port: config.port.clone(),
            pre_delay: config.pre_delay(),
            bus,
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Poll the unit once. Never fails; a unit that cannot be read cleanly
    /// yields the all-null reading.
    pub async fn read_values(&mut self) -> Reading {
        let Some(transport) = self.transport.as_mut() else {
            warn!(sensor = %self.name, "no transport, returning null readings");
            return Reading::degraded(self.name.as_str(), SensorKind::Interlock);
        };

        match read_with_retries(
            &self.name,
            &self.bus,
            &self.port,
            self.pre_delay,
            transport,
            &REGISTERS,
        )
        .await
        {
            Some(raws) => {
                let payload = decode_payload(&raws);
                if let Some(mode) = payload.operation_mode {
                    debug!(
                        sensor = %self.name,
                        mode = operation_mode_name(mode),
                        "interlock poll complete"
                    );
                }
                Reading::new(self.name.as_str(), Payload::Interlock(payload))
            }
            None => {
                warn!(sensor = %self.name, "all read attempts failed, returning null readings");
                Reading::degraded(self.name.as_str(), SensorKind::Interlock)
            }
        }
    }
}

/// Decode one full pass of raw register values, in map order.
fn decode_payload(raws: &[i32]) -> InterlockPayload {
    InterlockPayload {
        temp_before_filter: Some(tenths(raws[0])),
        fan_speed: Some(round2(raws[1] as f64)),
        temperature: Some(tenths(raws[2])),
        humid: Some(tenths(raws[3])),
        co2: Some(raws[4] as i64),
        voc: Some(tenths(raws[5])),
        operation_mode: Some(raws[6] as i64),
    }
}

/// Display name of an interlock operation mode.
pub fn operation_mode_name(mode: i64) -> &'static str {
    match mode {
        0 => "Manual",
        1 => "Standby",
        2 => "Scrubbing",
        3 => "Regeneration",
        4 => "Cooldown",
        5 => "Alarming",
        _ => "Unknown",
    }
}
