//! Tongdy air-quality probe driver.
//!
//! The probe reports CO2 in ppm directly and temperature/humidity in tenths.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use hlr_common::reading::{Payload, Reading, SensorKind, TongdyPayload};

use crate::bus::BusRegistry;
use crate::config::SensorConfig;
use crate::registers::{FUNCTION_READ_HOLDING, RegisterDef, tenths};
use crate::sensor::{open_transport, read_with_retries};
use crate::transport::{RegisterReader, RtuTransport};

/// Register map of the Tongdy probe.
const REGISTERS: [RegisterDef; 3] = [
    RegisterDef {
        name: "co2",
        address: 0,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
    RegisterDef {
        name: "temperature",
        address: 1,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
    RegisterDef {
        name: "humid",
        address: 2,
        function_code: FUNCTION_READ_HOLDING,
        signed: true,
    },
];

/// Driver for a Tongdy air-quality probe.
pub struct TongdySensor<T = RtuTransport> {
    name: String,
    port: String,
    pre_delay: Duration,
    bus: Arc<BusRegistry>,
    transport: Option<T>,
}

impl TongdySensor {
    /// Open the probe's serial transport and build the driver.
    pub fn connect(config: &SensorConfig, bus: Arc<BusRegistry>) -> Self {
        let transport = open_transport(config);
        Self::with_transport(config, bus, transport)
    }
}

impl<T: RegisterReader> TongdySensor<T> {
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

    /// Poll the probe once. Never fails; a probe that cannot be read cleanly
    /// yields the all-null reading.
    pub async fn read_values(&mut self) -> Reading {
        let Some(transport) = self.transport.as_mut() else {
            warn!(sensor = %self.name, "no transport, returning null readings");
            return Reading::degraded(self.name.as_str(), SensorKind::Tongdy);
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
                debug!(sensor = %self.name, co2 = ?payload.co2, "tongdy poll complete");
                Reading::new(self.name.as_str(), Payload::Tongdy(payload))
            }
            None => {
                warn!(sensor = %self.name, "all read attempts failed, returning null readings");
                Reading::degraded(self.name.as_str(), SensorKind::Tongdy)
            }
        }
    }
}

/// Decode one full pass of raw register values, in map order.
fn decode_payload(raws: &[i32]) -> TongdyPayload {
    TongdyPayload {
        co2: Some(raws[0] as i64),
        temperature: Some(tenths(raws[1])),
        humid: Some(tenths(raws[2])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::test_support::{ScriptedTransport, sensor_config};

    fn driver(transport: Option<ScriptedTransport>) -> TongdySensor<ScriptedTransport> {
        let config = sensor_config(SensorKind::Tongdy, "before_exhaust", 1);
        TongdySensor::with_transport(&config, Arc::new(BusRegistry::new()), transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_poll_scales_registers() {
        let mut sensor = driver(Some(ScriptedTransport::one_good_pass(&[600, 245, 550])));

        let reading = sensor.read_values().await;

        assert_eq!(reading.sensor_id, "before_exhaust");
        match reading.payload {
            Payload::Tongdy(p) => {
                assert_eq!(p.co2, Some(600));
                assert_eq!(p.temperature, Some(24.5));
                assert_eq!(p.humid, Some(55.0));
            }
            other => panic!("expected tongdy payload, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_poll_nulls_every_field() {
        let mut sensor = driver(Some(ScriptedTransport::always_failing()));

        let reading = sensor.read_values().await;

        assert!(reading.is_degraded());
        assert_eq!(reading.kind(), SensorKind::Tongdy);
        match reading.payload {
            Payload::Tongdy(p) => {
                assert_eq!(p.co2, None);
                assert_eq!(p.temperature, None);
                assert_eq!(p.humid, None);
            }
            other => panic!("expected tongdy payload, got {:?}", other),
        }
    }
}
