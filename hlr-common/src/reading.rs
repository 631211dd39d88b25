use serde::{Deserialize, Serialize};

/// One decoded poll result from a sensor.
///
/// Serializes to the wire/row shape consumed downstream:
/// `{ "sensor_id": ..., "sensor_type": ..., "payload": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Configured display name of the sensor instance (e.g., "interlock_4c").
    pub sensor_id: String,

    /// Sensor-type tag plus the decoded register payload.
    #[serde(flatten)]
    pub payload: Payload,
}

impl Reading {
    /// Create a reading from a decoded payload.
    pub fn new(sensor_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            payload,
        }
    }

    /// Create the degraded reading for a sensor kind: every payload field null.
    ///
    /// This is the only way degraded payloads are built, so a partial payload
    /// can never appear on the degraded path.
    pub fn degraded(sensor_id: impl Into<String>, kind: SensorKind) -> Self {
        let payload = match kind {
            SensorKind::Interlock => Payload::Interlock(InterlockPayload::empty()),
            SensorKind::Tongdy => Payload::Tongdy(TongdyPayload::empty()),
        };
        Self::new(sensor_id, payload)
    }

    /// The sensor kind this reading came from.
    pub fn kind(&self) -> SensorKind {
        self.payload.kind()
    }

    /// True when every payload field is null.
    pub fn is_degraded(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Decoded payload, tagged by sensor type.
///
/// The tag/content layout puts `sensor_type` alongside `payload` at the top
/// level of a [`Reading`], and decoding dispatches on the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sensor_type", content = "payload", rename_all = "lowercase")]
pub enum Payload {
    /// HLR interlock unit registers.
    Interlock(InterlockPayload),
    /// Tongdy air-quality probe registers.
    Tongdy(TongdyPayload),
}

impl Payload {
    /// The sensor kind carried by this payload.
    pub fn kind(&self) -> SensorKind {
        match self {
            Payload::Interlock(_) => SensorKind::Interlock,
            Payload::Tongdy(_) => SensorKind::Tongdy,
        }
    }

    /// True when every field is null.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Interlock(p) => p.is_empty(),
            Payload::Tongdy(p) => p.is_empty(),
        }
    }
}

/// Kinds of sensors the poller knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// HLR interlock unit (duct climate, fan, operation mode).
    Interlock,
    /// Tongdy air-quality probe (temperature, humidity, CO2).
    Tongdy,
}

impl SensorKind {
    /// String tag used in readings and row files.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Interlock => "interlock",
            SensorKind::Tongdy => "tongdy",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Register payload of the HLR interlock unit.
///
/// Fields are null together on the degraded path; a successful read fills
/// every one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterlockPayload {
    /// Temperature before the filter, °C.
    pub temp_before_filter: Option<f64>,
    /// Fan speed, %.
    pub fan_speed: Option<f64>,
    /// Duct temperature, °C.
    pub temperature: Option<f64>,
    /// Duct relative humidity, %RH.
    pub humid: Option<f64>,
    /// Duct CO2, ppm.
    pub co2: Option<i64>,
    /// Duct VOC, %LV.
    pub voc: Option<f64>,
    /// HLR operation mode, 0-5.
    pub operation_mode: Option<i64>,
}

impl InterlockPayload {
    /// The all-null payload returned when no clean read could be obtained.
    pub fn empty() -> Self {
        Self {
            temp_before_filter: None,
            fan_speed: None,
            temperature: None,
            humid: None,
            co2: None,
            voc: None,
            operation_mode: None,
        }
    }

    /// True when every field is null.
    pub fn is_empty(&self) -> bool {
        self.temp_before_filter.is_none()
            && self.fan_speed.is_none()
            && self.temperature.is_none()
            && self.humid.is_none()
            && self.co2.is_none()
            && self.voc.is_none()
            && self.operation_mode.is_none()
    }
}

/// Register payload of a Tongdy air-quality probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TongdyPayload {
    /// Air temperature, °C.
    pub temperature: Option<f64>,
    /// Relative humidity, %RH.
    pub humid: Option<f64>,
    /// CO2, ppm.
    pub co2: Option<i64>,
}

impl TongdyPayload {
    /// The all-null payload returned when no clean read could be obtained.
    pub fn empty() -> Self {
        Self {
            temperature: None,
            humid: None,
            co2: None,
        }
    }

    /// True when every field is null.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humid.is_none() && self.co2.is_none()
    }
}
