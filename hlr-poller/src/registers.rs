//! Register definitions and raw-value decoding.
//!
//! Sensors expose their data as 16-bit Modbus registers. Each driver carries
//! a fixed map of [`RegisterDef`]s describing where its values live and how
//! to interpret them; the helpers here turn raw register words into the
//! engineering units stored in payloads.

/// Modbus function code for reading holding registers.
pub const FUNCTION_READ_HOLDING: u8 = 3;

/// Modbus function code for reading input registers.
pub const FUNCTION_READ_INPUT: u8 = 4;

/// One register in a sensor's fixed address map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDef {
    /// Payload field this register feeds.
    pub name: &'static str,

    /// Zero-based register address (offset from the 4xxxx base).
    pub address: u16,

    /// Modbus function code used to read it.
    pub function_code: u8,

    /// Interpret the 16-bit word as two's complement.
    pub signed: bool,
}

/// Decode a raw 16-bit register word, sign-extending when requested.
pub fn decode_raw(word: u16, signed: bool) -> i32 {
    if signed { word as i16 as i32 } else { word as i32 }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scale a raw register value by 0.1, rounded to two decimals.
///
/// Most climate registers report tenths of a unit (tenths of a degree,
/// tenths of a percent).
pub fn tenths(raw: i32) -> f64 {
    round2(raw as f64 * 0.1)
}
