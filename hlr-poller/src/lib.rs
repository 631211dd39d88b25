//! RS-485 sensor poller for HLR installations.
//!
//! Polls HLR interlock units and Tongdy air-quality probes over shared
//! RS-485/Modbus-RTU buses and persists decoded readings as rows.
//!
//! # Structure
//!
//! - [`bus`] - per-port access coordination (exclusive transactions with a
//!   minimum quiet period between them)
//! - [`transport`] - Modbus-RTU register reads over tokio-serial
//! - [`sensor`] - the drivers and their shared retrying read pipeline
//! - [`poller`] - one polling task per sensor, feeding a reading channel
//! - [`store`] - appends readings as rows to per-table files
//! - [`mock`] - fixture readings for running without hardware

pub mod bus;
pub mod config;
pub mod error;
pub mod mock;
pub mod poller;
pub mod registers;
pub mod sensor;
pub mod store;
pub mod transport;
