//! Serial Modbus-RTU transport.
//!
//! [`RegisterReader`] is the capability the sensor drivers poll through; the
//! production implementation is [`RtuTransport`], a tokio-modbus RTU client
//! over a tokio-serial stream. Tests substitute their own implementations.

use async_trait::async_trait;
use std::time::Duration;
use tokio_modbus::client::{Context, Reader};
use tokio_modbus::prelude::*;
use tokio_serial::SerialStream;
use tracing::debug;

use crate::error::TransportError;
use crate::registers::{FUNCTION_READ_HOLDING, FUNCTION_READ_INPUT, decode_raw};

/// Reads single 16-bit registers from one sensor unit.
#[async_trait]
pub trait RegisterReader: Send {
    /// Read the register at `address` with the given Modbus function code,
    /// sign-extending the result when `signed`.
    async fn read_register(
        &mut self,
        address: u16,
        function_code: u8,
        signed: bool,
    ) -> Result<i32, TransportError>;
}

/// Modbus-RTU client bound to one slave on a serial port.
pub struct RtuTransport {
    ctx: Context,
    timeout: Duration,
}

impl RtuTransport {
    /// Open the serial port and attach a Modbus-RTU client for `slave`.
    ///
    /// The line is fixed at 8 data bits, no parity, 1 stop bit, which is what
    /// every unit on these buses speaks. Exclusivity is cleared so several
    /// drivers can hold the same device node; the bus registry serializes
    /// their transactions.
    pub fn open(
        port: &str,
        baud_rate: u32,
        slave: u8,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let builder = tokio_serial::new(port, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One);

        #[allow(unused_mut)]
        let mut serial = SerialStream::open(&builder)
            .map_err(|e| TransportError::Connection(format!("Serial open failed: {}", e)))?;

        #[cfg(unix)]
        serial
            .set_exclusive(false)
            .map_err(|e| TransportError::Connection(format!("Serial exclusivity: {}", e)))?;

        debug!(port, baud_rate, slave, "serial transport opened");

        let ctx = rtu::attach_slave(serial, Slave(slave));
        Ok(Self { ctx, timeout })
    }
}

#[async_trait]
impl RegisterReader for RtuTransport {
    async fn read_register(
        &mut self,
        address: u16,
        function_code: u8,
        signed: bool,
    ) -> Result<i32, TransportError> {
        let timeout = self.timeout;

        let request = async {
            let words = match function_code {
                FUNCTION_READ_HOLDING => self.ctx.read_holding_registers(address, 1).await,
                FUNCTION_READ_INPUT => self.ctx.read_input_registers(address, 1).await,
                other => return Err(TransportError::UnsupportedFunction(other)),
            }
            .map_err(|e| TransportError::Read(e.to_string()))?
            .map_err(|e| TransportError::Exception(format!("{:?}", e)))?;

            words
                .first()
                .map(|word| decode_raw(*word, signed))
                .ok_or_else(|| TransportError::Read("Empty response".to_string()))
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }
}
