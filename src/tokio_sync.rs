//! Synchronous `tokio-modbus` transport for the CN7500.
//!
//! [`SyncTransport`] adapts a `tokio-modbus` synchronous client context
//! (Modbus RTU or TCP) to the [`Transport`] trait used by
//! [`crate::client::Cn7500`]. The CN7500 communicates with function codes
//! 3 (read registers), 6 (write one register), 1 (read bits) and
//! 5 (write one bit).
//!
//! All methods block the current thread for the duration of one Modbus
//! request/response exchange. Timeouts are configured on the context via
//! [`SyncTransport::set_timeout`].
//!
//! # Examples
//!
//! ## RTU
//!
//! ```no_run
//! use cn7500_lib::{client::Cn7500, tokio_sync::SyncTransport};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = cn7500_lib::tokio_common::serial_port_builder("/dev/ttyUSB0", 9600);
//!     let ctx = tokio_modbus::client::sync::rtu::connect_slave(&builder, tokio_modbus::Slave(10))?;
//!     let mut transport = SyncTransport::new(ctx);
//!     transport.set_timeout(Duration::from_secs(1));
//!
//!     let mut client = Cn7500::new(transport);
//!     println!("PV: {} °C", client.read_process_value()?);
//!     Ok(())
//! }
//! ```

use crate::transport::{Transport, TransportError};
use std::time::Duration;
use tokio_modbus::prelude::{SyncReader, SyncWriter};

/// [`Transport`] implementation backed by a `tokio-modbus` synchronous
/// context.
pub struct SyncTransport {
    ctx: tokio_modbus::client::sync::Context,
}

impl SyncTransport {
    /// Wraps a `tokio-modbus` synchronous context.
    pub fn new(ctx: tokio_modbus::client::sync::Context) -> Self {
        Self { ctx }
    }

    /// Sets the timeout for Modbus communication.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.ctx.set_timeout(timeout);
    }

    /// Retrieves the current Modbus communication timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.ctx.timeout()
    }

    /// Consumes the transport, returning the `tokio-modbus` context.
    pub fn into_context(self) -> tokio_modbus::client::sync::Context {
        self.ctx
    }

    /// Flattens the nested `tokio-modbus` result (I/O error outside, Modbus
    /// exception inside) into one error type.
    fn flatten<T>(result: tokio_modbus::Result<T>) -> Result<T, TransportError> {
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(exception)) => Err(exception.into()),
            Err(err) => Err(err.into()),
        }
    }

    /// Extracts the single value of a quantity-1 read response.
    fn single<V: Copy>(values: Vec<V>, address: u16) -> Result<V, TransportError> {
        match values.as_slice() {
            [value] => Ok(*value),
            _ => Err(TransportError::UnexpectedResponse(format!(
                "expected 1 value for address {address}, device returned {}",
                values.len()
            ))),
        }
    }
}

impl Transport for SyncTransport {
    fn read_register(&mut self, address: u16) -> Result<u16, TransportError> {
        let values = Self::flatten(self.ctx.read_holding_registers(address, 1))?;
        Self::single(values, address)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        Self::flatten(self.ctx.write_single_register(address, value))
    }

    fn read_bit(&mut self, address: u16) -> Result<bool, TransportError> {
        let values = Self::flatten(self.ctx.read_coils(address, 1))?;
        Self::single(values, address)
    }

    fn write_bit(&mut self, address: u16, value: bool) -> Result<(), TransportError> {
        Self::flatten(self.ctx.write_single_coil(address, value))
    }
}
