//! The register-level transport boundary.
//!
//! The [`Transport`] trait is the seam between the controller facade
//! ([`crate::client::Cn7500`]) and the protocol engine that moves registers
//! and coils over the wire. The production implementation is backed by
//! `tokio-modbus` (see [`crate::tokio_sync`]); tests substitute an in-memory
//! register map.
//!
//! Register values cross this boundary as raw `u16` words. Decimal scaling
//! is applied by the types in [`crate::protocol`].

/// Errors originating from the wire, surfaced unchanged to the caller.
///
/// Timeouts, framing/checksum failures and missing responses all map to
/// variants of this type. Retry policy belongs to the transport
/// implementation; the facade never retries.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Wraps `tokio_modbus::Error` (I/O failure, timeout, protocol error).
    #[error(transparent)]
    Modbus(#[from] tokio_modbus::Error),

    /// Wraps `tokio_modbus::ExceptionCode` (exception response from the
    /// device).
    #[error(transparent)]
    Exception(#[from] tokio_modbus::ExceptionCode),

    /// The device answered, but not with the expected response shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Raw register and coil access against one controller.
///
/// The underlying field bus is half-duplex request/response without
/// multiplexing, so implementations handle exactly one request at a time;
/// every method suspends only for the duration of one exchange on the link.
pub trait Transport {
    /// Reads one holding register.
    fn read_register(&mut self, address: u16) -> Result<u16, TransportError>;

    /// Writes one holding register.
    fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError>;

    /// Reads one coil.
    fn read_bit(&mut self, address: u16) -> Result<bool, TransportError>;

    /// Writes one coil.
    fn write_bit(&mut self, address: u16, value: bool) -> Result<(), TransportError>;
}
