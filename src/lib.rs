//! A library for controlling the Omega CN7500 process controller via Modbus.
//!
//! The CN7500 is a temperature process controller reachable over Modbus RTU
//! (RS485) or Modbus TCP. Besides live process state (temperature, output
//! power, run status) it stores eight multi-step temperature programs,
//! called *patterns*, in its non-volatile memory; this crate reads and
//! configures all of it through addressed register and coil access.
//!
//! The crate is layered as follows:
//!
//! 1. **Protocol definitions** ([`protocol`]): the register map of the
//!    controller, strongly-typed domain values (`Pattern`, `Step`,
//!    `ControlMode`, ...) and their validation rules. Pure data and pure
//!    functions, no I/O.
//! 2. **Transport boundary** ([`transport`]): the [`transport::Transport`]
//!    trait moving raw registers and coils, with a `tokio-modbus` backed
//!    implementation in [`tokio_sync`].
//! 3. **Clients**: [`client::Cn7500`] exposes the domain operations;
//!    [`safe_client::SafeClient`] adds thread-safe sharing for concurrent
//!    applications.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cn7500_lib::{client::Cn7500, protocol::Pattern, tokio_sync::SyncTransport};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect to the instrument at slave address 10 on an RS485 adapter.
//!     let builder = cn7500_lib::tokio_common::serial_port_builder("/dev/ttyUSB0", 9600);
//!     let ctx = tokio_modbus::client::sync::rtu::connect_slave(&builder, tokio_modbus::Slave(10))?;
//!     let mut client = Cn7500::new(SyncTransport::new(ctx));
//!
//!     println!("Process value: {} °C", client.read_process_value()?);
//!
//!     // Dump all 19 variables of pattern 0.
//!     let pattern = Pattern::try_from(0)?;
//!     println!("{}", client.read_pattern(pattern)?);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod protocol;
pub mod safe_client;
pub mod transport;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio-rtu-sync")))]
#[cfg(feature = "tokio-rtu-sync")]
pub mod tokio_common;

#[cfg_attr(
    docsrs,
    doc(cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync")))
)]
#[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
pub mod tokio_sync;
