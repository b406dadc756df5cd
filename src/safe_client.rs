//! Thread-safe, shareable client for the Omega CN7500.
//!
//! The serial link to the controller is an exclusive resource: the protocol
//! is half-duplex request/response without multiplexing, so interleaved
//! frames from concurrent callers would corrupt the exchange. [`SafeClient`]
//! wraps a [`Cn7500`] in an `Arc<Mutex<_>>` so that concurrent callers queue
//! instead of interleaving. Composite pattern operations hold the lock for
//! all 19 register accesses.
//!
//! ## Example
//!
//! ```no_run
//! use cn7500_lib::{client::Cn7500, safe_client::SafeClient, tokio_sync::SyncTransport};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = tokio_modbus::client::sync::tcp::connect("192.168.1.100:502".parse()?)?;
//!     let mut client = SafeClient::new(Cn7500::new(SyncTransport::new(ctx)));
//!
//!     // Clones share the same serialized connection.
//!     let mut poller = client.clone();
//!     println!("Setpoint: {}", client.read_setpoint()?);
//!     println!("PV: {}", poller.read_process_value()?);
//!     Ok(())
//! }
//! ```

use crate::{
    client::{Cn7500, Result},
    protocol as proto,
    transport::Transport,
};
use std::sync::{Arc, Mutex};

/// Cloneable handle to a [`Cn7500`] shared between threads.
///
/// All bus access through any clone of a handle is serialized; a poisoned
/// lock (a panic in another thread while holding it) is treated as fatal.
#[derive(Debug)]
pub struct SafeClient<T> {
    inner: Arc<Mutex<Cn7500<T>>>,
}

impl<T> Clone for SafeClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> SafeClient<T> {
    /// Wraps a client for shared use.
    pub fn new(client: Cn7500<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    /// Creates a handle from an already shared client.
    pub fn from_shared(inner: Arc<Mutex<Cn7500<T>>>) -> Self {
        Self { inner }
    }

    /// Clones the shared client.
    pub fn clone_shared(&self) -> Arc<Mutex<Cn7500<T>>> {
        self.inner.clone()
    }

    /// Reads the process value (PV) in degrees.
    pub fn read_process_value(&mut self) -> Result<f64> {
        self.inner.lock().unwrap().read_process_value()
    }

    /// Reads the output 1 power level (OP1) in percent.
    pub fn read_output1(&mut self) -> Result<f64> {
        self.inner.lock().unwrap().read_output1()
    }

    /// Puts the controller in run mode.
    pub fn run(&mut self) -> Result<()> {
        self.inner.lock().unwrap().run()
    }

    /// Stops the controller.
    pub fn stop(&mut self) -> Result<()> {
        self.inner.lock().unwrap().stop()
    }

    /// Returns `true` if the controller is running.
    pub fn is_running(&mut self) -> Result<bool> {
        self.inner.lock().unwrap().is_running()
    }

    /// Reads the active setpoint (SV) in degrees.
    pub fn read_setpoint(&mut self) -> Result<f64> {
        self.inner.lock().unwrap().read_setpoint()
    }

    /// Sets the active setpoint (SV).
    pub fn set_setpoint(&mut self, value: f64) -> Result<()> {
        self.inner.lock().unwrap().set_setpoint(value)
    }

    /// Reads the current control mode.
    pub fn read_control_mode(&mut self) -> Result<proto::ControlMode> {
        self.inner.lock().unwrap().read_control_mode()
    }

    /// Sets the control mode.
    pub fn set_control_mode(&mut self, mode: proto::ControlMode) -> Result<()> {
        self.inner.lock().unwrap().set_control_mode(mode)
    }

    /// Reads the pattern number program execution starts at.
    pub fn read_start_pattern(&mut self) -> Result<proto::Pattern> {
        self.inner.lock().unwrap().read_start_pattern()
    }

    /// Sets the pattern number program execution starts at.
    pub fn set_start_pattern(&mut self, pattern: proto::Pattern) -> Result<()> {
        self.inner.lock().unwrap().set_start_pattern(pattern)
    }

    /// Reads the setpoint of one pattern step in degrees.
    pub fn read_step_setpoint(&mut self, pattern: proto::Pattern, step: proto::Step) -> Result<f64> {
        self.inner.lock().unwrap().read_step_setpoint(pattern, step)
    }

    /// Sets the setpoint of one pattern step.
    pub fn set_step_setpoint(
        &mut self,
        pattern: proto::Pattern,
        step: proto::Step,
        value: f64,
    ) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .set_step_setpoint(pattern, step, value)
    }

    /// Reads the time of one pattern step.
    pub fn read_step_time(&mut self, pattern: proto::Pattern, step: proto::Step) -> Result<u16> {
        self.inner.lock().unwrap().read_step_time(pattern, step)
    }

    /// Sets the time of one pattern step.
    pub fn set_step_time(
        &mut self,
        pattern: proto::Pattern,
        step: proto::Step,
        value: u16,
    ) -> Result<()> {
        self.inner.lock().unwrap().set_step_time(pattern, step, value)
    }

    /// Reads the actual step parameter of a pattern.
    pub fn read_actual_step(&mut self, pattern: proto::Pattern) -> Result<proto::Step> {
        self.inner.lock().unwrap().read_actual_step(pattern)
    }

    /// Sets the actual step parameter of a pattern.
    pub fn set_actual_step(&mut self, pattern: proto::Pattern, step: proto::Step) -> Result<()> {
        self.inner.lock().unwrap().set_actual_step(pattern, step)
    }

    /// Reads the additional cycles count of a pattern.
    pub fn read_additional_cycles(
        &mut self,
        pattern: proto::Pattern,
    ) -> Result<proto::AdditionalCycles> {
        self.inner.lock().unwrap().read_additional_cycles(pattern)
    }

    /// Sets the additional cycles count of a pattern.
    pub fn set_additional_cycles(
        &mut self,
        pattern: proto::Pattern,
        cycles: proto::AdditionalCycles,
    ) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .set_additional_cycles(pattern, cycles)
    }

    /// Reads the link parameter of a pattern.
    pub fn read_pattern_link(&mut self, pattern: proto::Pattern) -> Result<proto::PatternLink> {
        self.inner.lock().unwrap().read_pattern_link(pattern)
    }

    /// Sets the link parameter of a pattern.
    pub fn set_pattern_link(
        &mut self,
        pattern: proto::Pattern,
        link: proto::PatternLink,
    ) -> Result<()> {
        self.inner.lock().unwrap().set_pattern_link(pattern, link)
    }

    /// Reads all 19 variables of a pattern, holding the lock for the whole
    /// sequence.
    pub fn read_pattern(&mut self, pattern: proto::Pattern) -> Result<proto::PatternVariables> {
        self.inner.lock().unwrap().read_pattern(pattern)
    }

    /// Writes all 19 variables of a pattern, holding the lock for the whole
    /// sequence. See [`Cn7500::set_pattern`] for the atomicity caveat.
    pub fn set_pattern(
        &mut self,
        pattern: proto::Pattern,
        variables: &proto::PatternVariables,
    ) -> Result<()> {
        self.inner.lock().unwrap().set_pattern(pattern, variables)
    }
}
