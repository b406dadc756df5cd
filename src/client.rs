//! High-level client for the Omega CN7500 process controller.
//!
//! The [`Cn7500`] struct exposes the domain operations of the controller
//! (process value, setpoint, run/stop, control mode and the pattern/program
//! memory) on top of any [`Transport`] implementation. Every accessor is a
//! thin composition of *validate*, *resolve address* and *transport call*;
//! validation failures are raised before any bus access happens.
//!
//! # Examples
//!
//! ```no_run
//! use cn7500_lib::{client::Cn7500, tokio_sync::SyncTransport};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = tokio_modbus::client::sync::tcp::connect("127.0.0.1:502".parse()?)?;
//!     let mut client = Cn7500::new(SyncTransport::new(ctx));
//!
//!     let pv = client.read_process_value()?;
//!     println!("Process value: {pv} °C");
//!     Ok(())
//! }
//! ```

use crate::{
    protocol as proto,
    transport::{Transport, TransportError},
};

/// All errors a client operation can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value or index outside the documented bounds, or an unparseable
    /// device response. Raised before any bus access for validation
    /// failures; recoverable by supplying a corrected value.
    #[error(transparent)]
    Protocol(#[from] proto::Error),

    /// A failure on the wire (timeout, checksum mismatch, no response),
    /// propagated unchanged from the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Client for the Omega CN7500 process controller.
///
/// Holds the transport by value; all operations take `&mut self`, so
/// register accesses issued through one client are strictly sequential. For
/// sharing one controller between threads see
/// [`crate::safe_client::SafeClient`].
///
/// The setpoint and step time maxima are deployment-level safety limits and
/// are configurable per instance (see [`Cn7500::with_limits`]); they default
/// to [`proto::Setpoint::DEFAULT_MAX`] and [`proto::StepTime::DEFAULT_MAX`].
#[derive(Debug)]
pub struct Cn7500<T> {
    transport: T,
    setpoint_max: f64,
    time_max: u16,
}

impl<T: Transport> Cn7500<T> {
    /// Creates a new client with the default setpoint and time limits.
    pub fn new(transport: T) -> Self {
        Self::with_limits(
            transport,
            proto::Setpoint::DEFAULT_MAX,
            proto::StepTime::DEFAULT_MAX,
        )
    }

    /// Creates a new client with deployment-specific setpoint and step time
    /// maxima.
    ///
    /// All setpoint writes (active setpoint and pattern step setpoints) are
    /// checked against `setpoint_max`, all step time writes against
    /// `time_max`.
    pub fn with_limits(transport: T, setpoint_max: f64, time_max: u16) -> Self {
        Self {
            transport,
            setpoint_max,
            time_max,
        }
    }

    /// The configured maximum allowed setpoint.
    pub fn setpoint_max(&self) -> f64 {
        self.setpoint_max
    }

    /// The configured maximum allowed step time.
    pub fn time_max(&self) -> u16 {
        self.time_max
    }

    /// Consumes the client, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn read_register(&mut self, address: u16) -> Result<u16> {
        Ok(self.transport.read_register(address)?)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        Ok(self.transport.write_register(address, value)?)
    }

    /// Reads the process value (PV) in degrees.
    pub fn read_process_value(&mut self) -> Result<f64> {
        let raw = self.read_register(proto::ProcessValue::ADDRESS)?;
        Ok(proto::ProcessValue::decode_from_register(raw))
    }

    /// Reads the output 1 power level (OP1) in percent.
    pub fn read_output1(&mut self) -> Result<f64> {
        let raw = self.read_register(proto::Output1::ADDRESS)?;
        Ok(proto::Output1::decode_from_register(raw))
    }

    /// Puts the controller in run mode.
    pub fn run(&mut self) -> Result<()> {
        Ok(self.transport.write_bit(proto::RunFlag::ADDRESS, true)?)
    }

    /// Stops the controller.
    pub fn stop(&mut self) -> Result<()> {
        Ok(self.transport.write_bit(proto::RunFlag::ADDRESS, false)?)
    }

    /// Returns `true` if the controller is running.
    pub fn is_running(&mut self) -> Result<bool> {
        Ok(self.transport.read_bit(proto::RunFlag::ADDRESS)?)
    }

    /// Reads the active setpoint (SV) in degrees.
    pub fn read_setpoint(&mut self) -> Result<f64> {
        let raw = self.read_register(proto::Setpoint::ADDRESS)?;
        Ok(proto::Setpoint::decode_from_register(raw))
    }

    /// Sets the active setpoint (SV).
    ///
    /// # Errors
    ///
    /// [`proto::Error::SetpointOutOfRange`] if `value` is negative or above
    /// the configured maximum; no bus access is made in that case.
    pub fn set_setpoint(&mut self, value: f64) -> Result<()> {
        proto::Setpoint::check(value, self.setpoint_max)?;
        self.write_register(
            proto::Setpoint::ADDRESS,
            proto::Setpoint::encode_for_write_register(value),
        )
    }

    /// Reads the current control mode.
    ///
    /// # Errors
    ///
    /// [`proto::Error::UnknownControlMode`] if the device returns a code
    /// outside the documented enumeration.
    pub fn read_control_mode(&mut self) -> Result<proto::ControlMode> {
        let raw = self.read_register(proto::ControlMode::ADDRESS)?;
        Ok(proto::ControlMode::try_from(raw)?)
    }

    /// Sets the control mode.
    pub fn set_control_mode(&mut self, mode: proto::ControlMode) -> Result<()> {
        self.write_register(proto::ControlMode::ADDRESS, mode.encode_for_write_register())
    }

    /// Reads the pattern number program execution starts at.
    pub fn read_start_pattern(&mut self) -> Result<proto::Pattern> {
        let raw = self.read_register(proto::StartPattern::ADDRESS)?;
        Ok(proto::StartPattern::decode_from_register(raw)?)
    }

    /// Sets the pattern number program execution starts at.
    pub fn set_start_pattern(&mut self, pattern: proto::Pattern) -> Result<()> {
        self.write_register(
            proto::StartPattern::ADDRESS,
            proto::StartPattern::encode_for_write_register(pattern),
        )
    }

    /// Reads the setpoint of one pattern step in degrees.
    pub fn read_step_setpoint(&mut self, pattern: proto::Pattern, step: proto::Step) -> Result<f64> {
        let raw = self.read_register(proto::Setpoint::step_address(pattern, step))?;
        Ok(proto::Setpoint::decode_from_register(raw))
    }

    /// Sets the setpoint of one pattern step.
    ///
    /// # Errors
    ///
    /// [`proto::Error::SetpointOutOfRange`] if `value` is negative or above
    /// the configured maximum; no bus access is made in that case.
    pub fn set_step_setpoint(
        &mut self,
        pattern: proto::Pattern,
        step: proto::Step,
        value: f64,
    ) -> Result<()> {
        proto::Setpoint::check(value, self.setpoint_max)?;
        self.write_register(
            proto::Setpoint::step_address(pattern, step),
            proto::Setpoint::encode_for_write_register(value),
        )
    }

    /// Reads the time of one pattern step.
    pub fn read_step_time(&mut self, pattern: proto::Pattern, step: proto::Step) -> Result<u16> {
        self.read_register(proto::StepTime::step_address(pattern, step))
    }

    /// Sets the time of one pattern step.
    ///
    /// # Errors
    ///
    /// [`proto::Error::StepTimeOutOfRange`] if `value` is above the
    /// configured maximum; no bus access is made in that case.
    pub fn set_step_time(
        &mut self,
        pattern: proto::Pattern,
        step: proto::Step,
        value: u16,
    ) -> Result<()> {
        proto::StepTime::check(value, self.time_max)?;
        self.write_register(proto::StepTime::step_address(pattern, step), value)
    }

    /// Reads the actual step parameter of a pattern.
    pub fn read_actual_step(&mut self, pattern: proto::Pattern) -> Result<proto::Step> {
        let raw = self.read_register(proto::ActualStep::address(pattern))?;
        Ok(proto::ActualStep::decode_from_register(raw)?)
    }

    /// Sets the actual step parameter of a pattern.
    pub fn set_actual_step(&mut self, pattern: proto::Pattern, step: proto::Step) -> Result<()> {
        self.write_register(
            proto::ActualStep::address(pattern),
            proto::ActualStep::encode_for_write_register(step),
        )
    }

    /// Reads the additional cycles count of a pattern.
    pub fn read_additional_cycles(
        &mut self,
        pattern: proto::Pattern,
    ) -> Result<proto::AdditionalCycles> {
        let raw = self.read_register(proto::AdditionalCycles::address(pattern))?;
        Ok(proto::AdditionalCycles::decode_from_register(raw)?)
    }

    /// Sets the additional cycles count of a pattern.
    pub fn set_additional_cycles(
        &mut self,
        pattern: proto::Pattern,
        cycles: proto::AdditionalCycles,
    ) -> Result<()> {
        self.write_register(
            proto::AdditionalCycles::address(pattern),
            cycles.encode_for_write_register(),
        )
    }

    /// Reads the link parameter of a pattern.
    pub fn read_pattern_link(&mut self, pattern: proto::Pattern) -> Result<proto::PatternLink> {
        let raw = self.read_register(proto::PatternLink::address(pattern))?;
        Ok(proto::PatternLink::decode_from_register(raw)?)
    }

    /// Sets the link parameter of a pattern.
    pub fn set_pattern_link(
        &mut self,
        pattern: proto::Pattern,
        link: proto::PatternLink,
    ) -> Result<()> {
        self.write_register(
            proto::PatternLink::address(pattern),
            link.encode_for_write_register(),
        )
    }

    /// Reads all 19 variables of a pattern as one logical unit.
    ///
    /// This performs 19 sequential register reads; a transport failure
    /// aborts at the failing register.
    pub fn read_pattern(&mut self, pattern: proto::Pattern) -> Result<proto::PatternVariables> {
        let mut setpoints = [0.0; proto::STEPS_PER_PATTERN as usize];
        let mut step_times = [0; proto::STEPS_PER_PATTERN as usize];
        for step in proto::Step::iter() {
            setpoints[usize::from(*step)] = self.read_step_setpoint(pattern, step)?;
        }
        for step in proto::Step::iter() {
            step_times[usize::from(*step)] = self.read_step_time(pattern, step)?;
        }
        Ok(proto::PatternVariables {
            setpoints,
            step_times,
            actual_step: self.read_actual_step(pattern)?,
            additional_cycles: self.read_additional_cycles(pattern)?,
            link: self.read_pattern_link(pattern)?,
        })
    }

    /// Writes all 19 variables of a pattern as one logical unit.
    ///
    /// Every field is validated before the first register write, so an
    /// out-of-range value never causes a partial update. The 19 writes
    /// themselves are sequential but **not** atomic: a mid-sequence
    /// transport failure leaves the pattern partially updated on the device,
    /// and the returned error identifies the failing access. Callers that
    /// need atomicity must read back and compensate themselves.
    pub fn set_pattern(
        &mut self,
        pattern: proto::Pattern,
        variables: &proto::PatternVariables,
    ) -> Result<()> {
        for setpoint in &variables.setpoints {
            proto::Setpoint::check(*setpoint, self.setpoint_max)?;
        }
        for time in &variables.step_times {
            proto::StepTime::check(*time, self.time_max)?;
        }
        for step in proto::Step::iter() {
            self.set_step_setpoint(pattern, step, variables.setpoints[usize::from(*step)])?;
        }
        for step in proto::Step::iter() {
            self.set_step_time(pattern, step, variables.step_times[usize::from(*step)])?;
        }
        self.set_actual_step(pattern, variables.actual_step)?;
        self.set_additional_cycles(pattern, variables.additional_cycles)?;
        self.set_pattern_link(pattern, variables.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    /// Idempotent in-memory transport. Unwritten registers read as zero;
    /// the call counters verify that failed validations perform no I/O.
    #[derive(Debug, Default)]
    struct MockTransport {
        registers: HashMap<u16, u16>,
        bits: HashMap<u16, bool>,
        calls: usize,
    }

    impl Transport for MockTransport {
        fn read_register(&mut self, address: u16) -> std::result::Result<u16, TransportError> {
            self.calls += 1;
            Ok(self.registers.get(&address).copied().unwrap_or_default())
        }

        fn write_register(
            &mut self,
            address: u16,
            value: u16,
        ) -> std::result::Result<(), TransportError> {
            self.calls += 1;
            self.registers.insert(address, value);
            Ok(())
        }

        fn read_bit(&mut self, address: u16) -> std::result::Result<bool, TransportError> {
            self.calls += 1;
            Ok(self.bits.get(&address).copied().unwrap_or_default())
        }

        fn write_bit(
            &mut self,
            address: u16,
            value: bool,
        ) -> std::result::Result<(), TransportError> {
            self.calls += 1;
            self.bits.insert(address, value);
            Ok(())
        }
    }

    fn client() -> Cn7500<MockTransport> {
        Cn7500::new(MockTransport::default())
    }

    fn pattern(value: u8) -> proto::Pattern {
        proto::Pattern::try_from(value).unwrap()
    }

    fn step(value: u8) -> proto::Step {
        proto::Step::try_from(value).unwrap()
    }

    #[test]
    fn process_value_is_scaled() {
        let mut transport = MockTransport::default();
        transport.registers.insert(proto::ProcessValue::ADDRESS, 219);
        let mut client = Cn7500::new(transport);
        assert_eq!(client.read_process_value().unwrap(), 21.9);
    }

    #[test]
    fn run_stop_round_trip() {
        let mut client = client();
        assert!(!client.is_running().unwrap());
        client.run().unwrap();
        assert!(client.is_running().unwrap());
        client.stop().unwrap();
        assert!(!client.is_running().unwrap());
    }

    #[test]
    fn setpoint_round_trip() {
        let mut client = client();
        client.set_setpoint(123.4).unwrap();
        assert_eq!(client.read_setpoint().unwrap(), 123.4);
        let transport = client.into_transport();
        assert_eq!(transport.registers.get(&proto::Setpoint::ADDRESS), Some(&1234));
    }

    #[test]
    fn setpoint_out_of_range_performs_no_io() {
        let mut client = client();
        assert_matches!(
            client.set_setpoint(1000.0),
            Err(Error::Protocol(proto::Error::SetpointOutOfRange { .. }))
        );
        assert_matches!(
            client.set_setpoint(-1.0),
            Err(Error::Protocol(proto::Error::SetpointOutOfRange { .. }))
        );
        assert_eq!(client.into_transport().calls, 0);
    }

    #[test]
    fn configured_limits_are_enforced() {
        let mut client = Cn7500::with_limits(MockTransport::default(), 400.0, 600);
        assert_eq!(client.setpoint_max(), 400.0);
        assert_eq!(client.time_max(), 600);
        assert_matches!(
            client.set_step_setpoint(pattern(0), step(0), 500.0),
            Err(Error::Protocol(proto::Error::SetpointOutOfRange { .. }))
        );
        assert_matches!(
            client.set_step_time(pattern(0), step(0), 601),
            Err(Error::Protocol(proto::Error::StepTimeOutOfRange { .. }))
        );
        client.set_step_setpoint(pattern(0), step(0), 400.0).unwrap();
        client.set_step_time(pattern(0), step(0), 600).unwrap();
        assert_eq!(client.into_transport().calls, 2);
    }

    #[test]
    fn step_setpoint_scenario() {
        // Deployment limits 999.9 / 900.
        let mut client = client();
        assert_matches!(
            client.set_step_setpoint(pattern(0), step(0), 1200.0),
            Err(Error::Protocol(proto::Error::SetpointOutOfRange { .. }))
        );
        client.set_step_setpoint(pattern(0), step(0), 500.5).unwrap();
        assert_eq!(client.read_step_setpoint(pattern(0), step(0)).unwrap(), 500.5);
        let transport = client.into_transport();
        assert_eq!(transport.registers.get(&8192), Some(&5005));
    }

    #[test]
    fn step_time_round_trip() {
        let mut client = client();
        client.set_step_time(pattern(7), step(7), 900).unwrap();
        assert_eq!(client.read_step_time(pattern(7), step(7)).unwrap(), 900);
        let transport = client.into_transport();
        assert_eq!(transport.registers.get(&8383), Some(&900));
    }

    #[test]
    fn step_time_out_of_range_performs_no_io() {
        let mut client = client();
        assert_matches!(
            client.set_step_time(pattern(0), step(0), 901),
            Err(Error::Protocol(proto::Error::StepTimeOutOfRange { .. }))
        );
        assert_eq!(client.into_transport().calls, 0);
    }

    #[test]
    fn control_mode_round_trip() {
        let mut client = client();
        client.set_control_mode(proto::ControlMode::ManualTuning).unwrap();
        assert_eq!(
            client.read_control_mode().unwrap(),
            proto::ControlMode::ManualTuning
        );
    }

    #[test]
    fn unknown_control_mode_fails_to_parse() {
        let mut transport = MockTransport::default();
        transport.registers.insert(proto::ControlMode::ADDRESS, 9);
        let mut client = Cn7500::new(transport);
        assert_matches!(
            client.read_control_mode(),
            Err(Error::Protocol(proto::Error::UnknownControlMode(9)))
        );
    }

    #[test]
    fn start_pattern_round_trip() {
        let mut client = client();
        client.set_start_pattern(pattern(5)).unwrap();
        assert_eq!(client.read_start_pattern().unwrap(), pattern(5));
    }

    #[test]
    fn pattern_metadata_round_trips() {
        let mut client = client();
        client.set_actual_step(pattern(2), step(6)).unwrap();
        assert_eq!(client.read_actual_step(pattern(2)).unwrap(), step(6));

        let cycles = proto::AdditionalCycles::try_from(42).unwrap();
        client.set_additional_cycles(pattern(2), cycles).unwrap();
        assert_eq!(client.read_additional_cycles(pattern(2)).unwrap(), cycles);

        client
            .set_pattern_link(pattern(2), proto::PatternLink::To(pattern(3)))
            .unwrap();
        assert_eq!(
            client.read_pattern_link(pattern(2)).unwrap(),
            proto::PatternLink::To(pattern(3))
        );
        client.set_pattern_link(pattern(2), proto::PatternLink::Off).unwrap();
        assert_eq!(
            client.read_pattern_link(pattern(2)).unwrap(),
            proto::PatternLink::Off
        );
    }

    #[test]
    fn whole_pattern_round_trip() {
        let variables = proto::PatternVariables {
            setpoints: [100.0, 150.5, 200.0, 250.5, 300.0, 350.5, 400.0, 450.5],
            step_times: [10, 20, 30, 40, 50, 60, 70, 80],
            actual_step: step(7),
            additional_cycles: proto::AdditionalCycles::try_from(3).unwrap(),
            link: proto::PatternLink::To(pattern(1)),
        };
        let mut client = client();
        client.set_pattern(pattern(4), &variables).unwrap();
        assert_eq!(client.read_pattern(pattern(4)).unwrap(), variables);
        // 19 writes plus 19 reads.
        assert_eq!(client.into_transport().calls, 38);
    }

    #[test]
    fn whole_pattern_write_validates_before_any_io() {
        let variables = proto::PatternVariables {
            setpoints: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1200.0],
            step_times: [0; 8],
            actual_step: step(0),
            additional_cycles: proto::AdditionalCycles::try_from(0).unwrap(),
            link: proto::PatternLink::Off,
        };
        let mut client = client();
        assert_matches!(
            client.set_pattern(pattern(0), &variables),
            Err(Error::Protocol(proto::Error::SetpointOutOfRange { .. }))
        );
        assert_eq!(client.into_transport().calls, 0);
    }

    #[test]
    fn output1_is_scaled() {
        let mut transport = MockTransport::default();
        transport.registers.insert(proto::Output1::ADDRESS, 755);
        let mut client = Cn7500::new(transport);
        assert_eq!(client.read_output1().unwrap(), 75.5);
    }
}
