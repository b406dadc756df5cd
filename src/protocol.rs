//! Protocol definitions for the Omega CN7500 process controller.
//!
//! This module contains the register map of the controller, strongly-typed
//! wrappers for all domain values (pattern numbers, step numbers, control
//! modes, ...) and the validation rules the device imposes on them.
//!
//! The controller stores up to eight temperature programs, called *patterns*
//! (numbered 0-7). Each pattern consists of eight *steps* (numbered 0-7),
//! where every step is a setpoint/time pair. A pattern additionally carries
//! an *actual step* (the step execution stops at), an *additional cycles*
//! count (0-99 repetitions) and a *link* to a follow-up pattern (or OFF).
//!
//! All register addresses in this module are fixed by the CN7500 firmware
//! and must not be changed. Values with one decimal place (temperatures,
//! output percentage) are transferred as unsigned tenths.

/// Number of patterns stored in the controller.
pub const NUMBER_OF_PATTERNS: u8 = 8;
/// Number of steps in every pattern.
pub const STEPS_PER_PATTERN: u8 = 8;

/// Errors representing a violation of the documented value ranges or an
/// unparseable device response.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Pattern number outside 0-7. Carries the raw value, which may exceed
    /// `u8` when it came straight from a device register.
    #[error("pattern number {0} out of range ({min}-{max})", min = Pattern::MIN, max = Pattern::MAX)]
    PatternOutOfRange(u16),

    /// Step number outside 0-7. Carries the raw value, which may exceed
    /// `u8` when it came straight from a device register.
    #[error("step number {0} out of range ({min}-{max})", min = Step::MIN, max = Step::MAX)]
    StepOutOfRange(u16),

    /// Setpoint outside the configured limit.
    #[error("setpoint {value} out of range (0-{max})")]
    SetpointOutOfRange { value: f64, max: f64 },

    /// Step time outside the configured limit.
    #[error("step time {value} out of range (0-{max})")]
    StepTimeOutOfRange { value: u16, max: u16 },

    /// Additional cycles count outside 0-99.
    #[error("additional cycles {0} out of range ({min}-{max})", min = AdditionalCycles::MIN, max = AdditionalCycles::MAX)]
    AdditionalCyclesOutOfRange(u16),

    /// Pattern link outside 0-8 (8 = OFF).
    #[error("pattern link {0} out of range (0-7, or 8 for OFF)")]
    PatternLinkOutOfRange(u16),

    /// The device returned a control mode code that is not part of the
    /// documented enumeration. This indicates a firmware or address map
    /// mismatch and is not recoverable by retrying.
    #[error("could not parse control mode value {0}")]
    UnknownControlMode(u16),
}

fn decode_tenths(raw: u16) -> f64 {
    f64::from(raw) / 10.0
}

fn encode_tenths(value: f64) -> u16 {
    (value * 10.0).round() as u16
}

/// A pattern number (0-7) identifying one of the stored temperature programs.
///
/// # Examples
///
/// ```
/// use cn7500_lib::protocol::Pattern;
///
/// let pattern = Pattern::try_from(3).unwrap();
/// assert_eq!(*pattern, 3);
/// assert!(Pattern::try_from(8).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pattern(u8);

impl Pattern {
    /// Smallest valid pattern number.
    pub const MIN: u8 = 0;
    /// Largest valid pattern number.
    pub const MAX: u8 = NUMBER_OF_PATTERNS - 1;

    /// Iterates over all valid pattern numbers (0-7).
    pub fn iter() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<u8> for Pattern {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::PatternOutOfRange(u16::from(value)))
        }
    }
}

impl std::ops::Deref for Pattern {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A step number (0-7) within a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step(u8);

impl Step {
    /// Smallest valid step number.
    pub const MIN: u8 = 0;
    /// Largest valid step number.
    pub const MAX: u8 = STEPS_PER_PATTERN - 1;

    /// Iterates over all valid step numbers (0-7).
    pub fn iter() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<u8> for Step {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::StepOutOfRange(u16::from(value)))
        }
    }
}

impl std::ops::Deref for Step {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The measured process value (PV), read-only.
#[derive(Debug)]
pub struct ProcessValue;

impl ProcessValue {
    /// Holding register of the process value.
    pub const ADDRESS: u16 = 0x1000;

    /// Decodes a raw register value into degrees (one decimal place).
    pub fn decode_from_register(raw: u16) -> f64 {
        decode_tenths(raw)
    }
}

/// The setpoint (SV), both the active controller setpoint and the per-step
/// pattern setpoints.
///
/// The upper limit is a deployment-level safety limit, not a hardware limit,
/// and is therefore configurable per controller instance
/// (see [`crate::client::Cn7500::with_limits`]). The default allows the full
/// one-decimal display range up to 999.9.
#[derive(Debug)]
pub struct Setpoint;

impl Setpoint {
    /// Holding register of the active setpoint.
    pub const ADDRESS: u16 = 0x1001;
    /// Register of the pattern 0, step 0 setpoint. Each pattern occupies
    /// eight consecutive registers.
    pub const STEP_BASE_ADDRESS: u16 = 0x2000;
    /// Default maximum allowed setpoint value.
    pub const DEFAULT_MAX: f64 = 999.9;

    /// Checks a candidate setpoint against the configured maximum.
    pub fn check(value: f64, max: f64) -> Result<(), Error> {
        if (0.0..=max).contains(&value) {
            Ok(())
        } else {
            Err(Error::SetpointOutOfRange { value, max })
        }
    }

    /// Returns the holding register of the given pattern step setpoint.
    pub fn step_address(pattern: Pattern, step: Step) -> u16 {
        Self::STEP_BASE_ADDRESS
            + u16::from(*pattern) * u16::from(STEPS_PER_PATTERN)
            + u16::from(*step)
    }

    /// Decodes a raw register value into degrees (one decimal place).
    pub fn decode_from_register(raw: u16) -> f64 {
        decode_tenths(raw)
    }

    /// Encodes a setpoint for a register write (one decimal place).
    pub fn encode_for_write_register(value: f64) -> u16 {
        encode_tenths(value)
    }
}

/// The per-step time value (minutes or seconds, depending on the device
/// configuration).
#[derive(Debug)]
pub struct StepTime;

impl StepTime {
    /// Register of the pattern 0, step 0 time. Same 8-wide per-pattern
    /// layout as the step setpoints.
    pub const STEP_BASE_ADDRESS: u16 = 0x2080;
    /// Default maximum allowed step time.
    pub const DEFAULT_MAX: u16 = 900;

    /// Checks a candidate step time against the configured maximum.
    pub fn check(value: u16, max: u16) -> Result<(), Error> {
        if value <= max {
            Ok(())
        } else {
            Err(Error::StepTimeOutOfRange { value, max })
        }
    }

    /// Returns the holding register of the given pattern step time.
    pub fn step_address(pattern: Pattern, step: Step) -> u16 {
        Self::STEP_BASE_ADDRESS
            + u16::from(*pattern) * u16::from(STEPS_PER_PATTERN)
            + u16::from(*step)
    }
}

/// The controller operation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum ControlMode {
    Pid = 0,
    OnOff = 1,
    ManualTuning = 2,
    Program = 3,
}

impl ControlMode {
    /// Holding register of the control mode.
    pub const ADDRESS: u16 = 0x1005;

    /// Encodes the mode for a register write.
    pub fn encode_for_write_register(&self) -> u16 {
        *self as u16
    }
}

impl TryFrom<u16> for ControlMode {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ControlMode::Pid),
            1 => Ok(ControlMode::OnOff),
            2 => Ok(ControlMode::ManualTuning),
            3 => Ok(ControlMode::Program),
            _ => Err(Error::UnknownControlMode(value)),
        }
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlMode::Pid => write!(f, "PID"),
            ControlMode::OnOff => write!(f, "ON/OFF"),
            ControlMode::ManualTuning => write!(f, "Manual Tuning"),
            ControlMode::Program => write!(f, "Program"),
        }
    }
}

/// The run/stop state of the controller, a single coil.
#[derive(Debug)]
pub struct RunFlag;

impl RunFlag {
    /// Coil address of the run/stop flag (1 = running).
    pub const ADDRESS: u16 = 0x0814;
}

/// The pattern number program execution starts at.
#[derive(Debug)]
pub struct StartPattern;

impl StartPattern {
    /// Holding register of the start pattern number.
    pub const ADDRESS: u16 = 0x1030;

    /// Decodes a raw register value into a [`Pattern`].
    pub fn decode_from_register(raw: u16) -> Result<Pattern, Error> {
        let value = u8::try_from(raw).map_err(|_| Error::PatternOutOfRange(raw))?;
        Pattern::try_from(value)
    }

    /// Encodes a pattern number for a register write.
    pub fn encode_for_write_register(pattern: Pattern) -> u16 {
        u16::from(*pattern)
    }
}

/// The output 1 power level (OP1), read-only, in percent.
#[derive(Debug)]
pub struct Output1;

impl Output1 {
    /// Holding register of the output 1 level.
    pub const ADDRESS: u16 = 0x1012;

    /// Decodes a raw register value into percent (one decimal place).
    pub fn decode_from_register(raw: u16) -> f64 {
        decode_tenths(raw)
    }
}

/// The per-pattern *actual step* parameter: the step execution stops at.
#[derive(Debug)]
pub struct ActualStep;

impl ActualStep {
    /// First register of the actual step table, one register per pattern.
    pub const BASE_ADDRESS: u16 = 0x1040;

    /// Returns the holding register of the given pattern's actual step.
    pub fn address(pattern: Pattern) -> u16 {
        Self::BASE_ADDRESS + u16::from(*pattern)
    }

    /// Decodes a raw register value into a [`Step`].
    pub fn decode_from_register(raw: u16) -> Result<Step, Error> {
        let value = u8::try_from(raw).map_err(|_| Error::StepOutOfRange(raw))?;
        Step::try_from(value)
    }

    /// Encodes an actual step for a register write.
    pub fn encode_for_write_register(step: Step) -> u16 {
        u16::from(*step)
    }
}

/// The per-pattern repeat count (0-99).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdditionalCycles(u16);

impl AdditionalCycles {
    /// First register of the additional cycles table, one register per pattern.
    pub const BASE_ADDRESS: u16 = 0x1050;
    /// Smallest valid cycle count.
    pub const MIN: u16 = 0;
    /// Largest valid cycle count.
    pub const MAX: u16 = 99;

    /// Returns the holding register of the given pattern's cycle count.
    pub fn address(pattern: Pattern) -> u16 {
        Self::BASE_ADDRESS + u16::from(*pattern)
    }

    /// Decodes a raw register value.
    pub fn decode_from_register(raw: u16) -> Result<Self, Error> {
        Self::try_from(raw)
    }

    /// Encodes the cycle count for a register write.
    pub fn encode_for_write_register(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for AdditionalCycles {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::AdditionalCyclesOutOfRange(value))
        }
    }
}

impl std::ops::Deref for AdditionalCycles {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for AdditionalCycles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The pattern a given pattern transitions to upon completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PatternLink {
    /// Continue with the given pattern.
    To(Pattern),
    /// Program execution ends after this pattern.
    Off,
}

impl PatternLink {
    /// First register of the link table, one register per pattern.
    pub const BASE_ADDRESS: u16 = 0x1060;
    /// Wire value representing "no link".
    pub const OFF_VALUE: u16 = 8;

    /// Returns the holding register of the given pattern's link parameter.
    pub fn address(pattern: Pattern) -> u16 {
        Self::BASE_ADDRESS + u16::from(*pattern)
    }

    /// Decodes a raw register value.
    pub fn decode_from_register(raw: u16) -> Result<Self, Error> {
        match raw {
            Self::OFF_VALUE => Ok(PatternLink::Off),
            value if value < Self::OFF_VALUE => Ok(PatternLink::To(Pattern(value as u8))),
            value => Err(Error::PatternLinkOutOfRange(value)),
        }
    }

    /// Encodes the link for a register write.
    pub fn encode_for_write_register(&self) -> u16 {
        match self {
            PatternLink::To(pattern) => u16::from(**pattern),
            PatternLink::Off => Self::OFF_VALUE,
        }
    }
}

impl TryFrom<u8> for PatternLink {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::decode_from_register(u16::from(value))
    }
}

impl std::fmt::Display for PatternLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternLink::To(pattern) => write!(f, "{pattern}"),
            PatternLink::Off => write!(f, "OFF"),
        }
    }
}

/// All 19 variables of one pattern: eight setpoints, eight step times,
/// actual step, additional cycles and the link parameter.
///
/// This is a transient read/write view of the controller memory, not a
/// host-side copy; reading and writing it moves every field over the bus.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternVariables {
    /// Setpoint of each step, in degrees.
    pub setpoints: [f64; STEPS_PER_PATTERN as usize],
    /// Time of each step.
    pub step_times: [u16; STEPS_PER_PATTERN as usize],
    /// Step execution stops at.
    pub actual_step: Step,
    /// Repeat count for the step sequence.
    pub additional_cycles: AdditionalCycles,
    /// Follow-up pattern, or OFF.
    pub link: PatternLink,
}

impl std::fmt::Display for PatternVariables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (step, (setpoint, time)) in self.setpoints.iter().zip(&self.step_times).enumerate() {
            writeln!(f, "SP{step}: {setpoint:<6} Time{step}: {time}")?;
        }
        writeln!(f, "{:<17} {}", "Actual step:", self.actual_step)?;
        writeln!(f, "{:<17} {}", "Add'l cycles:", self.additional_cycles)?;
        write!(f, "{:<17} {}", "Linked pattern:", self.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn pattern_bounds() {
        assert_matches!(Pattern::try_from(0), Ok(p) if *p == 0);
        assert_matches!(Pattern::try_from(7), Ok(p) if *p == 7);
        assert_matches!(Pattern::try_from(8), Err(Error::PatternOutOfRange(8)));
        assert_eq!(Pattern::iter().count(), 8);
    }

    #[test]
    fn step_bounds() {
        assert_matches!(Step::try_from(0), Ok(s) if *s == 0);
        assert_matches!(Step::try_from(7), Ok(s) if *s == 7);
        assert_matches!(Step::try_from(8), Err(Error::StepOutOfRange(8)));
    }

    #[test]
    fn setpoint_scaling() {
        assert_eq!(Setpoint::encode_for_write_register(500.5), 5005);
        assert_eq!(Setpoint::decode_from_register(5005), 500.5);
        assert_eq!(Setpoint::encode_for_write_register(999.9), 9999);
        assert_eq!(Setpoint::decode_from_register(9999), 999.9);
        assert_eq!(Setpoint::encode_for_write_register(0.0), 0);
        // Rounds to the nearest representable tenth.
        assert_eq!(Setpoint::encode_for_write_register(21.94), 219);
        assert_eq!(Setpoint::encode_for_write_register(21.96), 220);
    }

    #[test]
    fn setpoint_check() {
        assert_matches!(Setpoint::check(0.0, Setpoint::DEFAULT_MAX), Ok(()));
        assert_matches!(Setpoint::check(999.9, Setpoint::DEFAULT_MAX), Ok(()));
        assert_matches!(
            Setpoint::check(1000.0, Setpoint::DEFAULT_MAX),
            Err(Error::SetpointOutOfRange { .. })
        );
        assert_matches!(
            Setpoint::check(-0.1, Setpoint::DEFAULT_MAX),
            Err(Error::SetpointOutOfRange { .. })
        );
        // Instance-configured limit, not the default.
        assert_matches!(
            Setpoint::check(500.0, 400.0),
            Err(Error::SetpointOutOfRange { .. })
        );
        assert_matches!(Setpoint::check(400.0, 400.0), Ok(()));
    }

    #[test]
    fn step_time_check() {
        assert_matches!(StepTime::check(0, StepTime::DEFAULT_MAX), Ok(()));
        assert_matches!(StepTime::check(900, StepTime::DEFAULT_MAX), Ok(()));
        assert_matches!(
            StepTime::check(901, StepTime::DEFAULT_MAX),
            Err(Error::StepTimeOutOfRange {
                value: 901,
                max: 900
            })
        );
        assert_matches!(StepTime::check(1000, 1200), Ok(()));
    }

    fn all_step_addresses(address: impl Fn(Pattern, Step) -> u16 + Copy) -> Vec<u16> {
        Pattern::iter()
            .flat_map(|pattern| Step::iter().map(move |step| address(pattern, step)))
            .collect()
    }

    #[test]
    fn step_setpoint_addresses() {
        let addresses = all_step_addresses(Setpoint::step_address);
        assert_eq!(addresses.len(), 64);
        assert_eq!(addresses.first(), Some(&8192));
        assert_eq!(addresses.last(), Some(&8255));
        // Unique and strictly increasing in (pattern, step) order.
        assert!(addresses.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn step_time_addresses() {
        let addresses = all_step_addresses(StepTime::step_address);
        assert_eq!(addresses.len(), 64);
        assert_eq!(addresses.first(), Some(&8320));
        assert_eq!(addresses.last(), Some(&8383));
        assert!(addresses.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn metadata_addresses() {
        let actual: Vec<u16> = Pattern::iter().map(ActualStep::address).collect();
        assert_eq!(actual, (4160..4168).collect::<Vec<u16>>());
        let cycles: Vec<u16> = Pattern::iter().map(AdditionalCycles::address).collect();
        assert_eq!(cycles, (4176..4184).collect::<Vec<u16>>());
        let links: Vec<u16> = Pattern::iter().map(PatternLink::address).collect();
        assert_eq!(links, (4192..4200).collect::<Vec<u16>>());
    }

    #[test]
    fn address_tables_do_not_collide() {
        let mut addresses = all_step_addresses(Setpoint::step_address);
        addresses.extend(all_step_addresses(StepTime::step_address));
        addresses.extend(Pattern::iter().map(ActualStep::address));
        addresses.extend(Pattern::iter().map(AdditionalCycles::address));
        addresses.extend(Pattern::iter().map(PatternLink::address));
        let count = addresses.len();
        addresses.sort_unstable();
        addresses.dedup();
        assert_eq!(addresses.len(), count);
    }

    #[test]
    fn control_mode_codes() {
        assert_matches!(ControlMode::try_from(0), Ok(ControlMode::Pid));
        assert_matches!(ControlMode::try_from(1), Ok(ControlMode::OnOff));
        assert_matches!(ControlMode::try_from(2), Ok(ControlMode::ManualTuning));
        assert_matches!(ControlMode::try_from(3), Ok(ControlMode::Program));
        assert_matches!(ControlMode::try_from(9), Err(Error::UnknownControlMode(9)));
        assert_eq!(ControlMode::ManualTuning.encode_for_write_register(), 2);
        assert_eq!(ControlMode::ManualTuning.to_string(), "Manual Tuning");
    }

    #[test]
    fn additional_cycles_bounds() {
        assert_matches!(AdditionalCycles::try_from(0), Ok(c) if *c == 0);
        assert_matches!(AdditionalCycles::try_from(99), Ok(c) if *c == 99);
        assert_matches!(
            AdditionalCycles::try_from(100),
            Err(Error::AdditionalCyclesOutOfRange(100))
        );
    }

    #[test]
    fn pattern_link_wire_values() {
        assert_matches!(PatternLink::decode_from_register(0), Ok(PatternLink::To(p)) if *p == 0);
        assert_matches!(PatternLink::decode_from_register(7), Ok(PatternLink::To(p)) if *p == 7);
        assert_matches!(PatternLink::decode_from_register(8), Ok(PatternLink::Off));
        assert_matches!(
            PatternLink::decode_from_register(9),
            Err(Error::PatternLinkOutOfRange(9))
        );
        assert_eq!(PatternLink::Off.encode_for_write_register(), 8);
        assert_eq!(
            PatternLink::To(Pattern::try_from(5).unwrap()).encode_for_write_register(),
            5
        );
    }

    #[test]
    fn decode_errors_name_the_raw_register_value() {
        assert_matches!(
            StartPattern::decode_from_register(300),
            Err(Error::PatternOutOfRange(300))
        );
        assert_matches!(
            StartPattern::decode_from_register(8),
            Err(Error::PatternOutOfRange(8))
        );
        assert_matches!(
            ActualStep::decode_from_register(300),
            Err(Error::StepOutOfRange(300))
        );
        assert_matches!(ActualStep::decode_from_register(5), Ok(s) if *s == 5);
    }

    #[test]
    fn fixed_register_addresses() {
        assert_eq!(ProcessValue::ADDRESS, 4096);
        assert_eq!(Setpoint::ADDRESS, 4097);
        assert_eq!(ControlMode::ADDRESS, 4101);
        assert_eq!(RunFlag::ADDRESS, 2068);
        assert_eq!(StartPattern::ADDRESS, 4144);
        assert_eq!(Output1::ADDRESS, 4114);
    }
}
