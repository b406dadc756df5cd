use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use cn7500_lib::protocol as proto;
use std::time::Duration;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1") // Common default for Windows, though may vary.
    } else {
        String::from("/dev/ttyUSB0") // Common default for USB-to-serial adapters on Linux.
    }
}

fn parse_pattern(s: &str) -> Result<proto::Pattern, String> {
    let pattern_num =
        clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid pattern number format: {e}"))?;
    proto::Pattern::try_from(pattern_num).map_err(|e| e.to_string())
}

fn parse_step(s: &str) -> Result<proto::Step, String> {
    let step_num =
        clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid step number format: {e}"))?;
    proto::Step::try_from(step_num).map_err(|e| e.to_string())
}

fn parse_additional_cycles(s: &str) -> Result<proto::AdditionalCycles, String> {
    let cycles = clap_num::maybe_hex::<u16>(s)
        .map_err(|e| format!("Invalid additional cycles format: {e}"))?;
    proto::AdditionalCycles::try_from(cycles).map_err(|e| e.to_string())
}

fn parse_pattern_link(s: &str) -> Result<proto::PatternLink, String> {
    if s.eq_ignore_ascii_case("off") {
        return Ok(proto::PatternLink::Off);
    }
    let link = clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid link format: {e}"))?;
    proto::PatternLink::try_from(link).map_err(|e| e.to_string())
}

fn parse_control_mode(s: &str) -> Result<proto::ControlMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "pid" => Ok(proto::ControlMode::Pid),
        "onoff" | "on/off" | "on-off" => Ok(proto::ControlMode::OnOff),
        "tuning" | "manual-tuning" => Ok(proto::ControlMode::ManualTuning),
        "program" => Ok(proto::ControlMode::Program),
        _ => {
            let code = s
                .parse::<u16>()
                .map_err(|_| format!("Unknown control mode '{s}' (expected pid, onoff, tuning, program or a code 0-3)"))?;
            proto::ControlMode::try_from(code).map_err(|e| e.to_string())
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliConnection {
    /// Connect to a process controller via Modbus TCP (e.g. through a
    /// Modbus TCP/RTU gateway).
    Tcp {
        /// The IP address or hostname and port of the Modbus TCP device.
        /// Example: "192.168.1.100:502" or "modbus-gateway.local:502".
        address: String,

        /// Commands for the connected controller.
        #[command(subcommand)]
        command: CliCommands,
    },
    /// Connect to a process controller via Modbus RTU (RS485).
    Rtu {
        /// Serial port device name.
        /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
        #[arg(short, long, default_value_t = default_device_name())]
        device: String,

        /// Baud rate for serial communication.
        /// Must match the communication format configured on the instrument.
        #[arg(long, default_value_t = cn7500_lib::tokio_common::FACTORY_DEFAULT_BAUD_RATE)]
        baud_rate: u32,

        /// The Modbus RTU slave address configured on the instrument (1-247).
        #[arg(short, long, default_value_t = cn7500_lib::tokio_common::FACTORY_DEFAULT_ADDRESS)]
        address: u8,

        /// Commands for the connected controller.
        #[command(subcommand)]
        command: CliCommands,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Read and display process value, setpoint, output level, control mode,
    /// run state and start pattern in one go.
    Status,

    /// Continuously poll and print the process value and setpoint.
    Monitor {
        /// Interval for fetching values (e.g., "2s", "1m").
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "2sec")]
        poll_interval: Duration,
    },

    /// Read and display the process value (PV).
    ReadPv,

    /// Read and display the output 1 power level (OP1) in percent.
    ReadOutput,

    /// Read and display the active setpoint (SV).
    ReadSetpoint,

    /// Set the active setpoint (SV).
    SetSetpoint {
        /// Setpoint in degrees, one decimal place (0 up to the configured
        /// --setpoint-max).
        value: f64,
    },

    /// Put the controller in run mode.
    Run,

    /// Stop the controller.
    Stop,

    /// Read and display the control mode.
    ReadControlMode,

    /// Set the control mode.
    SetControlMode {
        /// One of: pid, onoff, tuning, program (or the raw code 0-3).
        #[arg(value_parser = parse_control_mode)]
        mode: proto::ControlMode,
    },

    /// Read and display the pattern number program execution starts at.
    ReadStartPattern,

    /// Set the pattern number program execution starts at.
    SetStartPattern {
        /// Pattern number (0-7).
        #[arg(value_parser = parse_pattern)]
        pattern: proto::Pattern,
    },

    /// Read and display all 19 variables of one pattern.
    ReadPattern {
        /// Pattern number (0-7).
        #[arg(value_parser = parse_pattern)]
        pattern: proto::Pattern,
    },

    /// Set the setpoint of one pattern step.
    SetStepSetpoint {
        /// Pattern number (0-7).
        #[arg(value_parser = parse_pattern)]
        pattern: proto::Pattern,
        /// Step number (0-7).
        #[arg(value_parser = parse_step)]
        step: proto::Step,
        /// Setpoint in degrees (0 up to the configured --setpoint-max).
        value: f64,
    },

    /// Set the time of one pattern step.
    SetStepTime {
        /// Pattern number (0-7).
        #[arg(value_parser = parse_pattern)]
        pattern: proto::Pattern,
        /// Step number (0-7).
        #[arg(value_parser = parse_step)]
        step: proto::Step,
        /// Step time (0 up to the configured --time-max).
        value: u16,
    },

    /// Set the actual step parameter of a pattern (the step execution
    /// stops at).
    SetActualStep {
        /// Pattern number (0-7).
        #[arg(value_parser = parse_pattern)]
        pattern: proto::Pattern,
        /// Step number (0-7).
        #[arg(value_parser = parse_step)]
        step: proto::Step,
    },

    /// Set the additional cycles (repeat count) of a pattern.
    SetAdditionalCycles {
        /// Pattern number (0-7).
        #[arg(value_parser = parse_pattern)]
        pattern: proto::Pattern,
        /// Repeat count (0-99).
        #[arg(value_parser = parse_additional_cycles)]
        cycles: proto::AdditionalCycles,
    },

    /// Set the pattern a given pattern transitions to upon completion.
    SetPatternLink {
        /// Pattern number (0-7).
        #[arg(value_parser = parse_pattern)]
        pattern: proto::Pattern,
        /// Follow-up pattern number (0-7), or "off" (also accepted: 8).
        #[arg(value_parser = parse_pattern_link)]
        link: proto::PatternLink,
    },

    /// Overwrite all 19 variables of one pattern in the controller's
    /// non-volatile memory. Asks for confirmation first.
    SetPattern {
        /// Pattern number (0-7).
        #[arg(value_parser = parse_pattern)]
        pattern: proto::Pattern,
        /// The eight step setpoints in degrees, in step order.
        #[arg(long, num_args = 8, required = true, action = clap::ArgAction::Set, overrides_with = "setpoints")]
        setpoints: Vec<f64>,
        /// The eight step times, in step order.
        #[arg(long, num_args = 8, required = true, action = clap::ArgAction::Set, overrides_with = "times")]
        times: Vec<u16>,
        /// Step execution stops at (0-7).
        #[arg(long, value_parser = parse_step)]
        actual_step: proto::Step,
        /// Repeat count (0-99).
        #[arg(long, default_value = "0", value_parser = parse_additional_cycles)]
        cycles: proto::AdditionalCycles,
        /// Follow-up pattern number (0-7), or "off".
        #[arg(long, default_value = "off", value_parser = parse_pattern_link)]
        link: proto::PatternLink,
    },
}

const fn about_text() -> &'static str {
    "Omega CN7500 CLI - Read process state and configure temperature patterns via Modbus RTU/TCP."
}

#[derive(Parser, Debug)]
#[command(name="omegactl", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is off.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Specifies the connection method and device-specific commands.
    #[command(subcommand)]
    pub connection: CliConnection,

    /// Modbus I/O timeout for read/write operations.
    /// Examples: "1s", "500ms".
    #[arg(global = true, long, default_value = "200ms", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Minimum delay between multiple Modbus commands sent to the same
    /// device. Important for Modbus RTU, especially with USB-to-RS485
    /// converters that need time to switch between TX and RX modes.
    #[arg(global = true, long, default_value = "50ms", value_parser = humantime::parse_duration)]
    pub delay: Duration,

    /// Maximum allowed setpoint value. A deployment-level safety limit; all
    /// setpoint writes are checked against it.
    #[arg(global = true, long, default_value_t = proto::Setpoint::DEFAULT_MAX)]
    pub setpoint_max: f64,

    /// Maximum allowed step time. A deployment-level safety limit; all step
    /// time writes are checked against it.
    #[arg(global = true, long, default_value_t = proto::StepTime::DEFAULT_MAX)]
    pub time_max: u16,
}
