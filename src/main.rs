//! Omega CN7500 CLI
//!
//! A command-line interface (CLI) application for interacting with Omega
//! CN7500 process controllers using Modbus RTU (serial) or Modbus TCP.
//!
//! This tool allows users to:
//! - Read live process state: process value, setpoint, output level,
//!   control mode and run status.
//! - Run and stop the controller and change the setpoint.
//! - Inspect and edit the eight stored temperature patterns, per field or
//!   as a whole (eight setpoints, eight step times, actual step, additional
//!   cycles, link).
//! - Continuously monitor the process value and setpoint.
//!
//! The CLI leverages the `cn7500_lib` crate for protocol definitions and
//! client operations.

use anyhow::{Context, Result};
use clap::Parser;
use cn7500_lib::{client::Cn7500, tokio_sync::SyncTransport};
use dialoguer::Confirm;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::{panic, time::Duration};

mod commandline;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0)); // Provide defaults

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// Calculates the minimum recommended delay for Modbus RTU based on baud rate.
/// This is typically 3.5 character times.
fn minimum_rtu_delay(baud_rate: u32) -> Duration {
    // Modbus character time calculation assumes 11 bits per character
    // (start + 8 data + parity/stop + stop).
    let bits_per_char = 11.0;
    if baud_rate == 0 {
        // Avoid division by zero, default to a safe delay
        return Duration::from_millis(16);
    }

    let char_time_secs = bits_per_char / f64::from(baud_rate);
    let inter_frame_delay_secs = 3.5 * char_time_secs;
    let delay_micros = (inter_frame_delay_secs * 1_000_000.0) as u64;

    // The Modbus spec fixes the minimum silence interval at 1.75ms for baud
    // rates above 19200.
    const PRACTICAL_MIN_INTER_FRAME_DELAY_MICROS: u64 = 1_750; // 1.75 ms
    Duration::from_micros(delay_micros.max(PRACTICAL_MIN_INTER_FRAME_DELAY_MICROS))
}

/// Checks if the user-provided RTU delay is sufficient; if not, uses the calculated minimum.
fn check_rtu_delay(user_delay: Duration, baud_rate: u32) -> Duration {
    let min_rtu_delay = minimum_rtu_delay(baud_rate);
    if user_delay < min_rtu_delay {
        warn!(
            "User-defined RTU delay of {user_delay:?} is below the recommended minimum of {min_rtu_delay:?} for {baud_rate} baud. Using minimum."
        );
        min_rtu_delay
    } else {
        user_delay
    }
}

/// Creates a new CN7500 client based on the provided command-line arguments.
fn create_client<'a>(
    args: &'a commandline::CliArgs,
    delay: &mut Duration,
) -> Result<(Cn7500<SyncTransport>, &'a commandline::CliCommands)> {
    let (ctx, command_to_execute) = match &args.connection {
        commandline::CliConnection::Tcp {
            address: tcp_address_str,
            command,
        } => {
            let socket_addr = tcp_address_str
                .parse()
                .with_context(|| format!("Invalid TCP address format: '{tcp_address_str}'"))?;
            info!("Attempting to connect via TCP to {socket_addr}...");
            let ctx = tokio_modbus::client::sync::tcp::connect(socket_addr).with_context(|| {
                format!("Failed to connect to Modbus TCP device at {socket_addr}")
            })?;
            (ctx, command)
        }
        commandline::CliConnection::Rtu {
            device,
            baud_rate,
            address,
            command,
        } => {
            info!(
                "Attempting to connect via RTU to device {device} (Address: {address}, Baud: {baud_rate})..."
            );
            *delay = check_rtu_delay(*delay, *baud_rate);
            let ctx = tokio_modbus::client::sync::rtu::connect_slave(
                &cn7500_lib::tokio_common::serial_port_builder(device, *baud_rate),
                tokio_modbus::Slave(*address),
            )
            .with_context(|| format!("Cannot open serial port {device} at baud {baud_rate}"))?;
            (ctx, command)
        }
    };

    let mut transport = SyncTransport::new(ctx);
    transport.set_timeout(args.timeout);
    Ok((
        Cn7500::with_limits(transport, args.setpoint_max, args.time_max),
        command_to_execute,
    ))
}

fn print_pv_sv(client: &mut Cn7500<SyncTransport>) -> Result<()> {
    let pv = client
        .read_process_value()
        .with_context(|| "Cannot read process value")?;
    let sv = client
        .read_setpoint()
        .with_context(|| "Cannot read setpoint")?;
    println!("PV: {pv} °C  SV: {sv} °C");
    Ok(())
}

fn print_status(client: &mut Cn7500<SyncTransport>, delay: Duration) -> Result<()> {
    let pv = client
        .read_process_value()
        .with_context(|| "Cannot read process value")?;
    std::thread::sleep(delay);
    let sv = client
        .read_setpoint()
        .with_context(|| "Cannot read setpoint")?;
    std::thread::sleep(delay);
    let output = client
        .read_output1()
        .with_context(|| "Cannot read output level")?;
    std::thread::sleep(delay);
    let mode = client
        .read_control_mode()
        .with_context(|| "Cannot read control mode")?;
    std::thread::sleep(delay);
    let running = client
        .is_running()
        .with_context(|| "Cannot read run state")?;
    std::thread::sleep(delay);
    let start_pattern = client
        .read_start_pattern()
        .with_context(|| "Cannot read start pattern")?;

    println!("{:<15} {pv} °C", "PV:");
    println!("{:<15} {sv} °C", "SV:");
    println!("{:<15} {output} %", "OP1:");
    println!("{:<15} {mode}", "Control:");
    println!("{:<15} {running}", "Is running:");
    println!("{:<15} {start_pattern}", "Start pattern:");
    Ok(())
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    // Initialize logging as early as possible.
    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "CN7500 CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let mut delay = args.delay;
    let (mut client, command_to_execute) = create_client(&args, &mut delay)?;

    match command_to_execute {
        commandline::CliCommands::Status => {
            info!("Executing: Status");
            print_status(&mut client, delay)?;
        }
        commandline::CliCommands::Monitor { poll_interval } => {
            info!("Starting monitor mode: interval={poll_interval:?}");
            loop {
                debug!("Monitor: reading PV/SV...");
                print_pv_sv(&mut client)?;
                std::thread::sleep(delay.max(*poll_interval));
            }
        }
        commandline::CliCommands::ReadPv => {
            info!("Executing: Read Process Value");
            let pv = client
                .read_process_value()
                .with_context(|| "Cannot read process value")?;
            println!("PV: {pv} °C");
        }
        commandline::CliCommands::ReadOutput => {
            info!("Executing: Read Output Level");
            let output = client
                .read_output1()
                .with_context(|| "Cannot read output level")?;
            println!("OP1: {output} %");
        }
        commandline::CliCommands::ReadSetpoint => {
            info!("Executing: Read Setpoint");
            let sv = client
                .read_setpoint()
                .with_context(|| "Cannot read setpoint")?;
            println!("SV: {sv} °C");
        }
        commandline::CliCommands::SetSetpoint { value } => {
            info!("Executing: Set Setpoint to {value} °C");
            client
                .set_setpoint(*value)
                .with_context(|| format!("Failed to set setpoint to {value}"))?;
            println!("Setpoint set to {value} °C successfully.");
        }
        commandline::CliCommands::Run => {
            info!("Executing: Run");
            client.run().with_context(|| "Cannot start the controller")?;
            println!("Controller is now in run mode.");
        }
        commandline::CliCommands::Stop => {
            info!("Executing: Stop");
            client.stop().with_context(|| "Cannot stop the controller")?;
            println!("Controller stopped.");
        }
        commandline::CliCommands::ReadControlMode => {
            info!("Executing: Read Control Mode");
            let mode = client
                .read_control_mode()
                .with_context(|| "Cannot read control mode")?;
            println!("Control mode: {mode}");
        }
        commandline::CliCommands::SetControlMode { mode } => {
            info!("Executing: Set Control Mode to {mode}");
            client
                .set_control_mode(*mode)
                .with_context(|| format!("Failed to set control mode to {mode}"))?;
            println!("Control mode set to {mode} successfully.");
        }
        commandline::CliCommands::ReadStartPattern => {
            info!("Executing: Read Start Pattern");
            let pattern = client
                .read_start_pattern()
                .with_context(|| "Cannot read start pattern")?;
            println!("Start pattern: {pattern}");
        }
        commandline::CliCommands::SetStartPattern { pattern } => {
            info!("Executing: Set Start Pattern to {pattern}");
            client
                .set_start_pattern(*pattern)
                .with_context(|| format!("Failed to set start pattern to {pattern}"))?;
            println!("Start pattern set to {pattern} successfully.");
        }
        commandline::CliCommands::ReadPattern { pattern } => {
            info!("Executing: Read Pattern {pattern}");
            let variables = client
                .read_pattern(*pattern)
                .with_context(|| format!("Cannot read pattern {pattern}"))?;
            println!("Pattern {pattern}:");
            println!("{variables}");
        }
        commandline::CliCommands::SetStepSetpoint {
            pattern,
            step,
            value,
        } => {
            info!("Executing: Set Pattern {pattern} Step {step} Setpoint to {value} °C");
            client
                .set_step_setpoint(*pattern, *step, *value)
                .with_context(|| {
                    format!("Failed to set setpoint of pattern {pattern} step {step} to {value}")
                })?;
            println!("Setpoint of pattern {pattern} step {step} set to {value} °C successfully.");
        }
        commandline::CliCommands::SetStepTime {
            pattern,
            step,
            value,
        } => {
            info!("Executing: Set Pattern {pattern} Step {step} Time to {value}");
            client
                .set_step_time(*pattern, *step, *value)
                .with_context(|| {
                    format!("Failed to set time of pattern {pattern} step {step} to {value}")
                })?;
            println!("Time of pattern {pattern} step {step} set to {value} successfully.");
        }
        commandline::CliCommands::SetActualStep { pattern, step } => {
            info!("Executing: Set Pattern {pattern} Actual Step to {step}");
            client
                .set_actual_step(*pattern, *step)
                .with_context(|| {
                    format!("Failed to set actual step of pattern {pattern} to {step}")
                })?;
            println!("Actual step of pattern {pattern} set to {step} successfully.");
        }
        commandline::CliCommands::SetAdditionalCycles { pattern, cycles } => {
            info!("Executing: Set Pattern {pattern} Additional Cycles to {cycles}");
            client
                .set_additional_cycles(*pattern, *cycles)
                .with_context(|| {
                    format!("Failed to set additional cycles of pattern {pattern} to {cycles}")
                })?;
            println!("Additional cycles of pattern {pattern} set to {cycles} successfully.");
        }
        commandline::CliCommands::SetPatternLink { pattern, link } => {
            info!("Executing: Set Pattern {pattern} Link to {link}");
            client
                .set_pattern_link(*pattern, *link)
                .with_context(|| format!("Failed to set link of pattern {pattern} to {link}"))?;
            println!("Link of pattern {pattern} set to {link} successfully.");
        }
        commandline::CliCommands::SetPattern {
            pattern,
            setpoints,
            times,
            actual_step,
            cycles,
            link,
        } => {
            info!("Executing: Set Pattern {pattern}");
            let variables = cn7500_lib::protocol::PatternVariables {
                setpoints: setpoints
                    .as_slice()
                    .try_into()
                    .with_context(|| format!("Expected 8 setpoints, got {}", setpoints.len()))?,
                step_times: times
                    .as_slice()
                    .try_into()
                    .with_context(|| format!("Expected 8 step times, got {}", times.len()))?,
                actual_step: *actual_step,
                additional_cycles: *cycles,
                link: *link,
            };
            println!(
                "This will overwrite all variables of pattern {pattern} in the controller's \
                 non-volatile memory with:"
            );
            println!("{variables}");
            if !Confirm::new()
                .with_prompt("Do you want to continue?")
                .default(false)
                .show_default(true)
                .interact()
                .context("Failed to get user confirmation.")?
            {
                info!("Pattern write aborted by user.");
                return Ok(());
            }
            client
                .set_pattern(*pattern, &variables)
                .with_context(|| format!("Failed to write pattern {pattern}"))?;
            println!("Pattern {pattern} written successfully.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_rtu_delay_calculation() {
        // Char time = 11 bits / baud; 3.5 char times = 38.5 / baud.
        assert_eq!(minimum_rtu_delay(1200).as_micros(), 32083);
        assert_eq!(minimum_rtu_delay(2400).as_micros(), 16041);
        assert_eq!(minimum_rtu_delay(4800).as_micros(), 8020);
        assert_eq!(minimum_rtu_delay(9600).as_micros(), 4010);
        assert_eq!(minimum_rtu_delay(19200).as_micros(), 2005);
        // Above 19200 the 1.75ms practical minimum applies.
        assert_eq!(minimum_rtu_delay(38400).as_micros(), 1750);
    }

    #[test]
    fn test_check_rtu_delay() {
        let min_delay_9600 = minimum_rtu_delay(9600); // Approx 4010 us

        assert_eq!(check_rtu_delay(Duration::from_millis(3), 9600), min_delay_9600);
        assert_eq!(
            check_rtu_delay(Duration::from_millis(5), 9600),
            Duration::from_millis(5)
        );
        assert_eq!(check_rtu_delay(min_delay_9600, 9600), min_delay_9600);
    }
}
