//! # Drive Console
//!
//! Interactive operator console for the drive executable. Commands typed at the prompt are sent as
//! telecommands and the response printed.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Parameters for the console.
mod params;

/// Telecommand client.
mod tc_client;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{Result, eyre::WrapErr};
use rustyline::{error::ReadlineError, DefaultEditor};
use structopt::StructOpt;

use comms_if::tc::{Activity, DriveStatus, Tc, TcResponse};
use params::DriveCliParams;
use tc_client::TcClient;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "drive $ ";
const HISTORY_PATH: &str = ".drive_cli_history";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "drive_cli", about = "Operator console for the telescope drive")]
struct Opts {
    /// Telecommand endpoint, overriding drive_cli.toml
    #[structopt(short, long)]
    endpoint: Option<String>,
}

/// A command typed at the prompt.
#[derive(Debug, PartialEq, StructOpt)]
#[structopt(name = "drive", no_version)]
enum Command {
    /// Stop any motion and disable the drive
    Stop,

    /// Slew to the meridian
    Park,

    /// Slew to an hour angle
    Slew {
        /// Target hour angle in degrees, positive west
        #[structopt(allow_hyphen_values = true)]
        hour_angle_deg: f64,
    },

    /// Track the configured target
    Track,

    /// Show the drive status
    Status,

    /// Leave the console
    Quit,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    let endpoint = match opts.endpoint {
        Some(e) => e,
        None => {
            let params: DriveCliParams = util::params::load("drive_cli.toml")
                .wrap_err("Failed to load drive_cli parameters")?;
            params.tc_endpoint
        }
    };

    let mut client = TcClient::new(&endpoint)
        .wrap_err("Failed to create the telecommand client")?;

    println!("Drive console, sending telecommands to {}", endpoint);
    println!("Type `help` for a list of commands\n");

    let mut rl = DefaultEditor::new()
        .wrap_err("Failed to create the line editor")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Unhandled Error: {:?}", e);
                break
            }
        };

        if line.trim().is_empty() {
            continue
        }

        rl.add_history_entry(line.as_str()).ok();

        let cmd = match parse(&line) {
            Ok(c) => c,
            Err(e) => {
                println!("{}", e);
                continue
            }
        };

        let tc = match to_tc(&cmd) {
            Some(tc) => tc,
            None => break
        };

        match client.send(&tc) {
            Ok(response) => print_response(&response),
            Err(e) => {
                println!("Error: {}", e);
                if !client.connected() {
                    println!("Is the drive executable running at {}?", endpoint);
                }
            }
        }
    }

    if let Err(e) = rl.save_history(HISTORY_PATH) {
        println!("Could not save history: {}", e);
    }

    println!("Exiting...");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse a line typed at the prompt.
fn parse(line: &str) -> Result<Command, structopt::clap::Error> {
    Command::from_iter_safe(std::iter::once("drive").chain(line.split_whitespace()))
}

/// Telecommand for a command, `None` for a command which ends the console.
fn to_tc(cmd: &Command) -> Option<Tc> {
    match *cmd {
        Command::Stop => Some(Tc::Stop),
        Command::Park => Some(Tc::Park),
        Command::Slew { hour_angle_deg } => Some(Tc::Slew { hour_angle_deg }),
        Command::Track => Some(Tc::Track),
        Command::Status => Some(Tc::Status),
        Command::Quit => None,
    }
}

fn print_response(response: &TcResponse) {
    match response {
        TcResponse::Ok => println!("Ok"),
        TcResponse::Busy => println!("Busy, the drive is already moving. Send `stop` first."),
        TcResponse::Rejected(reason) => println!("Rejected: {}", reason),
        TcResponse::Status(status) => print_status(status),
    }
}

fn print_status(status: &DriveStatus) {
    let activity = match status.activity {
        Activity::Idle => String::from("idle"),
        Activity::Slewing { target_deg } => format!("slewing to {:.3} deg", target_deg),
        Activity::Tracking => String::from("tracking"),
    };

    println!("  drive:       {}", if status.enabled { "enabled" } else { "disabled" });
    println!("  activity:    {}", activity);

    match status.hour_angle_deg {
        Some(ha) => println!("  hour angle:  {:.3} deg", ha),
        None => println!("  hour angle:  unknown"),
    }

    if let Some(ra) = status.ra_deg {
        println!("  RA:          {:.3} deg ({:.4} h)", ra, ra / 15.0);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("stop").unwrap(), Command::Stop);
        assert_eq!(parse("  park ").unwrap(), Command::Park);
        assert_eq!(parse("slew 12.5").unwrap(), Command::Slew { hour_angle_deg: 12.5 });
        assert_eq!(parse("slew -30").unwrap(), Command::Slew { hour_angle_deg: -30.0 });
        assert_eq!(parse("status").unwrap(), Command::Status);

        assert!(parse("slew").is_err());
        assert!(parse("slew west").is_err());
        assert!(parse("spin").is_err());
    }

    #[test]
    fn test_to_tc() {
        assert_eq!(
            to_tc(&Command::Slew { hour_angle_deg: -30.0 }),
            Some(Tc::Slew { hour_angle_deg: -30.0 })
        );
        assert_eq!(to_tc(&Command::Track), Some(Tc::Track));
        assert_eq!(to_tc(&Command::Quit), None);
    }
}
