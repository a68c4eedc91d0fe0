//! # Drive Control Executable
//!
//! This executable is responsible for the hour angle drive of the telescope mount:
//! - Owns the connection to the mount's Netiom card (or the simulated mount)
//! - Serves operator telecommands (stop, park, slew, track, status)
//! - Runs slews and sidereal tracking on a worker thread

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Parameters for the drive executable.
mod params;

/// Telecommand server abstraction.
mod tc_server;

/// Executes telecommands against the drive.
mod tc_processor;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use std::sync::{Arc, Mutex};
use color_eyre::{Result, eyre::WrapErr};
use log::{info, warn};

// Internal
use comms_if::{
    netiom::{NetiomClient, Transport},
    tc::TcResponse,
};
use drive_lib::{
    drive::DriveCtrl,
    ephem::SiderealTarget,
    gray::GrayCodec,
    sim::{SimMount, SimParams},
};
use params::DriveExecParams;
use tc_processor::TcProcessor;
use tc_server::TcServer;
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {

    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session = Session::new(
        "drive_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Drive Control Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: DriveExecParams = util::params::load("drive_exec.toml")
        .wrap_err("Failed to load drive_exec parameters")?;

    info!("Parameters loaded");

    // ---- DRIVE INITIALISATION ----

    let codec = match params.calibration_file {
        Some(ref file) => {
            let path = host::get_pt_sw_root()
                .wrap_err("Could not find the software root")?
                .join("params")
                .join(file);

            info!("Loading the encoder calibration from {:?}", path);

            GrayCodec::from_calibration_file(&path, params.drive.bit_width)
                .wrap_err_with(|| format!("Failed to load the calibration table {:?}", path))?
        },
        None => GrayCodec::new(params.drive.bit_width)
            .wrap_err("Failed to build the encoder Gray code")?
    };
    let codec = Arc::new(codec);

    let transport: Box<dyn Transport + Send> = if params.simulate {
        warn!("Simulation mode, commands go to the simulated mount");

        // The simulated encoder is wired the same way as the real one
        let sim_params = SimParams {
            offset_deg: params.drive.offset_deg,
            invert_dac_outputs: params.drive.invert_dac_outputs,
            inputs_endpoint: params.drive.inputs_endpoint.clone(),
            outputs_endpoint: params.drive.outputs_endpoint.clone(),
            ..params.sim.clone()
        };

        Box::new(SimMount::new(sim_params, Arc::clone(&codec)))
    }
    else {
        info!("Connecting to the Netiom card at {}", params.netiom.base_url);

        Box::new(
            NetiomClient::new(&params.netiom)
                .wrap_err("Failed to create the Netiom client")?
        )
    };

    let target = SiderealTarget::from_params(&params.target)
        .wrap_err("Invalid target parameters")?;

    info!(
        "Target is {} at RA {:.4} deg, observer longitude {:.4} deg",
        params.target.name, target.ra_deg(), target.observer().longitude_deg
    );

    let mut drive = DriveCtrl::new(params.drive.clone(), transport, codec)
        .wrap_err("Failed to initialise the drive")?;

    drive.set_archive(
        Archiver::from_path(&session, "drive_slew.csv")
            .wrap_err("Failed to create the slew archive")?
    );
    drive.set_sidereal_clock(Box::new(target.observer()));

    let drive = Arc::new(Mutex::new(drive));

    info!("Drive initialised");

    // ---- SERVER INITIALISATION ----

    let mut server = TcServer::new(&params.tc_endpoint)
        .wrap_err("Failed to initialise the telecommand server")?;

    let mut processor = TcProcessor::new(drive, target, params.track.clone());

    info!("Telecommand server listening on {}", params.tc_endpoint);

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop");

    loop {
        processor.reap();

        let tc = match server.recv_tc() {
            Some(tc) => tc,
            None => continue
        };

        let response = match tc {
            Ok(tc) => {
                info!("Received {:?}", tc);
                processor.exec(&tc)
            },
            Err(e) => {
                warn!("Invalid telecommand: {}", e);
                TcResponse::Rejected(e.to_string())
            }
        };

        if let Err(e) = server.send_response(&response) {
            warn!("Couldn't send response to the client: {}", e);
        }
    }
}
