//! # Telecommand processor module
//!
//! Executes operator telecommands against the shared drive. Motions run on a worker thread so the
//! executable keeps answering telecommands, in particular `Stop`, while the drive is moving. Only
//! one motion runs at a time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::{
    sync::{Arc, Mutex},
    thread::{self, JoinHandle}};
use log::{debug, error, info};

// Internal
use comms_if::{
    netiom::Transport,
    tc::{Activity, DriveStatus, Tc, TcResponse}};
use drive_lib::{
    cancel::CancelToken,
    drive::{DriveCtrl, DriveError, DriveMonitor, DriveState},
    ephem::SiderealTarget,
    track::{TrackParams, Tracker}};
use util::maths::wrap_180;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The drive as shared between the processor and its worker threads.
pub type SharedDrive = Arc<Mutex<DriveCtrl<Box<dyn Transport + Send>>>>;

pub struct TcProcessor {
    drive: SharedDrive,

    monitor: DriveMonitor,

    /// The drive's stop token.
    stop: CancelToken,

    target: SiderealTarget,

    track_params: TrackParams,

    job: Option<Job>,
}

/// A motion running on a worker thread.
struct Job {
    activity: Activity,

    /// Tracker shutdown, if the job is tracking.
    shutdown: Option<CancelToken>,

    handle: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TcProcessor {
    pub fn new(drive: SharedDrive, target: SiderealTarget, track_params: TrackParams) -> Self {
        let (monitor, stop) = {
            let d = drive.lock().unwrap_or_else(|p| p.into_inner());
            (d.monitor(), d.stop_token())
        };

        Self {
            drive,
            monitor,
            stop,
            target,
            track_params,
            job: None,
        }
    }

    /// Execute a telecommand, returning the response for the operator.
    pub fn exec(&mut self, tc: &Tc) -> TcResponse {
        self.reap();

        match tc {
            Tc::Stop => {
                self.stop_all();
                TcResponse::Ok
            },
            Tc::Park => self.start_slew(0.0),
            Tc::Slew { hour_angle_deg } => self.start_slew(*hour_angle_deg),
            Tc::Track => self.start_track(),
            Tc::Status => TcResponse::Status(self.status()),
        }
    }

    /// Clean up a finished job.
    pub fn reap(&mut self) {
        let finished = match self.job {
            Some(ref j) => j.handle.is_finished(),
            None => false
        };

        if finished {
            if let Some(job) = self.job.take() {
                debug!("{:?} job finished", job.activity);

                if job.handle.join().is_err() {
                    error!("{:?} job panicked", job.activity);
                }
            }
        }
    }

    /// Stop any motion and disable the drive.
    fn stop_all(&mut self) {
        info!("Stopping the drive");

        self.stop.cancel();

        if let Some(job) = self.job.take() {
            if let Some(ref shutdown) = job.shutdown {
                shutdown.cancel();
            }

            if job.handle.join().is_err() {
                error!("{:?} job panicked", job.activity);
            }
        }

        let mut drive = self.drive.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = drive.disable() {
            error!("Could not disable the drive: {}", e);
        }

        self.stop.reset();
    }

    fn start_slew(&mut self, hour_angle_deg: f64) -> TcResponse {
        if self.job.is_some() {
            return TcResponse::Busy
        }

        let target_deg = wrap_180(hour_angle_deg);

        {
            let drive = self.drive.lock().unwrap_or_else(|p| p.into_inner());
            if let Err(e) = drive.check_stops(target_deg) {
                return TcResponse::Rejected(e.to_string())
            }
        }

        let drive = Arc::clone(&self.drive);
        let handle = thread::spawn(move || {
            let mut drive = match drive.lock() {
                Ok(d) => d,
                Err(_) => {
                    error!("Drive lock poisoned, cannot slew");
                    return
                }
            };

            match drive.slew(target_deg) {
                Ok(pos) => info!("Slew complete at {:.3} deg", pos.hour_angle_deg),
                Err(DriveError::Cancelled) => info!("Slew stopped"),
                Err(e) => error!("Slew failed: {}", e)
            }
        });

        self.job = Some(Job {
            activity: Activity::Slewing { target_deg },
            shutdown: None,
            handle
        });

        TcResponse::Ok
    }

    fn start_track(&mut self) -> TcResponse {
        if self.job.is_some() {
            return TcResponse::Busy
        }

        let mut tracker = Tracker::new(
            Arc::clone(&self.drive),
            self.target.clone(),
            self.track_params.clone()
        );
        let shutdown = tracker.shutdown_token();

        let handle = thread::spawn(move || {
            match tracker.track() {
                Ok(ticks) => info!("Tracking ended after {} ticks", ticks),
                Err(e) => error!("Tracking failed: {}", e)
            }
        });

        self.job = Some(Job {
            activity: Activity::Tracking,
            shutdown: Some(shutdown),
            handle
        });

        TcResponse::Ok
    }

    fn status(&self) -> DriveStatus {
        let snap = self.monitor.snapshot();

        DriveStatus {
            enabled: snap.state == DriveState::Enabled,
            activity: match self.job {
                Some(ref j) => j.activity.clone(),
                None => Activity::Idle
            },
            hour_angle_deg: snap.position.map(|p| p.hour_angle_deg),
            ra_deg: snap.position.and_then(|p| p.ra_deg),
        }
    }
}

impl Drop for TcProcessor {
    fn drop(&mut self) {
        self.stop_all();
    }
}
