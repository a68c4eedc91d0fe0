//! Implementations for the Tracker state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::{
    sync::{Arc, Mutex, MutexGuard, mpsc::Sender},
    time::Instant};
use chrono::Utc;
use log::{error, info, warn};

// Internal
use super::{TrackError, TrackEvent, TrackParams};
use crate::{
    cancel::CancelToken,
    drive::{DriveCtrl, DriveError},
    ephem::TargetProvider};
use comms_if::netiom::Transport;
use util::time::seconds_to_std;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Follows a target with a shared drive.
pub struct Tracker<T: Transport, P: TargetProvider> {
    drive: Arc<Mutex<DriveCtrl<T>>>,

    target: P,

    params: TrackParams,

    shutdown: CancelToken,

    events: Option<Sender<TrackEvent>>,
}

/// Disables the drive when dropped, whatever state the lock is in.
struct DisableGuard<T: Transport> {
    drive: Arc<Mutex<DriveCtrl<T>>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: Transport, P: TargetProvider> Tracker<T, P> {
    pub fn new(drive: Arc<Mutex<DriveCtrl<T>>>, target: P, params: TrackParams) -> Self {
        Self {
            drive,
            target,
            params,
            shutdown: CancelToken::new(),
            events: None,
        }
    }

    /// Send tracking events to the given channel.
    pub fn with_events(mut self, events: Sender<TrackEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// A token which ends tracking before the next tick.
    ///
    /// A slew already underway is not interrupted, cancel the drive's stop token as well for
    /// that.
    pub fn shutdown_token(&self) -> CancelToken {
        self.shutdown.clone()
    }

    pub fn target(&self) -> &P {
        &self.target
    }

    /// Track the target until shut down.
    ///
    /// Returns the number of ticks run. A failed tick is retried on the next one, tracking only
    /// ends with an error after `max_consecutive_faults` failures in a row or if the drive lock
    /// is poisoned. A drive stop ends tracking normally. The drive is disabled on every exit,
    /// including a panic.
    pub fn track(&mut self) -> Result<u64, TrackError> {
        let _guard = DisableGuard { drive: Arc::clone(&self.drive) };

        let max_faults = self.params.max_consecutive_faults.max(1);
        let mut ticks = 0u64;
        let mut consecutive = 0u32;
        let mut was_visible = None;

        info!("Tracking {}", self.target.name());

        loop {
            if self.shutdown.is_cancelled() {
                break
            }

            let tick_start = Instant::now();
            ticks += 1;

            match self.tick(&mut was_visible) {
                Ok(()) => consecutive = 0,
                Err(TrackError::Drive(DriveError::Cancelled)) => {
                    info!("Drive stopped, tracking ended");
                    return Ok(ticks)
                },
                Err(TrackError::Poisoned) => {
                    error!("Drive lock poisoned, tracking ended");
                    return Err(TrackError::Poisoned)
                },
                Err(e) => {
                    consecutive += 1;
                    warn!("Tracking tick {} failed ({} in a row): {}", ticks, consecutive, e);

                    self.emit(TrackEvent::Fault {
                        error: e.to_string(),
                        consecutive
                    });

                    if consecutive >= max_faults {
                        error!("Too many consecutive tracking faults, giving up");
                        return Err(e)
                    }
                }
            }

            let remaining = seconds_to_std(self.params.poll_interval_s)
                .checked_sub(tick_start.elapsed());
            if let Some(r) = remaining {
                if self.shutdown.sleep(r) {
                    break
                }
            }
        }

        info!("Tracking of {} shut down after {} ticks", self.target.name(), ticks);
        Ok(ticks)
    }

    fn tick(&self, was_visible: &mut Option<bool>) -> Result<(), TrackError> {
        let target_deg = self.target.hour_angle_deg(Utc::now())?;

        let mut drive = self.drive.lock().map_err(|_| TrackError::Poisoned)?;

        let visible = drive.visibility(target_deg);
        if *was_visible != Some(visible) {
            if visible {
                info!("{} is in view at {:.3} deg", self.target.name(), target_deg);
            }
            else {
                info!(
                    "{} is out of view at {:.3} deg, parking",
                    self.target.name(), target_deg
                );
            }
            *was_visible = Some(visible);
        }

        if visible {
            let pos = drive.slew(target_deg)?;
            self.emit(TrackEvent::Slewed {
                target_deg,
                position_deg: pos.hour_angle_deg
            });
        }
        else {
            drive.park()?;
            self.emit(TrackEvent::OutOfView { target_deg });
        }

        Ok(())
    }

    fn emit(&self, event: TrackEvent) {
        if let Some(ref tx) = self.events {
            // Nobody listening is not an error
            tx.send(event).ok();
        }
    }
}

impl<T: Transport> Drop for DisableGuard<T> {
    fn drop(&mut self) {
        let mut drive: MutexGuard<DriveCtrl<T>> = match self.drive.lock() {
            Ok(d) => d,
            Err(poisoned) => {
                warn!("Drive lock poisoned, disabling anyway");
                poisoned.into_inner()
            }
        };

        if let Err(e) = drive.disable() {
            error!("Could not disable the drive at the end of tracking: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        drive::{DriveParams, DriveState},
        gray::GrayCodec,
        sim::{SimMount, SimParams},
    };
    use std::thread;

    fn shared_drive() -> Arc<Mutex<DriveCtrl<SimMount>>> {
        let codec = Arc::new(GrayCodec::new(13).unwrap());
        let sim = SimMount::new(SimParams::default(), codec.clone());
        let params = DriveParams {
            poll_interval_s: 0.001,
            enable_settle_s: 0.0,
            ..DriveParams::default()
        };

        Arc::new(Mutex::new(DriveCtrl::new(params, sim, codec).unwrap()))
    }

    #[test]
    fn test_guard_recovers_poisoned_lock() {
        let drive = shared_drive();
        drive.lock().unwrap().enable().unwrap();

        let d = Arc::clone(&drive);
        let res = thread::spawn(move || {
            let _lock = d.lock().unwrap();
            panic!("poison the lock");
        }).join();
        assert!(res.is_err());
        assert!(drive.is_poisoned());

        drop(DisableGuard { drive: Arc::clone(&drive) });

        let d = drive.lock().unwrap_or_else(|p| p.into_inner());
        assert_eq!(d.state(), DriveState::Disabled);
        assert!(!d.transport().enabled());
    }
}
