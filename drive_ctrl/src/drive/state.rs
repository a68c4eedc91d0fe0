//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::{sync::Arc, time::Instant};
use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use serde::Serialize;

// Internal
use super::{
    DriveMonitor, DriveParams, DriveError, DriveState, MotorStatus, SensorFaultCause,
    ENABLE_PIN,
    speed_law, visible};
use crate::{
    cancel::CancelToken,
    ephem::SiderealClock,
    gray::GrayCodec,
    position::PositionEncoder,
    speed_cmd::{SpeedCommand, SpeedEncoder}};
use comms_if::netiom::{OutputCmd, Transport, TransportError};
use util::{
    archive::Archiver,
    maths::{wrap_180, wrap_360},
    session,
    time::seconds_to_std};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state.
///
/// Owns the transport to the mount. Callers on different threads must share a `DriveCtrl`
/// behind a mutex, the only thing which may be used without holding the lock is the
/// [`CancelToken`] returned by [`DriveCtrl::stop_token`].
pub struct DriveCtrl<T: Transport> {
    params: DriveParams,

    transport: T,

    encoder: PositionEncoder,
    speed_encoder: SpeedEncoder,

    state: DriveState,

    last_position: Option<Position>,

    monitor: DriveMonitor,

    stop: CancelToken,

    clock: Option<Box<dyn SiderealClock + Send>>,

    arch_slew: Archiver,
}

/// A successfully decoded position of the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Hour angle of the axis, in the range (-180, 180].
    ///
    /// Units: degrees
    pub hour_angle_deg: f64,

    /// Uncorrected encoder shaft angle, in the range [0, 360).
    ///
    /// Units: degrees
    pub raw_deg: f64,

    /// Encoder ordinal.
    pub ordinal: u32,

    /// Right ascension the axis points at, only known if a sidereal clock has been set.
    ///
    /// Units: degrees
    pub ra_deg: Option<f64>,

    /// Time the reading was taken.
    pub time: DateTime<Utc>,
}

/// One slew control cycle, as archived.
#[derive(Debug, Clone, Copy, Serialize)]
struct SlewRecord {
    time_s: f64,
    target_deg: f64,
    hour_angle_deg: f64,
    ordinal: u32,
    diff_deg: f64,
    speed: f64,
    dac: u8,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: Transport> DriveCtrl<T> {
    /// Create a new drive controller.
    ///
    /// The drive is disabled during construction. A failure to do so is only logged, since the
    /// controller is already in the `Disabled` state and will retry on the next command.
    pub fn new(params: DriveParams, transport: T, codec: Arc<GrayCodec>) -> Result<Self, DriveError> {
        params.validate()?;

        if codec.bit_width() != params.bit_width {
            return Err(DriveError::InvalidParams(format!(
                "codec is {} bits wide but bit_width is {}",
                codec.bit_width(),
                params.bit_width
            )))
        }

        let mut drive = Self {
            speed_encoder: SpeedEncoder::new(params.invert_dac_outputs),
            encoder: PositionEncoder::new(codec),
            params,
            transport,
            state: DriveState::Disabled,
            last_position: None,
            monitor: DriveMonitor::new(),
            stop: CancelToken::new(),
            clock: None,
            arch_slew: Archiver::default(),
        };

        if let Err(e) = drive.disable() {
            warn!("Could not disable the drive on startup: {}", e);
        }

        Ok(drive)
    }

    /// Create a new drive controller using the reflected Gray code of the configured width.
    pub fn with_default_codec(params: DriveParams, transport: T) -> Result<Self, DriveError> {
        let codec = GrayCodec::new(params.bit_width)?;
        Self::new(params, transport, Arc::new(codec))
    }

    // ---- ACCESSORS ----

    pub fn params(&self) -> &DriveParams {
        &self.params
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    /// The last successfully read position.
    pub fn last_position(&self) -> Option<Position> {
        self.last_position
    }

    /// A view of the drive's state which can be read without holding the drive.
    pub fn monitor(&self) -> DriveMonitor {
        self.monitor.clone()
    }

    /// A token which stops an in-progress slew at its next poll.
    ///
    /// A cancelled token stays cancelled, so it must be reset before the next slew.
    pub fn stop_token(&self) -> CancelToken {
        self.stop.clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Archive every slew control cycle.
    pub fn set_archive(&mut self, archiver: Archiver) {
        self.arch_slew = archiver;
    }

    /// Set the clock used to work out the right ascension of each position.
    pub fn set_sidereal_clock(&mut self, clock: Box<dyn SiderealClock + Send>) {
        self.clock = Some(clock);
    }

    /// True if the target hour angle lies strictly between the soft stops.
    pub fn visibility(&self, target_hour_angle_deg: f64) -> bool {
        visible(target_hour_angle_deg, self.params.east_stop_deg, self.params.west_stop_deg)
    }

    // ---- STATE MACHINE ----

    /// Enable the servo amplifier.
    ///
    /// Does nothing if the drive is already enabled. If a power relay is fitted it is switched on
    /// first and the amplifier is given `enable_settle_s` to power up, which the stop token
    /// interrupts.
    pub fn enable(&mut self) -> Result<(), DriveError> {
        if self.state == DriveState::Enabled {
            return Ok(())
        }

        if let Some(pin) = self.params.power_relay_pin {
            if let Err(e) = self.send(&[OutputCmd::High(pin)]) {
                return Err(self.fail_safe(e.into()))
            }

            info!("Amplifier power on, waiting {} s to settle", self.params.enable_settle_s);

            if self.stop.sleep(seconds_to_std(self.params.enable_settle_s)) {
                return Err(self.fail_safe(DriveError::Cancelled))
            }
        }

        match self.send(&[OutputCmd::High(ENABLE_PIN)]) {
            Ok(()) => {
                self.set_state(DriveState::Enabled);
                info!("Drive enabled");
                Ok(())
            },
            Err(e) => Err(self.fail_safe(e.into()))
        }
    }

    /// Disable the drive, command zero speed and cut the amplifier power.
    ///
    /// Safe to call from any state. Every step is attempted even if an earlier one fails, and
    /// the first failure is returned. The drive is considered disabled regardless.
    pub fn disable(&mut self) -> Result<(), DriveError> {
        self.set_state(DriveState::Disabled);

        let enable_res = self.send(&[OutputCmd::Low(ENABLE_PIN)]);

        let zero = self.speed_encoder.encode(0.0);
        let zero_res = self.send(&zero.cmds);

        let relay_res = match self.params.power_relay_pin {
            Some(pin) => self.send(&[OutputCmd::Low(pin)]),
            None => Ok(())
        };

        enable_res.and(zero_res).and(relay_res)?;

        info!("Drive disabled");
        Ok(())
    }

    /// Command a speed in [-1, 1].
    ///
    /// A non-zero speed may only be commanded while the drive is enabled. Returns the command
    /// that was sent.
    pub fn set_speed(&mut self, speed: f64) -> Result<SpeedCommand, DriveError> {
        let cmd = self.speed_encoder.encode(speed);

        if self.state == DriveState::Disabled && cmd.speed != 0.0 {
            return Err(DriveError::NotEnabled)
        }

        match self.send(&cmd.cmds) {
            Ok(()) => Ok(cmd),
            Err(e) => Err(self.fail_safe(e.into()))
        }
    }

    // ---- SENSING ----

    /// Read and decode the current position of the axis.
    ///
    /// On failure the drive is disabled and the cached position is left untouched.
    pub fn read_position(&mut self) -> Result<Position, DriveError> {
        let line = match self.transport.read_line(&self.params.inputs_endpoint) {
            Ok(l) => l,
            Err(e) => return Err(self.fail_safe(
                DriveError::SensorFault(SensorFaultCause::Transport(e))
            ))
        };

        let reading = match self.encoder.read(&line, self.params.offset_deg) {
            Ok(r) => r,
            Err(e) => return Err(self.fail_safe(
                DriveError::SensorFault(SensorFaultCause::Decode(e))
            ))
        };

        let time = Utc::now();
        let ra_deg = self.clock
            .as_ref()
            .map(|c| wrap_360(c.local_sidereal_deg(time) - reading.hour_angle_deg));

        let position = Position {
            hour_angle_deg: reading.hour_angle_deg,
            raw_deg: reading.raw_deg,
            ordinal: reading.ordinal,
            ra_deg,
            time
        };

        self.last_position = Some(position);
        self.monitor.set_position(position);

        Ok(position)
    }

    /// Read back the state of the drive enable output.
    pub fn motor_status(&mut self) -> Result<MotorStatus, DriveError> {
        let lines = match self.transport.read_lines(&self.params.outputs_endpoint) {
            Ok(l) => l,
            Err(e) => return Err(self.fail_safe(
                DriveError::SensorFault(SensorFaultCause::Transport(e))
            ))
        };

        // The enable pin is the first output on the second line
        match lines.get(1).and_then(|l| l.trim().chars().next()) {
            Some('1') => Ok(MotorStatus::On),
            Some(_) => Ok(MotorStatus::Off),
            None => Err(self.fail_safe(
                DriveError::SensorFault(SensorFaultCause::Malformed(lines.join("\n")))
            ))
        }
    }

    // ---- MOTION ----

    /// Drive the axis to the target hour angle.
    ///
    /// The target is taken modulo 360 and normalised to (-180, 180] before the soft stops are
    /// checked, so 350 deg means -10 deg. Returns the converged position. The drive is disabled on
    /// every exit, successful or not.
    pub fn slew(&mut self, target_hour_angle_deg: f64) -> Result<Position, DriveError> {
        let target = wrap_180(target_hour_angle_deg);
        self.check_stops(target)?;

        info!("Slewing to {:.3} deg", target);

        let start = Instant::now();

        loop {
            let cycle_start = Instant::now();

            if self.stop.is_cancelled() {
                warn!("Slew to {:.3} deg stopped", target);
                return Err(self.fail_safe(DriveError::Cancelled))
            }

            if let Err(e) = self.check_stops(target) {
                return Err(self.fail_safe(e))
            }

            let pos = self.read_position()?;
            let diff = target - pos.hour_angle_deg;

            if diff.abs() <= self.params.convergence_threshold_deg {
                let zero_dac = self.speed_encoder.encode(0.0).dac;
                self.archive_cycle(target, &pos, diff, 0.0, zero_dac);
                self.disable()?;

                info!(
                    "Slew converged at {:.3} deg ({:.3} deg from target)",
                    pos.hour_angle_deg, diff
                );
                return Ok(pos)
            }

            if start.elapsed().as_secs_f64() > self.params.max_slew_duration_s {
                error!(
                    "Slew to {:.3} deg has not converged after {} s, axis at {:.3} deg",
                    target, self.params.max_slew_duration_s, pos.hour_angle_deg
                );
                return Err(self.fail_safe(DriveError::SlewTimeout(self.params.max_slew_duration_s)))
            }

            let speed = speed_law(diff, self.params.speed_exponent);

            self.enable()?;
            let cmd = self.set_speed(speed)?;

            debug!(
                "target {:.3} deg, position {:.3} deg, diff {:.3} deg, speed {:.4} (dac {})",
                target, pos.hour_angle_deg, diff, cmd.speed, cmd.dac
            );
            self.archive_cycle(target, &pos, diff, cmd.speed, cmd.dac);

            // The stop check at the top of the loop handles a cancelled wait
            let remaining = seconds_to_std(self.params.poll_interval_s)
                .checked_sub(cycle_start.elapsed());
            if let Some(r) = remaining {
                self.stop.sleep(r);
            }
        }
    }

    /// Slew to the meridian.
    pub fn park(&mut self) -> Result<Position, DriveError> {
        self.slew(0.0)
    }

    /// Check a target hour angle lies within the soft stops, which are themselves reachable.
    ///
    /// The target is taken modulo 360 and normalised to (-180, 180] first.
    pub fn check_stops(&self, target_hour_angle_deg: f64) -> Result<(), DriveError> {
        let target_deg = wrap_180(target_hour_angle_deg);
        let east = self.params.east_stop_deg;
        let west = self.params.west_stop_deg;

        if east <= target_deg && target_deg <= west {
            Ok(())
        }
        else {
            Err(DriveError::OutOfRange {
                target_deg,
                east_stop_deg: east,
                west_stop_deg: west
            })
        }
    }

    // ---- PRIVATE ----

    fn set_state(&mut self, state: DriveState) {
        self.state = state;
        self.monitor.set_state(state);
    }

    /// Disable the drive after a fault and hand the fault back to be returned.
    fn fail_safe(&mut self, err: DriveError) -> DriveError {
        match err {
            DriveError::Cancelled => (),
            ref e => error!("Drive fault: {}", e)
        }

        if let Err(e) = self.disable() {
            error!("Could not disable the drive after a fault: {}", e);
        }

        err
    }

    fn send(&mut self, cmds: &[OutputCmd]) -> Result<(), TransportError> {
        if log::log_enabled!(log::Level::Trace) {
            let tokens: Vec<String> = cmds.iter().map(|c| c.to_string()).collect();
            trace!("Sending [{}]", tokens.join(", "));
        }

        self.transport.send(cmds)
    }

    fn archive_cycle(&mut self, target_deg: f64, pos: &Position, diff_deg: f64, speed: f64, dac: u8) {
        let record = SlewRecord {
            time_s: session::get_elapsed_seconds(),
            target_deg,
            hour_angle_deg: pos.hour_angle_deg,
            ordinal: pos.ordinal,
            diff_deg,
            speed,
            dac
        };

        if let Err(e) = self.arch_slew.serialise(record) {
            warn!("Could not archive slew cycle: {}", e);
        }
    }
}

impl<T: Transport> Drop for DriveCtrl<T> {
    fn drop(&mut self) {
        if self.state == DriveState::Enabled {
            warn!("Drive dropped while enabled, disabling");

            if let Err(e) = self.disable() {
                error!("Could not disable the drive: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::VecDeque;

    /// Transport which replays scripted status lines and records every command.
    #[derive(Default)]
    struct Scripted {
        lines: VecDeque<Result<String, TransportError>>,
        outputs: Vec<String>,
        sent: Vec<OutputCmd>,
        fail_sends: bool,
    }

    impl Transport for Scripted {
        fn send(&mut self, cmds: &[OutputCmd]) -> Result<(), TransportError> {
            if self.fail_sends {
                return Err(TransportError::Simulated(String::from("send")))
            }
            self.sent.extend_from_slice(cmds);
            Ok(())
        }

        fn read_lines(&mut self, endpoint: &str) -> Result<Vec<String>, TransportError> {
            if endpoint == comms_if::netiom::OUTPUTS_ENDPOINT {
                return Ok(self.outputs.clone())
            }

            match self.lines.pop_front() {
                Some(r) => r.map(|l| vec![l]),
                None => Err(TransportError::EmptyResponse(endpoint.to_string()))
            }
        }
    }

    fn params() -> DriveParams {
        DriveParams {
            poll_interval_s: 0.001,
            enable_settle_s: 0.0,
            ..DriveParams::default()
        }
    }

    fn drive(lines: Vec<&str>) -> DriveCtrl<Scripted> {
        let transport = Scripted {
            lines: lines.into_iter().map(|l| Ok(l.to_string())).collect(),
            ..Scripted::default()
        };

        let mut d = DriveCtrl::with_default_codec(params(), transport).unwrap();
        d.transport_mut().sent.clear();
        d
    }

    #[test]
    fn test_construction_disables() {
        let d = DriveCtrl::with_default_codec(params(), Scripted::default()).unwrap();

        assert_eq!(d.state(), DriveState::Disabled);
        assert_eq!(d.transport().sent[0], OutputCmd::Low(ENABLE_PIN));
        // Followed by the zero speed write
        assert_eq!(d.transport().sent.len(), 12);
    }

    #[test]
    fn test_construction_checks_params() {
        let mut p = params();
        p.east_stop_deg = 5.0;
        assert!(matches!(
            DriveCtrl::with_default_codec(p, Scripted::default()),
            Err(DriveError::InvalidParams(_))
        ));

        let codec = Arc::new(GrayCodec::new(10).unwrap());
        assert!(matches!(
            DriveCtrl::new(params(), Scripted::default(), codec),
            Err(DriveError::InvalidParams(_))
        ));

        let mut p = params();
        p.bit_width = 30;
        assert!(DriveCtrl::with_default_codec(p, Scripted::default()).is_err());
    }

    #[test]
    fn test_enable_is_idempotent() {
        let mut d = drive(vec![]);

        d.enable().unwrap();
        d.enable().unwrap();

        assert_eq!(d.state(), DriveState::Enabled);
        assert_eq!(d.transport().sent, vec![OutputCmd::High(ENABLE_PIN)]);
    }

    #[test]
    fn test_power_relay_sequence() {
        let mut p = params();
        p.power_relay_pin = Some(12);

        let mut d = DriveCtrl::with_default_codec(p, Scripted::default()).unwrap();
        d.transport_mut().sent.clear();

        d.enable().unwrap();
        assert_eq!(
            d.transport().sent,
            vec![OutputCmd::High(12), OutputCmd::High(ENABLE_PIN)]
        );

        d.transport_mut().sent.clear();
        d.disable().unwrap();
        assert_eq!(d.transport().sent.first(), Some(&OutputCmd::Low(ENABLE_PIN)));
        assert_eq!(d.transport().sent.last(), Some(&OutputCmd::Low(12)));
    }

    #[test]
    fn test_relay_settle_is_waited_out() {
        let mut p = params();
        p.power_relay_pin = Some(12);
        p.enable_settle_s = 0.3;

        let mut d = DriveCtrl::with_default_codec(p, Scripted::default()).unwrap();
        d.transport_mut().sent.clear();

        let start = Instant::now();
        d.enable().unwrap();

        assert!(start.elapsed() >= std::time::Duration::from_millis(300));
        assert_eq!(d.state(), DriveState::Enabled);
        assert_eq!(
            d.transport().sent,
            vec![OutputCmd::High(12), OutputCmd::High(ENABLE_PIN)]
        );
    }

    #[test]
    fn test_slew_target_taken_modulo_360() {
        let d = drive(vec![]);

        assert!(d.check_stops(350.0).is_ok());
        assert!(d.check_stops(-350.0).is_ok());
        assert!(matches!(
            d.check_stops(240.0),
            Err(DriveError::OutOfRange { target_deg, .. }) if (target_deg + 120.0).abs() < 1e-9
        ));
    }

    #[test]
    fn test_cancel_during_settle() {
        let mut p = params();
        p.power_relay_pin = Some(12);
        p.enable_settle_s = 5.0;

        let mut d = DriveCtrl::with_default_codec(p, Scripted::default()).unwrap();
        d.stop_token().cancel();

        assert!(matches!(d.enable(), Err(DriveError::Cancelled)));
        assert_eq!(d.state(), DriveState::Disabled);
        assert!(!d.transport().sent.contains(&OutputCmd::High(ENABLE_PIN)));
    }

    #[test]
    fn test_set_speed_requires_enable() {
        let mut d = drive(vec![]);

        assert!(matches!(d.set_speed(0.5), Err(DriveError::NotEnabled)));
        assert!(d.transport().sent.is_empty());

        // Zero speed is always allowed
        assert_eq!(d.set_speed(0.0).unwrap().dac, 128);

        d.enable().unwrap();
        assert_eq!(d.set_speed(1.0).unwrap().dac, 0);
    }

    #[test]
    fn test_send_fault_disables() {
        let mut d = drive(vec![]);
        d.enable().unwrap();
        d.transport_mut().fail_sends = true;

        assert!(matches!(d.set_speed(0.5), Err(DriveError::IoFault(_))));
        assert_eq!(d.state(), DriveState::Disabled);

        // Disabling still reports the failure but leaves the state safe
        assert!(d.disable().is_err());
        assert_eq!(d.state(), DriveState::Disabled);
    }

    #[test]
    fn test_read_position() {
        let codec = GrayCodec::new(13).unwrap();
        let line: String = codec.encode(1024).unwrap().chars().rev().collect();

        let mut d = drive(vec![line.as_str(), "0000000000000"]);

        let pos = d.read_position().unwrap();
        assert_eq!(pos.ordinal, 1024);
        assert_eq!(pos.hour_angle_deg, 45.0);
        assert_eq!(pos.ra_deg, None);
        assert_eq!(d.last_position().map(|p| p.ordinal), Some(1024));

        d.set_sidereal_clock(Box::new(crate::ephem::Observer { longitude_deg: 0.0 }));
        let pos = d.read_position().unwrap();
        assert_eq!(pos.hour_angle_deg, 0.0);
        assert!(pos.ra_deg.is_some());
    }

    #[test]
    fn test_read_faults_keep_cached_position() {
        let mut d = drive(vec!["0000000000000", "00000000000x0"]);
        d.read_position().unwrap();
        d.enable().unwrap();

        assert!(matches!(
            d.read_position(),
            Err(DriveError::SensorFault(SensorFaultCause::Decode(_)))
        ));
        assert_eq!(d.state(), DriveState::Disabled);

        d.enable().unwrap();
        assert!(matches!(
            d.read_position(),
            Err(DriveError::SensorFault(SensorFaultCause::Transport(_)))
        ));
        assert_eq!(d.state(), DriveState::Disabled);

        assert_eq!(d.last_position().map(|p| p.ordinal), Some(0));
    }

    #[test]
    fn test_monitor_follows_drive() {
        let mut d = drive(vec!["0000000000000"]);
        let monitor = d.monitor();

        d.enable().unwrap();
        assert_eq!(monitor.snapshot().state, DriveState::Enabled);
        assert_eq!(monitor.snapshot().position, None);

        let pos = d.read_position().unwrap();
        d.disable().unwrap();

        let snap = monitor.snapshot();
        assert_eq!(snap.state, DriveState::Disabled);
        assert_eq!(snap.position, Some(pos));
    }

    #[test]
    fn test_motor_status() {
        let mut d = drive(vec![]);

        d.transport_mut().outputs = vec![String::from("00000000"), String::from("10000000")];
        assert_eq!(d.motor_status().unwrap(), MotorStatus::On);

        d.transport_mut().outputs = vec![String::from("00000000"), String::from("00000000")];
        assert_eq!(d.motor_status().unwrap(), MotorStatus::Off);

        d.transport_mut().outputs = vec![String::from("00000000")];
        assert!(matches!(
            d.motor_status(),
            Err(DriveError::SensorFault(SensorFaultCause::Malformed(_)))
        ));
    }

    #[test]
    fn test_slew_rejects_out_of_range() {
        let mut d = drive(vec![]);

        for target in &[150.0, -110.5, f64::NAN] {
            assert!(matches!(d.slew(*target), Err(DriveError::OutOfRange { .. })));
        }
        assert!(d.transport().sent.is_empty());

        // The stops themselves are reachable
        assert!(d.check_stops(110.0).is_ok());
        assert!(d.check_stops(-110.0).is_ok());
    }

    #[test]
    fn test_slew_already_converged() {
        let mut d = drive(vec!["0000000000000"]);

        let pos = d.slew(0.1).unwrap();

        assert_eq!(pos.hour_angle_deg, 0.0);
        assert_eq!(d.state(), DriveState::Disabled);
        assert!(!d.transport().sent.contains(&OutputCmd::High(ENABLE_PIN)));
    }

    #[test]
    fn test_slew_cancelled() {
        let mut d = drive(vec!["0000000000000"]);
        d.stop_token().cancel();

        assert!(matches!(d.slew(45.0), Err(DriveError::Cancelled)));
        assert_eq!(d.state(), DriveState::Disabled);
    }
}
