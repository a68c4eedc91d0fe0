//! Drive control scenarios run against the simulated mount.

use std::{sync::Arc, thread, time::Duration};
use approx::assert_abs_diff_eq;

use comms_if::netiom::OutputCmd;
use drive_lib::{
    drive::{DriveCtrl, DriveError, DriveParams, DriveState, MotorStatus, SensorFaultCause, ENABLE_PIN},
    ephem::Observer,
    gray::GrayCodec,
    sim::{FaultPlan, SimMount, SimParams},
};
use util::archive::Archiver;

fn fast_params() -> DriveParams {
    DriveParams {
        poll_interval_s: 0.001,
        enable_settle_s: 0.0,
        ..DriveParams::default()
    }
}

fn drive_at(hour_angle_deg: f64, params: DriveParams) -> DriveCtrl<SimMount> {
    let codec = Arc::new(GrayCodec::new(params.bit_width).unwrap());
    let sim = SimMount::new(
        SimParams {
            initial_hour_angle_deg: hour_angle_deg,
            offset_deg: params.offset_deg,
            ..SimParams::default()
        },
        codec.clone()
    );

    DriveCtrl::new(params, sim, codec).unwrap()
}

#[test]
fn out_of_range_target_sends_nothing() {
    let mut drive = drive_at(0.0, fast_params());
    drive.transport_mut().clear_log();

    match drive.slew(150.0) {
        Err(DriveError::OutOfRange { target_deg, east_stop_deg, west_stop_deg }) => {
            assert_eq!(target_deg, 150.0);
            assert_eq!(east_stop_deg, -110.0);
            assert_eq!(west_stop_deg, 110.0);
        },
        r => panic!("expected OutOfRange, got {:?}", r.map(|p| p.hour_angle_deg))
    }

    assert!(drive.transport().log().is_empty());
    assert_eq!(drive.transport().reads(), 0);
    assert_eq!(drive.state(), DriveState::Disabled);
}

#[test]
fn small_move_converges_in_one_iteration() {
    let mut drive = drive_at(10.0, fast_params());

    let pos = drive.slew(10.1).unwrap();

    assert!((pos.hour_angle_deg - 10.1).abs() <= 0.2);
    assert_eq!(drive.transport().reads(), 1);
    assert_eq!(drive.state(), DriveState::Disabled);
    assert!(!drive.transport().enabled());
}

#[test]
fn slew_converges_from_either_side() {
    for &(start, target) in &[(-60.0, 45.0), (100.0, -100.0), (30.0, 0.0), (-109.0, 109.0)] {
        let mut drive = drive_at(start, fast_params());

        let pos = drive.slew(target).unwrap();

        assert!(
            (pos.hour_angle_deg - target).abs() <= 0.2,
            "slew from {} to {} ended at {}", start, target, pos.hour_angle_deg
        );
        assert_eq!(drive.state(), DriveState::Disabled);
        assert!(!drive.transport().enabled());
        assert_eq!(drive.transport().dac(), 128);
        assert!(drive.transport().reads() > 1);
    }
}

#[test]
fn older_speed_exponent_also_converges() {
    let mut drive = drive_at(0.0, DriveParams { speed_exponent: 0.3, ..fast_params() });

    let pos = drive.slew(45.0).unwrap();

    assert_abs_diff_eq!(pos.hour_angle_deg, 45.0, epsilon = 0.2);
}

#[test]
fn park_returns_to_meridian() {
    let mut drive = drive_at(-75.0, fast_params());

    let pos = drive.park().unwrap();

    assert_abs_diff_eq!(pos.hour_angle_deg, 0.0, epsilon = 0.2);
    assert_eq!(drive.last_position(), Some(pos));
}

#[test]
fn read_fault_on_third_poll_disables() {
    let mut drive = drive_at(0.0, fast_params());
    drive.transport_mut().set_read_faults(FaultPlan::Nth(3));

    let res = drive.slew(45.0);

    assert!(matches!(
        res,
        Err(DriveError::SensorFault(SensorFaultCause::Transport(_)))
    ));
    assert_eq!(drive.transport().reads(), 3);
    assert_eq!(drive.state(), DriveState::Disabled);
    assert!(!drive.transport().enabled());
    assert_eq!(drive.transport().log().last(), Some(&OutputCmd::Low(10)));
}

#[test]
fn send_fault_disables() {
    let mut drive = drive_at(0.0, fast_params());

    // Construction sent two batches, the slew enables then fails writing the speed
    drive.transport_mut().set_send_faults(FaultPlan::Nth(4));

    assert!(matches!(drive.slew(45.0), Err(DriveError::IoFault(_))));
    assert_eq!(drive.state(), DriveState::Disabled);
    assert!(!drive.transport().enabled());
}

#[test]
fn stalled_axis_times_out() {
    let params = DriveParams { max_slew_duration_s: 0.05, ..fast_params() };
    let codec = Arc::new(GrayCodec::new(13).unwrap());
    let sim = SimMount::new(
        SimParams { max_rate_deg_per_poll: 0.0, ..SimParams::default() },
        codec.clone()
    );
    let mut drive = DriveCtrl::new(params, sim, codec).unwrap();

    assert!(matches!(drive.slew(45.0), Err(DriveError::SlewTimeout(_))));
    assert_eq!(drive.state(), DriveState::Disabled);
    assert!(!drive.transport().enabled());
}

#[test]
fn manual_stop_preempts_slew() {
    let params = DriveParams { max_slew_duration_s: 60.0, ..fast_params() };
    let codec = Arc::new(GrayCodec::new(13).unwrap());
    let sim = SimMount::new(
        SimParams { max_rate_deg_per_poll: 0.0, ..SimParams::default() },
        codec.clone()
    );
    let mut drive = DriveCtrl::new(params, sim, codec).unwrap();
    let stop = drive.stop_token();

    let handle = thread::spawn(move || {
        let res = drive.slew(45.0);
        (res, drive)
    });

    thread::sleep(Duration::from_millis(50));
    stop.cancel();

    let (res, drive) = handle.join().unwrap();
    assert!(matches!(res, Err(DriveError::Cancelled)));
    assert_eq!(drive.state(), DriveState::Disabled);
    assert!(!drive.transport().enabled());

    // The token stays cancelled until reset
    let mut drive = drive;
    assert!(matches!(drive.slew(10.0), Err(DriveError::Cancelled)));
    stop.reset();
    drive.transport_mut().set_hour_angle_deg(10.0);
    assert!(drive.slew(10.0).is_ok());
}

#[test]
fn motor_status_follows_enable() {
    let mut drive = drive_at(0.0, fast_params());
    assert_eq!(drive.motor_status().unwrap(), MotorStatus::Off);

    drive.enable().unwrap();
    assert!(drive.transport().pin(ENABLE_PIN));
    assert_eq!(drive.motor_status().unwrap(), MotorStatus::On);

    drive.disable().unwrap();
    assert_eq!(drive.motor_status().unwrap(), MotorStatus::Off);
}

#[test]
fn offset_is_applied() {
    let params = DriveParams { offset_deg: 30.0, ..fast_params() };
    let mut drive = drive_at(20.0, params);

    let pos = drive.read_position().unwrap();
    assert_abs_diff_eq!(pos.hour_angle_deg, 20.0, epsilon = 0.05);
    assert_abs_diff_eq!(pos.raw_deg, 50.0, epsilon = 0.05);
}

#[test]
fn positions_carry_right_ascension() {
    let mut drive = drive_at(15.0, fast_params());
    drive.set_sidereal_clock(Box::new(Observer { longitude_deg: -4.307 }));

    let pos = drive.read_position().unwrap();
    let ra = pos.ra_deg.unwrap();

    assert!(ra >= 0.0 && ra < 360.0);
}

#[test]
fn calibration_table_drives_the_mount() {
    let generated = GrayCodec::new(13).unwrap();
    let mut table = Vec::new();
    generated.write_calibration(&mut table).unwrap();

    let codec = Arc::new(GrayCodec::from_calibration(&table[..], 13).unwrap());
    assert_eq!(*codec, generated);

    let sim = SimMount::new(
        SimParams { initial_hour_angle_deg: -20.0, ..SimParams::default() },
        codec.clone()
    );
    let mut drive = DriveCtrl::new(fast_params(), sim, codec).unwrap();

    assert_abs_diff_eq!(drive.slew(20.0).unwrap().hour_angle_deg, 20.0, epsilon = 0.2);
}

#[test]
fn slew_cycles_are_archived() {
    let path = std::env::temp_dir().join(format!("pt_slew_arch_{}.csv", std::process::id()));

    let mut drive = drive_at(0.0, fast_params());
    drive.set_archive(Archiver::from_file_path(&path).unwrap());
    drive.slew(10.0).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some("time_s,target_deg,hour_angle_deg,ordinal,diff_deg,speed,dac")
    );
    assert_eq!(lines.count() as u64, drive.transport().reads());

    std::fs::remove_file(&path).ok();
}
