//! # Ephemeris module
//!
//! The drive works in hour angle. This module provides the target hour angle to the tracker and
//! the local sidereal time used to turn a measured hour angle back into a right ascension.
//!
//! Sidereal time uses the linear GMST expression, accurate to well under a tenth of a degree over
//! decades, which is far below the drive's pointing resolution.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::Deserialize;
use util::maths::{wrap_180, wrap_360};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Julian date of the Unix epoch.
const JD_UNIX_EPOCH: f64 = 2_440_587.5;

/// Julian date of J2000.0.
const JD_J2000: f64 = 2_451_545.0;

/// GMST at J2000.0.
///
/// Units: degrees
const GMST_J2000_DEG: f64 = 280.460_618_37;

/// Sidereal rotation per solar day.
///
/// Units: degrees/day
const SIDEREAL_RATE_DEG_PER_DAY: f64 = 360.985_647_366_29;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something the tracker can follow.
pub trait TargetProvider {
    /// Human readable name of the target.
    fn name(&self) -> &str;

    /// Hour angle of the target at the given time, in the range (-180, 180].
    fn hour_angle_deg(&self, at: DateTime<Utc>) -> Result<f64, EphemError>;
}

/// Source of local sidereal time.
pub trait SiderealClock {
    /// Local sidereal time at the given instant, in the range [0, 360).
    fn local_sidereal_deg(&self, at: DateTime<Utc>) -> f64;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A fixed observing site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    /// East longitude of the site.
    ///
    /// Units: degrees
    pub longitude_deg: f64,
}

/// A target at a fixed right ascension, for example a pulsar.
#[derive(Debug, Clone)]
pub struct SiderealTarget {
    name: String,
    ra_deg: f64,
    observer: Observer,
}

/// A target held at a constant hour angle.
#[derive(Debug, Clone)]
pub struct FixedHourAngle {
    name: String,
    hour_angle_deg: f64,
}

/// Target parameters as found in the executive's parameter file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetParams {
    /// Name of the target.
    pub name: String,

    /// Right ascension as `hh:mm:ss.s`.
    pub ra_hms: String,

    /// Observer east longitude as `[-]dd:mm:ss.s`.
    pub longitude_dms: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EphemError {
    #[error("Cannot parse {0:?} as a sexagesimal angle")]
    InvalidSexagesimal(String),

    #[error("Computed a non-finite hour angle for {0}")]
    NonFinite(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SiderealClock for Observer {
    fn local_sidereal_deg(&self, at: DateTime<Utc>) -> f64 {
        wrap_360(gmst_deg(at) + self.longitude_deg)
    }
}

impl SiderealTarget {
    pub fn new(name: &str, ra_deg: f64, observer: Observer) -> Self {
        Self {
            name: name.to_string(),
            ra_deg,
            observer
        }
    }

    /// Build a target from parameters.
    pub fn from_params(params: &TargetParams) -> Result<Self, EphemError> {
        let ra_deg = parse_sexagesimal(&params.ra_hms)? * 15.0;
        let longitude_deg = parse_sexagesimal(&params.longitude_dms)?;

        Ok(Self::new(&params.name, ra_deg, Observer { longitude_deg }))
    }

    pub fn ra_deg(&self) -> f64 {
        self.ra_deg
    }

    pub fn observer(&self) -> Observer {
        self.observer
    }
}

impl TargetProvider for SiderealTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn hour_angle_deg(&self, at: DateTime<Utc>) -> Result<f64, EphemError> {
        let ha = wrap_180(self.observer.local_sidereal_deg(at) - self.ra_deg);

        if ha.is_finite() {
            Ok(ha)
        }
        else {
            Err(EphemError::NonFinite(self.name.clone()))
        }
    }
}

impl FixedHourAngle {
    pub fn new(name: &str, hour_angle_deg: f64) -> Self {
        Self {
            name: name.to_string(),
            hour_angle_deg
        }
    }
}

impl TargetProvider for FixedHourAngle {
    fn name(&self) -> &str {
        &self.name
    }

    fn hour_angle_deg(&self, _at: DateTime<Utc>) -> Result<f64, EphemError> {
        if self.hour_angle_deg.is_finite() {
            Ok(wrap_180(self.hour_angle_deg))
        }
        else {
            Err(EphemError::NonFinite(self.name.clone()))
        }
    }
}

impl Default for TargetParams {
    fn default() -> Self {
        // The Crab pulsar from Acre Road observatory
        Self {
            name: String::from("Crab pulsar"),
            ra_hms: String::from("05:34:31.97"),
            longitude_dms: String::from("-4:18:25.93"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Greenwich mean sidereal time, in the range [0, 360).
pub fn gmst_deg(at: DateTime<Utc>) -> f64 {
    let unix_s = at.timestamp() as f64 + at.timestamp_subsec_nanos() as f64 * 1e-9;
    let jd = unix_s / 86_400.0 + JD_UNIX_EPOCH;

    wrap_360(GMST_J2000_DEG + SIDEREAL_RATE_DEG_PER_DAY * (jd - JD_J2000))
}

/// Parse a sexagesimal value such as `05:34:31.97` or `-4:18:25.93` into decimal units of the
/// leading field. Minutes and seconds are optional.
pub fn parse_sexagesimal(value: &str) -> Result<f64, EphemError> {
    let invalid = || EphemError::InvalidSexagesimal(value.to_string());

    let trimmed = value.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed))
    };

    let fields: Vec<&str> = body.split(':').collect();
    if fields.is_empty() || fields.len() > 3 {
        return Err(invalid())
    }

    let mut total = 0.0;
    let mut scale = 1.0;
    for (i, field) in fields.iter().enumerate() {
        let v: f64 = field.parse().map_err(|_| invalid())?;

        // Minutes and seconds must be proper sub-units
        if !v.is_finite() || v < 0.0 || (i > 0 && v >= 60.0) {
            return Err(invalid())
        }

        total += v / scale;
        scale *= 60.0;
    }

    Ok(if negative { -total } else { total })
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    #[test]
    fn test_gmst() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(gmst_deg(j2000), 280.46061837, epsilon = 1e-6);

        let next_day = Utc.with_ymd_and_hms(2000, 1, 2, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(gmst_deg(next_day), 281.44626574, epsilon = 1e-6);
    }

    #[test]
    fn test_parse_sexagesimal() {
        assert_abs_diff_eq!(parse_sexagesimal("05:34:31.97").unwrap(), 5.575547, epsilon = 1e-6);
        assert_abs_diff_eq!(parse_sexagesimal("-4:18:25.93").unwrap(), -4.307203, epsilon = 1e-6);
        assert_abs_diff_eq!(parse_sexagesimal("22").unwrap(), 22.0);
        assert_abs_diff_eq!(parse_sexagesimal("+1:30").unwrap(), 1.5);

        for bad in &["", "ab:cd", "1:60:00", "1:2:3:4", "1:-2"] {
            assert!(parse_sexagesimal(bad).is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_sidereal_target_hour_angle() {
        let at = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let observer = Observer { longitude_deg: -4.307203 };
        let lst = observer.local_sidereal_deg(at);

        // A target on the meridian has zero hour angle
        let on_meridian = SiderealTarget::new("meridian", lst, observer);
        assert_abs_diff_eq!(on_meridian.hour_angle_deg(at).unwrap(), 0.0, epsilon = 1e-9);

        // An hour of sidereal time later it is 15 deg west
        let later = at + chrono::Duration::seconds(3590);
        let ha = on_meridian.hour_angle_deg(later).unwrap();
        assert_abs_diff_eq!(ha, 15.0, epsilon = 0.01);
    }

    #[test]
    fn test_from_params() {
        let target = SiderealTarget::from_params(&TargetParams::default()).unwrap();

        assert_eq!(target.name(), "Crab pulsar");
        assert_abs_diff_eq!(target.ra_deg(), 83.633208, epsilon = 1e-5);
        assert_abs_diff_eq!(target.observer().longitude_deg, -4.307203, epsilon = 1e-6);
    }

    #[test]
    fn test_fixed_hour_angle() {
        let t = FixedHourAngle::new("hold", 190.0);
        assert_abs_diff_eq!(t.hour_angle_deg(Utc::now()).unwrap(), -170.0);

        let t = FixedHourAngle::new("bad", f64::NAN);
        assert!(t.hour_angle_deg(Utc::now()).is_err());
    }
}
