//! GPS week/TOW conversions on top of `hifitime::Epoch` (§3, §4.5).
//!
//! Every function here takes its reference instant as an explicit
//! parameter rather than sampling the wall clock, so callers (and tests)
//! control time instead of the other way around.

use hifitime::Epoch;

/// Seconds in a GPS week, used for the half-week ambiguity resolution in
/// Keplerian ephemeris propagation (§4.4.1).
pub const SECONDS_PER_WEEK: f64 = 604_800.0;

/// Build a UTC `Epoch` from a GPS week number and time-of-week in seconds.
/// `hifitime` already tracks the GPS leap-second table internally.
pub fn gps_to_utc(week: u32, tow_s: f64) -> Epoch {
    Epoch::from_gpst_seconds(week as f64 * SECONDS_PER_WEEK + tow_s)
}

/// Decompose a UTC `Epoch` back into (GPS week, time-of-week).
pub fn utc_to_gps(epoch: Epoch) -> (u32, f64) {
    let total = epoch.to_gpst_seconds();
    let week = (total / SECONDS_PER_WEEK).floor();
    let tow = total - week * SECONDS_PER_WEEK;
    (week as u32, tow)
}

/// GPS week number current as of `now`.
pub fn current_gps_week(now: Epoch) -> u32 {
    utc_to_gps(now).0
}

/// Day of the GPS week (0 = Sunday 00:00:00 GPST) for `now`.
pub fn gps_day_of_week(now: Epoch) -> u32 {
    let (_, tow) = utc_to_gps(now);
    (tow / 86_400.0).floor() as u32
}

/// Resolve the half-week ambiguity between an ephemeris reference time of
/// week `toe_s` and an observation time of week `t_s`, both assumed to fall
/// within the same or an adjacent GPS week (§4.4.1 `wrap_half_week`).
pub fn wrap_half_week(t_s: f64, toe_s: f64) -> f64 {
    let mut dt = t_s - toe_s;
    if dt > SECONDS_PER_WEEK / 2.0 {
        dt -= SECONDS_PER_WEEK;
    } else if dt < -SECONDS_PER_WEEK / 2.0 {
        dt += SECONDS_PER_WEEK;
    }
    dt
}
