//! GPS/Galileo/BeiDou broadcast Keplerian ephemeris and propagation (§3,
//! §4.4.1), grounded on the WGS84 two-body-plus-second-harmonic model.

use crate::time::wrap_half_week;
use crate::types::SatKey;

/// Earth's gravitational constant for GPS/Galileo/BeiDou, m^3/s^2.
pub const GM_WGS84: f64 = 3.986005e14;
/// WGS84 Earth rotation rate, rad/s.
pub const WE_WGS84: f64 = 7.2921151467e-5;

/// BeiDou's ICD specifies its own Earth rotation rate, distinct from
/// WGS84's. It is kept here as a documented, unused-by-default constant:
/// this propagator applies `WE_WGS84` uniformly to GPS/Galileo/BeiDou,
/// since the discrepancy (on the order of 1e-10 rad/s) is well under the
/// position error this engine otherwise tolerates. A deployment that needs
/// BDS-ICD fidelity can switch `propagate`'s `we` selection on `eph.sat.sys`.
pub const EARTH_ROTATION_RATE_WGS84: f64 = WE_WGS84;
pub const EARTH_ROTATION_RATE_BDS_ICD: f64 = 7.2921150e-5;

/// One broadcast Keplerian ephemeris set, angles in radians (already
/// converted from the semi-circle units RTCM transmits on the wire).
#[derive(Debug, Clone, Copy)]
pub struct KeplerEphemeris {
    pub sat: SatKey,
    pub toe_s: f64,
    pub sqrt_a: f64,
    pub delta_n: f64,
    pub m0: f64,
    pub ecc: f64,
    pub omega: f64,
    pub cuc: f64,
    pub cus: f64,
    pub crc: f64,
    pub crs: f64,
    pub cic: f64,
    pub cis: f64,
    pub i0: f64,
    pub idot: f64,
    pub omega0: f64,
    pub omega_dot: f64,
}

/// Propagate `eph` to GPS time-of-week `t_s`, returning (ECEF position
/// meters, ECEF velocity m/s).
pub fn propagate(eph: &KeplerEphemeris, t_s: f64) -> ([f64; 3], [f64; 3]) {
    let gm = GM_WGS84;
    let we = WE_WGS84;

    let a = eph.sqrt_a * eph.sqrt_a;
    let tk = wrap_half_week(t_s, eph.toe_s);

    let n0 = (gm / a.powi(3)).sqrt();
    let n = n0 + eph.delta_n;

    let mut m = eph.m0 + n * tk;
    m = m.rem_euclid(2.0 * std::f64::consts::PI);

    // Kepler's equation, fixed-point iteration (§4.4.1).
    let mut e = m;
    for _ in 0..10 {
        let e_old = e;
        e = m + eph.ecc * e.sin();
        let de = (e - e_old).rem_euclid(2.0 * std::f64::consts::PI);
        if de.abs() < 1e-12 {
            break;
        }
    }
    e = e.rem_euclid(2.0 * std::f64::consts::PI);

    let v = ((1.0 - eph.ecc * eph.ecc).sqrt() * e.sin()).atan2(e.cos() - eph.ecc);

    let u0 = (v + eph.omega).rem_euclid(2.0 * std::f64::consts::PI);
    let u = u0 + eph.cuc * (2.0 * u0).cos() + eph.cus * (2.0 * u0).sin();

    let r = a * (1.0 - eph.ecc * e.cos()) + eph.crc * (2.0 * u0).cos() + eph.crs * (2.0 * u0).sin();
    let i = eph.i0 + eph.idot * tk + eph.cic * (2.0 * u0).cos() + eph.cis * (2.0 * u0).sin();

    let mut omega = eph.omega0 + (eph.omega_dot - we) * tk - we * eph.toe_s;
    omega = omega.rem_euclid(2.0 * std::f64::consts::PI);

    let x1 = u.cos() * r;
    let y1 = u.sin() * r;

    let pos = [
        x1 * omega.cos() - y1 * i.cos() * omega.sin(),
        x1 * omega.sin() + y1 * i.cos() * omega.cos(),
        y1 * i.sin(),
    ];

    // Velocity (analytic derivative of the above, §4.4.1).
    let e_help = 1.0 / (1.0 - eph.ecc * e.cos());
    let dot_v = (((1.0 + eph.ecc) / (1.0 - eph.ecc)).sqrt() / (e / 2.0).cos().powi(2))
        / (1.0 + (v / 2.0).tan().powi(2))
        * e_help
        * n;

    let dot_u = dot_v + (-eph.cuc * (2.0 * u0).sin() + eph.cus * (2.0 * u0).cos()) * 2.0 * dot_v;
    let dot_om = eph.omega_dot - we;
    let dot_i = eph.idot + (-eph.cic * (2.0 * u0).sin() + eph.cis * (2.0 * u0).cos()) * 2.0 * dot_v;
    let dot_r = a * eph.ecc * e.sin() * e_help * n
        + (-eph.crc * (2.0 * u0).sin() + eph.crs * (2.0 * u0).cos()) * 2.0 * dot_v;

    let dot_x1 = dot_r * u.cos() - r * u.sin() * dot_u;
    let dot_y1 = dot_r * u.sin() + r * u.cos() * dot_u;

    let vel = [
        omega.cos() * dot_x1
            - i.cos() * omega.sin() * dot_y1
            - x1 * omega.sin() * dot_om
            - y1 * i.cos() * omega.cos() * dot_om
            + y1 * i.sin() * omega.sin() * dot_i,
        omega.sin() * dot_x1
            + i.cos() * omega.cos() * dot_y1
            + x1 * omega.cos() * dot_om
            - y1 * i.cos() * omega.sin() * dot_om
            - y1 * i.sin() * omega.cos() * dot_i,
        i.sin() * dot_y1 + y1 * i.cos() * dot_i,
    ];

    (pos, vel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SatKey;

    fn sample_eph() -> KeplerEphemeris {
        // Roughly representative GPS broadcast values, circular-ish orbit.
        KeplerEphemeris {
            sat: SatKey::new('G', 1),
            toe_s: 259_200.0,
            sqrt_a: 5153.7,
            delta_n: 4.3e-9,
            m0: 0.5,
            ecc: 0.01,
            omega: 1.0,
            cuc: 1e-6,
            cus: 1e-6,
            crc: 200.0,
            crs: 5.0,
            cic: 1e-7,
            cis: 1e-7,
            i0: 0.96,
            idot: 1e-10,
            omega0: 2.0,
            omega_dot: -8.0e-9,
        }
    }

    #[test]
    fn propagated_position_is_near_orbital_radius() {
        let eph = sample_eph();
        let (pos, _vel) = propagate(&eph, eph.toe_s);
        let r = (pos[0] * pos[0] + pos[1] * pos[1] + pos[2] * pos[2]).sqrt();
        // sqrt_a^2 ~= semi-major axis; circular-ish orbit should match closely.
        let a = eph.sqrt_a * eph.sqrt_a;
        assert!((r - a).abs() < a * 0.05);
    }

    #[test]
    fn propagation_is_continuous_across_toe() {
        let eph = sample_eph();
        let (p1, _) = propagate(&eph, eph.toe_s - 1.0);
        let (p2, _) = propagate(&eph, eph.toe_s + 1.0);
        let dist = ((p1[0] - p2[0]).powi(2) + (p1[1] - p2[1]).powi(2) + (p1[2] - p2[2]).powi(2))
            .sqrt();
        // orbital velocity ~3.9 km/s, 2s span should move a few km, not thousands.
        assert!(dist < 20_000.0);
    }
}
