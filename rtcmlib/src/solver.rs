//! Weighted iterative least-squares Single-Point-Positioning solver (§4.8).

use nalgebra::{DMatrix, DVector};

use crate::error::SolverError;
use crate::geometry::{ecef_to_geodetic, rot_ecef_to_enu};
use crate::types::EpochObservation;

const CLIGHT: f64 = 299_792_458.0;
const MAX_ITERATIONS: usize = 10;
const CONVERGENCE_THRESHOLD_M: f64 = 1e-4;
const TIKHONOV_LAMBDA: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightMode {
    Equal,
    Elevation,
    Snr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    Fixed,
    Uncertain,
    NoFix,
}

#[derive(Debug, Clone)]
pub struct Dop {
    pub gdop: f64,
    pub pdop: f64,
    pub hdop: f64,
    pub vdop: f64,
    pub tdop: f64,
}

/// One epoch's SPP solution, ported from `PositioningSolution` with the
/// per-epoch iteration/timing metadata it carries.
#[derive(Debug, Clone)]
pub struct PositioningSolution {
    pub gps_tow_s: f64,
    pub ecef_m: [f64; 3],
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub height_m: f64,
    pub clock_bias_m: f64,
    pub std_north_m: f64,
    pub std_east_m: f64,
    pub std_up_m: f64,
    pub std_clock_m: f64,
    pub dop: Dop,
    pub num_satellites: usize,
    pub variance_unit_weight: f64,
    pub convergence: bool,
    pub status: SolutionStatus,
    pub num_iterations: usize,
    pub processing_time_ms: f64,
}

struct Observation {
    sat_pos_ecef_m: [f64; 3],
    pseudorange_m: f64,
    elevation_deg: f64,
    snr_dbhz: f64,
}

/// Gather the usable pseudorange observations of an epoch: elevation above
/// the cutoff, satellite position known, and at least one valid
/// pseudorange per satellite (§4.8 observation gating).
fn extract_observations(epoch: &EpochObservation, cutoff_elevation_deg: f64) -> Vec<Observation> {
    let mut out = Vec::new();
    for sat in epoch.satellites.values() {
        let Some(pos) = sat.pos_ecef_m else { continue };
        let Some(elevation) = sat.elevation_deg else { continue };
        if elevation < cutoff_elevation_deg {
            continue;
        }

        let mut best: Option<(f64, f64)> = None;
        for sig in sat.signals.values() {
            if sig.pseudorange_m > 0.0 {
                best = Some((sig.pseudorange_m, sig.snr_dbhz));
                break;
            }
        }
        let Some((pseudorange_m, snr_dbhz)) = best else { continue };

        out.push(Observation {
            sat_pos_ecef_m: pos,
            pseudorange_m,
            elevation_deg: elevation,
            snr_dbhz,
        });
    }
    out
}

fn weight_for(mode: WeightMode, obs: &Observation) -> f64 {
    match mode {
        WeightMode::Equal => 1.0,
        WeightMode::Elevation => {
            let sin_el = obs.elevation_deg.to_radians().sin();
            if sin_el > 0.0 {
                1.0 / (sin_el * sin_el)
            } else {
                1.0
            }
        }
        WeightMode::Snr => {
            // Smoothstep in [30, 45] dB-Hz: flat (low weight) below 30,
            // flat (high weight) above 45, monotone increasing between.
            let t = ((obs.snr_dbhz - 30.0) / 15.0).clamp(0.0, 1.0);
            let smooth = t * t * (3.0 - 2.0 * t);
            1.0 + 9.0 * smooth
        }
    }
}

/// Run the iterative WLS-SPP solve for one merged epoch.
pub fn solve(
    epoch: &EpochObservation,
    approx_position_m: [f64; 3],
    cutoff_elevation_deg: f64,
    min_satellites: usize,
    weight_mode: WeightMode,
    elapsed_ms: f64,
) -> Result<PositioningSolution, SolverError> {
    let observations = extract_observations(epoch, cutoff_elevation_deg);
    if observations.len() < min_satellites {
        return Err(SolverError::InsufficientSatellites {
            have: observations.len(),
            min_satellites,
        });
    }

    let n = observations.len();
    let mut pos = approx_position_m;
    let mut clock_bias_m = 0.0;
    let mut convergence = false;
    let mut num_iterations = 0;

    for iter in 0..MAX_ITERATIONS {
        num_iterations = iter + 1;
        let mut a = DMatrix::<f64>::zeros(n, 4);
        let mut b = DVector::<f64>::zeros(n);
        let mut w = DMatrix::<f64>::zeros(n, n);

        for (i, obs) in observations.iter().enumerate() {
            let dr = [
                obs.sat_pos_ecef_m[0] - pos[0],
                obs.sat_pos_ecef_m[1] - pos[1],
                obs.sat_pos_ecef_m[2] - pos[2],
            ];
            let rho = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

            if rho > 0.0 {
                a[(i, 0)] = -dr[0] / rho;
                a[(i, 1)] = -dr[1] / rho;
                a[(i, 2)] = -dr[2] / rho;
            }
            a[(i, 3)] = 1.0;

            let pr_computed = rho + clock_bias_m;
            b[i] = obs.pseudorange_m - pr_computed;

            w[(i, i)] = weight_for(weight_mode, obs);
        }

        let at = a.transpose();
        let mut at_w_a = &at * &w * &a;
        let at_w_b = &at * &w * &b;
        for i in 0..4 {
            at_w_a[(i, i)] += TIKHONOV_LAMBDA;
        }

        let solved = at_w_a.clone().lu().solve(&at_w_b).ok_or(SolverError::Degenerate)?;

        pos[0] += solved[0];
        pos[1] += solved[1];
        pos[2] += solved[2];
        clock_bias_m += solved[3];

        let pos_change = (solved[0] * solved[0] + solved[1] * solved[1] + solved[2] * solved[2]).sqrt();
        if pos_change < CONVERGENCE_THRESHOLD_M {
            convergence = true;
            break;
        }
    }

    // Final residuals, covariance, and DOP with the converged geometry.
    let mut a = DMatrix::<f64>::zeros(n, 4);
    let mut w = DMatrix::<f64>::zeros(n, n);
    let mut residuals = Vec::with_capacity(n);

    for (i, obs) in observations.iter().enumerate() {
        let dr = [
            obs.sat_pos_ecef_m[0] - pos[0],
            obs.sat_pos_ecef_m[1] - pos[1],
            obs.sat_pos_ecef_m[2] - pos[2],
        ];
        let rho = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
        if rho > 0.0 {
            a[(i, 0)] = -dr[0] / rho;
            a[(i, 1)] = -dr[1] / rho;
            a[(i, 2)] = -dr[2] / rho;
        }
        a[(i, 3)] = 1.0;
        residuals.push(obs.pseudorange_m - (rho + clock_bias_m));
        w[(i, i)] = weight_for(weight_mode, obs);
    }

    let variance_unit_weight = if n > 4 {
        residuals.iter().map(|r| r * r).sum::<f64>() / (n as f64 - 4.0)
    } else {
        0.0
    };

    let at = a.transpose();
    let mut at_w_a = &at * &w * &a;
    for i in 0..4 {
        at_w_a[(i, i)] += TIKHONOV_LAMBDA;
    }
    let cov = at_w_a
        .clone()
        .try_inverse()
        .map(|inv| inv * variance_unit_weight)
        .unwrap_or_else(|| DMatrix::zeros(4, 4));

    let std_clock_m = cov[(3, 3)].max(0.0).sqrt();

    let geo = ecef_to_geodetic(pos);
    let rot = rot_ecef_to_enu(geo.lat_deg, geo.lon_deg);
    let cov3 = cov.fixed_view::<3, 3>(0, 0).into_owned();
    let r = nalgebra::Matrix3::new(
        rot[0][0], rot[0][1], rot[0][2],
        rot[1][0], rot[1][1], rot[1][2],
        rot[2][0], rot[2][1], rot[2][2],
    );
    let cov_enu = r * cov3 * r.transpose();
    let std_east_m = cov_enu[(0, 0)].max(0.0).sqrt();
    let std_north_m = cov_enu[(1, 1)].max(0.0).sqrt();
    let std_up_m = cov_enu[(2, 2)].max(0.0).sqrt();

    let q = if variance_unit_weight > 0.0 {
        cov.clone() / variance_unit_weight
    } else {
        DMatrix::zeros(4, 4)
    };
    let q3 = q.fixed_view::<3, 3>(0, 0).into_owned();
    let q_enu = r * q3 * r.transpose();

    let trace: f64 = (0..4).map(|i| q[(i, i)]).sum();
    let gdop = if trace > 0.0 { trace.sqrt() } else { 0.0 };
    let pdop_var = q[(0, 0)] + q[(1, 1)] + q[(2, 2)];
    let pdop = if pdop_var > 0.0 { pdop_var.sqrt() } else { 0.0 };
    let hdop_var = q_enu[(0, 0)] + q_enu[(1, 1)];
    let hdop = if hdop_var > 0.0 { hdop_var.sqrt() } else { 0.0 };
    let vdop = if q_enu[(2, 2)] > 0.0 { q_enu[(2, 2)].sqrt() } else { 0.0 };
    let tdop = if q[(3, 3)] > 0.0 { q[(3, 3)].sqrt() } else { 0.0 };

    let status = if convergence {
        SolutionStatus::Fixed
    } else if n >= min_satellites {
        SolutionStatus::Uncertain
    } else {
        SolutionStatus::NoFix
    };

    Ok(PositioningSolution {
        gps_tow_s: epoch.gps_tow_s,
        ecef_m: pos,
        lat_deg: geo.lat_deg,
        lon_deg: geo.lon_deg,
        height_m: geo.height_m,
        clock_bias_m,
        std_north_m,
        std_east_m,
        std_up_m,
        std_clock_m,
        dop: Dop { gdop, pdop, hdop, vdop, tdop },
        num_satellites: n,
        variance_unit_weight,
        convergence,
        status,
        num_iterations,
        processing_time_ms: elapsed_ms,
    })
}

/// Bounded recent-solution history, capped like `PositionTrack.max_history`.
pub struct PositionTrack {
    max_history: usize,
    positions: Vec<PositioningSolution>,
}

impl PositionTrack {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            positions: Vec::new(),
        }
    }

    pub fn push(&mut self, solution: PositioningSolution) {
        self.positions.push(solution);
        if self.positions.len() > self.max_history {
            let excess = self.positions.len() - self.max_history;
            self.positions.drain(0..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn latest(&self) -> Option<&PositioningSolution> {
        self.positions.last()
    }
}

/// Running fix-rate / average-DOP accumulator, ported from
/// `PositioningStats`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PositioningStats {
    pub total_epochs: u64,
    pub fixed_count: u64,
    pub uncertain_count: u64,
    pub no_fix_count: u64,
    pub avg_num_satellites: f64,
    pub avg_hdop: f64,
    pub avg_vdop: f64,
}

impl PositioningStats {
    pub fn fix_rate(&self) -> f64 {
        if self.total_epochs == 0 {
            0.0
        } else {
            100.0 * self.fixed_count as f64 / self.total_epochs as f64
        }
    }

    pub fn update(&mut self, solution: &PositioningSolution) {
        self.total_epochs += 1;
        match solution.status {
            SolutionStatus::Fixed => self.fixed_count += 1,
            SolutionStatus::Uncertain => self.uncertain_count += 1,
            SolutionStatus::NoFix => self.no_fix_count += 1,
        }

        let n = self.total_epochs as f64;
        self.avg_num_satellites =
            ((n - 1.0) * self.avg_num_satellites + solution.num_satellites as f64) / n;
        self.avg_hdop = (n - 1.0) * self.avg_hdop / n + solution.dop.hdop / n;
        self.avg_vdop = (n - 1.0) * self.avg_vdop / n + solution.dop.vdop / n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SatKey, SatelliteState, SignalObservation};
    use hifitime::Epoch;

    fn satellite_above(
        sat: char,
        prn: u8,
        az_deg: f64,
        el_deg: f64,
        receiver: [f64; 3],
        range_offset_m: f64,
    ) -> SatelliteState {
        // Place a satellite along the azimuth/elevation direction at a large
        // radius, then set its measured pseudorange to the true range plus
        // a clock-bias-equivalent offset so a 4+ satellite solve converges
        // near `receiver`.
        let geo = ecef_to_geodetic(receiver);
        let rot = rot_ecef_to_enu(geo.lat_deg, geo.lon_deg);
        let el = el_deg.to_radians();
        let az = az_deg.to_radians();
        let enu = [el.cos() * az.sin(), el.cos() * az.cos(), el.sin()];
        // ENU -> ECEF is rot transposed (rot is ECEF->ENU, orthonormal).
        let dir = [
            rot[0][0] * enu[0] + rot[1][0] * enu[1] + rot[2][0] * enu[2],
            rot[0][1] * enu[0] + rot[1][1] * enu[1] + rot[2][1] * enu[2],
            rot[0][2] * enu[0] + rot[1][2] * enu[1] + rot[2][2] * enu[2],
        ];
        let radius = 20_000_000.0;
        let sat_pos = [
            receiver[0] + dir[0] * radius,
            receiver[1] + dir[1] * radius,
            receiver[2] + dir[2] * radius,
        ];
        let true_range = ((sat_pos[0] - receiver[0]).powi(2)
            + (sat_pos[1] - receiver[1]).powi(2)
            + (sat_pos[2] - receiver[2]).powi(2))
        .sqrt();

        let mut state = SatelliteState::new(sat, prn);
        state.pos_ecef_m = Some(sat_pos);
        state.elevation_deg = Some(el_deg);
        state.azimuth_deg = Some(az_deg);
        state.signals.insert(
            [b'1', b'C'],
            SignalObservation {
                pseudorange_m: true_range + range_offset_m,
                ..Default::default()
            },
        );
        state
    }

    #[test]
    fn converges_with_four_well_spread_satellites() {
        let receiver = [4_000_000.0, 3_000_000.0, 5_000_000.0];
        let mut epoch = EpochObservation::new(100_000.0, Epoch::from_gpst_seconds(100_000.0));
        let clock_bias_truth = 12.0; // meters
        epoch.satellites.insert(
            SatKey::new('G', 1),
            satellite_above('G', 1, 0.0, 60.0, receiver, clock_bias_truth),
        );
        epoch.satellites.insert(
            SatKey::new('G', 2),
            satellite_above('G', 2, 90.0, 50.0, receiver, clock_bias_truth),
        );
        epoch.satellites.insert(
            SatKey::new('G', 3),
            satellite_above('G', 3, 180.0, 70.0, receiver, clock_bias_truth),
        );
        epoch.satellites.insert(
            SatKey::new('G', 4),
            satellite_above('G', 4, 270.0, 40.0, receiver, clock_bias_truth),
        );

        let initial_guess = [receiver[0] + 50.0, receiver[1] - 50.0, receiver[2] + 20.0];
        let solution = solve(&epoch, initial_guess, 10.0, 4, WeightMode::Elevation, 1.0).unwrap();

        assert!(solution.convergence);
        let dist = ((solution.ecef_m[0] - receiver[0]).powi(2)
            + (solution.ecef_m[1] - receiver[1]).powi(2)
            + (solution.ecef_m[2] - receiver[2]).powi(2))
        .sqrt();
        assert!(dist < 1.0, "solved position too far from truth: {dist}m");
        assert!((solution.clock_bias_m - clock_bias_truth).abs() < 1.0);
    }

    #[test]
    fn insufficient_satellites_is_an_error() {
        let epoch = EpochObservation::new(0.0, Epoch::from_gpst_seconds(0.0));
        let err = solve(&epoch, [0.0, 0.0, 0.0], 10.0, 4, WeightMode::Equal, 0.0).unwrap_err();
        assert!(matches!(err, SolverError::InsufficientSatellites { have: 0, min_satellites: 4 }));
    }

    #[test]
    fn position_track_bounds_history() {
        let mut track = PositionTrack::new(2);
        for i in 0..5 {
            track.push(PositioningSolution {
                gps_tow_s: i as f64,
                ecef_m: [0.0; 3],
                lat_deg: 0.0,
                lon_deg: 0.0,
                height_m: 0.0,
                clock_bias_m: 0.0,
                std_north_m: 0.0,
                std_east_m: 0.0,
                std_up_m: 0.0,
                std_clock_m: 0.0,
                dop: Dop { gdop: 0.0, pdop: 0.0, hdop: 0.0, vdop: 0.0, tdop: 0.0 },
                num_satellites: 4,
                variance_unit_weight: 0.0,
                convergence: true,
                status: SolutionStatus::Fixed,
                num_iterations: 1,
                processing_time_ms: 0.0,
            });
        }
        assert_eq!(track.len(), 2);
        assert_eq!(track.latest().unwrap().gps_tow_s, 4.0);
    }
}
