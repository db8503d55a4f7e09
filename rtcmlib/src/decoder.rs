//! RTCM payload decoder (§4.6): maps each supported message type to either
//! a cached [`Ephemeris`] or an [`EpochObservation`] fragment.
//!
//! Every `(type_id, DF)` pair is read once, in declaration order, through a
//! [`BitCursor`] — there is no dynamic attribute lookup by DF name, only a
//! fixed table of field widths and scale factors per message type.

use std::f64::consts::PI;

use crate::bitstream::BitCursor;
use crate::ephemeris::{glonass::GlonassEphemeris, keplerian::KeplerEphemeris, Ephemeris};
use crate::error::DecodeError;
use crate::time;
use crate::types::{signal_id, EpochObservation, SatKey, SatelliteState, SignalObservation};

const CLIGHT: f64 = 299_792_458.0;
const RANGE_MS: f64 = CLIGHT / 1000.0;

/// Scale factors expressed as `2^-n`, named the way the ICD tables do.
const P2_5: f64 = 1.0 / 32.0;
const P2_6: f64 = 1.0 / 64.0;
const P2_11: f64 = 1.0 / 2048.0;
const P2_19: f64 = 1.0 / 524_288.0;
const P2_20: f64 = 1.0 / 1_048_576.0;
const P2_29: f64 = 1.0 / 536_870_912.0;
const P2_30: f64 = 1.0 / 1_073_741_824.0;
const P2_31: f64 = P2_30 / 2.0;
const P2_33: f64 = P2_31 / 4.0;
const P2_34: f64 = P2_33 / 2.0;
const P2_40: f64 = P2_34 / 64.0;
const P2_43: f64 = P2_40 / 8.0;
const P2_46: f64 = P2_43 / 8.0;
const P2_50: f64 = P2_46 / 16.0;
const P2_55: f64 = P2_50 / 32.0;
const P2_59: f64 = P2_55 / 16.0;
const P2_66: f64 = P2_59 / 128.0;
const SC2RAD: f64 = PI;

/// Station ECEF coordinates published by a 1005/1006 message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationPosition {
    pub ecef_m: [f64; 3],
}

/// Decode outcome for one framed RTCM payload: most message types produce
/// exactly one of these, unsupported types produce `None`.
#[derive(Debug, Clone)]
pub enum DecodedMessage {
    Ephemeris(Ephemeris),
    Observation(EpochObservation),
    StationPosition(StationPosition),
}

/// Frequency (Hz) for a given signal band character and satellite system,
/// with GLONASS FDMA requiring the satellite's frequency channel number
/// (§4.6, ported from the corpus's per-band frequency table).
pub fn signal_frequency_hz(sys: char, band: char, glonass_fcn: i8) -> f64 {
    match sys {
        'G' | 'J' => match band {
            '1' => 1_575.42e6,
            '2' => 1_227.60e6,
            '5' => 1_176.45e6,
            '6' => 1_278.75e6,
            _ => 0.0,
        },
        'E' => match band {
            '1' => 1_575.42e6,
            '5' => 1_176.45e6,
            '7' => 1_207.14e6,
            '8' => 1_191.795e6,
            '6' => 1_278.75e6,
            _ => 0.0,
        },
        'C' => match band {
            '1' => 1_575.42e6,
            '2' => 1_561.098e6,
            '5' => 1_176.45e6,
            '7' => 1_207.140e6,
            '8' => 1_191.795e6,
            '6' => 1_268.52e6,
            _ => 0.0,
        },
        'R' => match band {
            '1' => 1_602.0e6 + 0.5625e6 * glonass_fcn as f64,
            '2' => 1_246.0e6 + 0.4375e6 * glonass_fcn as f64,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

/// Decodes framed RTCM payloads, filtering by configured target systems
/// and carrying enough per-satellite state (GLONASS FCN) across messages to
/// resolve signal frequency.
pub struct MessageDecoder {
    target_systems: Vec<char>,
    glonass_fcn: std::collections::HashMap<u8, i8>,
}

impl MessageDecoder {
    pub fn new(target_systems: Vec<char>) -> Self {
        Self {
            target_systems,
            glonass_fcn: std::collections::HashMap::new(),
        }
    }

    fn system_allowed(&self, sys: char) -> bool {
        self.target_systems.contains(&sys)
    }

    /// Decode one framed payload (header message number already embedded
    /// at bit 0..12, as produced by [`crate::framer::RtcmFramer`]).
    pub fn decode(
        &mut self,
        message_type: u16,
        payload: &[u8],
        now: hifitime::Epoch,
    ) -> Result<Option<DecodedMessage>, DecodeError> {
        match message_type {
            1005 | 1006 => Ok(self.decode_station(payload).map(DecodedMessage::StationPosition)),
            1019 => self.decode_gps_eph(payload).map(|e| Some(DecodedMessage::Ephemeris(e))),
            1020 => self.decode_glonass_eph(payload, now).map(|e| Some(DecodedMessage::Ephemeris(e))),
            1042 => self.decode_bds_eph(payload).map(|e| Some(DecodedMessage::Ephemeris(e))),
            1045 | 1046 => self.decode_galileo_eph(payload).map(|e| Some(DecodedMessage::Ephemeris(e))),
            1077 | 1087 | 1097 | 1117 | 1127 => {
                self.decode_msm7(message_type, payload, now).map(|o| o.map(DecodedMessage::Observation))
            }
            _ => Ok(None),
        }
    }

    fn decode_station(&self, payload: &[u8]) -> Option<StationPosition> {
        let mut c = BitCursor::new(payload);
        c.skip(12); // message number
        c.skip(12); // station id
        c.skip(6); // ITRF realization year
        c.skip(4); // GPS/GLONASS/Galileo/ref-station indicators
        let x = c.take_i64(38) as f64 * 0.0001;
        c.skip(2); // oscillator + reserved
        let y = c.take_i64(38) as f64 * 0.0001;
        c.skip(2); // quarter cycle indicator
        let z = c.take_i64(38) as f64 * 0.0001;
        Some(StationPosition { ecef_m: [x, y, z] })
    }

    fn decode_gps_eph(&self, payload: &[u8]) -> Result<Ephemeris, DecodeError> {
        let mut c = BitCursor::new(payload);
        c.skip(12);
        let prn = c.take_u32(6) as u8;
        let week = c.take_u32(10) + 2048;
        c.skip(4); // URA
        c.skip(2); // code on L2
        let idot = c.take_i32(14) as f64 * P2_43 * SC2RAD;
        c.skip(8); // IODE
        let toc = c.take_u32(16) as f64 * 16.0;
        c.skip(8); // af2
        c.skip(16); // af1
        c.skip(22); // af0
        c.skip(10); // IODC
        let crs = c.take_i32(16) as f64 * P2_5;
        let delta_n = c.take_i32(16) as f64 * P2_43 * SC2RAD;
        let m0 = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let cuc = c.take_i32(16) as f64 * P2_29;
        let ecc = c.take_u32(32) as f64 * P2_33;
        let cus = c.take_i32(16) as f64 * P2_29;
        let sqrt_a = c.take_u32(32) as f64 * P2_19;
        let toe_s = c.take_u32(16) as f64 * 16.0;
        let cic = c.take_i32(16) as f64 * P2_29;
        let omega0 = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let cis = c.take_i32(16) as f64 * P2_29;
        let i0 = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let crc = c.take_i32(16) as f64 * P2_5;
        let omega = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let omega_dot = c.take_i32(24) as f64 * P2_43 * SC2RAD;
        let _ = (week, toc);

        Ok(Ephemeris::Keplerian(KeplerEphemeris {
            sat: SatKey::new('G', prn),
            toe_s,
            sqrt_a,
            delta_n,
            m0,
            ecc,
            omega,
            cuc,
            cus,
            crc,
            crs,
            cic,
            cis,
            i0,
            idot,
            omega0,
            omega_dot,
        }))
    }

    fn decode_galileo_eph(&self, payload: &[u8]) -> Result<Ephemeris, DecodeError> {
        let mut c = BitCursor::new(payload);
        c.skip(12);
        let prn = c.take_u32(6) as u8;
        let week = c.take_u32(12) + 1024;
        c.skip(10); // IODnav
        c.skip(8); // SISA
        let idot = c.take_i32(14) as f64 * P2_43 * SC2RAD;
        let toc = c.take_u32(14) as f64 * 60.0;
        c.skip(6); // af2
        c.skip(21); // af1
        c.skip(31); // af0
        let crs = c.take_i32(16) as f64 * P2_5;
        let delta_n = c.take_i32(16) as f64 * P2_43 * SC2RAD;
        let m0 = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let cuc = c.take_i32(16) as f64 * P2_29;
        let ecc = c.take_u32(32) as f64 * P2_33;
        let cus = c.take_i32(16) as f64 * P2_29;
        let sqrt_a = c.take_u32(32) as f64 * P2_19;
        let toe_s = c.take_u32(14) as f64 * 60.0;
        let cic = c.take_i32(16) as f64 * P2_29;
        let omega0 = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let cis = c.take_i32(16) as f64 * P2_29;
        let i0 = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let crc = c.take_i32(16) as f64 * P2_5;
        let omega = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let omega_dot = c.take_i32(24) as f64 * P2_43 * SC2RAD;
        let _ = (week, toc);

        Ok(Ephemeris::Keplerian(KeplerEphemeris {
            sat: SatKey::new('E', prn),
            toe_s,
            sqrt_a,
            delta_n,
            m0,
            ecc,
            omega,
            cuc,
            cus,
            crc,
            crs,
            cic,
            cis,
            i0,
            idot,
            omega0,
            omega_dot,
        }))
    }

    fn decode_bds_eph(&self, payload: &[u8]) -> Result<Ephemeris, DecodeError> {
        let mut c = BitCursor::new(payload);
        c.skip(12);
        let prn = c.take_u32(6) as u8;
        let bds_week = c.take_u32(13);
        let week = bds_week + 1356; // GPS-aligned week (§4.6)
        c.skip(4); // URAI
        let idot = c.take_i32(14) as f64 * P2_43 * SC2RAD;
        c.skip(5); // AODE
        let toc = c.take_u32(17) as f64 * 8.0;
        c.skip(11); // a2
        c.skip(22); // a1
        c.skip(24); // a0
        c.skip(5); // AODC
        let crs = c.take_i32(18) as f64 * P2_6;
        let delta_n = c.take_i32(16) as f64 * P2_43 * SC2RAD;
        let m0 = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let cuc = c.take_i32(18) as f64 * P2_31;
        let ecc = c.take_u32(32) as f64 * P2_33;
        let cus = c.take_i32(18) as f64 * P2_31;
        let sqrt_a = c.take_u32(32) as f64 * P2_19;
        let toe_s = c.take_u32(17) as f64 * 8.0;
        let cic = c.take_i32(18) as f64 * P2_31;
        let omega0 = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let cis = c.take_i32(18) as f64 * P2_31;
        let i0 = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let crc = c.take_i32(18) as f64 * P2_6;
        let omega = c.take_i32(32) as f64 * P2_31 * SC2RAD;
        let omega_dot = c.take_i32(24) as f64 * P2_43 * SC2RAD;
        let _ = (week, toc);

        Ok(Ephemeris::Keplerian(KeplerEphemeris {
            sat: SatKey::new('C', prn),
            toe_s,
            sqrt_a,
            delta_n,
            m0,
            ecc,
            omega,
            cuc,
            cus,
            crc,
            crs,
            cic,
            cis,
            i0,
            idot,
            omega0,
            omega_dot,
        }))
    }

    fn decode_glonass_eph(
        &mut self,
        payload: &[u8],
        now: hifitime::Epoch,
    ) -> Result<Ephemeris, DecodeError> {
        let mut c = BitCursor::new(payload);
        c.skip(12);
        let prn = c.take_u32(5) as u8;
        let fcn_raw = c.take_u32(5) as i32;
        let fcn = (fcn_raw - 7) as i8; // DF040: value 7 == channel 0 (§4.6)
        c.skip(1); // almanac health
        c.skip(1); // almanac health avail
        c.skip(2); // P1
        c.skip(12); // DF107 tk (frame time-of-day, not retained on the cached ephemeris)
        c.skip(1); // Bn MSB
        c.skip(1); // P2
        let tb_raw = c.take_u32(7);

        let vel_x = c.take_i32(24) as f64 * P2_20 * 1000.0;
        let pos_x = c.take_i32(27) as f64 * P2_11 * 1000.0;
        let acc_x = c.take_i32(5) as f64 * P2_30 * 1000.0;
        let vel_y = c.take_i32(24) as f64 * P2_20 * 1000.0;
        let pos_y = c.take_i32(27) as f64 * P2_11 * 1000.0;
        let acc_y = c.take_i32(5) as f64 * P2_30 * 1000.0;
        let vel_z = c.take_i32(24) as f64 * P2_20 * 1000.0;
        let pos_z = c.take_i32(27) as f64 * P2_11 * 1000.0;
        let acc_z = c.take_i32(5) as f64 * P2_30 * 1000.0;

        self.glonass_fcn.insert(prn, fcn);

        let day_of_week_s = time::gps_day_of_week(now) as f64 * 86_400.0;
        let tb_s = tb_raw as f64 * 15.0 * 60.0 - 3.0 * 3600.0 + day_of_week_s;

        Ok(Ephemeris::Glonass(GlonassEphemeris {
            sat: SatKey::new('R', prn),
            tb_s,
            pos_m: [pos_x, pos_y, pos_z],
            vel_mps: [vel_x, vel_y, vel_z],
            accel_lunisolar_mps2: [acc_x, acc_y, acc_z],
        }))
    }

    fn decode_msm7(
        &mut self,
        message_type: u16,
        payload: &[u8],
        now: hifitime::Epoch,
    ) -> Result<Option<EpochObservation>, DecodeError> {
        let sys = match message_type {
            1077 => 'G',
            1087 => 'R',
            1097 => 'E',
            1117 => 'J',
            1127 => 'C',
            _ => return Err(DecodeError::UnknownType(message_type)),
        };
        if !self.system_allowed(sys) {
            return Err(DecodeError::SystemExcluded(sys));
        }

        let mut c = BitCursor::new(payload);
        c.skip(12); // message number
        c.skip(12); // reference station id
        // DF004/DF248/DF427/DF428 (ms-of-week) for GPS/GAL/BDS/QZSS; for
        // GLONASS (1087) this 30-bit field is DF416 (3-bit day-of-week) in
        // the high bits followed by DF034 (27-bit tk, ms-of-day).
        let epoch_time_raw = c.take_u32(30);
        c.skip(1); // multiple message bit
        c.skip(3); // IODS
        c.skip(7); // reserved
        c.skip(2); // clock steering
        c.skip(2); // external clock
        c.skip(1); // smoothing indicator
        c.skip(3); // smoothing interval

        let sat_mask = c.take_u64(64);
        let signal_mask = c.take_u32(32);

        let num_sats = sat_mask.count_ones() as usize;
        let num_signals = signal_mask.count_ones() as usize;
        if num_sats == 0 || num_signals == 0 {
            return Ok(None);
        }
        let num_cells = num_sats * num_signals;
        if num_cells > 64 {
            // malformed or unsupported cell mask width for this decoder
            return Ok(None);
        }
        let cell_mask = c.take_u64(num_cells.min(64));

        let sat_prns: Vec<u8> = (0..64)
            .filter(|i| sat_mask & (1u64 << (63 - i)) != 0)
            .map(|i| i as u8 + 1)
            .collect();
        let signal_bands: Vec<(char, char)> = (0..32)
            .filter(|i| signal_mask & (1u32 << (31 - i)) != 0)
            .map(|i| msm_signal_band_attr(i))
            .collect();

        let epoch_time_s = if sys == 'R' {
            // Low 27 bits are DF034 (tk, ms-of-day); the DF416 day-of-week
            // bits above it are discarded in favor of the day derived from
            // `now`, same substitution the ephemeris decode path uses.
            let tk_ms_of_day = epoch_time_raw & 0x07FF_FFFF;
            let day_of_week_s = time::gps_day_of_week(now) as f64 * 86_400.0;
            tk_ms_of_day as f64 / 1000.0 - 3.0 * 3600.0 + day_of_week_s
        } else {
            epoch_time_raw as f64 / 1000.0
        };
        let gps_week = time::current_gps_week(now);
        let utc_datetime = time::gps_to_utc(gps_week, epoch_time_s);

        let mut epoch = EpochObservation::new(epoch_time_s, utc_datetime);

        // Satellite-level rough range/range-rate data (DF397/398/399), one
        // entry per satellite present in the mask, in mask order.
        let mut rough_ranges = Vec::with_capacity(num_sats);
        for _ in 0..num_sats {
            rough_ranges.push(0.0f64);
        }
        let mut int_ms = Vec::with_capacity(num_sats);
        for _ in 0..num_sats {
            let v = c.take_u32(8);
            int_ms.push(v);
        }
        for _ in 0..num_sats {
            c.skip(4); // DF419 extended info, unused
        }
        for (i, rough) in rough_ranges.iter_mut().enumerate() {
            let rng_mod = c.take_u32(10); // DF398
            *rough = if int_ms[i] != 255 {
                int_ms[i] as f64 * RANGE_MS + rng_mod as f64 * RANGE_MS / 1024.0
            } else {
                0.0
            };
        }
        let mut rough_rates = Vec::with_capacity(num_sats);
        for _ in 0..num_sats {
            let raw = c.take_i32(14); // DF399
            rough_rates.push(if raw != -8192 { raw as f64 } else { f64::NAN });
        }

        // cell-level fine fields, one entry per set bit in cell_mask, row
        // major over (satellite, signal) in mask order.
        let mut cell_entries: Vec<(usize, usize)> = Vec::with_capacity(num_cells);
        for si in 0..num_sats {
            for gi in 0..num_signals {
                let bit = num_cells - 1 - (si * num_signals + gi);
                if cell_mask & (1u64 << bit) != 0 {
                    cell_entries.push((si, gi));
                }
            }
        }

        let n_cells = cell_entries.len();
        let mut pr_fine = vec![0i32; n_cells];
        for v in pr_fine.iter_mut() {
            *v = c.take_i32(20); // DF405, 20-bit fine pseudorange extended
        }
        let mut cp_fine = vec![0i64; n_cells];
        for v in cp_fine.iter_mut() {
            *v = c.take_i64(24); // DF406
        }
        let mut lock_time = vec![0u32; n_cells];
        for v in lock_time.iter_mut() {
            *v = c.take_u32(10); // DF407
        }
        let mut half_cycle = vec![0u32; n_cells];
        for v in half_cycle.iter_mut() {
            *v = c.take_u32(1); // DF420
        }
        let mut cnr = vec![0u32; n_cells];
        for v in cnr.iter_mut() {
            *v = c.take_u32(10); // DF408
        }
        let mut fine_rate = vec![0i32; n_cells];
        for v in fine_rate.iter_mut() {
            *v = c.take_i32(15); // DF404
        }

        for (idx, (si, gi)) in cell_entries.iter().enumerate() {
            let prn = sat_prns[*si];
            let (band, attr) = signal_bands[*gi];
            let sat_key = SatKey::new(sys, prn);

            let fcn = if sys == 'R' {
                *self.glonass_fcn.get(&prn).unwrap_or(&0)
            } else {
                0
            };
            let freq = signal_frequency_hz(sys, band, fcn);

            let rough = rough_ranges[*si];
            let mut pseudorange_m = 0.0;
            if rough != 0.0 && pr_fine[idx] != -524_288 {
                pseudorange_m = rough + pr_fine[idx] as f64 * P2_29 * RANGE_MS;
            }

            let mut carrier_phase_cyc = 0.0;
            if rough != 0.0 && cp_fine[idx] != -8_388_608 {
                let ph_m = rough + cp_fine[idx] as f64 * P2_31 * RANGE_MS;
                if freq > 0.0 {
                    carrier_phase_cyc = ph_m * freq / CLIGHT;
                }
            }

            let rough_rate = rough_rates[*si];
            let mut doppler_hz = 0.0;
            if !rough_rate.is_nan() && fine_rate[idx] != -16_384 {
                let total_rate = rough_rate + fine_rate[idx] as f64 * 0.0001;
                if freq > 0.0 {
                    doppler_hz = -total_rate * freq / CLIGHT;
                }
            }

            let snr = cnr[idx] as f64 * 0.0625; // DF408, 1/16 dB-Hz resolution
            if snr <= 0.0 && carrier_phase_cyc == 0.0 {
                continue;
            }

            let state = epoch
                .satellites
                .entry(sat_key)
                .or_insert_with(|| SatelliteState::new(sys, prn));
            state.signals.insert(
                signal_id(band as u8, attr),
                SignalObservation {
                    pseudorange_m,
                    carrier_phase_cyc,
                    doppler_hz,
                    snr_dbhz: snr,
                    lock_time: lock_time[idx],
                    half_cycle_flag: half_cycle[idx] as u8,
                },
            );
        }

        Ok(Some(epoch))
    }
}

/// Maps an MSM signal-mask bit index to `(band, attribute)`, e.g. index 1 ->
/// ('1', 'C') for GPS L1 C/A. This is a representative subset of RTCM's
/// 32-entry signal table covering the bands this engine's frequency table
/// resolves (§4.6).
fn msm_signal_band_attr(index: usize) -> (char, char) {
    const TABLE: [(char, char); 32] = [
        ('0', '0'), ('1', 'C'), ('1', 'P'), ('1', 'W'),
        ('0', '0'), ('0', '0'), ('0', '0'), ('0', '0'),
        ('2', 'C'), ('2', 'P'), ('2', 'W'), ('0', '0'),
        ('0', '0'), ('0', '0'), ('0', '0'), ('0', '0'),
        ('2', 'S'), ('2', 'L'), ('2', 'X'), ('0', '0'),
        ('5', 'I'), ('5', 'Q'), ('5', 'X'), ('0', '0'),
        ('1', 'S'), ('1', 'L'), ('1', 'X'), ('0', '0'),
        ('0', '0'), ('0', '0'), ('0', '0'), ('0', '0'),
    ];
    TABLE[index.min(31)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::{crc24q, RtcmFramer};

    fn build_frame(payload: &[u8]) -> Vec<u8> {
        let len = payload.len() as u16;
        let mut header = vec![0xD3, (len >> 8) as u8, (len & 0xFF) as u8];
        header.extend_from_slice(payload);
        let crc = crc24q(&header);
        header.push((crc >> 16) as u8);
        header.push((crc >> 8) as u8);
        header.push(crc as u8);
        header
    }

    #[test]
    fn unknown_type_returns_none_without_error() {
        let mut decoder = MessageDecoder::new(vec!['G', 'R', 'E', 'C', 'J', 'S']);
        let payload = vec![0u8; 8];
        let now = hifitime::Epoch::from_gpst_seconds(1_000_000.0);
        let result = decoder.decode(9999, &payload, now).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn excluded_system_is_rejected() {
        let mut decoder = MessageDecoder::new(vec!['G']);
        let payload = vec![0u8; 30];
        let now = hifitime::Epoch::from_gpst_seconds(1_000_000.0);
        let result = decoder.decode(1087, &payload, now);
        assert!(matches!(result, Err(DecodeError::SystemExcluded('R'))));
    }

    #[test]
    fn frequency_table_matches_known_bands() {
        assert_eq!(signal_frequency_hz('G', '1', 0), 1_575.42e6);
        assert_eq!(signal_frequency_hz('R', '1', 1), 1_602.0e6 + 0.5625e6);
        assert_eq!(signal_frequency_hz('R', '1', -7), 1_602.0e6 - 7.0 * 0.5625e6);
    }

    #[test]
    fn gps_eph_roundtrips_through_framer() {
        let mut payload = vec![0u8; 62];
        // Not a bit-exact encode; this just exercises the decode path end to
        // end through the framer and confirms it yields a Keplerian record.
        payload[0] = (1019u16 >> 4) as u8;
        payload[1] = ((1019u16 & 0xF) << 4) as u8;
        let frame = build_frame(&payload);
        let mut framer = RtcmFramer::new();
        let frames = framer.feed(&frame);
        assert_eq!(frames.len(), 1);

        let mut decoder = MessageDecoder::new(vec!['G']);
        let now = hifitime::Epoch::from_gpst_seconds(1_000_000.0);
        let decoded = decoder.decode(frames[0].message_type, &frames[0].payload, now).unwrap();
        assert!(matches!(decoded, Some(DecodedMessage::Ephemeris(Ephemeris::Keplerian(_)))));
    }
}
