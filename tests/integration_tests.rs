//! Cross-module end-to-end scenarios. Unit tests inside each `rtcmlib`
//! module cover the same invariants in isolation; these exercise the
//! seams between framer/decoder/cache/merger/solver the way a live byte
//! stream would.

use float_cmp::approx_eq;
use hifitime::Epoch;

use rtcmlib::config::ApproxPosition;
use rtcmlib::decoder::{DecodedMessage, MessageDecoder};
use rtcmlib::ephemeris::cache::EphemerisStore;
use rtcmlib::ephemeris::keplerian::KeplerEphemeris;
use rtcmlib::ephemeris::Ephemeris;
use rtcmlib::framer::{crc24q, RtcmFramer};
use rtcmlib::geometry::{azimuth_elevation, ecef_to_geodetic, rot_ecef_to_enu};
use rtcmlib::merger::EpochMerger;
use rtcmlib::solver::{self, SolutionStatus, WeightMode};
use rtcmlib::types::{EpochObservation, SatKey, SatelliteState, SignalObservation};
use rtcmlib::EphemerisCache;

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

/// E1: garbage bytes ahead of a valid frame produce exactly one emission,
/// nothing for the leading noise.
#[test]
fn e1_framer_resyncs_past_leading_garbage() {
    let payload = vec![0xAA, 0xBB, 0xCC, 0xDD];
    let mut stream = vec![0x00, 0x00];
    stream.extend(build_frame(&payload));

    let mut framer = RtcmFramer::new();
    let frames = framer.feed(&stream);

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload, payload);
    assert_eq!(framer.crc_failure_count(), 0);
}

/// E2: re-broadcasting the same `toe` is a no-op; a changed `toe` counts
/// as a real update.
#[test]
fn e2_ephemeris_cache_update_counter_tracks_toe_changes() {
    let cache = EphemerisCache::new();
    let sat = SatKey::new('G', 1);

    let make = |toe_s: f64| {
        Ephemeris::Keplerian(KeplerEphemeris {
            sat,
            toe_s,
            sqrt_a: 5153.65,
            delta_n: 0.0,
            m0: 0.0,
            ecc: 0.0,
            omega: 0.0,
            cuc: 0.0,
            cus: 0.0,
            crc: 0.0,
            crs: 0.0,
            cic: 0.0,
            cis: 0.0,
            i0: 0.96,
            idot: 0.0,
            omega0: 0.0,
            omega_dot: 0.0,
        })
    };

    cache.insert(make(100.0));
    cache.insert(make(100.0));
    cache.insert(make(200.0));

    assert_eq!(cache.update_count(), 2);
}

/// E3: a near-circular, zero-inclination-perturbation orbit evaluated at
/// its own `toe` lands within 1m of `sqrt_a^2`.
#[test]
fn e3_kepler_propagation_matches_semi_major_axis_at_toe() {
    let eph = KeplerEphemeris {
        sat: SatKey::new('G', 1),
        toe_s: 0.0,
        sqrt_a: 5153.65,
        delta_n: 0.0,
        m0: 0.0,
        ecc: 0.0,
        omega: 0.0,
        cuc: 0.0,
        cus: 0.0,
        crc: 0.0,
        crs: 0.0,
        cic: 0.0,
        cis: 0.0,
        i0: 0.96,
        idot: 0.0,
        omega0: 0.0,
        omega_dot: 0.0,
    };

    let (pos, _vel) = rtcmlib::ephemeris::keplerian::propagate(&eph, 0.0);
    let radius = (pos[0] * pos[0] + pos[1] * pos[1] + pos[2] * pos[2]).sqrt();
    let expected = eph.sqrt_a * eph.sqrt_a;

    assert!((radius - expected).abs() < 1.0, "radius {radius} vs expected {expected}");
}

/// E4: overhead satellite reads ~90 degrees elevation; a satellite offset
/// due east near the horizon reads ~90 degrees azimuth and ~0 elevation.
#[test]
fn e4_azimuth_elevation_matches_known_geometry() {
    let receiver = [6_378_137.0, 0.0, 0.0];

    let (_az, el) = azimuth_elevation(receiver, [7_378_137.0, 0.0, 0.0]);
    assert!((el - 90.0).abs() < 1e-6, "expected ~90 deg elevation overhead, got {el}");

    let (az, el) = azimuth_elevation(receiver, [6_378_137.0, 1.0e6, 0.0]);
    assert!((az - 90.0).abs() < 1.0, "expected ~east azimuth, got {az}");
    assert!(el.abs() < 1.0, "expected ~horizon elevation, got {el}");
}

fn satellite_toward(sat: char, prn: u8, az_deg: f64, el_deg: f64, receiver: [f64; 3], bias_m: f64) -> SatelliteState {
    let geo = ecef_to_geodetic(receiver);
    let rot = rot_ecef_to_enu(geo.lat_deg, geo.lon_deg);
    let el = el_deg.to_radians();
    let az = az_deg.to_radians();
    let enu = [el.cos() * az.sin(), el.cos() * az.cos(), el.sin()];
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
            pseudorange_m: true_range + bias_m,
            ..Default::default()
        },
    );
    state
}

/// E5: four satellites on a regular tetrahedron around a receiver, a
/// common 1000m pseudorange bias, recovers the true position to 1mm and
/// the clock bias to within 1mm.
#[test]
fn e5_wls_spp_recovers_tetrahedron_geometry() {
    let receiver = [4_000_000.0, 3_000_000.0, 5_000_000.0];
    let bias_m = 1000.0;
    let mut epoch = EpochObservation::new(200_000.0, Epoch::from_gpst_seconds(200_000.0));

    let placements = [(0.0, 90.0), (0.0, 20.0), (120.0, 20.0), (240.0, 20.0)];
    for (i, (az, el)) in placements.iter().enumerate() {
        epoch.satellites.insert(
            SatKey::new('G', i as u8 + 1),
            satellite_toward('G', i as u8 + 1, *az, *el, receiver, bias_m),
        );
    }

    let guess = [receiver[0] + 10.0, receiver[1] - 10.0, receiver[2] + 10.0];
    let solution = solver::solve(&epoch, guess, 10.0, 4, WeightMode::Equal, 1.0).unwrap();

    let dist = ((solution.ecef_m[0] - receiver[0]).powi(2)
        + (solution.ecef_m[1] - receiver[1]).powi(2)
        + (solution.ecef_m[2] - receiver[2]).powi(2))
    .sqrt();
    assert!(dist < 1e-3, "recovered position off by {dist}m");
    assert!(
        approx_eq!(f64, solution.clock_bias_m, bias_m, epsilon = 1e-3),
        "recovered clock bias {} vs truth {bias_m}",
        solution.clock_bias_m
    );
    assert_eq!(solution.status, SolutionStatus::Fixed);
}

/// E6: two fragments 0.6-0.8s into the same UTC second merge into one
/// epoch; a fragment 1.1s later starts a new one. Only the fully-populated
/// epoch has enough satellites for the solver to produce a fix.
#[test]
fn e6_epoch_merging_yields_two_solver_epochs() {
    let receiver = [4_000_000.0, 3_000_000.0, 5_000_000.0];
    let bias_m = 50.0;

    let fragment = |sat_idx: u8, utc: Epoch, az: f64, el: f64| {
        let mut epoch = EpochObservation::new(utc.to_gpst_seconds(), utc);
        epoch
            .satellites
            .insert(SatKey::new('G', sat_idx), satellite_toward('G', sat_idx, az, el, receiver, bias_m));
        epoch
    };

    let base_s = 300_000.0;
    let frag_a = fragment(1, Epoch::from_gpst_seconds(base_s), 0.0, 90.0);
    let frag_b = fragment(2, Epoch::from_gpst_seconds(base_s + 0.6), 0.0, 20.0);
    let frag_c = fragment(3, Epoch::from_gpst_seconds(base_s + 0.7), 120.0, 20.0);
    let frag_d = fragment(4, Epoch::from_gpst_seconds(base_s + 0.8), 240.0, 20.0);
    let frag_next_second = fragment(1, Epoch::from_gpst_seconds(base_s + 1.1), 0.0, 90.0);

    let mut merger = EpochMerger::new();
    let mut completed = Vec::new();
    for frag in [frag_a, frag_b, frag_c, frag_d, frag_next_second] {
        if let Some(epoch) = merger.feed(frag) {
            completed.push(epoch);
        }
    }
    if let Some(epoch) = merger.flush() {
        completed.push(epoch);
    }

    assert_eq!(completed.len(), 2);
    assert_eq!(completed[0].satellites.len(), 4);
    assert_eq!(completed[1].satellites.len(), 1);

    let mut solved = 0;
    for epoch in &completed {
        let guess = [receiver[0] + 5.0, receiver[1] - 5.0, receiver[2] + 5.0];
        if solver::solve(epoch, guess, 10.0, 4, WeightMode::Equal, 1.0).is_ok() {
            solved += 1;
        }
    }
    assert_eq!(solved, 1);
}

/// Decoder + framer + cache wired together: a GPS ephemeris frame decodes
/// to a `Keplerian` record and lands in the shared cache.
#[test]
fn framer_decoder_cache_pipeline_caches_gps_ephemeris() {
    let mut payload = vec![0u8; 62];
    payload[0] = (1019u16 >> 4) as u8;
    payload[1] = ((1019u16 & 0xF) << 4) as u8;
    let frame_bytes = build_frame(&payload);

    let mut framer = RtcmFramer::new();
    let frames = framer.feed(&frame_bytes);
    assert_eq!(frames.len(), 1);

    let mut decoder = MessageDecoder::new(vec!['G']);
    let now = Epoch::from_gpst_seconds(1_000_000.0);
    let decoded = decoder.decode(frames[0].message_type, &frames[0].payload, now).unwrap();

    let cache = EphemerisCache::new();
    match decoded {
        Some(DecodedMessage::Ephemeris(eph)) => cache.insert(eph),
        other => panic!("expected a Keplerian ephemeris, got {other:?}"),
    }
    assert_eq!(cache.update_count(), 1);
}

/// `ApproxPosition` starts unknown and publishes whatever a 1005/1006
/// station-position decode resolves to, the seam the decoder thread and
/// positioning thread share outside of the ring buffers.
#[test]
fn approx_position_reflects_decoded_station_message() {
    let approx = ApproxPosition::default();
    assert!(!approx.is_known());
    approx.set([4_001_000.0, 3_001_000.0, 5_001_000.0]);
    assert!(approx.is_known());
    assert_eq!(approx.update_count(), 1);
}
