//! ECEF/geodetic/ENU coordinate transforms and satellite az/el (§4.3).

use std::f64::consts::PI;

/// WGS84 semi-major axis, meters.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = 6.694_379_990_14e-3;

/// Geodetic coordinates in degrees/meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub height_m: f64,
}

/// Convert an ECEF position to geodetic lat/lon/height using Bowring's
/// closed-form method (no iteration needed to double precision).
pub fn ecef_to_geodetic(ecef_m: [f64; 3]) -> Geodetic {
    let [x, y, z] = ecef_m;
    let a = WGS84_A;
    let e2 = WGS84_E2;
    let b = a * (1.0 - e2).sqrt();
    let ep2 = (a * a - b * b) / (b * b);

    let p = (x * x + y * y).sqrt();
    let theta = (z * a).atan2(p * b);

    let lon = y.atan2(x);
    let lat = (z + ep2 * b * theta.sin().powi(3)).atan2(p - e2 * a * theta.cos().powi(3));

    let sin_lat = lat.sin();
    let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let height = if lat.abs() < PI / 4.0 {
        p / lat.cos() - n
    } else {
        z / sin_lat - n * (1.0 - e2)
    };

    Geodetic {
        lat_deg: lat.to_degrees(),
        lon_deg: lon.to_degrees(),
        height_m: height,
    }
}

/// Convert geodetic lat/lon/height back to ECEF, the inverse of
/// [`ecef_to_geodetic`].
pub fn geodetic_to_ecef(geo: Geodetic) -> [f64; 3] {
    let lat = geo.lat_deg.to_radians();
    let lon = geo.lon_deg.to_radians();
    let a = WGS84_A;
    let e2 = WGS84_E2;
    let sin_lat = lat.sin();
    let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    let x = (n + geo.height_m) * lat.cos() * lon.cos();
    let y = (n + geo.height_m) * lat.cos() * lon.sin();
    let z = (n * (1.0 - e2) + geo.height_m) * sin_lat;
    [x, y, z]
}

/// Row-major 3x3 rotation matrix taking an ECEF displacement into the local
/// East-North-Up frame anchored at `(lat, lon)`.
pub fn rot_ecef_to_enu(lat_deg: f64, lon_deg: f64) -> [[f64; 3]; 3] {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let (sin_lat, cos_lat) = (lat.sin(), lat.cos());
    let (sin_lon, cos_lon) = (lon.sin(), lon.cos());

    [
        [-sin_lon, cos_lon, 0.0],
        [-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat],
        [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat],
    ]
}

fn mat_vec_mul(m: [[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Azimuth (degrees clockwise from north, 0-360) and elevation (degrees
/// above the local horizon) of `sat_ecef_m` as seen from `rx_ecef_m`.
pub fn azimuth_elevation(rx_ecef_m: [f64; 3], sat_ecef_m: [f64; 3]) -> (f64, f64) {
    let geo = ecef_to_geodetic(rx_ecef_m);
    let rot = rot_ecef_to_enu(geo.lat_deg, geo.lon_deg);
    let d = [
        sat_ecef_m[0] - rx_ecef_m[0],
        sat_ecef_m[1] - rx_ecef_m[1],
        sat_ecef_m[2] - rx_ecef_m[2],
    ];
    let enu = mat_vec_mul(rot, d);
    let [e, n, u] = enu;

    let horiz = (e * e + n * n).sqrt();
    let elevation = u.atan2(horiz).to_degrees();
    let mut azimuth = e.atan2(n).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }
    (azimuth, elevation)
}
