//! Transverse Mercator projection (Krüger series).
//!
//! Uses the 6th-order series in the third flattening `n` (Karney 2011),
//! which is what PROJ's default `tmerc`/`utm` implementation evaluates.
//! Within a UTM zone the error is far below a millimetre.

use crate::{check_geographic, Ellipsoid, ProjError, Result};

/// Beyond this isometric distance from the central meridian PROJ refuses
/// to project; we do the same.
const ETA_LIMIT: f64 = 2.623_395_162_778;

/// Transverse Mercator projection on an ellipsoid.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// Ellipsoid the geographic coordinates refer to.
    pub ellipsoid: Ellipsoid,
    /// Central meridian in degrees.
    pub lon_0: f64,
    /// Latitude of origin in degrees.
    pub lat_0: f64,
    /// Scale factor on the central meridian.
    pub k_0: f64,
    /// False easting in meters.
    pub x_0: f64,
    /// False northing in meters.
    pub y_0: f64,
    /// Rectifying radius scaled by `k_0`.
    radius: f64,
    /// Forward series coefficients alpha_1..alpha_6.
    alpha: [f64; 6],
    /// Inverse series coefficients beta_1..beta_6.
    beta: [f64; 6],
    /// Scaled northing of the latitude of origin.
    origin_northing: f64,
}

impl TransverseMercator {
    /// Create a Transverse Mercator projection.
    pub fn new(ellipsoid: Ellipsoid, lon_0: f64, lat_0: f64, k_0: f64, x_0: f64, y_0: f64) -> Self {
        let n = ellipsoid.third_flattening();
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let rectifying = ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0 - 127.0 * n5 / 288.0
                + 7891.0 * n6 / 37800.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                - 1_983_433.0 * n6 / 1_935_360.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0 + 15061.0 * n5 / 26880.0
                + 167_603.0 * n6 / 181_440.0,
            49561.0 * n4 / 161_280.0 - 179.0 * n5 / 168.0 + 6_601_661.0 * n6 / 7_257_600.0,
            34729.0 * n5 / 80640.0 - 3_418_889.0 * n6 / 1_995_840.0,
            212_378_941.0 * n6 / 319_334_400.0,
        ];

        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                + 96199.0 * n6 / 604_800.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                - 1_118_711.0 * n6 / 3_870_720.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0 + 5569.0 * n6 / 90720.0,
            4397.0 * n4 / 161_280.0 - 11.0 * n5 / 504.0 - 830_251.0 * n6 / 7_257_600.0,
            4583.0 * n5 / 161_280.0 - 108_847.0 * n6 / 3_991_680.0,
            20_648_693.0 * n6 / 638_668_800.0,
        ];

        let mut tm = Self {
            ellipsoid,
            lon_0,
            lat_0,
            k_0,
            x_0,
            y_0,
            radius: k_0 * rectifying,
            alpha,
            beta,
            origin_northing: 0.0,
        };
        let (_, origin_northing) = tm.project_unshifted(0.0, lat_0.to_radians());
        tm.origin_northing = origin_northing;
        tm
    }

    /// Universal Transverse Mercator zone projection.
    pub fn utm(ellipsoid: Ellipsoid, zone: i32, south: bool) -> Result<Self> {
        if !(1..=60).contains(&zone) {
            return Err(ProjError::InvalidZone(zone));
        }
        let lon_0 = f64::from(zone) * 6.0 - 183.0;
        let y_0 = if south { 10_000_000.0 } else { 0.0 };
        Ok(Self::new(ellipsoid, lon_0, 0.0, 0.9996, 500_000.0, y_0))
    }

    /// Project geographic degrees (on this projection's ellipsoid) to meters.
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        check_geographic(lon, lat)?;

        let lam = normalize_radians((lon - self.lon_0).to_radians());
        let phi = lat.to_radians();
        if lam.abs() > std::f64::consts::FRAC_PI_2 {
            return Err(ProjError::OutOfDomain { lon, lat });
        }

        let (xi_prime, eta_prime) = self.conformal(lam, phi);

        if eta_prime.abs() > ETA_LIMIT {
            return Err(ProjError::OutOfDomain { lon, lat });
        }

        let (x, y) = self.series_forward(xi_prime, eta_prime);
        Ok((x + self.x_0, y - self.origin_northing + self.y_0))
    }

    /// Invert meters back to geographic degrees on this projection's ellipsoid.
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjError::InvalidPlanar { x, y });
        }

        let xi = (y - self.y_0 + self.origin_northing) / self.radius;
        let eta = (x - self.x_0) / self.radius;

        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_prime -= b * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let tau_prime = xi_prime.sin() / eta_prime.sinh().hypot(xi_prime.cos());
        let lam = eta_prime.sinh().atan2(xi_prime.cos());
        let tau = conformal_to_geographic(tau_prime, self.ellipsoid.e2())?;

        let lon = normalize_degrees(self.lon_0 + lam.to_degrees());
        Ok((lon, tau.atan().to_degrees()))
    }

    fn project_unshifted(&self, lam: f64, phi: f64) -> (f64, f64) {
        let (xi_prime, eta_prime) = self.conformal(lam, phi);
        self.series_forward(xi_prime, eta_prime)
    }

    /// Coordinates (xi', eta') of a point on the conformal sphere.
    fn conformal(&self, lam: f64, phi: f64) -> (f64, f64) {
        let e = self.ellipsoid.e2().sqrt();
        let tau = phi.tan();
        let sigma = (e * (e * tau / tau.hypot(1.0)).atanh()).sinh();
        let tau_prime = tau * sigma.hypot(1.0) - sigma * tau.hypot(1.0);
        let xi_prime = tau_prime.atan2(lam.cos());
        let eta_prime = (lam.sin() / tau_prime.hypot(lam.cos())).asinh();
        (xi_prime, eta_prime)
    }

    fn series_forward(&self, xi_prime: f64, eta_prime: f64) -> (f64, f64) {
        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += a * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += a * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }
        (self.radius * eta, self.radius * xi)
    }
}

/// Newton iteration for tan(phi) from the conformal tan(phi').
fn conformal_to_geographic(tau_prime: f64, e2: f64) -> Result<f64> {
    let e = e2.sqrt();
    let mut tau = tau_prime;
    for _ in 0..20 {
        let sigma = (e * (e * tau / tau.hypot(1.0)).atanh()).sinh();
        let tau_i = tau * sigma.hypot(1.0) - sigma * tau.hypot(1.0);
        let delta = (tau_prime - tau_i) / tau_i.hypot(1.0) * (1.0 + (1.0 - e2) * tau * tau)
            / ((1.0 - e2) * tau.hypot(1.0));
        tau += delta;
        if delta.abs() < 1e-12 * tau.abs().max(1.0) {
            return Ok(tau);
        }
    }
    Err(ProjError::NoConvergence("transverse mercator inverse"))
}

fn normalize_radians(mut lam: f64) -> f64 {
    use std::f64::consts::PI;
    while lam > PI {
        lam -= 2.0 * PI;
    }
    while lam < -PI {
        lam += 2.0 * PI;
    }
    lam
}

fn normalize_degrees(mut lon: f64) -> f64 {
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_geographiclib_reference_point() {
        // GeoConvert -u: "33.3 44.4" -> "38n 444140.54 3684706.36"
        let tm = TransverseMercator::utm(Ellipsoid::WGS84, 38, false).unwrap();
        let (x, y) = tm.forward(44.4, 33.3).unwrap();
        assert_abs_diff_eq!(x, 444_140.54, epsilon = 0.01);
        assert_abs_diff_eq!(y, 3_684_706.36, epsilon = 0.01);
    }

    #[test]
    fn test_central_meridian_and_equator() {
        let tm = TransverseMercator::utm(Ellipsoid::WGS84, 11, false).unwrap();
        let (x, y) = tm.forward(-117.0, 0.0).unwrap();
        assert_abs_diff_eq!(x, 500_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-6);

        let (x, _) = tm.forward(-117.0, 34.0).unwrap();
        assert_abs_diff_eq!(x, 500_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_symmetric_about_central_meridian() {
        let tm = TransverseMercator::utm(Ellipsoid::CLARKE_1866, 11, false).unwrap();
        let (xw, yw) = tm.forward(-118.0, 34.0).unwrap();
        let (xe, ye) = tm.forward(-116.0, 34.0).unwrap();
        assert_abs_diff_eq!(500_000.0 - xw, xe - 500_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(yw, ye, epsilon = 1e-6);
    }

    #[test]
    fn test_round_trip() {
        let tm = TransverseMercator::utm(Ellipsoid::CLARKE_1866, 11, false).unwrap();
        for &(lon, lat) in &[(-118.0, 34.0), (-120.5, 32.1), (-114.2, 36.9)] {
            let (x, y) = tm.forward(lon, lat).unwrap();
            let (lon2, lat2) = tm.inverse(x, y).unwrap();
            assert_abs_diff_eq!(lon, lon2, epsilon = 1e-10);
            assert_abs_diff_eq!(lat, lat2, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_southern_hemisphere_false_northing() {
        let tm = TransverseMercator::utm(Ellipsoid::WGS84, 33, true).unwrap();
        let (_, y) = tm.forward(15.0, -10.0).unwrap();
        assert!(y < 10_000_000.0 && y > 8_000_000.0);
    }

    #[test]
    fn test_latitude_of_origin_offset() {
        let tm = TransverseMercator::new(Ellipsoid::WGS84, -117.0, 34.0, 1.0, 0.0, 0.0);
        let (x, y) = tm.forward(-117.0, 34.0).unwrap();
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_input() {
        let tm = TransverseMercator::utm(Ellipsoid::WGS84, 11, false).unwrap();
        assert!(matches!(
            tm.forward(-118.0, 95.0),
            Err(ProjError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            tm.forward(f64::NAN, 34.0),
            Err(ProjError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            tm.forward(63.0, 34.0),
            Err(ProjError::OutOfDomain { .. })
        ));
        assert!(matches!(
            TransverseMercator::utm(Ellipsoid::WGS84, 61, false),
            Err(ProjError::InvalidZone(61))
        ));
    }
}
