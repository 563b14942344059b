//! Azimuthal Equidistant projection on the ellipsoid.
//!
//! A point maps to `(s sin(az), s cos(az))` where `s` is the geodesic
//! distance from the projection centre and `az` the forward azimuth at the
//! centre. Geodesics are solved with Vincenty's formulae, which are good to
//! well under a millimetre for the regional extents models cover.

use crate::{check_geographic, Ellipsoid, ProjError, Result};

const MAX_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1e-12;

/// Azimuthal Equidistant projection centred on `(lon_0, lat_0)`.
#[derive(Debug, Clone)]
pub struct AzimuthalEquidistant {
    /// Ellipsoid the geographic coordinates refer to.
    pub ellipsoid: Ellipsoid,
    /// Longitude of the projection centre in degrees.
    pub lon_0: f64,
    /// Latitude of the projection centre in degrees.
    pub lat_0: f64,
    /// False easting in meters.
    pub x_0: f64,
    /// False northing in meters.
    pub y_0: f64,
}

impl AzimuthalEquidistant {
    /// Create a projection centred on `(lon_0, lat_0)` with no false origin.
    pub fn new(ellipsoid: Ellipsoid, lon_0: f64, lat_0: f64) -> Self {
        Self {
            ellipsoid,
            lon_0,
            lat_0,
            x_0: 0.0,
            y_0: 0.0,
        }
    }

    /// Project geographic degrees to meters.
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        check_geographic(lon, lat)?;
        let (s, azimuth) = self
            .inverse_geodesic(lon, lat)
            .ok_or(ProjError::NoConvergence("geodesic inverse"))?;
        Ok((
            s * azimuth.sin() + self.x_0,
            s * azimuth.cos() + self.y_0,
        ))
    }

    /// Invert meters back to geographic degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjError::InvalidPlanar { x, y });
        }
        let dx = x - self.x_0;
        let dy = y - self.y_0;
        let s = dx.hypot(dy);
        if s == 0.0 {
            return Ok((self.lon_0, self.lat_0));
        }
        self.direct_geodesic(dx.atan2(dy), s)
            .ok_or(ProjError::NoConvergence("geodesic direct"))
    }

    /// Distance and azimuth (radians) from the centre to `(lon, lat)`.
    fn inverse_geodesic(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let Ellipsoid { a, f } = self.ellipsoid;
        let b = self.ellipsoid.b();

        let l = (lon - self.lon_0).to_radians();
        let u1 = ((1.0 - f) * self.lat_0.to_radians().tan()).atan();
        let u2 = ((1.0 - f) * lat.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        for _ in 0..MAX_ITERATIONS {
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            let sin_sigma =
                (cos_u2 * sin_lambda).hypot(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
            if sin_sigma == 0.0 {
                return Some((0.0, 0.0));
            }
            let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            let sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
            // Equatorial lines have cos2_alpha == 0.
            let cos_2sigma_m = if cos2_alpha == 0.0 {
                0.0
            } else {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
            };
            let c = f / 16.0 * cos2_alpha * (4.0 + f * (4.0 - 3.0 * cos2_alpha));
            let previous = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m
                                + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

            if (lambda - previous).abs() < TOLERANCE {
                let (big_a, big_b) = series_coefficients(cos2_alpha, a, b);
                let delta_sigma =
                    delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sigma_m);
                let s = b * big_a * (sigma - delta_sigma);
                let (sin_lambda, cos_lambda) = lambda.sin_cos();
                let azimuth = (cos_u2 * sin_lambda)
                    .atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
                return Some((s, azimuth));
            }
        }
        None
    }

    /// Point reached from the centre along `azimuth` (radians) after `s` meters.
    fn direct_geodesic(&self, azimuth: f64, s: f64) -> Option<(f64, f64)> {
        let Ellipsoid { a, f } = self.ellipsoid;
        let b = self.ellipsoid.b();

        let u1 = ((1.0 - f) * self.lat_0.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_az, cos_az) = azimuth.sin_cos();
        let sigma1 = u1.tan().atan2(cos_az);
        let sin_alpha = cos_u1 * sin_az;
        let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
        let (big_a, big_b) = series_coefficients(cos2_alpha, a, b);

        let mut sigma = s / (b * big_a);
        let mut converged = false;
        for _ in 0..MAX_ITERATIONS {
            let cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
            let (sin_sigma, cos_sigma) = sigma.sin_cos();
            let previous = sigma;
            sigma = s / (b * big_a) + delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sigma_m);
            if (sigma - previous).abs() < TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            return None;
        }

        let cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
        let (sin_sigma, cos_sigma) = sigma.sin_cos();
        let tmp = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_az;
        let lat = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_az)
            .atan2((1.0 - f) * sin_alpha.hypot(tmp));
        let lambda = (sin_sigma * sin_az).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_az);
        let c = f / 16.0 * cos2_alpha * (4.0 + f * (4.0 - 3.0 * cos2_alpha));
        let l = lambda
            - (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        let mut lon = self.lon_0 + l.to_degrees();
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        Some((lon, lat.to_degrees()))
    }
}

/// Vincenty's A and B series terms.
fn series_coefficients(cos2_alpha: f64, a: f64, b: f64) -> (f64, f64) {
    let u2 = cos2_alpha * (a * a - b * b) / (b * b);
    let big_a = 1.0 + u2 / 16384.0 * (4096.0 + u2 * (-768.0 + u2 * (320.0 - 175.0 * u2)));
    let big_b = u2 / 1024.0 * (256.0 + u2 * (-128.0 + u2 * (74.0 - 47.0 * u2)));
    (big_a, big_b)
}

fn delta_sigma(big_b: f64, sin_sigma: f64, cos_sigma: f64, cos_2sigma_m: f64) -> f64 {
    let c2m2 = cos_2sigma_m * cos_2sigma_m;
    big_b
        * sin_sigma
        * (cos_2sigma_m
            + big_b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * c2m2)
                    - big_b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * c2m2)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dms(d: f64, m: f64, s: f64) -> f64 {
        d + m / 60.0 + s / 3600.0
    }

    #[test]
    fn test_centre_maps_to_false_origin() {
        let mut p = AzimuthalEquidistant::new(Ellipsoid::WGS84, -118.0, 34.0);
        p.x_0 = 1000.0;
        p.y_0 = -250.0;
        let (x, y) = p.forward(-118.0, 34.0).unwrap();
        assert_eq!((x, y), (1000.0, -250.0));
        assert_eq!(p.inverse(1000.0, -250.0).unwrap(), (-118.0, 34.0));
    }

    #[test]
    fn test_one_degree_along_equator() {
        let p = AzimuthalEquidistant::new(Ellipsoid::WGS84, 0.0, 0.0);
        let (x, y) = p.forward(1.0, 0.0).unwrap();
        assert_abs_diff_eq!(x, 111_319.490_8, epsilon = 1e-3);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_flinders_peak_to_buninyong() {
        // Vincenty (1975) worked example on GRS80.
        let lon_0 = dms(144.0, 25.0, 29.5244);
        let lat_0 = -dms(37.0, 57.0, 3.7203);
        let p = AzimuthalEquidistant::new(Ellipsoid::GRS80, lon_0, lat_0);

        let lon = dms(143.0, 55.0, 35.3839);
        let lat = -dms(37.0, 39.0, 10.1561);
        let (x, y) = p.forward(lon, lat).unwrap();
        assert_abs_diff_eq!(x.hypot(y), 54_972.271, epsilon = 1e-3);
        let azimuth = x.atan2(y).to_degrees().rem_euclid(360.0);
        assert_abs_diff_eq!(azimuth, dms(306.0, 52.0, 5.37), epsilon = 1e-5);

        let (lon2, lat2) = p.inverse(x, y).unwrap();
        assert_abs_diff_eq!(lon2, lon, epsilon = 1e-9);
        assert_abs_diff_eq!(lat2, lat, epsilon = 1e-9);
    }

    #[test]
    fn test_round_trip_regional() {
        let p = AzimuthalEquidistant::new(Ellipsoid::WGS84, -118.0, 34.0);
        for &(x, y) in &[(12_500.0, -40_000.0), (-150_000.0, 90_000.0), (0.0, 250_000.0)] {
            let (lon, lat) = p.inverse(x, y).unwrap();
            let (x2, y2) = p.forward(lon, lat).unwrap();
            assert_abs_diff_eq!(x, x2, epsilon = 1e-4);
            assert_abs_diff_eq!(y, y2, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_rejects_non_finite() {
        let p = AzimuthalEquidistant::new(Ellipsoid::WGS84, 0.0, 0.0);
        assert!(matches!(
            p.forward(f64::INFINITY, 0.0),
            Err(ProjError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            p.inverse(f64::NAN, 0.0),
            Err(ProjError::InvalidPlanar { .. })
        ));
    }
}
