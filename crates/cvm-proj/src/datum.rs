//! Reference ellipsoids and geodetic datums.

/// A reference ellipsoid given by its semi-major axis and flattening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in meters.
    pub a: f64,
    /// Flattening.
    pub f: f64,
}

impl Ellipsoid {
    /// WGS 84.
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    /// GRS 1980 (NAD83).
    pub const GRS80: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_222_101,
    };

    /// Clarke 1866 (NAD27).
    pub const CLARKE_1866: Ellipsoid = Ellipsoid {
        a: 6_378_206.4,
        f: 1.0 / 294.978_698_213_898,
    };

    /// Look up an ellipsoid by its PROJ name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "wgs84" => Some(Self::WGS84),
            "grs80" => Some(Self::GRS80),
            "clrk66" => Some(Self::CLARKE_1866),
            _ => None,
        }
    }

    /// PROJ name of a known ellipsoid.
    pub fn name(&self) -> Option<&'static str> {
        [
            (Self::WGS84, "WGS84"),
            (Self::GRS80, "GRS80"),
            (Self::CLARKE_1866, "clrk66"),
        ]
        .iter()
        .find(|(e, _)| e == self)
        .map(|(_, name)| *name)
    }

    /// Semi-minor axis in meters.
    pub fn b(&self) -> f64 {
        self.a * (1.0 - self.f)
    }

    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// Third flattening `n = (a - b) / (a + b)`.
    pub fn third_flattening(&self) -> f64 {
        self.f / (2.0 - self.f)
    }

    /// Geodetic (radians, height in meters) to earth-centred cartesian.
    pub(crate) fn to_geocentric(&self, lon: f64, lat: f64, h: f64) -> [f64; 3] {
        let e2 = self.e2();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        [
            (n + h) * cos_lat * lon.cos(),
            (n + h) * cos_lat * lon.sin(),
            (n * (1.0 - e2) + h) * sin_lat,
        ]
    }

    /// Earth-centred cartesian to geodetic (radians, height in meters).
    pub(crate) fn from_geocentric(&self, xyz: [f64; 3]) -> (f64, f64, f64) {
        let [x, y, z] = xyz;
        let e2 = self.e2();
        let lon = y.atan2(x);
        let p = x.hypot(y);

        if p < 1e-9 {
            let lat = if z >= 0.0 {
                std::f64::consts::FRAC_PI_2
            } else {
                -std::f64::consts::FRAC_PI_2
            };
            return (lon, lat, z.abs() - self.b());
        }

        let mut lat = z.atan2(p * (1.0 - e2));
        let mut h = 0.0;
        for _ in 0..10 {
            let sin_lat = lat.sin();
            let n = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
            h = p / lat.cos() - n;
            let next = z.atan2(p * (1.0 - e2 * n / (n + h)));
            let done = (next - lat).abs() < 1e-14;
            lat = next;
            if done {
                break;
            }
        }
        (lon, lat, h)
    }
}

/// A geodetic datum: an ellipsoid plus a geocentric translation to WGS84.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datum {
    /// The datum's ellipsoid.
    pub ellipsoid: Ellipsoid,
    /// Translation (dx, dy, dz) in meters taking this datum's geocentric
    /// coordinates to WGS84.
    pub to_wgs84: [f64; 3],
}

impl Datum {
    /// WGS 84.
    pub const WGS84: Datum = Datum {
        ellipsoid: Ellipsoid::WGS84,
        to_wgs84: [0.0; 3],
    };

    /// North American Datum 1983.
    pub const NAD83: Datum = Datum {
        ellipsoid: Ellipsoid::GRS80,
        to_wgs84: [0.0; 3],
    };

    /// North American Datum 1927, CONUS mean translation.
    pub const NAD27: Datum = Datum {
        ellipsoid: Ellipsoid::CLARKE_1866,
        to_wgs84: [-8.0, 160.0, 176.0],
    };

    /// Datum on the given ellipsoid with no shift.
    pub fn from_ellipsoid(ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            to_wgs84: [0.0; 3],
        }
    }

    /// Look up a datum by its PROJ name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "WGS84" => Some(Self::WGS84),
            "NAD83" => Some(Self::NAD83),
            "NAD27" => Some(Self::NAD27),
            _ => None,
        }
    }

    /// True when geographic coordinates need no conversion to or from WGS84.
    ///
    /// GRS80 and WGS84 differ by a fraction of a millimetre in the semi-minor
    /// axis, so an unshifted GRS80 datum is treated as WGS84.
    pub fn is_wgs84_equivalent(&self) -> bool {
        self.to_wgs84 == [0.0; 3] && self.ellipsoid.a == Ellipsoid::WGS84.a
    }

    /// Convert WGS84 geographic degrees to this datum's geographic degrees.
    pub fn from_wgs84(&self, lon: f64, lat: f64) -> (f64, f64) {
        if self.is_wgs84_equivalent() {
            return (lon, lat);
        }
        let [x, y, z] = Ellipsoid::WGS84.to_geocentric(lon.to_radians(), lat.to_radians(), 0.0);
        let [dx, dy, dz] = self.to_wgs84;
        let (lon, lat, _) = self.ellipsoid.from_geocentric([x - dx, y - dy, z - dz]);
        (lon.to_degrees(), lat.to_degrees())
    }

    /// Convert this datum's geographic degrees to WGS84 geographic degrees.
    pub fn to_wgs84(&self, lon: f64, lat: f64) -> (f64, f64) {
        if self.is_wgs84_equivalent() {
            return (lon, lat);
        }
        let [x, y, z] = self.ellipsoid.to_geocentric(lon.to_radians(), lat.to_radians(), 0.0);
        let [dx, dy, dz] = self.to_wgs84;
        let (lon, lat, _) = Ellipsoid::WGS84.from_geocentric([x + dx, y + dy, z + dz]);
        (lon.to_degrees(), lat.to_degrees())
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::WGS84
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_geocentric_round_trip() {
        let e = Ellipsoid::CLARKE_1866;
        let (lon, lat, h) = (-118f64.to_radians(), 34f64.to_radians(), 250.0);
        let xyz = e.to_geocentric(lon, lat, h);
        let (lon2, lat2, h2) = e.from_geocentric(xyz);
        assert_abs_diff_eq!(lon, lon2, epsilon = 1e-12);
        assert_abs_diff_eq!(lat, lat2, epsilon = 1e-12);
        assert_abs_diff_eq!(h, h2, epsilon = 1e-6);
    }

    #[test]
    fn test_wgs84_is_identity() {
        assert_eq!(Datum::WGS84.from_wgs84(-118.0, 34.0), (-118.0, 34.0));
        assert_eq!(Datum::NAD83.to_wgs84(-118.0, 34.0), (-118.0, 34.0));
    }

    #[test]
    fn test_nad27_shift_round_trip() {
        let (lon, lat) = Datum::NAD27.from_wgs84(-118.0, 34.0);
        // NAD27 positions in southern California sit roughly 80 m east
        // and a few meters south of their WGS84 counterparts.
        assert!(lon > -118.0 && lon < -117.998, "lon {}", lon);
        assert!((lat - 34.0).abs() < 1e-3, "lat {}", lat);

        let (lon2, lat2) = Datum::NAD27.to_wgs84(lon, lat);
        assert_abs_diff_eq!(lon2, -118.0, epsilon = 1e-8);
        assert_abs_diff_eq!(lat2, 34.0, epsilon = 1e-8);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Ellipsoid::by_name("clrk66"), Some(Ellipsoid::CLARKE_1866));
        assert_eq!(Ellipsoid::GRS80.name(), Some("GRS80"));
        assert_eq!(Datum::by_name("nad27"), Some(Datum::NAD27));
        assert_eq!(Datum::by_name("ED50"), None);
    }
}
