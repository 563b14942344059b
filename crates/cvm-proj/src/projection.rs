//! Projections with their datum, built from PROJ.4-style definitions.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::{
    check_geographic, AzimuthalEquidistant, Datum, Ellipsoid, ProjError, Result,
    TransverseMercator,
};

/// A planar (or geographic) coordinate system on a datum.
///
/// `forward` always takes WGS84 longitude/latitude in degrees and `inverse`
/// always returns them; the datum shift happens inside.
#[derive(Debug, Clone)]
pub enum Projection {
    /// Geographic coordinates on the datum, in degrees.
    LongLat {
        /// Target datum.
        datum: Datum,
    },
    /// Transverse Mercator (including UTM).
    TransverseMercator {
        /// Projection parameters.
        tm: TransverseMercator,
        /// Target datum.
        datum: Datum,
    },
    /// Azimuthal Equidistant.
    AzimuthalEquidistant {
        /// Projection parameters.
        aeqd: AzimuthalEquidistant,
        /// Target datum.
        datum: Datum,
    },
}

impl Projection {
    /// UTM zone on the given datum.
    pub fn utm(zone: i32, south: bool, datum: Datum) -> Result<Self> {
        Ok(Self::TransverseMercator {
            tm: TransverseMercator::utm(datum.ellipsoid, zone, south)?,
            datum,
        })
    }

    /// Parse a PROJ.4 definition such as
    /// `+proj=utm +zone=11 +ellps=clrk66 +datum=NAD27 +units=m +no_defs`.
    pub fn from_proj_string(definition: &str) -> Result<Self> {
        let params = ProjParams::parse(definition);
        let datum = params.datum()?;

        if let Some(units) = params.get("units") {
            if units != "m" {
                return Err(ProjError::InvalidParameter {
                    name: "units".to_string(),
                    value: units.to_string(),
                });
            }
        }

        let proj = params.get("proj").ok_or(ProjError::MissingParameter("proj"))?;
        let projection = match proj {
            "longlat" | "latlong" | "lonlat" | "latlon" => Self::LongLat { datum },
            "utm" => {
                let zone = params
                    .number("zone")?
                    .ok_or(ProjError::MissingParameter("zone"))?;
                if zone.fract() != 0.0 {
                    return Err(ProjError::InvalidParameter {
                        name: "zone".to_string(),
                        value: zone.to_string(),
                    });
                }
                Self::utm(zone as i32, params.has("south"), datum)?
            }
            "tmerc" => {
                let k_0 = match params.number("k_0")? {
                    Some(k) => Some(k),
                    None => params.number("k")?,
                };
                let tm = TransverseMercator::new(
                    datum.ellipsoid,
                    params.number("lon_0")?.unwrap_or(0.0),
                    params.number("lat_0")?.unwrap_or(0.0),
                    k_0.unwrap_or(1.0),
                    params.number("x_0")?.unwrap_or(0.0),
                    params.number("y_0")?.unwrap_or(0.0),
                );
                Self::TransverseMercator { tm, datum }
            }
            "aeqd" => {
                let mut aeqd = AzimuthalEquidistant::new(
                    datum.ellipsoid,
                    params.number("lon_0")?.unwrap_or(0.0),
                    params.number("lat_0")?.unwrap_or(0.0),
                );
                aeqd.x_0 = params.number("x_0")?.unwrap_or(0.0);
                aeqd.y_0 = params.number("y_0")?.unwrap_or(0.0);
                Self::AzimuthalEquidistant { aeqd, datum }
            }
            other => return Err(ProjError::UnsupportedProjection(other.to_string())),
        };

        params.log_ignored();
        Ok(projection)
    }

    /// The datum planar coordinates are expressed on.
    pub fn datum(&self) -> &Datum {
        match self {
            Self::LongLat { datum }
            | Self::TransverseMercator { datum, .. }
            | Self::AzimuthalEquidistant { datum, .. } => datum,
        }
    }

    /// WGS84 degrees to this system's coordinates.
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        check_geographic(lon, lat)?;
        let (lon, lat) = self.datum().from_wgs84(lon, lat);
        match self {
            Self::LongLat { .. } => Ok((lon, lat)),
            Self::TransverseMercator { tm, .. } => tm.forward(lon, lat),
            Self::AzimuthalEquidistant { aeqd, .. } => aeqd.forward(lon, lat),
        }
    }

    /// This system's coordinates back to WGS84 degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (lon, lat) = match self {
            Self::LongLat { .. } => {
                check_geographic(x, y)?;
                (x, y)
            }
            Self::TransverseMercator { tm, .. } => tm.inverse(x, y)?,
            Self::AzimuthalEquidistant { aeqd, .. } => aeqd.inverse(x, y)?,
        };
        Ok(self.datum().to_wgs84(lon, lat))
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [dx, dy, dz] = self.datum().to_wgs84;
        match self {
            Self::LongLat { .. } => write!(f, "+proj=longlat")?,
            Self::TransverseMercator { tm, .. } => write!(
                f,
                "+proj=tmerc +lat_0={} +lon_0={} +k_0={} +x_0={} +y_0={}",
                tm.lat_0, tm.lon_0, tm.k_0, tm.x_0, tm.y_0
            )?,
            Self::AzimuthalEquidistant { aeqd, .. } => write!(
                f,
                "+proj=aeqd +lat_0={} +lon_0={} +x_0={} +y_0={}",
                aeqd.lat_0, aeqd.lon_0, aeqd.x_0, aeqd.y_0
            )?,
        }
        let ellipsoid = self.datum().ellipsoid;
        match ellipsoid.name() {
            Some(name) => write!(f, " +ellps={}", name)?,
            None => write!(f, " +a={} +rf={}", ellipsoid.a, 1.0 / ellipsoid.f)?,
        }
        if dx != 0.0 || dy != 0.0 || dz != 0.0 {
            write!(f, " +towgs84={},{},{}", dx, dy, dz)?;
        }
        write!(f, " +units=m +no_defs")
    }
}

/// Tokenised `+key=value` / `+flag` parameters.
struct ProjParams<'a> {
    values: HashMap<&'a str, &'a str>,
}

/// Parameters this crate understands; anything else is logged and ignored.
const KNOWN: &[&str] = &[
    "proj", "zone", "south", "ellps", "datum", "towgs84", "lat_0", "lon_0", "x_0", "y_0", "k_0",
    "k", "units", "no_defs",
];

impl<'a> ProjParams<'a> {
    fn parse(definition: &'a str) -> Self {
        let values = definition
            .split_whitespace()
            .map(|token| token.trim_start_matches('+'))
            .filter(|token| !token.is_empty())
            .map(|token| match token.split_once('=') {
                Some((key, value)) => (key, value),
                None => (token, ""),
            })
            .collect();
        Self { values }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.values.get(key).copied()
    }

    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn number(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| ProjError::InvalidParameter {
                    name: key.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    /// Resolve `+datum`, `+ellps` and `+towgs84` into a datum.
    ///
    /// A named datum takes precedence over `+ellps`; an explicit `+towgs84`
    /// replaces whatever shift the datum carried.
    fn datum(&self) -> Result<Datum> {
        let mut datum = match self.get("datum") {
            Some(name) => Datum::by_name(name).ok_or_else(|| ProjError::UnknownReference {
                kind: "datum",
                name: name.to_string(),
            })?,
            None => match self.get("ellps") {
                Some(name) => Ellipsoid::by_name(name)
                    .map(Datum::from_ellipsoid)
                    .ok_or_else(|| ProjError::UnknownReference {
                        kind: "ellipsoid",
                        name: name.to_string(),
                    })?,
                None => Datum::WGS84,
            },
        };

        if let Some(raw) = self.get("towgs84") {
            let invalid = || ProjError::InvalidParameter {
                name: "towgs84".to_string(),
                value: raw.to_string(),
            };
            let parts = raw
                .split(',')
                .map(|p| p.trim().parse::<f64>().map_err(|_| invalid()))
                .collect::<Result<Vec<_>>>()?;
            // Seven-parameter forms are accepted when the rotation and scale are zero.
            let shift_only = parts.len() == 3
                || (parts.len() == 7 && parts[3..].iter().all(|v| *v == 0.0));
            if !shift_only {
                return Err(invalid());
            }
            datum.to_wgs84 = [parts[0], parts[1], parts[2]];
        }
        Ok(datum)
    }

    fn log_ignored(&self) {
        for key in self.values.keys().filter(|k| !KNOWN.contains(k)) {
            debug!("Ignoring unsupported projection parameter +{}", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const CVMS5_UTM: &str = "+proj=utm +zone=11 +ellps=clrk66 +datum=NAD27 +units=m +no_defs";

    #[test]
    fn test_parse_nad27_utm() {
        let p = Projection::from_proj_string(CVMS5_UTM).unwrap();
        assert_eq!(p.datum(), &Datum::NAD27);
        match &p {
            Projection::TransverseMercator { tm, .. } => {
                assert_eq!(tm.lon_0, -117.0);
                assert_eq!(tm.k_0, 0.9996);
                assert_eq!(tm.x_0, 500_000.0);
            }
            other => panic!("unexpected projection {:?}", other),
        }
    }

    #[test]
    fn test_datum_shift_applied_on_forward() {
        let wgs = Projection::utm(11, false, Datum::WGS84).unwrap();
        let nad27 = Projection::from_proj_string(CVMS5_UTM).unwrap();

        let (xw, yw) = wgs.forward(-118.0, 34.0).unwrap();
        assert_abs_diff_eq!(xw, 407_650.397, epsilon = 1e-2);
        assert_abs_diff_eq!(yw, 3_762_606.660, epsilon = 1e-2);

        // Different ellipsoid plus the datum translation moves the point
        // by a few hundred meters.
        let (xn, yn) = nad27.forward(-118.0, 34.0).unwrap();
        let shift = (xn - xw).hypot(yn - yw);
        assert!(shift > 50.0 && shift < 500.0, "shift {}", shift);

        let (lon, lat) = nad27.inverse(xn, yn).unwrap();
        assert_abs_diff_eq!(lon, -118.0, epsilon = 1e-8);
        assert_abs_diff_eq!(lat, 34.0, epsilon = 1e-8);
    }

    #[test]
    fn test_parse_aeqd() {
        let p = Projection::from_proj_string(
            "+proj=aeqd +lat_0=34.0 +lon_0=-118.0 +x_0=0.0 +y_0=0.0 +ellps=WGS84 +units=m +no_defs",
        )
        .unwrap();
        let (x, y) = p.forward(-118.0, 34.0).unwrap();
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-9);

        let (x, y) = p.forward(-118.0, 34.1).unwrap();
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-6);
        assert!(y > 11_000.0 && y < 11_200.0);
    }

    #[test]
    fn test_parse_tmerc_with_towgs84() {
        let p = Projection::from_proj_string(
            "+proj=tmerc +lon_0=-117 +k=1 +x_0=100 +ellps=clrk66 +towgs84=-8,160,176,0,0,0,0",
        )
        .unwrap();
        assert_eq!(p.datum(), &Datum::NAD27);
        match &p {
            Projection::TransverseMercator { tm, .. } => {
                assert_eq!(tm.k_0, 1.0);
                assert_eq!(tm.x_0, 100.0);
            }
            other => panic!("unexpected projection {:?}", other),
        }
    }

    #[test]
    fn test_longlat_round_trip() {
        let p = Projection::from_proj_string("+proj=longlat +datum=NAD27").unwrap();
        let (lon, lat) = p.forward(-118.0, 34.0).unwrap();
        assert!(lon != -118.0);
        let (lon2, lat2) = p.inverse(lon, lat).unwrap();
        assert_abs_diff_eq!(lon2, -118.0, epsilon = 1e-8);
        assert_abs_diff_eq!(lat2, 34.0, epsilon = 1e-8);
    }

    #[test]
    fn test_display_reparses() {
        let p = Projection::from_proj_string(CVMS5_UTM).unwrap();
        let reparsed = Projection::from_proj_string(&p.to_string()).unwrap();
        assert_eq!(reparsed.datum(), p.datum());
        assert_eq!(
            reparsed.forward(-118.0, 34.0).unwrap(),
            p.forward(-118.0, 34.0).unwrap()
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Projection::from_proj_string("+proj=lcc +lat_1=33"),
            Err(ProjError::UnsupportedProjection(_))
        ));
        assert!(matches!(
            Projection::from_proj_string("+zone=11"),
            Err(ProjError::MissingParameter("proj"))
        ));
        assert!(matches!(
            Projection::from_proj_string("+proj=utm +datum=WGS84"),
            Err(ProjError::MissingParameter("zone"))
        ));
        assert!(matches!(
            Projection::from_proj_string("+proj=utm +zone=11 +units=ft"),
            Err(ProjError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Projection::from_proj_string("+proj=tmerc +lon_0=abc"),
            Err(ProjError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Projection::from_proj_string("+proj=utm +zone=11 +datum=ED50"),
            Err(ProjError::UnknownReference { kind: "datum", .. })
        ));
        assert!(matches!(
            Projection::from_proj_string("+proj=utm +zone=0"),
            Err(ProjError::InvalidZone(0))
        ));
    }
}
