//! Projections as used by the Southern California model family.

use approx::assert_abs_diff_eq;
use cvm_proj::{Datum, ProjError, Projection};

#[test]
fn test_utm_zone_11_wgs84() {
    let proj = Projection::from_proj_string("+proj=utm +zone=11 +datum=WGS84 +units=m +no_defs")
        .unwrap();
    let (e, n) = proj.forward(-118.0, 34.0).unwrap();
    assert_abs_diff_eq!(e, 407_650.397, epsilon = 1e-3);
    assert_abs_diff_eq!(n, 3_762_606.660, epsilon = 1e-3);
}

#[test]
fn test_utm_zone_11_nad27_shift() {
    let wgs84 = Projection::utm(11, false, Datum::WGS84).unwrap();
    let nad27 = Projection::utm(11, false, Datum::NAD27).unwrap();
    let (e0, n0) = wgs84.forward(-118.0, 34.0).unwrap();
    let (e1, n1) = nad27.forward(-118.0, 34.0).unwrap();

    // NAD27 grid coordinates sit roughly 80 m east and 200 m south.
    assert_abs_diff_eq!(e1 - e0, 80.0, epsilon = 5.0);
    assert_abs_diff_eq!(n1 - n0, -198.0, epsilon = 5.0);
}

#[test]
fn test_footprint_round_trip() {
    let proj = Projection::utm(11, false, Datum::NAD27).unwrap();
    for (lon, lat) in [(-120.86, 30.95), (-113.33, 36.61), (-118.0, 34.0)] {
        let (e, n) = proj.forward(lon, lat).unwrap();
        let (lon2, lat2) = proj.inverse(e, n).unwrap();
        assert_abs_diff_eq!(lon, lon2, epsilon = 1e-8);
        assert_abs_diff_eq!(lat, lat2, epsilon = 1e-8);
    }
}

#[test]
fn test_vs30_map_projection() {
    let proj = Projection::from_proj_string(
        "+proj=aeqd +lat_0=34.0 +lon_0=-118.0 +x_0=0.0 +y_0=0.0 +ellps=WGS84 +units=m +no_defs",
    )
    .unwrap();
    let (x, y) = proj.forward(-118.0, 34.0).unwrap();
    assert_abs_diff_eq!(x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(y, 0.0, epsilon = 1e-9);

    // Due north by 0.1 degree is about 11.09 km.
    let (x, y) = proj.forward(-118.0, 34.1).unwrap();
    assert_abs_diff_eq!(x, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(y, 11_092.0, epsilon = 5.0);
}

#[test]
fn test_rejects_bad_input() {
    let proj = Projection::utm(11, false, Datum::NAD27).unwrap();
    assert!(matches!(
        proj.forward(-118.0, 90.5),
        Err(ProjError::InvalidCoordinate { .. })
    ));
    assert!(proj.forward(f64::NAN, 34.0).is_err());
    assert!(matches!(
        Projection::from_proj_string("+proj=merc +ellps=WGS84"),
        Err(ProjError::UnsupportedProjection(_))
    ));
}
