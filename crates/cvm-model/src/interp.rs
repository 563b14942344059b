//! Linear, bilinear and trilinear interpolation of [`Properties`].
//!
//! Every field is blended independently. Corner values are used as given,
//! so a not-found corner (-1) is absorbed into the result.

use crate::Properties;

/// Linear blend `(1 - t) * a + t * b` of every field.
pub fn lerp(t: f64, a: &Properties, b: &Properties) -> Properties {
    let mix = |x: f64, y: f64| (1.0 - t) * x + t * y;
    Properties {
        vp: mix(a.vp, b.vp),
        vs: mix(a.vs, b.vs),
        rho: mix(a.rho, b.rho),
        qp: mix(a.qp, b.qp),
        qs: mix(a.qs, b.qs),
    }
}

/// Bilinear blend over corners ordered origin, `+x`, `+y`, `+x+y`.
pub fn bilerp(tx: f64, ty: f64, corners: &[Properties; 4]) -> Properties {
    let lower = lerp(tx, &corners[0], &corners[1]);
    let upper = lerp(tx, &corners[2], &corners[3]);
    lerp(ty, &lower, &upper)
}

/// Trilinear blend over two stacked planes.
///
/// The first four corners are the plane at `tz = 0`, the last four the plane
/// at `tz = 1`, each in [`bilerp`] order.
pub fn trilerp(tx: f64, ty: f64, tz: f64, corners: &[Properties; 8]) -> Properties {
    let top = bilerp(tx, ty, &[corners[0], corners[1], corners[2], corners[3]]);
    let bottom = bilerp(tx, ty, &[corners[4], corners[5], corners[6], corners[7]]);
    lerp(tz, &top, &bottom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn props(v: f64) -> Properties {
        Properties {
            vp: v,
            vs: v / 2.0,
            rho: v + 1.0,
            qp: -v,
            qs: 3.0 * v,
        }
    }

    fn cube() -> [Properties; 8] {
        [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0].map(props)
    }

    #[test]
    fn test_lerp_endpoints() {
        let (a, b) = (props(10.0), props(20.0));
        assert_eq!(lerp(0.0, &a, &b), a);
        assert_eq!(lerp(1.0, &a, &b), b);
        assert_eq!(lerp(0.25, &a, &b).vp, 12.5);
    }

    #[test]
    fn test_corner_exactness() {
        let corners = cube();
        assert_eq!(trilerp(0.0, 0.0, 0.0, &corners), corners[0]);
        assert_eq!(trilerp(1.0, 1.0, 1.0, &corners), corners[7]);
        assert_eq!(trilerp(1.0, 0.0, 0.0, &corners), corners[1]);
        assert_eq!(trilerp(0.0, 1.0, 1.0, &corners), corners[6]);

        let plane = [corners[0], corners[1], corners[2], corners[3]];
        assert_eq!(bilerp(0.0, 0.0, &plane), plane[0]);
        assert_eq!(bilerp(1.0, 1.0, &plane), plane[3]);
    }

    #[test]
    fn test_linear_in_each_fraction() {
        let corners = cube();
        let plane = [corners[0], corners[1], corners[2], corners[3]];
        // Holding the other fractions fixed, the midpoint is the mean of the ends.
        for (ty, tz) in [(0.0, 0.0), (0.3, 0.7), (1.0, 0.5)] {
            let lo = trilerp(0.0, ty, tz, &corners).vp;
            let hi = trilerp(1.0, ty, tz, &corners).vp;
            let mid = trilerp(0.5, ty, tz, &corners).vp;
            assert_abs_diff_eq!(mid, 0.5 * (lo + hi), epsilon = 1e-12);

            let q = trilerp(0.25, ty, tz, &corners).vp;
            assert_abs_diff_eq!(q, 0.75 * lo + 0.25 * hi, epsilon = 1e-12);
        }
        for tx in [0.0, 0.4, 1.0] {
            let lo = bilerp(tx, 0.0, &plane).qs;
            let hi = bilerp(tx, 1.0, &plane).qs;
            assert_abs_diff_eq!(bilerp(tx, 0.6, &plane).qs, 0.4 * lo + 0.6 * hi, epsilon = 1e-12);
        }
        let lo = trilerp(0.2, 0.9, 0.0, &corners).rho;
        let hi = trilerp(0.2, 0.9, 1.0, &corners).rho;
        assert_abs_diff_eq!(
            trilerp(0.2, 0.9, 0.1, &corners).rho,
            0.9 * lo + 0.1 * hi,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_not_found_corner_is_absorbed() {
        let mut corners = cube();
        corners[0] = Properties::NOT_FOUND;
        let value = trilerp(0.5, 0.0, 0.0, &corners);
        assert_eq!(value.vp, 0.5 * (-1.0 + 2.0));
    }
}
