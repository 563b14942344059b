//! Vs30-based near-surface taper.
//!
//! Above the first layer boundary the grid's value at that boundary is
//! blended with a Vs30 proxy. With `p = depth / interval`:
//!
//! ```text
//! f = p + b (p - p^2)
//! g = a - a p + c (p^2 + 2 sqrt(p) - 3 p)
//! vs = f * vs_deep + g * vs30
//! vp = f * vp_deep + g * vp30
//! ```
//!
//! `vp30` comes from an empirical quartic in Vs30 (km/s).

use crate::Properties;

const VP30_COEFFICIENTS: [f64; 5] = [0.9409, 2.0947, -0.8206, 0.2683, -0.0251];

/// Taper coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GtlWeights {
    /// Proxy weight at the surface; scales the linear term of `g`.
    pub a: f64,
    /// Curvature of the deep weight `f`.
    pub b: f64,
    /// Curvature of the proxy weight `g`.
    pub c: f64,
}

impl Default for GtlWeights {
    fn default() -> Self {
        Self {
            a: 0.5,
            b: 0.6,
            c: 0.5,
        }
    }
}

impl GtlWeights {
    /// Weights `(f, g)` of the deep value and the proxy at fraction `p`.
    ///
    /// Returns `None` unless `0 <= p <= 1`.
    pub fn weights(&self, p: f64) -> Option<(f64, f64)> {
        if !(0.0..=1.0).contains(&p) {
            return None;
        }
        let p2 = p * p;
        let f = p + self.b * (p - p2);
        let g = self.a - self.a * p + self.c * (p2 + 2.0 * p.sqrt() - 3.0 * p);
        Some((f, g))
    }

    /// Blend the deep reference velocities with a Vs30 value (m/s).
    ///
    /// Only `vp` and `vs` are set in the result.
    pub fn blend(&self, p: f64, deep: &Properties, vs30: f64) -> Option<Properties> {
        let (f, g) = self.weights(p)?;
        Some(Properties::velocities(
            f * deep.vp + g * vp_from_vs30(vs30),
            f * deep.vs + g * vs30,
        ))
    }
}

/// P-wave proxy (m/s) for a Vs30 value (m/s).
pub fn vp_from_vs30(vs30: f64) -> f64 {
    let v = vs30 / 1000.0;
    let km_s = VP30_COEFFICIENTS
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * v + c);
    km_s * 1000.0
}
