//! Density and attenuation derived from shear-wave velocity.

use crate::Properties;

/// Vs (m/s) at and above which the stiffer attenuation factor applies.
pub const QS_VS_THRESHOLD: f64 = 1500.0;

/// Fifth-order polynomial density scaling.
///
/// `rho = 1000 * (p0 + p1 v + p2 v^2 + p3 v^3 + p4 v^4 + p5 v^5)` with `v`
/// the shear-wave velocity in km/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityScaling {
    coefficients: [f64; 6],
}

impl DensityScaling {
    /// Scaling with coefficients `p0..p5`.
    pub fn new(coefficients: [f64; 6]) -> Self {
        Self { coefficients }
    }

    /// Coefficients `p0..p5`.
    pub fn coefficients(&self) -> [f64; 6] {
        self.coefficients
    }

    /// Density in kg/m^3 for a shear-wave velocity in m/s.
    pub fn density(&self, vs: f64) -> f64 {
        let v = vs / 1000.0;
        let poly = self
            .coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, p| acc * v + p);
        1000.0 * poly
    }
}

/// Quality factors `(qp, qs)` for a shear-wave velocity in m/s.
pub fn attenuation(vs: f64) -> (f64, f64) {
    let qs = if vs < QS_VS_THRESHOLD {
        vs * 0.02
    } else {
        vs * 0.10
    };
    (1.5 * qs, qs)
}

/// Overwrite density and attenuation with values derived from `vs`.
pub fn apply(props: &mut Properties, density: &DensityScaling) {
    props.rho = density.density(props.vs);
    let (qp, qs) = attenuation(props.vs);
    props.qp = qp;
    props.qs = qs;
}
