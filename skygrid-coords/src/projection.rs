//! Celestial projections and the native↔celestial spherical rotation.
//!
//! A [`Projection`] maps native spherical coordinates `(φ, θ)` to
//! tangent-plane offsets `(x, y)`; all angles here are radians. The
//! zenithal families carried are the ones the FITS bridge can name: TAN,
//! SIN (with the slant parameters that subsume NCP), ARC, STG and ZEA.

use skygrid_core::constants::HALF_PI;
use skygrid_core::near;

use crate::error::{CoordError, CoordResult};

#[inline]
fn asin_safe(sin_value: f64) -> f64 {
    sin_value.clamp(-1.0, 1.0).asin()
}

/// Wraps a longitude into (-π, π].
#[inline]
pub(crate) fn wrap_longitude(lon: f64) -> f64 {
    let mut wrapped = lon % skygrid_core::constants::TWOPI;
    if wrapped > skygrid_core::constants::PI {
        wrapped -= skygrid_core::constants::TWOPI;
    } else if wrapped <= -skygrid_core::constants::PI {
        wrapped += skygrid_core::constants::TWOPI;
    }
    wrapped
}

#[inline]
fn radial_to_xy(r_theta: f64, phi: f64) -> (f64, f64) {
    let (sin_phi, cos_phi) = phi.sin_cos();
    (r_theta * sin_phi, -r_theta * cos_phi)
}

#[inline]
fn xy_to_polar(x: f64, y: f64) -> (f64, f64, bool) {
    let r_theta = libm::hypot(x, y);
    let at_pole = r_theta == 0.0;
    let phi = if at_pole { 0.0 } else { x.atan2(-y) };
    (phi, r_theta, at_pole)
}

/// Projection family plus parameters, as carried by a direction
/// sub-coordinate and named in FITS ctype suffixes.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Tan,
    Sin { xi: f64, eta: f64 },
    Arc,
    Stg,
    Zea,
}

impl Projection {
    pub fn tan() -> Self {
        Self::Tan
    }

    pub fn sin() -> Self {
        Self::Sin { xi: 0.0, eta: 0.0 }
    }

    pub fn sin_with_params(xi: f64, eta: f64) -> Self {
        Self::Sin { xi, eta }
    }

    /// Three-letter FITS code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Tan => "TAN",
            Self::Sin { .. } => "SIN",
            Self::Arc => "ARC",
            Self::Stg => "STG",
            Self::Zea => "ZEA",
        }
    }

    /// Projection parameters in FITS order; empty for the parameterless
    /// families.
    pub fn parameters(&self) -> Vec<f64> {
        match self {
            Self::Sin { xi, eta } => vec![*xi, *eta],
            _ => Vec::new(),
        }
    }

    pub fn from_code(code: &str, params: &[f64]) -> CoordResult<Self> {
        match code {
            "TAN" => Ok(Self::Tan),
            "SIN" => {
                let xi = params.first().copied().unwrap_or(0.0);
                let eta = params.get(1).copied().unwrap_or(0.0);
                Ok(Self::Sin { xi, eta })
            }
            "ARC" => Ok(Self::Arc),
            "STG" => Ok(Self::Stg),
            "ZEA" => Ok(Self::Zea),
            _ => Err(CoordError::fits_unknown_projection(code)),
        }
    }

    /// Native coordinates of the fiducial point. Zenithal projections all
    /// reference the native pole.
    pub fn native_reference(&self) -> (f64, f64) {
        (0.0, HALF_PI)
    }

    /// Native spherical to tangent-plane offsets, radians in and out.
    pub fn project(&self, phi: f64, theta: f64) -> CoordResult<(f64, f64)> {
        match self {
            Self::Tan => {
                if theta == HALF_PI {
                    return Ok((0.0, 0.0));
                }
                if theta <= 0.0 {
                    return Err(CoordError::conversion_failure(
                        "TAN projection undefined at theta <= 0",
                    ));
                }
                let (sin_theta, cos_theta) = theta.sin_cos();
                Ok(radial_to_xy(cos_theta / sin_theta, phi))
            }
            Self::Sin { xi, eta } => {
                let (sin_theta, cos_theta) = theta.sin_cos();
                let (sin_phi, cos_phi) = phi.sin_cos();
                let x = cos_theta * sin_phi + xi * (1.0 - sin_theta);
                let y = -(cos_theta * cos_phi - eta * (1.0 - sin_theta));
                Ok((x, y))
            }
            Self::Arc => Ok(radial_to_xy(HALF_PI - theta, phi)),
            Self::Stg => {
                if theta == -HALF_PI {
                    return Err(CoordError::conversion_failure(
                        "STG projection diverges at theta = -90 deg",
                    ));
                }
                let (sin_theta, cos_theta) = theta.sin_cos();
                Ok(radial_to_xy(2.0 * cos_theta / (1.0 + sin_theta), phi))
            }
            Self::Zea => {
                let r_theta = (2.0 * (1.0 - theta.sin())).sqrt();
                Ok(radial_to_xy(r_theta, phi))
            }
        }
    }

    /// Tangent-plane offsets back to native spherical, radians in and out.
    pub fn deproject(&self, x: f64, y: f64) -> CoordResult<(f64, f64)> {
        match self {
            Self::Tan => {
                let (phi, r_theta, at_pole) = xy_to_polar(x, y);
                if at_pole {
                    return Ok((0.0, HALF_PI));
                }
                Ok((phi, 1.0_f64.atan2(r_theta)))
            }
            Self::Sin { xi, eta } => {
                let a = xi * xi + eta * eta + 1.0;
                let b = xi * (x - xi) + eta * (y - eta);
                let c = (x - xi) * (x - xi) + (y - eta) * (y - eta) - 1.0;
                let discriminant = b * b - a * c;
                if discriminant < 0.0 {
                    return Err(CoordError::conversion_failure(
                        "point outside SIN projection boundary",
                    ));
                }
                let sin_theta = (-b + discriminant.sqrt()) / a;
                if sin_theta.abs() > 1.0 {
                    return Err(CoordError::conversion_failure(
                        "invalid theta in SIN deprojection",
                    ));
                }
                let theta = sin_theta.asin();
                let x_adj = x - xi * (1.0 - sin_theta);
                let y_adj = y - eta * (1.0 - sin_theta);
                let phi = if x_adj == 0.0 && y_adj == 0.0 {
                    0.0
                } else {
                    x_adj.atan2(-y_adj)
                };
                Ok((phi, theta))
            }
            Self::Arc => {
                let (phi, r_theta, at_pole) = xy_to_polar(x, y);
                if at_pole {
                    return Ok((0.0, HALF_PI));
                }
                Ok((phi, HALF_PI - r_theta))
            }
            Self::Stg => {
                let (phi, r_theta, at_pole) = xy_to_polar(x, y);
                if at_pole {
                    return Ok((0.0, HALF_PI));
                }
                Ok((phi, HALF_PI - 2.0 * (r_theta / 2.0).atan()))
            }
            Self::Zea => {
                let (phi, r_theta, at_pole) = xy_to_polar(x, y);
                if at_pole {
                    return Ok((0.0, HALF_PI));
                }
                let rho = r_theta / 2.0;
                if rho > 1.0 {
                    return Err(CoordError::conversion_failure(
                        "point outside ZEA projection boundary",
                    ));
                }
                Ok((phi, HALF_PI - 2.0 * rho.asin()))
            }
        }
    }

    /// Whether this is SIN with both slant parameters zero.
    pub fn is_plain_sin(&self) -> bool {
        match self {
            Self::Sin { xi, eta } => {
                near(*xi, 0.0, skygrid_core::NEAR_TOL) && near(*eta, 0.0, skygrid_core::NEAR_TOL)
            }
            _ => false,
        }
    }
}

/// Euler rotation between native spherical coordinates and the celestial
/// frame, built from the reference value of a direction coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalRotation {
    alpha_p: f64,
    delta_p: f64,
    phi_p: f64,
    sin_delta_p: f64,
    cos_delta_p: f64,
}

impl SphericalRotation {
    /// Builds the rotation for a zenithal projection referenced at
    /// `(alpha_0, delta_0)`; `theta_0` is the projection's native latitude
    /// of the fiducial point. All radians.
    pub fn from_crval(alpha_0: f64, delta_0: f64, theta_0: f64) -> Self {
        // Default LONPOLE per Greisen & Calabretta paper II.
        let phi_p = if delta_0 >= theta_0 {
            0.0
        } else {
            skygrid_core::constants::PI
        };

        // For zenithal projections the celestial pole of the native system
        // follows directly from the fiducial point.
        let (sin_delta_0, cos_delta_0) = delta_0.sin_cos();
        let (sin_theta_0, cos_theta_0) = theta_0.sin_cos();
        let (sin_phi_p, cos_phi_p) = phi_p.sin_cos();

        let delta_p = if theta_0 == HALF_PI {
            delta_0
        } else {
            let base = sin_theta_0.atan2(cos_theta_0 * cos_phi_p);
            let denom_sq = 1.0 - cos_theta_0 * sin_phi_p * cos_theta_0 * sin_phi_p;
            let acos_term = (sin_delta_0 / denom_sq.sqrt()).clamp(-1.0, 1.0).acos();
            base + acos_term
        };

        let x = -cos_theta_0 * sin_phi_p;
        let y = sin_theta_0 * cos_delta_0 - cos_theta_0 * sin_delta_0 * cos_phi_p;
        let alpha_p = alpha_0 + x.atan2(y);

        let (sin_delta_p, cos_delta_p) = delta_p.sin_cos();
        Self {
            alpha_p: wrap_longitude(alpha_p),
            delta_p,
            phi_p,
            sin_delta_p,
            cos_delta_p,
        }
    }

    /// Native `(φ, θ)` to celestial `(α, δ)`, radians.
    pub fn native_to_celestial(&self, phi: f64, theta: f64) -> (f64, f64) {
        let (sin_theta, cos_theta) = theta.sin_cos();
        let d_phi = phi - self.phi_p;
        let (sin_d_phi, cos_d_phi) = d_phi.sin_cos();

        let sin_delta = sin_theta * self.sin_delta_p + cos_theta * self.cos_delta_p * cos_d_phi;
        let delta = asin_safe(sin_delta);

        let x = -cos_theta * sin_d_phi;
        let y = sin_theta * self.cos_delta_p - cos_theta * self.sin_delta_p * cos_d_phi;
        let alpha = self.alpha_p + x.atan2(y);

        (wrap_longitude(alpha), delta)
    }

    /// Celestial `(α, δ)` to native `(φ, θ)`, radians.
    pub fn celestial_to_native(&self, alpha: f64, delta: f64) -> (f64, f64) {
        let (sin_delta, cos_delta) = delta.sin_cos();
        let d_alpha = alpha - self.alpha_p;
        let (sin_d_alpha, cos_d_alpha) = d_alpha.sin_cos();

        let sin_theta = sin_delta * self.sin_delta_p + cos_delta * self.cos_delta_p * cos_d_alpha;
        let theta = asin_safe(sin_theta);

        let x = -cos_delta * sin_d_alpha;
        let y = sin_delta * self.cos_delta_p - cos_delta * self.sin_delta_p * cos_d_alpha;
        let phi = self.phi_p + x.atan2(y);

        (phi, theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use skygrid_core::constants::DEG_TO_RAD;

    #[test]
    fn test_tan_reference_point() {
        let (x, y) = Projection::Tan.project(0.0, HALF_PI).unwrap();
        assert_eq!((x, y), (0.0, 0.0));
    }

    #[test]
    fn test_tan_roundtrip() {
        let proj = Projection::Tan;
        let (phi0, theta0) = (0.7, 1.2);
        let (x, y) = proj.project(phi0, theta0).unwrap();
        let (phi, theta) = proj.deproject(x, y).unwrap();
        assert_abs_diff_eq!(phi, phi0, epsilon = 1e-12);
        assert_abs_diff_eq!(theta, theta0, epsilon = 1e-12);
    }

    #[test]
    fn test_tan_rejects_horizon() {
        assert!(Projection::Tan.project(0.0, 0.0).is_err());
        assert!(Projection::Tan.project(0.0, -0.3).is_err());
    }

    #[test]
    fn test_sin_roundtrip() {
        let proj = Projection::sin();
        let (x, y) = proj.project(0.4, 1.3).unwrap();
        let (phi, theta) = proj.deproject(x, y).unwrap();
        assert_abs_diff_eq!(phi, 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(theta, 1.3, epsilon = 1e-12);
    }

    #[test]
    fn test_slant_sin_roundtrip() {
        let proj = Projection::sin_with_params(0.0, 1.0);
        let (x, y) = proj.project(-0.2, 1.1).unwrap();
        let (phi, theta) = proj.deproject(x, y).unwrap();
        assert_abs_diff_eq!(phi, -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(theta, 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_arc_is_linear_in_colatitude() {
        let (x, y) = Projection::Arc.project(0.0, HALF_PI - 0.25).unwrap();
        assert_abs_diff_eq!(libm::hypot(x, y), 0.25, epsilon = 1e-14);
    }

    #[test]
    fn test_stg_zea_roundtrip() {
        for proj in [Projection::Stg, Projection::Zea] {
            let (x, y) = proj.project(1.9, 0.8).unwrap();
            let (phi, theta) = proj.deproject(x, y).unwrap();
            assert_abs_diff_eq!(phi, 1.9, epsilon = 1e-12);
            assert_abs_diff_eq!(theta, 0.8, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zea_outside_boundary() {
        assert!(Projection::Zea.deproject(2.5, 0.0).is_err());
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Projection::from_code("TAN", &[]).unwrap(), Projection::Tan);
        assert_eq!(
            Projection::from_code("SIN", &[0.0, 2.0]).unwrap(),
            Projection::Sin { xi: 0.0, eta: 2.0 }
        );
        assert!(matches!(
            Projection::from_code("BOGUS", &[]),
            Err(CoordError::FitsUnknownProjection { .. })
        ));
    }

    #[test]
    fn test_is_plain_sin() {
        assert!(Projection::sin().is_plain_sin());
        assert!(!Projection::sin_with_params(0.0, 0.5).is_plain_sin());
        assert!(!Projection::Tan.is_plain_sin());
    }

    #[test]
    fn test_rotation_reference_maps_to_pole() {
        let rot = SphericalRotation::from_crval(2.0, 0.5, HALF_PI);
        let (alpha, delta) = rot.native_to_celestial(0.0, HALF_PI);
        assert_abs_diff_eq!(alpha, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(delta, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_roundtrip() {
        let rot = SphericalRotation::from_crval(
            120.0 * DEG_TO_RAD,
            35.0 * DEG_TO_RAD,
            HALF_PI,
        );
        let (alpha, delta) = rot.native_to_celestial(0.6, 1.1);
        let (phi, theta) = rot.celestial_to_native(alpha, delta);
        assert_abs_diff_eq!(wrap_longitude(phi - 0.6), 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(theta, 1.1, epsilon = 1e-10);
    }

    #[test]
    fn test_wrap_longitude() {
        assert_abs_diff_eq!(
            wrap_longitude(skygrid_core::constants::TWOPI + 0.1),
            0.1,
            epsilon = 1e-14
        );
        assert!(wrap_longitude(4.0) < 0.0);
    }
}
