//! Celestial direction sub-coordinate: two coupled sky axes behind a
//! projection.

use nalgebra::{DMatrix, Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use skygrid_core::units;

use crate::coordinate::{Coordinate, CoordinateKind};
use crate::error::{CoordError, CoordResult};
use crate::projection::{wrap_longitude, Projection, SphericalRotation};
use crate::record::Record;

const MIX_MAX_ITER: usize = 100;
const MIX_TOL_RAD: f64 = 1.0e-12;

/// Celestial reference frame of a direction coordinate. Frame conversion
/// is out of scope here; the frame rides along for axis naming and FITS
/// equinox handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionFrame {
    J2000,
    B1950,
    Galactic,
}

impl DirectionFrame {
    /// Short axis names used to build FITS ctype values.
    pub fn axis_names(&self) -> (&'static str, &'static str) {
        match self {
            Self::J2000 | Self::B1950 => ("RA", "DEC"),
            Self::Galactic => ("GLON", "GLAT"),
        }
    }

    /// FITS equinox, when the frame has one.
    pub fn equinox(&self) -> Option<f64> {
        match self {
            Self::J2000 => Some(2000.0),
            Self::B1950 => Some(1950.0),
            Self::Galactic => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::J2000 => "J2000",
            Self::B1950 => "B1950",
            Self::Galactic => "GALACTIC",
        }
    }

    pub fn from_str_name(name: &str) -> Option<Self> {
        match name {
            "J2000" => Some(Self::J2000),
            "B1950" => Some(Self::B1950),
            "GALACTIC" => Some(Self::Galactic),
            _ => None,
        }
    }

    fn default_axis_labels(&self) -> (&'static str, &'static str) {
        match self {
            Self::J2000 | Self::B1950 => ("Right Ascension", "Declination"),
            Self::Galactic => ("Galactic Longitude", "Galactic Latitude"),
        }
    }
}

/// Longitude/latitude pair mapped through a celestial projection.
///
/// Reference value and increment are held in the current axis units
/// (radians on construction); the projection math runs in radians via
/// cached per-axis conversion factors. The two axes couple through the
/// projection, so this coordinate overrides the mixed solve.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionCoordinate {
    frame: DirectionFrame,
    projection: Projection,
    names: Vec<String>,
    units: Vec<String>,
    preferred_units: Vec<String>,
    crval: [f64; 2],
    crpix: [f64; 2],
    cdelt: [f64; 2],
    pc: Matrix2<f64>,
    pc_inverse: Matrix2<f64>,
    to_rad: [f64; 2],
    rotation: SphericalRotation,
}

impl DirectionCoordinate {
    /// Builds a direction coordinate from reference value and increment
    /// in radians.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frame: DirectionFrame,
        projection: Projection,
        crval_long: f64,
        crval_lat: f64,
        cdelt_long: f64,
        cdelt_lat: f64,
        pc: Matrix2<f64>,
        crpix_long: f64,
        crpix_lat: f64,
    ) -> CoordResult<Self> {
        let determinant = pc.determinant();
        let pc_inverse = pc
            .try_inverse()
            .ok_or(CoordError::SingularTransform { determinant })?;
        let (long_label, lat_label) = frame.default_axis_labels();
        let theta_0 = projection.native_reference().1;
        let rotation = SphericalRotation::from_crval(crval_long, crval_lat, theta_0);
        Ok(Self {
            frame,
            projection,
            names: vec![long_label.to_string(), lat_label.to_string()],
            units: vec!["rad".to_string(), "rad".to_string()],
            preferred_units: vec![String::new(), String::new()],
            crval: [crval_long, crval_lat],
            crpix: [crpix_long, crpix_lat],
            cdelt: [cdelt_long, cdelt_lat],
            pc,
            pc_inverse,
            to_rad: [1.0, 1.0],
            rotation,
        })
    }

    #[inline]
    pub fn frame(&self) -> DirectionFrame {
        self.frame
    }

    #[inline]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Reference latitude in radians, used by the FITS bridge for NCP
    /// detection.
    #[inline]
    pub fn reference_latitude(&self) -> f64 {
        self.crval[1] * self.to_rad[1]
    }

    fn rebuild_rotation(&mut self) {
        let theta_0 = self.projection.native_reference().1;
        self.rotation = SphericalRotation::from_crval(
            self.crval[0] * self.to_rad[0],
            self.crval[1] * self.to_rad[1],
            theta_0,
        );
    }

    fn two_guard(len: usize, what: &str) -> CoordResult<()> {
        if len != 2 {
            return Err(CoordError::dimension_mismatch(format!(
                "{} must have two elements for a direction coordinate",
                what
            )));
        }
        Ok(())
    }

    pub fn restore(record: &Record, field: &str) -> CoordResult<Self> {
        let sub = record.require_record(field)?;
        let frame = DirectionFrame::from_str_name(sub.require_str("system")?)
            .ok_or_else(|| CoordError::missing_field("system"))?;
        let proj_sub = sub.require_record("projection")?;
        let projection = Projection::from_code(
            proj_sub.require_str("name")?,
            proj_sub.require_float_vec("parameters")?,
        )?;
        let crval = sub.require_float_vec("crval")?.to_vec();
        let crpix = sub.require_float_vec("crpix")?.to_vec();
        let cdelt = sub.require_float_vec("cdelt")?.to_vec();
        let pc = sub.require_matrix("pc")?;
        if crval.len() != 2 || crpix.len() != 2 || cdelt.len() != 2 || pc.shape() != (2, 2) {
            return Err(CoordError::dimension_mismatch(
                "direction record vectors must have two elements",
            ));
        }
        let pc = Matrix2::new(pc[(0, 0)], pc[(0, 1)], pc[(1, 0)], pc[(1, 1)]);
        let mut coord = Self::new(
            frame, projection, crval[0], crval[1], cdelt[0], cdelt[1], pc, crpix[0], crpix[1],
        )?;
        // Stored values are in the stored units, not necessarily radians.
        coord.units = sub.require_str_vec("units")?.to_vec();
        coord.to_rad = [
            units::parse(&coord.units[0])?.scale,
            units::parse(&coord.units[1])?.scale,
        ];
        coord.names = sub.require_str_vec("axes")?.to_vec();
        coord.rebuild_rotation();
        Ok(coord)
    }
}

impl Coordinate for DirectionCoordinate {
    fn kind(&self) -> CoordinateKind {
        CoordinateKind::Direction
    }

    fn n_pixel_axes(&self) -> usize {
        2
    }

    fn n_world_axes(&self) -> usize {
        2
    }

    fn reference_value(&self) -> Vec<f64> {
        self.crval.to_vec()
    }

    fn reference_pixel(&self) -> Vec<f64> {
        self.crpix.to_vec()
    }

    fn increment(&self) -> Vec<f64> {
        self.cdelt.to_vec()
    }

    fn linear_transform(&self) -> DMatrix<f64> {
        DMatrix::from_fn(2, 2, |i, j| self.pc[(i, j)])
    }

    fn world_axis_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn world_axis_units(&self) -> Vec<String> {
        self.units.clone()
    }

    fn preferred_world_axis_units(&self) -> Vec<String> {
        self.preferred_units.clone()
    }

    fn to_world(&self, world: &mut [f64], pixel: &[f64]) -> CoordResult<()> {
        debug_assert_eq!(world.len(), 2);
        debug_assert_eq!(pixel.len(), 2);
        let rel = Vector2::new(pixel[0] - self.crpix[0], pixel[1] - self.crpix[1]);
        let rotated = self.pc * rel;
        let x = self.cdelt[0] * self.to_rad[0] * rotated[0];
        let y = self.cdelt[1] * self.to_rad[1] * rotated[1];
        let (phi, theta) = self.projection.deproject(x, y)?;
        let (alpha, delta) = self.rotation.native_to_celestial(phi, theta);
        world[0] = alpha / self.to_rad[0];
        world[1] = delta / self.to_rad[1];
        Ok(())
    }

    fn to_pixel(&self, pixel: &mut [f64], world: &[f64]) -> CoordResult<()> {
        debug_assert_eq!(world.len(), 2);
        debug_assert_eq!(pixel.len(), 2);
        let alpha = world[0] * self.to_rad[0];
        let delta = world[1] * self.to_rad[1];
        let (phi, theta) = self.rotation.celestial_to_native(alpha, delta);
        let (x, y) = self.projection.project(phi, theta)?;
        let scaled = Vector2::new(
            x / (self.cdelt[0] * self.to_rad[0]),
            y / (self.cdelt[1] * self.to_rad[1]),
        );
        let rel = self.pc_inverse * scaled;
        pixel[0] = rel[0] + self.crpix[0];
        pixel[1] = rel[1] + self.crpix[1];
        Ok(())
    }

    /// Coupled mixed solve: with one axis pinned in pixel space and the
    /// other in world space, the free pixel value is found iteratively
    /// (secant steps on the forward transform, seeded at the reference
    /// pixel). The world-mix ranges bound the acceptable solution.
    fn to_mix(
        &self,
        world_out: &mut [f64],
        pixel_out: &mut [f64],
        world_in: &[f64],
        pixel_in: &[f64],
        world_axes: &[bool],
        pixel_axes: &[bool],
        world_min: &[f64],
        world_max: &[f64],
    ) -> CoordResult<()> {
        for i in 0..2 {
            if pixel_axes[i] == world_axes[i] {
                return Err(CoordError::invalid_mix_selection(i));
            }
        }

        if world_axes[0] && world_axes[1] {
            self.to_pixel(pixel_out, world_in)?;
            world_out.copy_from_slice(world_in);
            return Ok(());
        }
        if pixel_axes[0] && pixel_axes[1] {
            self.to_world(world_out, pixel_in)?;
            pixel_out.copy_from_slice(pixel_in);
            return Ok(());
        }

        // One of each: solve for the pixel on the world-constrained axis.
        let world_axis = if world_axes[0] { 0 } else { 1 };
        let pixel_axis = 1 - world_axis;
        let target = world_in[world_axis];

        let eval = |p: f64, world_tmp: &mut [f64]| -> CoordResult<f64> {
            let mut pix = [0.0; 2];
            pix[world_axis] = p;
            pix[pixel_axis] = pixel_in[pixel_axis];
            self.to_world(world_tmp, &pix)?;
            let mut diff = world_tmp[world_axis] - target;
            if world_axis == 0 {
                // Longitude differences wrap.
                diff = wrap_longitude(diff * self.to_rad[0]) / self.to_rad[0];
            }
            Ok(diff)
        };

        let mut world_tmp = [0.0; 2];
        let mut x0 = self.crpix[world_axis];
        let mut f0 = eval(x0, &mut world_tmp)?;
        let mut converged = f0.abs() * self.to_rad[world_axis] <= MIX_TOL_RAD;
        let (mut x1, mut f1) = if converged {
            (x0, f0)
        } else {
            let probe = x0 + 1.0;
            (probe, eval(probe, &mut world_tmp)?)
        };
        let mut iterations = 0;
        while !converged && iterations < MIX_MAX_ITER {
            if f1 == f0 {
                return Err(CoordError::conversion_failure(
                    "mixed direction conversion stalled",
                ));
            }
            let x2 = x1 - f1 * (x1 - x0) / (f1 - f0);
            let f2 = eval(x2, &mut world_tmp)?;
            x0 = x1;
            f0 = f1;
            x1 = x2;
            f1 = f2;
            converged = f1.abs() * self.to_rad[world_axis] <= MIX_TOL_RAD;
            iterations += 1;
        }
        if !converged {
            return Err(CoordError::conversion_failure(
                "mixed direction conversion did not converge",
            ));
        }

        let mut pix = [0.0; 2];
        pix[world_axis] = x1;
        pix[pixel_axis] = pixel_in[pixel_axis];
        self.to_world(&mut world_tmp, &pix)?;

        let solved = world_tmp[pixel_axis];
        if solved < world_min[pixel_axis] || solved > world_max[pixel_axis] {
            return Err(CoordError::conversion_failure(
                "mixed direction solution is outside the world range",
            ));
        }

        pixel_out[world_axis] = x1;
        pixel_out[pixel_axis] = pixel_in[pixel_axis];
        world_out[world_axis] = world_in[world_axis];
        world_out[pixel_axis] = solved;
        Ok(())
    }

    fn set_world_axis_names(&mut self, names: &[String]) -> CoordResult<()> {
        Self::two_guard(names.len(), "names vector")?;
        self.names = names.to_vec();
        Ok(())
    }

    fn set_world_axis_units(&mut self, new_units: &[String]) -> CoordResult<()> {
        if let Some(factors) = self.unit_change_factors(new_units)? {
            for i in 0..2 {
                self.cdelt[i] *= factors[i];
                self.crval[i] *= factors[i];
            }
            self.units = new_units.to_vec();
            self.to_rad = [
                units::parse(&self.units[0])?.scale,
                units::parse(&self.units[1])?.scale,
            ];
            self.rebuild_rotation();
        }
        Ok(())
    }

    fn set_preferred_world_axis_units(&mut self, new_units: &[String]) -> CoordResult<()> {
        self.check_preferred_units(new_units)?;
        self.preferred_units = new_units.to_vec();
        Ok(())
    }

    fn set_reference_value(&mut self, refval: &[f64]) -> CoordResult<()> {
        Self::two_guard(refval.len(), "reference value")?;
        self.crval = [refval[0], refval[1]];
        self.rebuild_rotation();
        Ok(())
    }

    fn set_reference_pixel(&mut self, refpix: &[f64]) -> CoordResult<()> {
        Self::two_guard(refpix.len(), "reference pixel")?;
        self.crpix = [refpix[0], refpix[1]];
        Ok(())
    }

    fn set_increment(&mut self, inc: &[f64]) -> CoordResult<()> {
        Self::two_guard(inc.len(), "increment")?;
        self.cdelt = [inc[0], inc[1]];
        Ok(())
    }

    fn set_linear_transform(&mut self, xform: &DMatrix<f64>) -> CoordResult<()> {
        if xform.shape() != (2, 2) {
            return Err(CoordError::dimension_mismatch(
                "linear transform has wrong shape",
            ));
        }
        let pc = Matrix2::new(xform[(0, 0)], xform[(0, 1)], xform[(1, 0)], xform[(1, 1)]);
        let determinant = pc.determinant();
        self.pc_inverse = pc
            .try_inverse()
            .ok_or(CoordError::SingularTransform { determinant })?;
        self.pc = pc;
        Ok(())
    }

    fn save(&self, record: &mut Record, field: &str) -> CoordResult<()> {
        let mut proj_sub = Record::new();
        proj_sub
            .define_str("name", self.projection.code())
            .define_float_vec("parameters", self.projection.parameters());

        let mut sub = Record::new();
        sub.define_str("system", self.frame.as_str())
            .define_record("projection", proj_sub)
            .define_str_vec("axes", self.names.clone())
            .define_str_vec("units", self.units.clone())
            .define_float_vec("crval", self.crval.to_vec())
            .define_float_vec("crpix", self.crpix.to_vec())
            .define_float_vec("cdelt", self.cdelt.to_vec())
            .define_matrix("pc", self.linear_transform());
        record.define_record(field, sub);
        Ok(())
    }
}
