//! The coordinate capability contract and its default algorithms.
//!
//! [`Coordinate`] is the seam between the composite
//! [`CoordinateSystem`](crate::system::CoordinateSystem) and the concrete
//! sub-coordinate variants. Everything a caller can ask of a coordinate is
//! expressed here, from axis counts and descriptors to forward/inverse
//! transforms, unit changes and formatting; the algorithms that are
//! identical across variants (bulk conversion with the previous-column
//! cache, the decoupled mixed solve, absolute/relative shifts,
//! axis-descriptor comparison) are provided as defaults.

use std::fmt;

use nalgebra::DMatrix;

use skygrid_core::{near, units, NEAR_TOL};

use crate::error::{CoordError, CoordResult};
use crate::record::Record;

/// Which concrete transform a coordinate performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateKind {
    Linear,
    Direction,
    Spectral,
    Stokes,
    Tabular,
    System,
}

impl CoordinateKind {
    /// Field-name stem used when saving into a record (`linear0`,
    /// `direction1`, ...).
    pub fn record_basename(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Direction => "direction",
            Self::Spectral => "spectral",
            Self::Stokes => "stokes",
            Self::Tabular => "tabular",
            Self::System => "coordsys",
        }
    }
}

impl fmt::Display for CoordinateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linear => "Linear",
            Self::Direction => "Direction",
            Self::Spectral => "Spectral",
            Self::Stokes => "Stokes",
            Self::Tabular => "Tabular",
            Self::System => "System",
        };
        f.write_str(name)
    }
}

/// Text rendering style for [`Coordinate::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    #[default]
    Default,
    Scientific,
    Fixed,
}

impl FormatMode {
    fn resolve(self) -> FormatMode {
        match self {
            FormatMode::Default => FormatMode::Scientific,
            other => other,
        }
    }
}

/// Per-column outcome of a bulk conversion. Bulk calls never fail as a
/// whole; columns that could not be converted are listed here together
/// with the first error encountered, and their output columns are not
/// meaningful.
#[derive(Debug, Clone, Default)]
pub struct BulkFailures {
    pub failures: Vec<usize>,
    pub first_error: Option<CoordError>,
}

impl BulkFailures {
    #[inline]
    pub fn n_failed(&self) -> usize {
        self.failures.len()
    }

    #[inline]
    pub fn all_ok(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, column: usize, error: CoordError) {
        if self.first_error.is_none() {
            self.first_error = Some(error);
        }
        self.failures.push(column);
    }
}

/// Name/unit triple for the Fourier-transform partner of an axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FourierAxisInfo {
    pub name: String,
    pub unit: String,
    pub canonical_input_unit: String,
}

/// Names and units of the Fourier-conjugate axis of `(kind, axis)`.
///
/// Sky axes in angular units pair with `UU`/`VV` in wavelengths; frequency
/// pairs with time and vice versa; anything else becomes
/// `Inverse(<name>)` in `1/<unit>`.
pub fn fourier_axis_info(
    kind: CoordinateKind,
    axis: usize,
    unit_in: &str,
    name_in: &str,
) -> CoordResult<FourierAxisInfo> {
    let inverse = |unit_in: &str, name_in: &str| FourierAxisInfo {
        name: format!("Inverse({})", name_in),
        unit: format!("1/{}", unit_in),
        canonical_input_unit: unit_in.to_string(),
    };

    match kind {
        CoordinateKind::Direction => {
            if units::compatible(unit_in, "rad")? {
                let name = match axis {
                    0 => "UU",
                    1 => "VV",
                    _ => return Err(CoordError::invalid_axis(axis, 2)),
                };
                Ok(FourierAxisInfo {
                    name: name.to_string(),
                    unit: "lambda".to_string(),
                    canonical_input_unit: "rad".to_string(),
                })
            } else {
                Ok(inverse(unit_in, name_in))
            }
        }
        CoordinateKind::Linear | CoordinateKind::Spectral | CoordinateKind::Tabular => {
            if units::compatible(unit_in, "Hz")? {
                Ok(FourierAxisInfo {
                    name: "Time".to_string(),
                    unit: "s".to_string(),
                    canonical_input_unit: "Hz".to_string(),
                })
            } else if units::compatible(unit_in, "s")? {
                Ok(FourierAxisInfo {
                    name: "Frequency".to_string(),
                    unit: "Hz".to_string(),
                    canonical_input_unit: "s".to_string(),
                })
            } else {
                Ok(inverse(unit_in, name_in))
            }
        }
        CoordinateKind::Stokes | CoordinateKind::System => {
            Err(CoordError::no_fourier(kind.to_string()))
        }
    }
}

/// The coordinate capability set.
///
/// Implementations fix their pixel and world axis counts for life, keep
/// every unit string parseable by the unit algebra (or empty), and carry
/// an `n_world_axes x n_pixel_axes` linear transform.
pub trait Coordinate {
    fn kind(&self) -> CoordinateKind;
    fn n_pixel_axes(&self) -> usize;
    fn n_world_axes(&self) -> usize;

    fn reference_value(&self) -> Vec<f64>;
    fn reference_pixel(&self) -> Vec<f64>;
    fn increment(&self) -> Vec<f64>;
    fn linear_transform(&self) -> DMatrix<f64>;
    fn world_axis_names(&self) -> Vec<String>;
    fn world_axis_units(&self) -> Vec<String>;
    fn preferred_world_axis_units(&self) -> Vec<String>;

    /// Pixel position to world position. `world` must be
    /// `n_world_axes()` long and `pixel` `n_pixel_axes()` long.
    fn to_world(&self, world: &mut [f64], pixel: &[f64]) -> CoordResult<()>;

    /// World position to pixel position; inverse of [`Self::to_world`].
    fn to_pixel(&self, pixel: &mut [f64], world: &[f64]) -> CoordResult<()>;

    fn set_world_axis_names(&mut self, names: &[String]) -> CoordResult<()>;
    fn set_world_axis_units(&mut self, units: &[String]) -> CoordResult<()>;
    fn set_preferred_world_axis_units(&mut self, units: &[String]) -> CoordResult<()>;
    fn set_reference_value(&mut self, refval: &[f64]) -> CoordResult<()>;
    fn set_reference_pixel(&mut self, refpix: &[f64]) -> CoordResult<()>;
    fn set_increment(&mut self, inc: &[f64]) -> CoordResult<()>;
    fn set_linear_transform(&mut self, xform: &DMatrix<f64>) -> CoordResult<()>;

    /// Serializes this coordinate as a sub-record of `record` under
    /// `field`.
    fn save(&self, record: &mut Record, field: &str) -> CoordResult<()>;

    /// Bulk pixel→world over a `(n_pixel_axes, T)` column-major matrix.
    ///
    /// Consecutive identical columns (under [`near`]) reuse the previous
    /// conversion instead of recomputing it; images are commonly traversed
    /// along one axis and this is the fast path. Output columns listed in
    /// the returned [`BulkFailures`] are not meaningful.
    fn to_world_many(&self, pixel: &DMatrix<f64>) -> (DMatrix<f64>, BulkFailures) {
        let np = self.n_pixel_axes();
        let nw = self.n_world_axes();
        debug_assert_eq!(pixel.nrows(), np);
        let n_transforms = pixel.ncols();

        let mut world = DMatrix::zeros(nw, n_transforms);
        let mut pix_tmp = vec![0.0; np];
        let mut last_pix = vec![0.0; np];
        let mut world_tmp = vec![0.0; nw];
        let mut report = BulkFailures::default();

        for l in 0..n_transforms {
            let mut same = true;
            for k in 0..np {
                pix_tmp[k] = pixel[(k, l)];
                if l == 0 || !near(pix_tmp[k], last_pix[k], NEAR_TOL) {
                    same = false;
                }
            }
            if same {
                for k in 0..nw {
                    world[(k, l)] = world_tmp[k];
                }
            } else {
                match self.to_world(&mut world_tmp, &pix_tmp) {
                    Ok(()) => {
                        for k in 0..nw {
                            world[(k, l)] = world_tmp[k];
                        }
                    }
                    Err(err) => report.record(l, err),
                }
            }
            last_pix.copy_from_slice(&pix_tmp);
        }
        (world, report)
    }

    /// Bulk world→pixel; mirror of [`Self::to_world_many`].
    fn to_pixel_many(&self, world: &DMatrix<f64>) -> (DMatrix<f64>, BulkFailures) {
        let np = self.n_pixel_axes();
        let nw = self.n_world_axes();
        debug_assert_eq!(world.nrows(), nw);
        let n_transforms = world.ncols();

        let mut pixel = DMatrix::zeros(np, n_transforms);
        let mut world_tmp = vec![0.0; nw];
        let mut last_world = vec![0.0; nw];
        let mut pix_tmp = vec![0.0; np];
        let mut report = BulkFailures::default();

        for l in 0..n_transforms {
            let mut same = true;
            for k in 0..nw {
                world_tmp[k] = world[(k, l)];
                if l == 0 || !near(world_tmp[k], last_world[k], NEAR_TOL) {
                    same = false;
                }
            }
            if same {
                for k in 0..np {
                    pixel[(k, l)] = pix_tmp[k];
                }
            } else {
                match self.to_pixel(&mut pix_tmp, &world_tmp) {
                    Ok(()) => {
                        for k in 0..np {
                            pixel[(k, l)] = pix_tmp[k];
                        }
                    }
                    Err(err) => report.record(l, err),
                }
            }
            last_world.copy_from_slice(&world_tmp);
        }
        (pixel, report)
    }

    /// Mixed solve: each axis carries either a world or a pixel input
    /// value; the other quantity is computed. The default treats axes as
    /// uncoupled and substitutes reference values for the unconstrained
    /// side; coordinates whose axes couple (sky projections) override it.
    /// `world_min`/`world_max` bound the solution for such overrides and
    /// are unused here.
    #[allow(clippy::too_many_arguments)]
    fn to_mix(
        &self,
        world_out: &mut [f64],
        pixel_out: &mut [f64],
        world_in: &[f64],
        pixel_in: &[f64],
        world_axes: &[bool],
        pixel_axes: &[bool],
        _world_min: &[f64],
        _world_max: &[f64],
    ) -> CoordResult<()> {
        let nw = self.n_world_axes();
        let np = self.n_pixel_axes();
        debug_assert_eq!(nw, np);
        debug_assert_eq!(world_axes.len(), nw);
        debug_assert_eq!(pixel_axes.len(), np);
        debug_assert_eq!(world_in.len(), nw);
        debug_assert_eq!(pixel_in.len(), np);

        for i in 0..np {
            if pixel_axes[i] == world_axes[i] {
                return Err(CoordError::invalid_mix_selection(i));
            }
        }

        // World to pixel, with reference values standing in for the axes
        // given as pixels.
        let mut world_tmp = self.reference_value();
        for i in 0..nw {
            if world_axes[i] {
                world_tmp[i] = world_in[i];
            }
        }
        let mut pixel_tmp = vec![0.0; np];
        self.to_pixel(&mut pixel_tmp, &world_tmp)?;
        for i in 0..np {
            pixel_out[i] = if pixel_axes[i] {
                pixel_in[i]
            } else {
                pixel_tmp[i]
            };
        }

        // Pixel to world, with the reference pixel standing in for the
        // axes given as world values.
        let mut pixel_tmp = self.reference_pixel();
        for i in 0..np {
            if pixel_axes[i] {
                pixel_tmp[i] = pixel_in[i];
            }
        }
        self.to_world(&mut world_tmp, &pixel_tmp)?;
        for i in 0..nw {
            world_out[i] = if world_axes[i] {
                world_in[i]
            } else {
                world_tmp[i]
            };
        }
        Ok(())
    }

    fn make_world_absolute(&self, world: &mut [f64]) {
        debug_assert_eq!(world.len(), self.n_world_axes());
        for (value, reference) in world.iter_mut().zip(self.reference_value()) {
            *value += reference;
        }
    }

    fn make_world_relative(&self, world: &mut [f64]) {
        debug_assert_eq!(world.len(), self.n_world_axes());
        for (value, reference) in world.iter_mut().zip(self.reference_value()) {
            *value -= reference;
        }
    }

    fn make_pixel_absolute(&self, pixel: &mut [f64]) {
        debug_assert_eq!(pixel.len(), self.n_pixel_axes());
        for (value, reference) in pixel.iter_mut().zip(self.reference_pixel()) {
            *value += reference;
        }
    }

    fn make_pixel_relative(&self, pixel: &mut [f64]) {
        debug_assert_eq!(pixel.len(), self.n_pixel_axes());
        for (value, reference) in pixel.iter_mut().zip(self.reference_pixel()) {
            *value -= reference;
        }
    }

    fn make_world_absolute_many(&self, value: &mut DMatrix<f64>) {
        self.world_abs_rel_many(value, true);
    }

    fn make_world_relative_many(&self, value: &mut DMatrix<f64>) {
        self.world_abs_rel_many(value, false);
    }

    fn make_pixel_absolute_many(&self, value: &mut DMatrix<f64>) {
        self.pixel_abs_rel_many(value, true);
    }

    fn make_pixel_relative_many(&self, value: &mut DMatrix<f64>) {
        self.pixel_abs_rel_many(value, false);
    }

    #[doc(hidden)]
    fn world_abs_rel_many(&self, value: &mut DMatrix<f64>, to_absolute: bool) {
        let nw = self.n_world_axes();
        debug_assert_eq!(value.nrows(), nw);
        let mut col = vec![0.0; nw];
        let mut last_in = vec![0.0; nw];
        let mut last_out = vec![0.0; nw];
        for l in 0..value.ncols() {
            let mut same = true;
            for k in 0..nw {
                col[k] = value[(k, l)];
                if l == 0 || !near(col[k], last_in[k], NEAR_TOL) {
                    same = false;
                }
            }
            last_in.copy_from_slice(&col);
            if same {
                for k in 0..nw {
                    value[(k, l)] = last_out[k];
                }
            } else {
                if to_absolute {
                    self.make_world_absolute(&mut col);
                } else {
                    self.make_world_relative(&mut col);
                }
                for k in 0..nw {
                    value[(k, l)] = col[k];
                }
                last_out.copy_from_slice(&col);
            }
        }
    }

    #[doc(hidden)]
    fn pixel_abs_rel_many(&self, value: &mut DMatrix<f64>, to_absolute: bool) {
        let np = self.n_pixel_axes();
        debug_assert_eq!(value.nrows(), np);
        let mut col = vec![0.0; np];
        let mut last_in = vec![0.0; np];
        let mut last_out = vec![0.0; np];
        for l in 0..value.ncols() {
            let mut same = true;
            for k in 0..np {
                col[k] = value[(k, l)];
                if l == 0 || !near(col[k], last_in[k], NEAR_TOL) {
                    same = false;
                }
            }
            last_in.copy_from_slice(&col);
            if same {
                for k in 0..np {
                    value[(k, l)] = last_out[k];
                }
            } else {
                if to_absolute {
                    self.make_pixel_absolute(&mut col);
                } else {
                    self.make_pixel_relative(&mut col);
                }
                for k in 0..np {
                    value[(k, l)] = col[k];
                }
                last_out.copy_from_slice(&col);
            }
        }
    }

    /// Scale factors that carry the stored descriptors to `units`, or
    /// `None` when the units are unchanged. Implementations of
    /// [`Self::set_world_axis_units`] scale their increment and reference
    /// value by the returned factors and store the new strings.
    #[doc(hidden)]
    fn unit_change_factors(&self, units: &[String]) -> CoordResult<Option<Vec<f64>>> {
        if units.len() != self.n_world_axes() {
            return Err(CoordError::dimension_mismatch(
                "wrong number of elements in units vector",
            ));
        }
        let old = self.world_axis_units();
        if old == units {
            return Ok(None);
        }
        let factors = units::scale_factors(&old, units)?;
        Ok(Some(factors))
    }

    /// Validates a preferred-units vector: entries are empty or
    /// dimensionally consistent with the actual units.
    #[doc(hidden)]
    fn check_preferred_units(&self, preferred: &[String]) -> CoordResult<()> {
        if preferred.len() != self.n_world_axes() {
            return Err(CoordError::dimension_mismatch(
                "wrong number of elements in preferred units vector",
            ));
        }
        let current = self.world_axis_units();
        for (pref, actual) in preferred.iter().zip(current.iter()) {
            if !pref.is_empty() && !units::compatible(pref, actual)? {
                return Err(CoordError::incompatible_unit(format!(
                    "preferred unit '{}' is not dimensionally consistent with '{}'",
                    pref, actual
                )));
            }
        }
        Ok(())
    }

    /// Renders one world value on one axis as text.
    ///
    /// `is_absolute` describes the input value; `show_as_absolute` the
    /// rendering. A negative `precision` selects the default of 6. On
    /// entry an empty `unit` selects the preferred unit (native when no
    /// preference is set); on return `unit` holds the unit actually used.
    fn format(
        &self,
        unit: &mut String,
        mode: FormatMode,
        world_value: f64,
        world_axis: usize,
        is_absolute: bool,
        show_as_absolute: bool,
        precision: i32,
    ) -> CoordResult<String> {
        let nw = self.n_world_axes();
        if world_axis >= nw {
            return Err(CoordError::invalid_axis(world_axis, nw));
        }

        let mode = mode.resolve();
        let precision = if precision < 0 { 6 } else { precision as usize };

        let mut value = world_value;
        if show_as_absolute != is_absolute {
            if show_as_absolute {
                let mut world = vec![0.0; nw];
                world[world_axis] = value;
                self.make_world_absolute(&mut world);
                value = world[world_axis];
            } else {
                let mut world = self.reference_value();
                world[world_axis] = value;
                self.make_world_relative(&mut world);
                value = world[world_axis];
            }
        }

        let native = &self.world_axis_units()[world_axis];
        if unit.is_empty() {
            let preferred = self.preferred_world_axis_units()[world_axis].clone();
            *unit = if preferred.is_empty() {
                native.clone()
            } else {
                preferred
            };
        }
        value *= units::scale_factor(native, unit)?;

        let text = match mode {
            FormatMode::Fixed => format!("{:.*}", precision, value),
            _ => format!("{:.*e}", precision, value),
        };
        Ok(text)
    }

    /// Compares the axis descriptors of the selected axes against
    /// `other` under relative tolerance `tol`.
    fn do_near_pixel(
        &self,
        other: &dyn Coordinate,
        this_axes: &[bool],
        other_axes: &[bool],
        tol: f64,
    ) -> CoordResult<()> {
        if self.kind() != other.kind() {
            return Err(CoordError::mismatch("coordinate types differ"));
        }
        if !this_axes.iter().any(|&b| b) && !other_axes.iter().any(|&b| b) {
            return Ok(());
        }
        if self.n_pixel_axes() != other.n_pixel_axes() {
            return Err(CoordError::mismatch("number of pixel axes differs"));
        }
        if self.n_world_axes() != other.n_world_axes() {
            return Err(CoordError::mismatch("number of world axes differs"));
        }

        let this_pc = self.linear_transform();
        let other_pc = other.linear_transform();
        if this_pc.shape() != other_pc.shape() {
            return Err(CoordError::mismatch("PC matrices differ in shape"));
        }

        let this_refval = self.reference_value();
        let other_refval = other.reference_value();
        let this_inc = self.increment();
        let other_inc = other.increment();
        let this_refpix = self.reference_pixel();
        let other_refpix = other.reference_pixel();
        let this_units = self.world_axis_units();
        let other_units = other.world_axis_units();

        for i in 0..self.n_pixel_axes() {
            if !(this_axes[i] && other_axes[i]) {
                continue;
            }

            // Units must agree in their leading dimension token; scale
            // differences on the same dimension already show up in the
            // numeric descriptors.
            let token = |unit: &str| {
                unit.trim()
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_uppercase()
            };
            if token(&this_units[i]) != token(&other_units[i]) {
                return Err(CoordError::mismatch(format!(
                    "the coordinates have differing axis units for axis {}",
                    i
                )));
            }

            if !near(this_refval[i], other_refval[i], tol) {
                return Err(CoordError::mismatch(format!(
                    "the coordinates have differing reference values for axis {}",
                    i
                )));
            }
            if !near(this_inc[i], other_inc[i], tol) {
                return Err(CoordError::mismatch(format!(
                    "the coordinates have differing increments for axis {}",
                    i
                )));
            }
            if !near(this_refpix[i], other_refpix[i], tol) {
                return Err(CoordError::mismatch(format!(
                    "the coordinates have differing reference pixels for axis {}",
                    i
                )));
            }

            // An axis appears in the PC matrix along its whole row and
            // whole column.
            for j in 0..this_pc.ncols() {
                if !near(this_pc[(i, j)], other_pc[(i, j)], tol) {
                    return Err(CoordError::mismatch(format!(
                        "the coordinates have differing linear transforms in row {}",
                        i
                    )));
                }
            }
            for j in 0..this_pc.nrows() {
                if !near(this_pc[(j, i)], other_pc[(j, i)], tol) {
                    return Err(CoordError::mismatch(format!(
                        "the coordinates have differing linear transforms in column {}",
                        i
                    )));
                }
            }
        }
        Ok(())
    }

    /// Per-axis world ranges for mixed solves, derived from an image
    /// shape: pixel positions 25% off each edge are converted to world.
    /// Axes with unknown shape (0) fall back to the reference pixel ±10
    /// pixels; single-pixel axes use 0 ± 10.
    fn world_mix_ranges(&self, shape: &[i64]) -> CoordResult<(Vec<f64>, Vec<f64>)> {
        let np = self.n_pixel_axes();
        let nw = self.n_world_axes();
        if shape.len() != np {
            return Err(CoordError::dimension_mismatch(
                "shape must be of length n_pixel_axes",
            ));
        }
        debug_assert_eq!(np, nw);

        let refpix = self.reference_pixel();
        let mut pixel_min = vec![0.0; np];
        let mut pixel_max = vec![0.0; np];
        for i in 0..np {
            if shape[i] == 0 {
                pixel_min[i] = refpix[i] - 10.0;
                pixel_max[i] = refpix[i] + 10.0;
            } else if shape[i] == 1 {
                pixel_min[i] = -10.0;
                pixel_max[i] = 10.0;
            } else {
                let half = shape[i] as f64 / 2.0;
                pixel_min[i] = half - 1.5 * half;
                pixel_max[i] = half + 1.5 * half;
            }
        }

        let mut world_min = vec![-1.0e99; nw];
        let mut world_max = vec![1.0e99; nw];
        let mut converted_min = vec![0.0; nw];
        let mut converted_max = vec![0.0; nw];
        self.to_world(&mut converted_min, &pixel_min)?;
        self.to_world(&mut converted_max, &pixel_max)?;
        for i in 0..nw {
            if shape[i] > 0 {
                world_min[i] = converted_min[i];
                world_max[i] = converted_max[i];
            }
        }
        Ok((world_min, world_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal uncoupled coordinate: world = scale * (pixel - refpix) +
    /// refval per axis. Exercises the default algorithms in isolation.
    #[derive(Clone)]
    struct ScaledCoord {
        refval: Vec<f64>,
        refpix: Vec<f64>,
        scale: Vec<f64>,
        fail_above: f64,
    }

    impl ScaledCoord {
        fn new() -> Self {
            Self {
                refval: vec![10.0, 20.0],
                refpix: vec![1.0, 2.0],
                scale: vec![2.0, 0.5],
                fail_above: f64::INFINITY,
            }
        }
    }

    impl Coordinate for ScaledCoord {
        fn kind(&self) -> CoordinateKind {
            CoordinateKind::Linear
        }
        fn n_pixel_axes(&self) -> usize {
            2
        }
        fn n_world_axes(&self) -> usize {
            2
        }
        fn reference_value(&self) -> Vec<f64> {
            self.refval.clone()
        }
        fn reference_pixel(&self) -> Vec<f64> {
            self.refpix.clone()
        }
        fn increment(&self) -> Vec<f64> {
            self.scale.clone()
        }
        fn linear_transform(&self) -> DMatrix<f64> {
            DMatrix::identity(2, 2)
        }
        fn world_axis_names(&self) -> Vec<String> {
            vec!["x".into(), "y".into()]
        }
        fn world_axis_units(&self) -> Vec<String> {
            vec!["m".into(), "m".into()]
        }
        fn preferred_world_axis_units(&self) -> Vec<String> {
            vec![String::new(), String::new()]
        }
        fn to_world(&self, world: &mut [f64], pixel: &[f64]) -> CoordResult<()> {
            for i in 0..2 {
                if pixel[i] > self.fail_above {
                    return Err(CoordError::conversion_failure("pixel out of range"));
                }
                world[i] = self.refval[i] + self.scale[i] * (pixel[i] - self.refpix[i]);
            }
            Ok(())
        }
        fn to_pixel(&self, pixel: &mut [f64], world: &[f64]) -> CoordResult<()> {
            for i in 0..2 {
                pixel[i] = (world[i] - self.refval[i]) / self.scale[i] + self.refpix[i];
            }
            Ok(())
        }
        fn set_world_axis_names(&mut self, _: &[String]) -> CoordResult<()> {
            Ok(())
        }
        fn set_world_axis_units(&mut self, _: &[String]) -> CoordResult<()> {
            Ok(())
        }
        fn set_preferred_world_axis_units(&mut self, _: &[String]) -> CoordResult<()> {
            Ok(())
        }
        fn set_reference_value(&mut self, refval: &[f64]) -> CoordResult<()> {
            self.refval = refval.to_vec();
            Ok(())
        }
        fn set_reference_pixel(&mut self, refpix: &[f64]) -> CoordResult<()> {
            self.refpix = refpix.to_vec();
            Ok(())
        }
        fn set_increment(&mut self, inc: &[f64]) -> CoordResult<()> {
            self.scale = inc.to_vec();
            Ok(())
        }
        fn set_linear_transform(&mut self, _: &DMatrix<f64>) -> CoordResult<()> {
            Ok(())
        }
        fn save(&self, _: &mut Record, _: &str) -> CoordResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_to_world_many_matches_scalar() {
        let coord = ScaledCoord::new();
        let pixel = DMatrix::from_columns(&[
            nalgebra::DVector::from_vec(vec![0.0, 0.0]),
            nalgebra::DVector::from_vec(vec![3.0, 4.0]),
            nalgebra::DVector::from_vec(vec![3.0, 4.0]),
            nalgebra::DVector::from_vec(vec![-1.0, 7.0]),
        ]);
        let (world, report) = coord.to_world_many(&pixel);
        assert!(report.all_ok());

        let mut expected = vec![0.0; 2];
        for l in 0..4 {
            let col: Vec<f64> = (0..2).map(|k| pixel[(k, l)]).collect();
            coord.to_world(&mut expected, &col).unwrap();
            assert_eq!(world[(0, l)], expected[0]);
            assert_eq!(world[(1, l)], expected[1]);
        }
    }

    #[test]
    fn test_to_world_many_reports_failures() {
        let mut coord = ScaledCoord::new();
        coord.fail_above = 5.0;
        let pixel = DMatrix::from_columns(&[
            nalgebra::DVector::from_vec(vec![0.0, 0.0]),
            nalgebra::DVector::from_vec(vec![9.0, 0.0]),
            nalgebra::DVector::from_vec(vec![1.0, 1.0]),
        ]);
        let (_, report) = coord.to_world_many(&pixel);
        assert_eq!(report.failures, vec![1]);
        assert!(report.first_error.is_some());
    }

    #[test]
    fn test_to_pixel_many_roundtrip() {
        let coord = ScaledCoord::new();
        let pixel = DMatrix::from_columns(&[
            nalgebra::DVector::from_vec(vec![0.5, 1.5]),
            nalgebra::DVector::from_vec(vec![6.0, -2.0]),
        ]);
        let (world, _) = coord.to_world_many(&pixel);
        let (recovered, report) = coord.to_pixel_many(&world);
        assert!(report.all_ok());
        for l in 0..2 {
            for k in 0..2 {
                assert!((recovered[(k, l)] - pixel[(k, l)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_to_mix_rejects_bad_selection() {
        let coord = ScaledCoord::new();
        let mut world_out = vec![0.0; 2];
        let mut pixel_out = vec![0.0; 2];
        let err = coord
            .to_mix(
                &mut world_out,
                &mut pixel_out,
                &[0.0, 0.0],
                &[0.0, 0.0],
                &[true, true],
                &[true, false],
                &[-1e99, -1e99],
                &[1e99, 1e99],
            )
            .unwrap_err();
        assert!(matches!(err, CoordError::InvalidMixSelection { axis: 0 }));
    }

    #[test]
    fn test_to_mix_decoupled() {
        let coord = ScaledCoord::new();
        let mut world_out = vec![0.0; 2];
        let mut pixel_out = vec![0.0; 2];
        // Axis 0 given in world, axis 1 in pixel.
        coord
            .to_mix(
                &mut world_out,
                &mut pixel_out,
                &[16.0, 0.0],
                &[0.0, 4.0],
                &[true, false],
                &[false, true],
                &[-1e99, -1e99],
                &[1e99, 1e99],
            )
            .unwrap();
        // world 16 on axis 0 -> pixel (16-10)/2 + 1 = 4.
        assert!((pixel_out[0] - 4.0).abs() < 1e-12);
        assert_eq!(pixel_out[1], 4.0);
        assert_eq!(world_out[0], 16.0);
        // pixel 4 on axis 1 -> world 20 + 0.5*(4-2) = 21.
        assert!((world_out[1] - 21.0).abs() < 1e-12);
    }

    #[test]
    fn test_make_world_absolute_relative() {
        let coord = ScaledCoord::new();
        let mut world = vec![1.0, 2.0];
        coord.make_world_absolute(&mut world);
        assert_eq!(world, vec![11.0, 22.0]);
        coord.make_world_relative(&mut world);
        assert_eq!(world, vec![1.0, 2.0]);
    }

    #[test]
    fn test_make_world_relative_many_caches_columns() {
        let coord = ScaledCoord::new();
        let mut value = DMatrix::from_columns(&[
            nalgebra::DVector::from_vec(vec![11.0, 22.0]),
            nalgebra::DVector::from_vec(vec![11.0, 22.0]),
            nalgebra::DVector::from_vec(vec![12.0, 24.0]),
        ]);
        coord.make_world_relative_many(&mut value);
        assert_eq!(value[(0, 0)], 1.0);
        assert_eq!(value[(0, 1)], 1.0);
        assert_eq!(value[(1, 2)], 4.0);
    }

    #[test]
    fn test_format_scientific_default() {
        let coord = ScaledCoord::new();
        let mut unit = String::new();
        let text = coord
            .format(&mut unit, FormatMode::Default, 12.5, 0, true, true, -1)
            .unwrap();
        assert_eq!(text, "1.250000e1");
        assert_eq!(unit, "m");
    }

    #[test]
    fn test_format_fixed_with_conversion() {
        let coord = ScaledCoord::new();
        let mut unit = String::from("km");
        let text = coord
            .format(&mut unit, FormatMode::Fixed, 1500.0, 0, true, true, 2)
            .unwrap();
        assert_eq!(text, "1.50");
    }

    #[test]
    fn test_format_relative_display() {
        let coord = ScaledCoord::new();
        let mut unit = String::new();
        // Absolute input 12 on axis 0, shown relative: 12 - 10 = 2.
        let text = coord
            .format(&mut unit, FormatMode::Fixed, 12.0, 0, true, false, 1)
            .unwrap();
        assert_eq!(text, "2.0");
    }

    #[test]
    fn test_format_rejects_incompatible_unit() {
        let coord = ScaledCoord::new();
        let mut unit = String::from("Hz");
        assert!(coord
            .format(&mut unit, FormatMode::Fixed, 1.0, 0, true, true, 2)
            .is_err());
    }

    #[test]
    fn test_do_near_pixel_detects_refval_change() {
        let a = ScaledCoord::new();
        let mut b = ScaledCoord::new();
        b.refval[0] += 1.0e-3;
        let axes = [true, true];
        assert!(a.do_near_pixel(&b, &axes, &axes, 1e-6).is_err());
        assert!(a.do_near_pixel(&b, &[false, true], &[false, true], 1e-6).is_ok());
    }

    #[test]
    fn test_fourier_axis_info_direction() {
        let info =
            fourier_axis_info(CoordinateKind::Direction, 0, "rad", "Right Ascension").unwrap();
        assert_eq!(info.name, "UU");
        assert_eq!(info.unit, "lambda");
        assert_eq!(info.canonical_input_unit, "rad");

        let info = fourier_axis_info(CoordinateKind::Direction, 1, "deg", "Declination").unwrap();
        assert_eq!(info.name, "VV");

        assert!(matches!(
            fourier_axis_info(CoordinateKind::Direction, 2, "rad", "x"),
            Err(CoordError::InvalidAxis { .. })
        ));
    }

    #[test]
    fn test_fourier_axis_info_frequency_time() {
        let info = fourier_axis_info(CoordinateKind::Spectral, 0, "Hz", "Frequency").unwrap();
        assert_eq!(info.name, "Time");
        assert_eq!(info.unit, "s");

        let info = fourier_axis_info(CoordinateKind::Linear, 0, "s", "Time").unwrap();
        assert_eq!(info.name, "Frequency");
        assert_eq!(info.unit, "Hz");

        let info = fourier_axis_info(CoordinateKind::Linear, 0, "m", "Baseline").unwrap();
        assert_eq!(info.name, "Inverse(Baseline)");
        assert_eq!(info.unit, "1/m");
    }

    #[test]
    fn test_fourier_axis_info_stokes_fails() {
        assert!(matches!(
            fourier_axis_info(CoordinateKind::Stokes, 0, "", "I"),
            Err(CoordError::NoFourier { .. })
        ));
        assert!(matches!(
            fourier_axis_info(CoordinateKind::System, 0, "", "x"),
            Err(CoordError::NoFourier { .. })
        ));
    }

    #[test]
    fn test_world_mix_ranges() {
        let coord = ScaledCoord::new();
        let (min, max) = coord.world_mix_ranges(&[4, 0]).unwrap();
        // Axis 0: shape 4 -> pixels -1..5 -> world 10 + 2*(-1-1) .. 10 + 2*(5-1).
        assert_eq!(min[0], 6.0);
        assert_eq!(max[0], 18.0);
        // Axis 1: unknown shape keeps the defaults.
        assert_eq!(min[1], -1.0e99);
        assert_eq!(max[1], 1.0e99);
    }
}
