//! Tabular sub-coordinate: one axis defined by a lookup table.

use nalgebra::DMatrix;

use crate::coordinate::{Coordinate, CoordinateKind};
use crate::error::{CoordError, CoordResult};
use crate::record::Record;

/// One axis that is either purely linear or backed by a strictly
/// monotonic pixel/world table with linear interpolation between entries
/// (and end-segment extrapolation outside them).
///
/// The linearized `crval`/`crpix`/`cdelt` view of a table is what FITS
/// export falls back to when it flattens the lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularCoordinate {
    name: String,
    unit: String,
    preferred_unit: String,
    crval: f64,
    crpix: f64,
    cdelt: f64,
    pixel_values: Vec<f64>,
    world_values: Vec<f64>,
}

fn strictly_monotonic(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] > w[0]) || values.windows(2).all(|w| w[1] < w[0])
}

/// Piecewise-linear interpolation of `ys` at `x` over monotonically
/// increasing `xs`; the end segments extend beyond the table.
fn interpolate(xs: &[f64], ys: &[f64], x: f64, ascending: bool) -> f64 {
    let n = xs.len();
    let segment = if ascending {
        match xs.iter().position(|&v| v > x) {
            Some(0) => 0,
            Some(i) => i - 1,
            None => n - 2,
        }
    } else {
        match xs.iter().position(|&v| v < x) {
            Some(0) => 0,
            Some(i) => i - 1,
            None => n - 2,
        }
    };
    let (x0, x1) = (xs[segment], xs[segment + 1]);
    let (y0, y1) = (ys[segment], ys[segment + 1]);
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

impl TabularCoordinate {
    /// Purely linear axis.
    pub fn linear(
        name: impl Into<String>,
        unit: impl Into<String>,
        crval: f64,
        cdelt: f64,
        crpix: f64,
    ) -> CoordResult<Self> {
        let unit = unit.into();
        skygrid_core::units::parse(&unit).map_err(CoordError::from)?;
        Ok(Self {
            name: name.into(),
            unit,
            preferred_unit: String::new(),
            crval,
            crpix,
            cdelt,
            pixel_values: Vec::new(),
            world_values: Vec::new(),
        })
    }

    /// Table-backed axis. Both value lists must be strictly monotonic and
    /// at least two entries long.
    pub fn from_table(
        name: impl Into<String>,
        unit: impl Into<String>,
        pixel_values: Vec<f64>,
        world_values: Vec<f64>,
    ) -> CoordResult<Self> {
        if pixel_values.len() != world_values.len() || pixel_values.len() < 2 {
            return Err(CoordError::dimension_mismatch(
                "pixel and world tables must be equally long with at least two entries",
            ));
        }
        if !strictly_monotonic(&pixel_values) || !strictly_monotonic(&world_values) {
            return Err(CoordError::conversion_failure(
                "tabular pixel and world values must be strictly monotonic",
            ));
        }
        let unit = unit.into();
        skygrid_core::units::parse(&unit).map_err(CoordError::from)?;
        let first = 0;
        let last = pixel_values.len() - 1;
        let cdelt =
            (world_values[last] - world_values[first]) / (pixel_values[last] - pixel_values[first]);
        Ok(Self {
            name: name.into(),
            unit,
            preferred_unit: String::new(),
            crval: world_values[first],
            crpix: pixel_values[first],
            cdelt,
            pixel_values,
            world_values,
        })
    }

    #[inline]
    pub fn pixel_values(&self) -> &[f64] {
        &self.pixel_values
    }

    #[inline]
    pub fn world_values(&self) -> &[f64] {
        &self.world_values
    }

    #[inline]
    pub fn has_table(&self) -> bool {
        !self.pixel_values.is_empty()
    }

    pub fn restore(record: &Record, field: &str) -> CoordResult<Self> {
        let sub = record.require_record(field)?;
        let name = sub.require_str("name")?.to_string();
        let unit = sub.require_str("unit")?.to_string();
        let pixel_values = sub.get_float_vec("pixelvalues").unwrap_or(&[]).to_vec();
        if pixel_values.is_empty() {
            Self::linear(
                name,
                unit,
                sub.require_float("crval")?,
                sub.require_float("cdelt")?,
                sub.require_float("crpix")?,
            )
        } else {
            let world_values = sub.require_float_vec("worldvalues")?.to_vec();
            Self::from_table(name, unit, pixel_values, world_values)
        }
    }

    fn table_immutable(&self, what: &str) -> CoordError {
        CoordError::conversion_failure(format!(
            "cannot change the {} of a tabular coordinate with a lookup table",
            what
        ))
    }

    fn one_guard(len: usize, what: &str) -> CoordResult<()> {
        if len != 1 {
            return Err(CoordError::dimension_mismatch(format!(
                "{} must have one element for a tabular coordinate",
                what
            )));
        }
        Ok(())
    }
}

impl Coordinate for TabularCoordinate {
    fn kind(&self) -> CoordinateKind {
        CoordinateKind::Tabular
    }

    fn n_pixel_axes(&self) -> usize {
        1
    }

    fn n_world_axes(&self) -> usize {
        1
    }

    fn reference_value(&self) -> Vec<f64> {
        vec![self.crval]
    }

    fn reference_pixel(&self) -> Vec<f64> {
        vec![self.crpix]
    }

    fn increment(&self) -> Vec<f64> {
        vec![self.cdelt]
    }

    fn linear_transform(&self) -> DMatrix<f64> {
        DMatrix::identity(1, 1)
    }

    fn world_axis_names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn world_axis_units(&self) -> Vec<String> {
        vec![self.unit.clone()]
    }

    fn preferred_world_axis_units(&self) -> Vec<String> {
        vec![self.preferred_unit.clone()]
    }

    fn to_world(&self, world: &mut [f64], pixel: &[f64]) -> CoordResult<()> {
        debug_assert_eq!(world.len(), 1);
        debug_assert_eq!(pixel.len(), 1);
        if self.has_table() {
            let ascending = self.pixel_values[1] > self.pixel_values[0];
            world[0] = interpolate(&self.pixel_values, &self.world_values, pixel[0], ascending);
        } else {
            world[0] = self.crval + self.cdelt * (pixel[0] - self.crpix);
        }
        Ok(())
    }

    fn to_pixel(&self, pixel: &mut [f64], world: &[f64]) -> CoordResult<()> {
        debug_assert_eq!(world.len(), 1);
        debug_assert_eq!(pixel.len(), 1);
        if self.has_table() {
            let ascending = self.world_values[1] > self.world_values[0];
            pixel[0] = interpolate(&self.world_values, &self.pixel_values, world[0], ascending);
        } else {
            pixel[0] = (world[0] - self.crval) / self.cdelt + self.crpix;
        }
        Ok(())
    }

    fn set_world_axis_names(&mut self, names: &[String]) -> CoordResult<()> {
        Self::one_guard(names.len(), "names vector")?;
        self.name = names[0].clone();
        Ok(())
    }

    fn set_world_axis_units(&mut self, units: &[String]) -> CoordResult<()> {
        if let Some(factors) = self.unit_change_factors(units)? {
            self.crval *= factors[0];
            self.cdelt *= factors[0];
            for value in &mut self.world_values {
                *value *= factors[0];
            }
            self.unit = units[0].clone();
        }
        Ok(())
    }

    fn set_preferred_world_axis_units(&mut self, units: &[String]) -> CoordResult<()> {
        self.check_preferred_units(units)?;
        self.preferred_unit = units[0].clone();
        Ok(())
    }

    fn set_reference_value(&mut self, refval: &[f64]) -> CoordResult<()> {
        Self::one_guard(refval.len(), "reference value")?;
        if self.has_table() {
            return Err(self.table_immutable("reference value"));
        }
        self.crval = refval[0];
        Ok(())
    }

    fn set_reference_pixel(&mut self, refpix: &[f64]) -> CoordResult<()> {
        Self::one_guard(refpix.len(), "reference pixel")?;
        if self.has_table() {
            return Err(self.table_immutable("reference pixel"));
        }
        self.crpix = refpix[0];
        Ok(())
    }

    fn set_increment(&mut self, inc: &[f64]) -> CoordResult<()> {
        Self::one_guard(inc.len(), "increment")?;
        if self.has_table() {
            return Err(self.table_immutable("increment"));
        }
        self.cdelt = inc[0];
        Ok(())
    }

    fn set_linear_transform(&mut self, xform: &DMatrix<f64>) -> CoordResult<()> {
        if xform.shape() != (1, 1) {
            return Err(CoordError::dimension_mismatch(
                "linear transform has wrong shape",
            ));
        }
        Ok(())
    }

    fn save(&self, record: &mut Record, field: &str) -> CoordResult<()> {
        let mut sub = Record::new();
        sub.define_str("name", self.name.clone())
            .define_str("unit", self.unit.clone())
            .define_float("crval", self.crval)
            .define_float("crpix", self.crpix)
            .define_float("cdelt", self.cdelt);
        if self.has_table() {
            sub.define_float_vec("pixelvalues", self.pixel_values.clone())
                .define_float_vec("worldvalues", self.world_values.clone());
        }
        record.define_record(field, sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_mode() {
        let coord = TabularCoordinate::linear("Time", "s", 100.0, 0.5, 10.0).unwrap();
        let mut world = vec![0.0];
        coord.to_world(&mut world, &[14.0]).unwrap();
        assert_abs_diff_eq!(world[0], 102.0);
        let mut pixel = vec![0.0];
        coord.to_pixel(&mut pixel, &world).unwrap();
        assert_abs_diff_eq!(pixel[0], 14.0, epsilon = 1e-12);
    }

    #[test]
    fn test_table_interpolation() {
        let coord = TabularCoordinate::from_table(
            "Frequency",
            "Hz",
            vec![0.0, 1.0, 2.0],
            vec![10.0, 30.0, 40.0],
        )
        .unwrap();
        let mut world = vec![0.0];
        coord.to_world(&mut world, &[0.5]).unwrap();
        assert_abs_diff_eq!(world[0], 20.0);
        coord.to_world(&mut world, &[1.5]).unwrap();
        assert_abs_diff_eq!(world[0], 35.0);
    }

    #[test]
    fn test_table_extrapolates_with_end_segments() {
        let coord = TabularCoordinate::from_table(
            "Frequency",
            "Hz",
            vec![0.0, 1.0, 2.0],
            vec![10.0, 30.0, 40.0],
        )
        .unwrap();
        let mut world = vec![0.0];
        coord.to_world(&mut world, &[-1.0]).unwrap();
        assert_abs_diff_eq!(world[0], -10.0);
        coord.to_world(&mut world, &[3.0]).unwrap();
        assert_abs_diff_eq!(world[0], 50.0);
    }

    #[test]
    fn test_table_inverse() {
        let coord = TabularCoordinate::from_table(
            "Frequency",
            "Hz",
            vec![0.0, 1.0, 2.0],
            vec![10.0, 30.0, 40.0],
        )
        .unwrap();
        let mut pixel = vec![0.0];
        coord.to_pixel(&mut pixel, &[35.0]).unwrap();
        assert_abs_diff_eq!(pixel[0], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_descending_world_table() {
        let coord = TabularCoordinate::from_table(
            "Frequency",
            "Hz",
            vec![0.0, 1.0, 2.0],
            vec![40.0, 30.0, 10.0],
        )
        .unwrap();
        let mut world = vec![0.0];
        coord.to_world(&mut world, &[0.5]).unwrap();
        assert_abs_diff_eq!(world[0], 35.0);
        let mut pixel = vec![0.0];
        coord.to_pixel(&mut pixel, &[35.0]).unwrap();
        assert_abs_diff_eq!(pixel[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_linearized_descriptors() {
        let coord = TabularCoordinate::from_table(
            "Frequency",
            "Hz",
            vec![0.0, 1.0, 2.0],
            vec![10.0, 30.0, 40.0],
        )
        .unwrap();
        assert_abs_diff_eq!(coord.reference_value()[0], 10.0);
        assert_abs_diff_eq!(coord.reference_pixel()[0], 0.0);
        assert_abs_diff_eq!(coord.increment()[0], 15.0);
    }

    #[test]
    fn test_non_monotonic_rejected() {
        assert!(TabularCoordinate::from_table(
            "x",
            "m",
            vec![0.0, 2.0, 1.0],
            vec![0.0, 1.0, 2.0]
        )
        .is_err());
    }

    #[test]
    fn test_table_descriptors_immutable() {
        let mut coord =
            TabularCoordinate::from_table("x", "m", vec![0.0, 1.0], vec![0.0, 2.0]).unwrap();
        assert!(coord.set_reference_value(&[5.0]).is_err());
        assert!(coord.set_increment(&[2.0]).is_err());
    }

    #[test]
    fn test_save_restore_roundtrip() {
        let table = TabularCoordinate::from_table(
            "Frequency",
            "Hz",
            vec![0.0, 1.0, 4.0],
            vec![1.0e9, 1.1e9, 1.5e9],
        )
        .unwrap();
        let mut record = Record::new();
        table.save(&mut record, "tabular0").unwrap();
        assert_eq!(TabularCoordinate::restore(&record, "tabular0").unwrap(), table);

        let linear = TabularCoordinate::linear("Time", "s", 0.0, 1.0, 0.0).unwrap();
        let mut record = Record::new();
        linear.save(&mut record, "tabular0").unwrap();
        assert_eq!(
            TabularCoordinate::restore(&record, "tabular0").unwrap(),
            linear
        );
    }
}
