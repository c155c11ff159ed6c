//! Spectral sub-coordinate: one frequency axis with a rest frequency.

use nalgebra::DMatrix;

use crate::coordinate::{Coordinate, CoordinateKind};
use crate::error::{CoordError, CoordResult};
use crate::record::Record;

/// Linear pixel↔frequency axis, natively in Hz.
///
/// Velocity conventions are not modeled; the rest frequency rides along
/// so downstream consumers can derive velocities, and the FITS routines
/// here own the spectral keywords when a system is written to or read
/// from a header.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralCoordinate {
    name: String,
    unit: String,
    preferred_unit: String,
    crval: f64,
    crpix: f64,
    cdelt: f64,
    rest_frequency: f64,
}

impl SpectralCoordinate {
    /// Frequency at `crpix` and per-pixel step, both in Hz.
    pub fn new(crval: f64, cdelt: f64, crpix: f64, rest_frequency: f64) -> Self {
        Self {
            name: "Frequency".to_string(),
            unit: "Hz".to_string(),
            preferred_unit: String::new(),
            crval,
            crpix,
            cdelt,
            rest_frequency,
        }
    }

    /// Rest frequency in Hz.
    #[inline]
    pub fn rest_frequency(&self) -> f64 {
        self.rest_frequency
    }

    pub fn set_rest_frequency(&mut self, rest_frequency: f64) {
        self.rest_frequency = rest_frequency;
    }

    /// Writes the spectral keywords into a header the coordinate system
    /// has already populated: rewrites this axis's ctype to `FREQ` and
    /// adds the rest frequency.
    pub fn to_fits(&self, header: &mut Record, axis: usize, prefix: char) -> CoordResult<()> {
        let key = format!("{}type", prefix);
        let mut ctype = header.require_str_vec(&key)?.to_vec();
        if axis >= ctype.len() {
            return Err(CoordError::invalid_axis(axis, ctype.len()));
        }
        ctype[axis] = "FREQ    ".to_string();
        header.define_str_vec(key, ctype);
        if self.rest_frequency > 0.0 {
            header.define_float("restfreq", self.rest_frequency);
        }
        Ok(())
    }

    /// Builds a spectral coordinate from the frequency axis of a header.
    /// Fails when the axis is not a plain frequency axis (velocity-style
    /// ctypes are left for the caller's linear fallback).
    pub fn from_fits(
        header: &Record,
        axis: usize,
        offset: f64,
        prefix: char,
    ) -> CoordResult<Self> {
        let ctype = header.require_str_vec(&format!("{}type", prefix))?;
        if axis >= ctype.len() {
            return Err(CoordError::invalid_axis(axis, ctype.len()));
        }
        if !ctype[axis].contains("FREQ") {
            return Err(CoordError::fits_inconsistent(format!(
                "spectral axis ctype '{}' is not a frequency axis",
                ctype[axis].trim()
            )));
        }
        let fetch = |key: &str| -> CoordResult<f64> {
            header
                .require_float_vec(&format!("{}{}", prefix, key))?
                .get(axis)
                .copied()
                .ok_or_else(|| CoordError::invalid_axis(axis, ctype.len()))
        };
        let crval = fetch("rval")?;
        let cdelt = fetch("delt")?;
        let crpix = fetch("rpix")?;
        let rest_frequency = header.get_float("restfreq").unwrap_or(0.0);
        Ok(Self::new(crval, cdelt, crpix - offset, rest_frequency))
    }

    pub fn restore(record: &Record, field: &str) -> CoordResult<Self> {
        let sub = record.require_record(field)?;
        let mut coord = Self::new(
            sub.require_float("crval")?,
            sub.require_float("cdelt")?,
            sub.require_float("crpix")?,
            sub.require_float("restfreq")?,
        );
        if let Some(unit) = sub.get_str("unit") {
            coord.unit = unit.to_string();
        }
        if let Some(name) = sub.get_str("name") {
            coord.name = name.to_string();
        }
        Ok(coord)
    }

    fn one_guard(len: usize, what: &str) -> CoordResult<()> {
        if len != 1 {
            return Err(CoordError::dimension_mismatch(format!(
                "{} must have one element for a spectral coordinate",
                what
            )));
        }
        Ok(())
    }
}

impl Coordinate for SpectralCoordinate {
    fn kind(&self) -> CoordinateKind {
        CoordinateKind::Spectral
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
        world[0] = self.crval + self.cdelt * (pixel[0] - self.crpix);
        Ok(())
    }

    fn to_pixel(&self, pixel: &mut [f64], world: &[f64]) -> CoordResult<()> {
        debug_assert_eq!(world.len(), 1);
        debug_assert_eq!(pixel.len(), 1);
        pixel[0] = (world[0] - self.crval) / self.cdelt + self.crpix;
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
        self.crval = refval[0];
        Ok(())
    }

    fn set_reference_pixel(&mut self, refpix: &[f64]) -> CoordResult<()> {
        Self::one_guard(refpix.len(), "reference pixel")?;
        self.crpix = refpix[0];
        Ok(())
    }

    fn set_increment(&mut self, inc: &[f64]) -> CoordResult<()> {
        Self::one_guard(inc.len(), "increment")?;
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
            .define_float("cdelt", self.cdelt)
            .define_float("restfreq", self.rest_frequency);
        record.define_record(field, sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_frequency_transform() {
        let coord = SpectralCoordinate::new(1.4e9, 1.0e6, 0.0, 1.420405751786e9);
        let mut world = vec![0.0];
        coord.to_world(&mut world, &[10.0]).unwrap();
        assert_abs_diff_eq!(world[0], 1.41e9);

        let mut pixel = vec![0.0];
        coord.to_pixel(&mut pixel, &world).unwrap();
        assert_abs_diff_eq!(pixel[0], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unit_change_to_ghz() {
        let mut coord = SpectralCoordinate::new(1.4e9, 1.0e6, 32.0, 0.0);
        coord.set_world_axis_units(&["GHz".to_string()]).unwrap();
        assert_abs_diff_eq!(coord.reference_value()[0], 1.4, epsilon = 1e-12);
        assert_abs_diff_eq!(coord.increment()[0], 1.0e-3, epsilon = 1e-15);
    }

    #[test]
    fn test_to_fits_rewrites_ctype() {
        let coord = SpectralCoordinate::new(1.4e9, 1.0e6, 0.0, 1.42e9);
        let mut header = Record::new();
        header.define_str_vec(
            "ctype",
            vec!["RA---TAN".to_string(), "DEC--TAN".to_string(), "Frequency".to_string()],
        );
        coord.to_fits(&mut header, 2, 'c').unwrap();
        assert_eq!(header.get_str_vec("ctype").unwrap()[2], "FREQ    ");
        assert_eq!(header.get_float("restfreq"), Some(1.42e9));
    }

    #[test]
    fn test_from_fits() {
        let mut header = Record::new();
        header
            .define_str_vec("ctype", vec!["FREQ    ".to_string()])
            .define_float_vec("crval", vec![1.4e9])
            .define_float_vec("cdelt", vec![2.0e6])
            .define_float_vec("crpix", vec![5.0])
            .define_float("restfreq", 1.42e9);
        let coord = SpectralCoordinate::from_fits(&header, 0, 1.0, 'c').unwrap();
        assert_abs_diff_eq!(coord.reference_pixel()[0], 4.0);
        assert_abs_diff_eq!(coord.rest_frequency(), 1.42e9);
    }

    #[test]
    fn test_from_fits_rejects_velocity_axis() {
        let mut header = Record::new();
        header
            .define_str_vec("ctype", vec!["VELO-LSR".to_string()])
            .define_float_vec("crval", vec![0.0])
            .define_float_vec("cdelt", vec![1.0])
            .define_float_vec("crpix", vec![0.0]);
        assert!(SpectralCoordinate::from_fits(&header, 0, 0.0, 'c').is_err());
    }

    #[test]
    fn test_save_restore_roundtrip() {
        let original = SpectralCoordinate::new(1.4e9, -2.5e5, 63.0, 1.420405751786e9);
        let mut record = Record::new();
        original.save(&mut record, "spectral0").unwrap();
        let restored = SpectralCoordinate::restore(&record, "spectral0").unwrap();
        assert_eq!(restored, original);
    }
}
