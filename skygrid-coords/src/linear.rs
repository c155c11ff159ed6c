//! Linear sub-coordinate: an affine pixel↔world map over N axes.

use nalgebra::{DMatrix, DVector};

use crate::coordinate::{Coordinate, CoordinateKind};
use crate::error::{CoordError, CoordResult};
use crate::record::Record;

const DETERMINANT_THRESHOLD: f64 = 1e-15;

/// N uncoupled-or-rotated axes: `world = crval + diag(cdelt) · PC ·
/// (pixel − crpix)`. The PC inverse is computed once at construction, so
/// a singular transform is rejected before it can corrupt a transform
/// chain.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCoordinate {
    names: Vec<String>,
    units: Vec<String>,
    preferred_units: Vec<String>,
    crval: Vec<f64>,
    crpix: Vec<f64>,
    cdelt: Vec<f64>,
    pc: DMatrix<f64>,
    pc_inverse: DMatrix<f64>,
}

fn invert_pc(pc: &DMatrix<f64>) -> CoordResult<DMatrix<f64>> {
    let determinant = pc.determinant();
    if determinant.abs() < DETERMINANT_THRESHOLD {
        return Err(CoordError::singular_transform(determinant));
    }
    pc.clone()
        .try_inverse()
        .ok_or(CoordError::SingularTransform {
            determinant,
        })
}

impl LinearCoordinate {
    pub fn new(
        names: Vec<String>,
        units: Vec<String>,
        crval: Vec<f64>,
        cdelt: Vec<f64>,
        pc: DMatrix<f64>,
        crpix: Vec<f64>,
    ) -> CoordResult<Self> {
        let n = names.len();
        if units.len() != n
            || crval.len() != n
            || cdelt.len() != n
            || crpix.len() != n
            || pc.nrows() != n
            || pc.ncols() != n
        {
            return Err(CoordError::dimension_mismatch(
                "linear coordinate vectors and PC matrix must agree in length",
            ));
        }
        for unit in &units {
            skygrid_core::units::parse(unit).map_err(CoordError::from)?;
        }
        let pc_inverse = invert_pc(&pc)?;
        Ok(Self {
            preferred_units: vec![String::new(); n],
            names,
            units,
            crval,
            crpix,
            cdelt,
            pc,
            pc_inverse,
        })
    }

    /// An n-axis identity coordinate: unnamed dimensionless axes with unit
    /// increments and zero reference.
    pub fn identity(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            units: vec![String::new(); n],
            preferred_units: vec![String::new(); n],
            crval: vec![0.0; n],
            crpix: vec![0.0; n],
            cdelt: vec![1.0; n],
            pc: DMatrix::identity(n, n),
            pc_inverse: DMatrix::identity(n, n),
        }
    }

    pub fn restore(record: &Record, field: &str) -> CoordResult<Self> {
        let sub = record.require_record(field)?;
        Self::new(
            sub.require_str_vec("axes")?.to_vec(),
            sub.require_str_vec("units")?.to_vec(),
            sub.require_float_vec("crval")?.to_vec(),
            sub.require_float_vec("cdelt")?.to_vec(),
            sub.require_matrix("pc")?.clone(),
            sub.require_float_vec("crpix")?.to_vec(),
        )
        .map(|mut coord| {
            if let Some(punits) = sub.get_str_vec("punits") {
                coord.preferred_units = punits.to_vec();
            }
            coord
        })
    }

    fn axis_count_guard(&self, len: usize, what: &str) -> CoordResult<()> {
        if len != self.crval.len() {
            return Err(CoordError::dimension_mismatch(format!(
                "{} has wrong number of elements",
                what
            )));
        }
        Ok(())
    }
}

impl Coordinate for LinearCoordinate {
    fn kind(&self) -> CoordinateKind {
        CoordinateKind::Linear
    }

    fn n_pixel_axes(&self) -> usize {
        self.crpix.len()
    }

    fn n_world_axes(&self) -> usize {
        self.crval.len()
    }

    fn reference_value(&self) -> Vec<f64> {
        self.crval.clone()
    }

    fn reference_pixel(&self) -> Vec<f64> {
        self.crpix.clone()
    }

    fn increment(&self) -> Vec<f64> {
        self.cdelt.clone()
    }

    fn linear_transform(&self) -> DMatrix<f64> {
        self.pc.clone()
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
        let n = self.crval.len();
        debug_assert_eq!(world.len(), n);
        debug_assert_eq!(pixel.len(), n);
        let rel = DVector::from_iterator(n, (0..n).map(|i| pixel[i] - self.crpix[i]));
        let rotated = &self.pc * rel;
        for i in 0..n {
            world[i] = self.crval[i] + self.cdelt[i] * rotated[i];
        }
        Ok(())
    }

    fn to_pixel(&self, pixel: &mut [f64], world: &[f64]) -> CoordResult<()> {
        let n = self.crval.len();
        debug_assert_eq!(world.len(), n);
        debug_assert_eq!(pixel.len(), n);
        let scaled =
            DVector::from_iterator(n, (0..n).map(|i| (world[i] - self.crval[i]) / self.cdelt[i]));
        let rel = &self.pc_inverse * scaled;
        for i in 0..n {
            pixel[i] = rel[i] + self.crpix[i];
        }
        Ok(())
    }

    fn set_world_axis_names(&mut self, names: &[String]) -> CoordResult<()> {
        self.axis_count_guard(names.len(), "names vector")?;
        self.names = names.to_vec();
        Ok(())
    }

    fn set_world_axis_units(&mut self, units: &[String]) -> CoordResult<()> {
        if let Some(factors) = self.unit_change_factors(units)? {
            for i in 0..self.cdelt.len() {
                self.cdelt[i] *= factors[i];
                self.crval[i] *= factors[i];
            }
            self.units = units.to_vec();
        }
        Ok(())
    }

    fn set_preferred_world_axis_units(&mut self, units: &[String]) -> CoordResult<()> {
        self.check_preferred_units(units)?;
        self.preferred_units = units.to_vec();
        Ok(())
    }

    fn set_reference_value(&mut self, refval: &[f64]) -> CoordResult<()> {
        self.axis_count_guard(refval.len(), "reference value")?;
        self.crval = refval.to_vec();
        Ok(())
    }

    fn set_reference_pixel(&mut self, refpix: &[f64]) -> CoordResult<()> {
        self.axis_count_guard(refpix.len(), "reference pixel")?;
        self.crpix = refpix.to_vec();
        Ok(())
    }

    fn set_increment(&mut self, inc: &[f64]) -> CoordResult<()> {
        self.axis_count_guard(inc.len(), "increment")?;
        self.cdelt = inc.to_vec();
        Ok(())
    }

    fn set_linear_transform(&mut self, xform: &DMatrix<f64>) -> CoordResult<()> {
        if xform.shape() != self.pc.shape() {
            return Err(CoordError::dimension_mismatch(
                "linear transform has wrong shape",
            ));
        }
        self.pc_inverse = invert_pc(xform)?;
        self.pc = xform.clone();
        Ok(())
    }

    fn save(&self, record: &mut Record, field: &str) -> CoordResult<()> {
        let mut sub = Record::new();
        sub.define_str_vec("axes", self.names.clone())
            .define_str_vec("units", self.units.clone())
            .define_str_vec("punits", self.preferred_units.clone())
            .define_float_vec("crval", self.crval.clone())
            .define_float_vec("crpix", self.crpix.clone())
            .define_float_vec("cdelt", self.cdelt.clone())
            .define_matrix("pc", self.pc.clone());
        record.define_record(field, sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn two_axis() -> LinearCoordinate {
        LinearCoordinate::new(
            vec!["u".into(), "v".into()],
            vec!["m".into(), "m".into()],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            DMatrix::identity(2, 2),
            vec![0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_identity_transform() {
        let coord = two_axis();
        let mut world = vec![0.0; 2];
        coord.to_world(&mut world, &[3.0, 4.0]).unwrap();
        assert_eq!(world, vec![3.0, 4.0]);

        let mut pixel = vec![0.0; 2];
        coord.to_pixel(&mut pixel, &[3.0, 4.0]).unwrap();
        assert_eq!(pixel, vec![3.0, 4.0]);
    }

    #[test]
    fn test_offset_and_scale() {
        let coord = LinearCoordinate::new(
            vec!["x".into()],
            vec!["km".into()],
            vec![100.0],
            vec![2.5],
            DMatrix::identity(1, 1),
            vec![10.0],
        )
        .unwrap();
        let mut world = vec![0.0];
        coord.to_world(&mut world, &[14.0]).unwrap();
        assert_abs_diff_eq!(world[0], 110.0);
        let mut pixel = vec![0.0];
        coord.to_pixel(&mut pixel, &world).unwrap();
        assert_abs_diff_eq!(pixel[0], 14.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotated_pc_roundtrip() {
        let angle: f64 = 0.3;
        let (s, c) = angle.sin_cos();
        let pc = DMatrix::from_row_slice(2, 2, &[c, -s, s, c]);
        let coord = LinearCoordinate::new(
            vec!["u".into(), "v".into()],
            vec!["m".into(), "m".into()],
            vec![5.0, -5.0],
            vec![0.5, 2.0],
            pc,
            vec![128.0, 128.0],
        )
        .unwrap();
        let pixel_in = [100.0, 150.0];
        let mut world = vec![0.0; 2];
        coord.to_world(&mut world, &pixel_in).unwrap();
        let mut pixel = vec![0.0; 2];
        coord.to_pixel(&mut pixel, &world).unwrap();
        assert_abs_diff_eq!(pixel[0], pixel_in[0], epsilon = 1e-10);
        assert_abs_diff_eq!(pixel[1], pixel_in[1], epsilon = 1e-10);
    }

    #[test]
    fn test_singular_pc_rejected() {
        let pc = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let result = LinearCoordinate::new(
            vec!["u".into(), "v".into()],
            vec!["m".into(), "m".into()],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            pc,
            vec![0.0, 0.0],
        );
        assert!(matches!(
            result,
            Err(CoordError::SingularTransform { .. })
        ));
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let result = LinearCoordinate::new(
            vec!["x".into()],
            vec!["wombat".into()],
            vec![0.0],
            vec![1.0],
            DMatrix::identity(1, 1),
            vec![0.0],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_set_world_axis_units_scales() {
        let mut coord = LinearCoordinate::new(
            vec!["x".into()],
            vec!["m".into()],
            vec![1000.0],
            vec![10.0],
            DMatrix::identity(1, 1),
            vec![0.0],
        )
        .unwrap();
        coord.set_world_axis_units(&["km".to_string()]).unwrap();
        assert_abs_diff_eq!(coord.reference_value()[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(coord.increment()[0], 0.01, epsilon = 1e-12);
        assert_eq!(coord.world_axis_units(), vec!["km".to_string()]);
    }

    #[test]
    fn test_set_world_axis_units_noop_on_same() {
        let mut coord = two_axis();
        let before = coord.reference_value();
        coord
            .set_world_axis_units(&["m".to_string(), "m".to_string()])
            .unwrap();
        assert_eq!(coord.reference_value(), before);
    }

    #[test]
    fn test_set_linear_transform_updates_inverse() {
        let mut coord = two_axis();
        let pc = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        coord.set_linear_transform(&pc).unwrap();
        let mut world = vec![0.0; 2];
        coord.to_world(&mut world, &[1.0, 1.0]).unwrap();
        assert_eq!(world, vec![2.0, 4.0]);
        let mut pixel = vec![0.0; 2];
        coord.to_pixel(&mut pixel, &world).unwrap();
        assert_abs_diff_eq!(pixel[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pixel[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_save_restore_roundtrip() {
        let angle: f64 = -0.1;
        let (s, c) = angle.sin_cos();
        let original = LinearCoordinate::new(
            vec!["u".into(), "v".into()],
            vec!["km".into(), "m".into()],
            vec![7.0, 8.0],
            vec![0.25, -0.5],
            DMatrix::from_row_slice(2, 2, &[c, -s, s, c]),
            vec![32.0, 64.0],
        )
        .unwrap();
        let mut record = Record::new();
        original.save(&mut record, "linear0").unwrap();
        let restored = LinearCoordinate::restore(&record, "linear0").unwrap();
        assert_eq!(restored, original);
    }
}
