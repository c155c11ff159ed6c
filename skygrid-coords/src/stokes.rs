//! Polarization states and the Stokes sub-coordinate.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::coordinate::{Coordinate, CoordinateKind};
use crate::error::{CoordError, CoordResult};
use crate::record::Record;

/// Polarization state. The discriminants are the engine's own values; the
/// FITS convention uses a different numbering, see [`Stokes::fits_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i64)]
pub enum Stokes {
    I = 1,
    Q = 2,
    U = 3,
    V = 4,
    RR = 5,
    LL = 6,
    RL = 7,
    LR = 8,
    XX = 9,
    YY = 10,
    XY = 11,
    YX = 12,
}

impl Stokes {
    pub const ALL: [Stokes; 12] = [
        Stokes::I,
        Stokes::Q,
        Stokes::U,
        Stokes::V,
        Stokes::RR,
        Stokes::LL,
        Stokes::RL,
        Stokes::LR,
        Stokes::XX,
        Stokes::YY,
        Stokes::XY,
        Stokes::YX,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stokes::I => "I",
            Stokes::Q => "Q",
            Stokes::U => "U",
            Stokes::V => "V",
            Stokes::RR => "RR",
            Stokes::LL => "LL",
            Stokes::RL => "RL",
            Stokes::LR => "LR",
            Stokes::XX => "XX",
            Stokes::YY => "YY",
            Stokes::XY => "XY",
            Stokes::YX => "YX",
        }
    }

    pub fn from_value(value: i64) -> Option<Stokes> {
        Self::ALL.iter().copied().find(|s| *s as i64 == value)
    }

    /// The value this state takes in a FITS Stokes axis: `1..4` for
    /// I, Q, U, V; `−1..−4` for the circular correlations; `−5..−8` for
    /// the linear ones.
    pub fn fits_value(&self) -> i64 {
        match self {
            Stokes::I => 1,
            Stokes::Q => 2,
            Stokes::U => 3,
            Stokes::V => 4,
            Stokes::RR => -1,
            Stokes::LL => -2,
            Stokes::RL => -3,
            Stokes::LR => -4,
            Stokes::XX => -5,
            Stokes::YY => -6,
            Stokes::XY => -7,
            Stokes::YX => -8,
        }
    }

    pub fn from_fits_value(value: i64) -> Option<Stokes> {
        Self::ALL.iter().copied().find(|s| s.fits_value() == value)
    }
}

/// One axis enumerating polarization planes.
///
/// The transform is a table lookup: pixel `k` is the `k`-th state in the
/// list and the world value is that state's numeric value. The reference
/// pixel/value/increment are nominal descriptors kept for header
/// interchange; they do not bend the lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct StokesCoordinate {
    states: Vec<Stokes>,
    name: String,
    unit: String,
    preferred_unit: String,
    crval: f64,
    crpix: f64,
    cdelt: f64,
}

impl StokesCoordinate {
    pub fn new(states: Vec<Stokes>) -> CoordResult<Self> {
        if states.is_empty() {
            return Err(CoordError::dimension_mismatch(
                "a Stokes coordinate needs at least one state",
            ));
        }
        let crval = states[0] as i64 as f64;
        Ok(Self {
            states,
            name: "Stokes".to_string(),
            unit: String::new(),
            preferred_unit: String::new(),
            crval,
            crpix: 0.0,
            cdelt: 1.0,
        })
    }

    #[inline]
    pub fn states(&self) -> &[Stokes] {
        &self.states
    }

    pub fn restore(record: &Record, field: &str) -> CoordResult<Self> {
        let sub = record.require_record(field)?;
        let values = sub.require_int_vec("stokes")?;
        let states = values
            .iter()
            .map(|&v| {
                Stokes::from_value(v).ok_or_else(|| {
                    CoordError::conversion_failure(format!("unknown Stokes value {}", v))
                })
            })
            .collect::<CoordResult<Vec<_>>>()?;
        let mut coord = Self::new(states)?;
        if let Some(name) = sub.get_str("name") {
            coord.name = name.to_string();
        }
        coord.crval = sub.require_float("crval")?;
        coord.crpix = sub.require_float("crpix")?;
        coord.cdelt = sub.require_float("cdelt")?;
        Ok(coord)
    }
}

impl Coordinate for StokesCoordinate {
    fn kind(&self) -> CoordinateKind {
        CoordinateKind::Stokes
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
        let index = pixel[0].round();
        if index < 0.0 || index as usize >= self.states.len() {
            return Err(CoordError::conversion_failure(format!(
                "Stokes pixel {} outside the {} stored states",
                pixel[0],
                self.states.len()
            )));
        }
        world[0] = self.states[index as usize] as i64 as f64;
        Ok(())
    }

    fn to_pixel(&self, pixel: &mut [f64], world: &[f64]) -> CoordResult<()> {
        debug_assert_eq!(world.len(), 1);
        debug_assert_eq!(pixel.len(), 1);
        let value = world[0].round() as i64;
        match self
            .states
            .iter()
            .position(|s| *s as i64 == value)
        {
            Some(index) => {
                pixel[0] = index as f64;
                Ok(())
            }
            None => Err(CoordError::conversion_failure(format!(
                "Stokes value {} is not present on this axis",
                world[0]
            ))),
        }
    }

    fn set_world_axis_names(&mut self, names: &[String]) -> CoordResult<()> {
        if names.len() != 1 {
            return Err(CoordError::dimension_mismatch(
                "names vector has wrong number of elements",
            ));
        }
        self.name = names[0].clone();
        Ok(())
    }

    fn set_world_axis_units(&mut self, units: &[String]) -> CoordResult<()> {
        if self.unit_change_factors(units)?.is_some() {
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
        if refval.len() != 1 {
            return Err(CoordError::dimension_mismatch(
                "reference value has wrong number of elements",
            ));
        }
        self.crval = refval[0];
        Ok(())
    }

    fn set_reference_pixel(&mut self, refpix: &[f64]) -> CoordResult<()> {
        if refpix.len() != 1 {
            return Err(CoordError::dimension_mismatch(
                "reference pixel has wrong number of elements",
            ));
        }
        self.crpix = refpix[0];
        Ok(())
    }

    fn set_increment(&mut self, inc: &[f64]) -> CoordResult<()> {
        if inc.len() != 1 {
            return Err(CoordError::dimension_mismatch(
                "increment has wrong number of elements",
            ));
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
        sub.define_int_vec("stokes", self.states.iter().map(|s| *s as i64).collect())
            .define_str("name", self.name.clone())
            .define_float("crval", self.crval)
            .define_float("crpix", self.crpix)
            .define_float("cdelt", self.cdelt);
        record.define_record(field, sub);
        Ok(())
    }
}
