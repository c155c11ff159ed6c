//! Sum type over the concrete sub-coordinate variants.
//!
//! A [`CoordinateSystem`](crate::system::CoordinateSystem) owns its
//! sub-coordinates as values of this enum; dynamic dispatch happens
//! through [`SubCoordinate::as_coord`] rather than a pointer hierarchy,
//! and a nested system is just another variant.

use crate::coordinate::{Coordinate, CoordinateKind};
use crate::direction::DirectionCoordinate;
use crate::error::CoordResult;
use crate::linear::LinearCoordinate;
use crate::record::Record;
use crate::spectral::SpectralCoordinate;
use crate::stokes::StokesCoordinate;
use crate::system::CoordinateSystem;
use crate::tabular::TabularCoordinate;

#[derive(Debug, Clone, PartialEq)]
pub enum SubCoordinate {
    Linear(LinearCoordinate),
    Direction(DirectionCoordinate),
    Spectral(SpectralCoordinate),
    Stokes(StokesCoordinate),
    Tabular(TabularCoordinate),
    System(Box<CoordinateSystem>),
}

impl SubCoordinate {
    pub fn as_coord(&self) -> &dyn Coordinate {
        match self {
            Self::Linear(c) => c,
            Self::Direction(c) => c,
            Self::Spectral(c) => c,
            Self::Stokes(c) => c,
            Self::Tabular(c) => c,
            Self::System(c) => c.as_ref(),
        }
    }

    pub fn as_coord_mut(&mut self) -> &mut dyn Coordinate {
        match self {
            Self::Linear(c) => c,
            Self::Direction(c) => c,
            Self::Spectral(c) => c,
            Self::Stokes(c) => c,
            Self::Tabular(c) => c,
            Self::System(c) => c.as_mut(),
        }
    }

    #[inline]
    pub fn kind(&self) -> CoordinateKind {
        self.as_coord().kind()
    }

    pub fn save(&self, record: &mut Record, field: &str) -> CoordResult<()> {
        self.as_coord().save(record, field)
    }

    /// Restores the `index`-th sub-coordinate of a system record, probing
    /// the kind-tagged field names. `None` means no field for this index
    /// exists at all.
    pub fn restore_indexed(record: &Record, index: usize) -> Option<CoordResult<SubCoordinate>> {
        let probe = |kind: CoordinateKind| format!("{}{}", kind.record_basename(), index);

        let field = probe(CoordinateKind::Linear);
        if record.is_defined(&field) {
            return Some(LinearCoordinate::restore(record, &field).map(Self::Linear));
        }
        let field = probe(CoordinateKind::Direction);
        if record.is_defined(&field) {
            return Some(DirectionCoordinate::restore(record, &field).map(Self::Direction));
        }
        let field = probe(CoordinateKind::Spectral);
        if record.is_defined(&field) {
            return Some(SpectralCoordinate::restore(record, &field).map(Self::Spectral));
        }
        let field = probe(CoordinateKind::Stokes);
        if record.is_defined(&field) {
            return Some(StokesCoordinate::restore(record, &field).map(Self::Stokes));
        }
        let field = probe(CoordinateKind::Tabular);
        if record.is_defined(&field) {
            return Some(TabularCoordinate::restore(record, &field).map(Self::Tabular));
        }
        let field = probe(CoordinateKind::System);
        if record.is_defined(&field) {
            return Some(
                CoordinateSystem::restore(record, &field).map(|s| Self::System(Box::new(s))),
            );
        }
        None
    }
}

impl From<LinearCoordinate> for SubCoordinate {
    fn from(coord: LinearCoordinate) -> Self {
        Self::Linear(coord)
    }
}

impl From<DirectionCoordinate> for SubCoordinate {
    fn from(coord: DirectionCoordinate) -> Self {
        Self::Direction(coord)
    }
}

impl From<SpectralCoordinate> for SubCoordinate {
    fn from(coord: SpectralCoordinate) -> Self {
        Self::Spectral(coord)
    }
}

impl From<StokesCoordinate> for SubCoordinate {
    fn from(coord: StokesCoordinate) -> Self {
        Self::Stokes(coord)
    }
}

impl From<TabularCoordinate> for SubCoordinate {
    fn from(coord: TabularCoordinate) -> Self {
        Self::Tabular(coord)
    }
}

impl From<CoordinateSystem> for SubCoordinate {
    fn from(system: CoordinateSystem) -> Self {
        Self::System(Box::new(system))
    }
}
