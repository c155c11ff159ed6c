//! The composite coordinate system.
//!
//! A [`CoordinateSystem`] owns an ordered list of sub-coordinates plus the
//! axis-mapping tables that decide which of their axes are visible to
//! callers, at which position, and what value stands in for the hidden
//! ones. It implements the full [`Coordinate`] contract by dispatching
//! through the maps, so a system can itself nest inside another system.
//!
//! # Axis maps
//!
//! For each sub-coordinate the world map and pixel map give, per axis of
//! that sub-coordinate, the externally visible axis index, or −1 for a
//! removed axis. The non-negative entries of all maps together are always
//! a permutation of `0..n_world_axes()` (respectively pixel); every
//! mutating operation here preserves that.

use std::cell::RefCell;

use nalgebra::DMatrix;

use skygrid_core::near;

use crate::coordinate::{Coordinate, CoordinateKind, FormatMode};
use crate::direction::DirectionCoordinate;
use crate::error::{CoordError, CoordResult};
use crate::record::Record;
use crate::spectral::SpectralCoordinate;
use crate::stokes::StokesCoordinate;
use crate::subcoord::SubCoordinate;
use crate::tabular::TabularCoordinate;

const WORLD_RANGE_DEFAULT: f64 = 1.0e99;

/// A sub-coordinate plus its mapping tables, replacement values and
/// conversion scratch.
#[derive(Debug, Clone)]
struct SubEntry {
    coord: SubCoordinate,
    world_map: Vec<i32>,
    pixel_map: Vec<i32>,
    world_replacement: Vec<f64>,
    pixel_replacement: Vec<f64>,
    world_tmp: RefCell<Vec<f64>>,
    pixel_tmp: RefCell<Vec<f64>>,
}

impl PartialEq for SubEntry {
    fn eq(&self, other: &Self) -> bool {
        // Scratch does not participate in identity.
        self.coord == other.coord
            && self.world_map == other.world_map
            && self.pixel_map == other.pixel_map
            && self.world_replacement == other.world_replacement
            && self.pixel_replacement == other.pixel_replacement
    }
}

impl SubEntry {
    fn new(coord: SubCoordinate, first_world: usize, first_pixel: usize) -> Self {
        let nw = coord.as_coord().n_world_axes();
        let np = coord.as_coord().n_pixel_axes();
        Self {
            world_map: (0..nw).map(|i| (first_world + i) as i32).collect(),
            pixel_map: (0..np).map(|i| (first_pixel + i) as i32).collect(),
            world_replacement: vec![0.0; nw],
            pixel_replacement: vec![0.0; np],
            world_tmp: RefCell::new(vec![0.0; nw]),
            pixel_tmp: RefCell::new(vec![0.0; np]),
            coord,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoordinateSystem {
    entries: Vec<SubEntry>,
    mix_ranges: Option<(Vec<f64>, Vec<f64>)>,
}

impl PartialEq for CoordinateSystem {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl CoordinateSystem {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn n_coordinates(&self) -> usize {
        self.entries.len()
    }

    pub fn coordinate(&self, which: usize) -> &SubCoordinate {
        &self.entries[which].coord
    }

    pub fn coordinate_kind(&self, which: usize) -> CoordinateKind {
        self.entries[which].coord.kind()
    }

    pub fn direction_coordinate(&self, which: usize) -> Option<&DirectionCoordinate> {
        match &self.entries.get(which)?.coord {
            SubCoordinate::Direction(c) => Some(c),
            _ => None,
        }
    }

    pub fn spectral_coordinate(&self, which: usize) -> Option<&SpectralCoordinate> {
        match &self.entries.get(which)?.coord {
            SubCoordinate::Spectral(c) => Some(c),
            _ => None,
        }
    }

    pub fn stokes_coordinate(&self, which: usize) -> Option<&StokesCoordinate> {
        match &self.entries.get(which)?.coord {
            SubCoordinate::Stokes(c) => Some(c),
            _ => None,
        }
    }

    pub fn tabular_coordinate(&self, which: usize) -> Option<&TabularCoordinate> {
        match &self.entries.get(which)?.coord {
            SubCoordinate::Tabular(c) => Some(c),
            _ => None,
        }
    }

    /// Appends a sub-coordinate; its axes become the next exposed world
    /// and pixel indices in order.
    pub fn add_coordinate(&mut self, coord: impl Into<SubCoordinate>) {
        let first_world = self.n_world_axes();
        let first_pixel = self.n_pixel_axes();
        self.entries
            .push(SubEntry::new(coord.into(), first_world, first_pixel));
        self.mix_ranges = None;
    }

    /// Substitutes the sub-coordinate at `which`; axis counts must be
    /// unchanged so the maps stay valid.
    pub fn replace_coordinate(
        &mut self,
        which: usize,
        coord: impl Into<SubCoordinate>,
    ) -> CoordResult<()> {
        if which >= self.entries.len() {
            return Err(CoordError::invalid_axis(which, self.entries.len()));
        }
        let coord = coord.into();
        let old = self.entries[which].coord.as_coord();
        if coord.as_coord().n_world_axes() != old.n_world_axes()
            || coord.as_coord().n_pixel_axes() != old.n_pixel_axes()
        {
            return Err(CoordError::dimension_mismatch(
                "replacement coordinate must keep the axis counts",
            ));
        }
        self.entries[which].coord = coord;
        Ok(())
    }

    /// First coordinate of `kind`, scanning from the start.
    pub fn find_coordinate(&self, kind: CoordinateKind) -> Option<usize> {
        self.entries.iter().position(|e| e.coord.kind() == kind)
    }

    /// First coordinate of `kind` after index `after`.
    pub fn find_coordinate_after(&self, kind: CoordinateKind, after: usize) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .skip(after + 1)
            .find(|(_, e)| e.coord.kind() == kind)
            .map(|(i, _)| i)
    }

    /// Walks an exposed world axis back to `(coordinate, axis in
    /// coordinate)`.
    pub fn find_world_axis(&self, axis: usize) -> Option<(usize, usize)> {
        for (i, entry) in self.entries.iter().enumerate() {
            for (j, &mapped) in entry.world_map.iter().enumerate() {
                if mapped == axis as i32 {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Walks an exposed pixel axis back to `(coordinate, axis in
    /// coordinate)`.
    pub fn find_pixel_axis(&self, axis: usize) -> Option<(usize, usize)> {
        for (i, entry) in self.entries.iter().enumerate() {
            for (j, &mapped) in entry.pixel_map.iter().enumerate() {
                if mapped == axis as i32 {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Per-axis exposed world indices of one sub-coordinate; −1 for
    /// removed axes.
    pub fn world_axes(&self, which: usize) -> Vec<i32> {
        self.entries[which].world_map.clone()
    }

    /// Per-axis exposed pixel indices of one sub-coordinate; −1 for
    /// removed axes.
    pub fn pixel_axes(&self, which: usize) -> Vec<i32> {
        self.entries[which].pixel_map.clone()
    }

    /// The exposed world axis fed by an exposed pixel axis, when its
    /// world partner has not been removed.
    pub fn pixel_axis_to_world_axis(&self, pixel_axis: usize) -> Option<usize> {
        let (coord, axis) = self.find_pixel_axis(pixel_axis)?;
        let mapped = self.entries[coord].world_map[axis];
        (mapped >= 0).then_some(mapped as usize)
    }

    /// Hides world axis `axis`; `replacement` is used for it in every
    /// later world→pixel conversion. Exposed indices above `axis` shift
    /// down.
    pub fn remove_world_axis(&mut self, axis: usize, replacement: f64) -> CoordResult<()> {
        let nw = self.n_world_axes();
        if axis >= nw {
            return Err(CoordError::invalid_axis(axis, nw));
        }
        let (coord, caxis) = match self.find_world_axis(axis) {
            Some(found) => found,
            None => return Err(CoordError::invalid_axis(axis, nw)),
        };
        self.entries[coord].world_replacement[caxis] = replacement;
        self.entries[coord].world_map[caxis] = -1;
        for entry in &mut self.entries {
            for mapped in &mut entry.world_map {
                if *mapped > axis as i32 {
                    *mapped -= 1;
                }
            }
        }
        self.mix_ranges = None;
        Ok(())
    }

    /// Hides pixel axis `axis`; the sub-coordinate still sees the axis
    /// internally at the fixed `replacement` value.
    pub fn remove_pixel_axis(&mut self, axis: usize, replacement: f64) -> CoordResult<()> {
        let np = self.n_pixel_axes();
        if axis >= np {
            return Err(CoordError::invalid_axis(axis, np));
        }
        let (coord, caxis) = match self.find_pixel_axis(axis) {
            Some(found) => found,
            None => return Err(CoordError::invalid_axis(axis, np)),
        };
        self.entries[coord].pixel_replacement[caxis] = replacement;
        self.entries[coord].pixel_map[caxis] = -1;
        for entry in &mut self.entries {
            for mapped in &mut entry.pixel_map {
                if *mapped > axis as i32 {
                    *mapped -= 1;
                }
            }
        }
        self.mix_ranges = None;
        Ok(())
    }

    fn check_permutation(order: &[usize], n: usize, what: &str) -> CoordResult<()> {
        if order.len() != n {
            return Err(CoordError::invalid_permutation(format!(
                "{} order has {} elements, expected {}",
                what,
                order.len(),
                n
            )));
        }
        let mut seen = vec![false; n];
        for &index in order {
            if index >= n || seen[index] {
                return Err(CoordError::invalid_permutation(format!(
                    "{} order is not a permutation of 0..{}",
                    what, n
                )));
            }
            seen[index] = true;
        }
        Ok(())
    }

    /// Reorders the exposed axes: after the call, exposed world axis `i`
    /// is what `world_order[i]` used to be (and likewise for pixels).
    /// The stored sub-coordinates do not move.
    pub fn transpose(&mut self, world_order: &[usize], pixel_order: &[usize]) -> CoordResult<()> {
        let nw = self.n_world_axes();
        let np = self.n_pixel_axes();
        Self::check_permutation(world_order, nw, "world")?;
        Self::check_permutation(pixel_order, np, "pixel")?;

        // Removed axes keep their place, so start from copies.
        let mut new_world: Vec<Vec<i32>> =
            self.entries.iter().map(|e| e.world_map.clone()).collect();
        let mut new_pixel: Vec<Vec<i32>> =
            self.entries.iter().map(|e| e.pixel_map.clone()).collect();

        for (i, &old) in world_order.iter().enumerate() {
            let (coord, axis) = self
                .find_world_axis(old)
                .ok_or_else(|| CoordError::invalid_permutation("world axis not found"))?;
            new_world[coord][axis] = i as i32;
        }
        for (i, &old) in pixel_order.iter().enumerate() {
            let (coord, axis) = self
                .find_pixel_axis(old)
                .ok_or_else(|| CoordError::invalid_permutation("pixel axis not found"))?;
            new_pixel[coord][axis] = i as i32;
        }
        for (entry, (world_map, pixel_map)) in self
            .entries
            .iter_mut()
            .zip(new_world.into_iter().zip(new_pixel))
        {
            entry.world_map = world_map;
            entry.pixel_map = pixel_map;
        }
        self.mix_ranges = None;
        Ok(())
    }

    /// Rebuilds the identity maps: every axis exposed again, in append
    /// order.
    pub fn restore_original(&mut self) {
        let coords: Vec<SubCoordinate> = self.entries.iter().map(|e| e.coord.clone()).collect();
        let mut fresh = CoordinateSystem::new();
        for coord in coords {
            fresh.add_coordinate(coord);
        }
        *self = fresh;
    }

    /// The coordinate system of a regularly subsampled cutout:
    /// `new_refpix = (refpix − origin_shift) / inc` and `new_increment =
    /// increment · inc` per pixel axis.
    pub fn sub_image(&self, origin_shift: &[f64], inc: &[f64]) -> CoordResult<CoordinateSystem> {
        let np = self.n_pixel_axes();
        if origin_shift.len() != np || inc.len() != np {
            return Err(CoordError::dimension_mismatch(
                "origin shift and increment must be of length n_pixel_axes",
            ));
        }
        for (axis, &step) in inc.iter().enumerate() {
            if step < 1.0 {
                return Err(CoordError::invalid_increment(axis, step));
            }
        }

        let mut coords = self.clone();
        let mut crpix = coords.reference_pixel();
        let mut cdelt = coords.increment();
        for i in 0..np {
            crpix[i] = (crpix[i] - origin_shift[i]) / inc[i];
            if i < cdelt.len() {
                cdelt[i] *= inc[i];
            }
        }
        // Tabular table axes refuse descriptor changes; mirror the
        // original behavior of applying what can be applied.
        let _ = coords.set_reference_pixel(&crpix);
        let _ = coords.set_increment(&cdelt);
        Ok(coords)
    }

    /// Fills the per-axis world ranges used by mixed conversions from an
    /// image shape (see [`Coordinate::world_mix_ranges`]). On conversion
    /// failure the stored ranges fall back to the open defaults and the
    /// error is returned.
    pub fn set_world_mix_ranges(&mut self, shape: &[i64]) -> CoordResult<()> {
        let nw = self.n_world_axes();
        self.mix_ranges = Some((
            vec![-WORLD_RANGE_DEFAULT; nw],
            vec![WORLD_RANGE_DEFAULT; nw],
        ));
        let (world_min, world_max) = self.world_mix_ranges(shape)?;
        self.mix_ranges = Some((world_min, world_max));
        Ok(())
    }

    pub fn world_mix_min(&self) -> Vec<f64> {
        match &self.mix_ranges {
            Some((min, _)) => min.clone(),
            None => vec![-WORLD_RANGE_DEFAULT; self.n_world_axes()],
        }
    }

    pub fn world_mix_max(&self) -> Vec<f64> {
        match &self.mix_ranges {
            Some((_, max)) => max.clone(),
            None => vec![WORLD_RANGE_DEFAULT; self.n_world_axes()],
        }
    }

    /// Integer-pixel forward transform; the indices widen to floating
    /// point.
    pub fn to_world_indices(&self, world: &mut [f64], pixel: &[i64]) -> CoordResult<()> {
        let widened: Vec<f64> = pixel.iter().map(|&p| p as f64).collect();
        self.to_world(world, &widened)
    }

    /// Compares two systems under tolerance `tol`.
    pub fn near(&self, other: &CoordinateSystem, tol: f64) -> CoordResult<()> {
        self.near_with_exclusions(other, &[], tol)
    }

    /// Compares two systems, ignoring the axis descriptors on the listed
    /// exposed pixel axes.
    pub fn near_with_exclusions(
        &self,
        other: &CoordinateSystem,
        exclude_pixel_axes: &[usize],
        tol: f64,
    ) -> CoordResult<()> {
        if self.n_coordinates() != other.n_coordinates() {
            return Err(CoordError::mismatch("number of coordinates differs"));
        }
        if self.n_pixel_axes() != other.n_pixel_axes() {
            return Err(CoordError::mismatch("number of pixel axes differs"));
        }
        if self.n_world_axes() != other.n_world_axes() {
            return Err(CoordError::mismatch("number of world axes differs"));
        }

        for i in 0..self.n_coordinates() {
            if self.coordinate_kind(i) != other.coordinate_kind(i) {
                return Err(CoordError::mismatch(format!(
                    "coordinate {} differs in type",
                    i
                )));
            }
            if self.pixel_axes(i) != other.pixel_axes(i) {
                return Err(CoordError::mismatch(format!(
                    "coordinate {} occupies different pixel axes",
                    i
                )));
            }
            if self.world_axes(i) != other.world_axes(i) {
                return Err(CoordError::mismatch(format!(
                    "coordinate {} occupies different world axes",
                    i
                )));
            }

            // A coordinate whose world axes are all removed carries no
            // caller-visible descriptors to compare.
            if self.world_axes(i).iter().all(|&a| a < 0) {
                continue;
            }

            // Translate the system-level exclusions into axes of this
            // coordinate; indices that are not valid simply never match.
            let np = self.coordinate(i).as_coord().n_pixel_axes();
            let mut compare_axes = vec![true; np];
            for &excluded in exclude_pixel_axes {
                if let Some((coord, axis)) = self.find_pixel_axis(excluded) {
                    if coord == i {
                        compare_axes[axis] = false;
                    }
                }
            }

            self.near_one_coordinate(other, i, &compare_axes, tol)?;
        }
        Ok(())
    }

    fn near_one_coordinate(
        &self,
        other: &CoordinateSystem,
        which: usize,
        compare_axes: &[bool],
        tol: f64,
    ) -> CoordResult<()> {
        let a = self.coordinate(which);
        let b = other.coordinate(which);

        // Kind-specific state the generic descriptors cannot see.
        match (a, b) {
            (SubCoordinate::Direction(x), SubCoordinate::Direction(y)) => {
                if x.frame() != y.frame() {
                    return Err(CoordError::mismatch("direction frames differ"));
                }
                if x.projection().code() != y.projection().code() {
                    return Err(CoordError::mismatch("projections differ"));
                }
            }
            (SubCoordinate::Spectral(x), SubCoordinate::Spectral(y)) => {
                if !near(x.rest_frequency(), y.rest_frequency(), tol) {
                    return Err(CoordError::mismatch("rest frequencies differ"));
                }
            }
            (SubCoordinate::Stokes(x), SubCoordinate::Stokes(y)) => {
                if x.states() != y.states() {
                    return Err(CoordError::mismatch("Stokes states differ"));
                }
            }
            (SubCoordinate::Tabular(x), SubCoordinate::Tabular(y)) => {
                if x.pixel_values().len() != y.pixel_values().len() {
                    return Err(CoordError::mismatch("tabular table lengths differ"));
                }
            }
            _ => {}
        }

        a.as_coord()
            .do_near_pixel(b.as_coord(), compare_axes, compare_axes, tol)
    }

    /// Serializes the system as a sub-record of `container` under
    /// `field`: one kind-tagged sub-record per sub-coordinate plus its
    /// maps and replacement values.
    pub fn save_record(&self, container: &mut Record, field: &str) -> CoordResult<()> {
        if container.is_defined(field) {
            return Err(CoordError::conversion_failure(format!(
                "record already contains a field '{}'",
                field
            )));
        }
        let mut sub = Record::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let name = format!("{}{}", entry.coord.kind().record_basename(), i);
            entry.coord.save(&mut sub, &name)?;
            sub.define_int_vec(
                format!("worldmap{}", i),
                entry.world_map.iter().map(|&v| v as i64).collect(),
            );
            sub.define_float_vec(format!("worldreplace{}", i), entry.world_replacement.clone());
            sub.define_int_vec(
                format!("pixelmap{}", i),
                entry.pixel_map.iter().map(|&v| v as i64).collect(),
            );
            sub.define_float_vec(format!("pixelreplace{}", i), entry.pixel_replacement.clone());
        }
        container.define_record(field, sub);
        Ok(())
    }

    pub fn restore(container: &Record, field: &str) -> CoordResult<CoordinateSystem> {
        let sub = container.require_record(field)?;
        let mut system = CoordinateSystem::new();
        loop {
            match SubCoordinate::restore_indexed(sub, system.n_coordinates()) {
                Some(coord) => system.add_coordinate(coord?),
                None => break,
            }
        }
        for i in 0..system.n_coordinates() {
            let world_map: Vec<i32> = sub
                .require_int_vec(&format!("worldmap{}", i))?
                .iter()
                .map(|&v| v as i32)
                .collect();
            let pixel_map: Vec<i32> = sub
                .require_int_vec(&format!("pixelmap{}", i))?
                .iter()
                .map(|&v| v as i32)
                .collect();
            let world_replacement = sub
                .require_float_vec(&format!("worldreplace{}", i))?
                .to_vec();
            let pixel_replacement = sub
                .require_float_vec(&format!("pixelreplace{}", i))?
                .to_vec();
            let entry = &mut system.entries[i];
            if world_map.len() != entry.world_map.len()
                || pixel_map.len() != entry.pixel_map.len()
            {
                return Err(CoordError::dimension_mismatch(
                    "restored axis maps do not match the coordinate",
                ));
            }
            entry.world_map = world_map;
            entry.pixel_map = pixel_map;
            entry.world_replacement = world_replacement;
            entry.pixel_replacement = pixel_replacement;
        }
        Ok(system)
    }
}

impl Coordinate for CoordinateSystem {
    fn kind(&self) -> CoordinateKind {
        CoordinateKind::System
    }

    fn n_pixel_axes(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.pixel_map.iter().filter(|&&m| m >= 0).count())
            .sum()
    }

    fn n_world_axes(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.world_map.iter().filter(|&&m| m >= 0).count())
            .sum()
    }

    fn reference_value(&self) -> Vec<f64> {
        let n = self.n_world_axes();
        let mut result = vec![0.0; n];
        for (i, slot) in result.iter_mut().enumerate() {
            if let Some((coord, axis)) = self.find_world_axis(i) {
                *slot = self.entries[coord].coord.as_coord().reference_value()[axis];
            }
        }
        result
    }

    fn reference_pixel(&self) -> Vec<f64> {
        let n = self.n_pixel_axes();
        let mut result = vec![0.0; n];
        for (i, slot) in result.iter_mut().enumerate() {
            if let Some((coord, axis)) = self.find_pixel_axis(i) {
                *slot = self.entries[coord].coord.as_coord().reference_pixel()[axis];
            }
        }
        result
    }

    fn increment(&self) -> Vec<f64> {
        let n = self.n_world_axes();
        let mut result = vec![0.0; n];
        for (i, slot) in result.iter_mut().enumerate() {
            if let Some((coord, axis)) = self.find_world_axis(i) {
                *slot = self.entries[coord].coord.as_coord().increment()[axis];
            }
        }
        result
    }

    /// The composite linear transform. Off-diagonal coupling only occurs
    /// between world and pixel axes originating in the same
    /// sub-coordinate; everything else is structurally zero.
    fn linear_transform(&self) -> DMatrix<f64> {
        let nrows = self.n_world_axes();
        let ncols = self.n_pixel_axes();
        let mut result = DMatrix::zeros(nrows, ncols);
        for i in 0..nrows {
            for j in 0..ncols {
                let (world_coord, world_axis) = match self.find_world_axis(i) {
                    Some(found) => found,
                    None => continue,
                };
                let (pixel_coord, pixel_axis) = match self.find_pixel_axis(j) {
                    Some(found) => found,
                    None => continue,
                };
                if world_coord == pixel_coord {
                    let sub = self.entries[world_coord].coord.as_coord().linear_transform();
                    result[(i, j)] = sub[(world_axis, pixel_axis)];
                }
            }
        }
        result
    }

    fn world_axis_names(&self) -> Vec<String> {
        let n = self.n_world_axes();
        let mut result = vec![String::new(); n];
        for (i, slot) in result.iter_mut().enumerate() {
            if let Some((coord, axis)) = self.find_world_axis(i) {
                *slot = self.entries[coord].coord.as_coord().world_axis_names()[axis].clone();
            }
        }
        result
    }

    fn world_axis_units(&self) -> Vec<String> {
        let n = self.n_world_axes();
        let mut result = vec![String::new(); n];
        for (i, slot) in result.iter_mut().enumerate() {
            if let Some((coord, axis)) = self.find_world_axis(i) {
                *slot = self.entries[coord].coord.as_coord().world_axis_units()[axis].clone();
            }
        }
        result
    }

    fn preferred_world_axis_units(&self) -> Vec<String> {
        let n = self.n_world_axes();
        let mut result = vec![String::new(); n];
        for (i, slot) in result.iter_mut().enumerate() {
            if let Some((coord, axis)) = self.find_world_axis(i) {
                *slot =
                    self.entries[coord].coord.as_coord().preferred_world_axis_units()[axis].clone();
            }
        }
        result
    }

    /// Forward transform across all sub-coordinates. Removed pixel axes
    /// take their replacement values; every sub-coordinate is attempted
    /// even after one fails, and the first error is reported.
    fn to_world(&self, world: &mut [f64], pixel: &[f64]) -> CoordResult<()> {
        debug_assert_eq!(world.len(), self.n_world_axes());
        debug_assert_eq!(pixel.len(), self.n_pixel_axes());

        let mut first_error = None;
        for entry in &self.entries {
            let mut pixel_tmp = entry.pixel_tmp.borrow_mut();
            for (j, &mapped) in entry.pixel_map.iter().enumerate() {
                pixel_tmp[j] = if mapped >= 0 {
                    pixel[mapped as usize]
                } else {
                    entry.pixel_replacement[j]
                };
            }
            let mut world_tmp = entry.world_tmp.borrow_mut();
            if let Err(error) = entry.coord.as_coord().to_world(&mut world_tmp, &pixel_tmp) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
            for (j, &mapped) in entry.world_map.iter().enumerate() {
                if mapped >= 0 {
                    world[mapped as usize] = world_tmp[j];
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    /// Inverse transform; mirror of [`Self::to_world`], with removed
    /// world axes taking their replacement values.
    fn to_pixel(&self, pixel: &mut [f64], world: &[f64]) -> CoordResult<()> {
        debug_assert_eq!(world.len(), self.n_world_axes());
        debug_assert_eq!(pixel.len(), self.n_pixel_axes());

        let mut first_error = None;
        for entry in &self.entries {
            let mut world_tmp = entry.world_tmp.borrow_mut();
            for (j, &mapped) in entry.world_map.iter().enumerate() {
                world_tmp[j] = if mapped >= 0 {
                    world[mapped as usize]
                } else {
                    entry.world_replacement[j]
                };
            }
            let mut pixel_tmp = entry.pixel_tmp.borrow_mut();
            if let Err(error) = entry.coord.as_coord().to_pixel(&mut pixel_tmp, &world_tmp) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
            for (j, &mapped) in entry.pixel_map.iter().enumerate() {
                if mapped >= 0 {
                    pixel[mapped as usize] = pixel_tmp[j];
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    fn set_world_axis_names(&mut self, names: &[String]) -> CoordResult<()> {
        if names.len() != self.n_world_axes() {
            return Err(CoordError::dimension_mismatch(
                "names vector has wrong number of elements",
            ));
        }
        let mut first_error = None;
        for entry in &mut self.entries {
            let mut tmp = entry.coord.as_coord().world_axis_names();
            for (j, &mapped) in entry.world_map.iter().enumerate() {
                if mapped >= 0 {
                    tmp[j] = names[mapped as usize].clone();
                }
            }
            if let Err(error) = entry.coord.as_coord_mut().set_world_axis_names(&tmp) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    fn set_world_axis_units(&mut self, units: &[String]) -> CoordResult<()> {
        if units.len() != self.n_world_axes() {
            return Err(CoordError::dimension_mismatch(
                "units vector has wrong number of elements",
            ));
        }
        let mut first_error = None;
        for entry in &mut self.entries {
            let mut tmp = entry.coord.as_coord().world_axis_units();
            for (j, &mapped) in entry.world_map.iter().enumerate() {
                if mapped >= 0 {
                    tmp[j] = units[mapped as usize].clone();
                }
            }
            if let Err(error) = entry.coord.as_coord_mut().set_world_axis_units(&tmp) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    fn set_preferred_world_axis_units(&mut self, units: &[String]) -> CoordResult<()> {
        if units.len() != self.n_world_axes() {
            return Err(CoordError::dimension_mismatch(
                "units vector has wrong number of elements",
            ));
        }
        let mut first_error = None;
        for entry in &mut self.entries {
            let mut tmp = entry.coord.as_coord().preferred_world_axis_units();
            for (j, &mapped) in entry.world_map.iter().enumerate() {
                if mapped >= 0 {
                    tmp[j] = units[mapped as usize].clone();
                }
            }
            if let Err(error) = entry
                .coord
                .as_coord_mut()
                .set_preferred_world_axis_units(&tmp)
            {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    fn set_reference_value(&mut self, refval: &[f64]) -> CoordResult<()> {
        if refval.len() != self.n_world_axes() {
            return Err(CoordError::dimension_mismatch(
                "reference value has wrong number of elements",
            ));
        }
        let mut first_error = None;
        for entry in &mut self.entries {
            let mut tmp = entry.coord.as_coord().reference_value();
            for (j, &mapped) in entry.world_map.iter().enumerate() {
                if mapped >= 0 {
                    tmp[j] = refval[mapped as usize];
                }
            }
            if let Err(error) = entry.coord.as_coord_mut().set_reference_value(&tmp) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    fn set_reference_pixel(&mut self, refpix: &[f64]) -> CoordResult<()> {
        if refpix.len() != self.n_pixel_axes() {
            return Err(CoordError::dimension_mismatch(
                "reference pixel has wrong number of elements",
            ));
        }
        let mut first_error = None;
        for entry in &mut self.entries {
            let mut tmp = entry.coord.as_coord().reference_pixel();
            for (j, &mapped) in entry.pixel_map.iter().enumerate() {
                if mapped >= 0 {
                    tmp[j] = refpix[mapped as usize];
                }
            }
            if let Err(error) = entry.coord.as_coord_mut().set_reference_pixel(&tmp) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    fn set_increment(&mut self, inc: &[f64]) -> CoordResult<()> {
        if inc.len() != self.n_world_axes() {
            return Err(CoordError::dimension_mismatch(
                "increment has wrong number of elements",
            ));
        }
        let mut first_error = None;
        for entry in &mut self.entries {
            let mut tmp = entry.coord.as_coord().increment();
            for (j, &mapped) in entry.world_map.iter().enumerate() {
                if mapped >= 0 {
                    tmp[j] = inc[mapped as usize];
                }
            }
            if let Err(error) = entry.coord.as_coord_mut().set_increment(&tmp) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    fn set_linear_transform(&mut self, xform: &DMatrix<f64>) -> CoordResult<()> {
        if xform.shape() != (self.n_world_axes(), self.n_pixel_axes()) {
            return Err(CoordError::dimension_mismatch(
                "linear transform has wrong shape",
            ));
        }
        let mut first_error = None;
        for entry in &mut self.entries {
            let mut tmp = entry.coord.as_coord().linear_transform();
            for j in 0..tmp.nrows() {
                for k in 0..tmp.ncols() {
                    let row = entry.world_map[j];
                    let col = entry.pixel_map[k];
                    if row >= 0 && col >= 0 {
                        tmp[(j, k)] = xform[(row as usize, col as usize)];
                    }
                }
            }
            if let Err(error) = entry.coord.as_coord_mut().set_linear_transform(&tmp) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    /// Formatting dispatches to the sub-coordinate owning the axis.
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
        let (coord, axis) = self
            .find_world_axis(world_axis)
            .ok_or_else(|| CoordError::invalid_axis(world_axis, self.n_world_axes()))?;
        self.entries[coord].coord.as_coord().format(
            unit,
            mode,
            world_value,
            axis,
            is_absolute,
            show_as_absolute,
            precision,
        )
    }

    fn save(&self, record: &mut Record, field: &str) -> CoordResult<()> {
        self.save_record(record, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DirectionFrame;
    use crate::linear::LinearCoordinate;
    use crate::projection::Projection;
    use crate::stokes::Stokes;
    use approx::assert_abs_diff_eq;
    use nalgebra::Matrix2;

    fn linear2(names: [&str; 2], units: [&str; 2]) -> LinearCoordinate {
        LinearCoordinate::new(
            names.iter().map(|s| s.to_string()).collect(),
            units.iter().map(|s| s.to_string()).collect(),
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            DMatrix::identity(2, 2),
            vec![0.0, 0.0],
        )
        .unwrap()
    }

    fn sky_freq_system() -> CoordinateSystem {
        let mut system = CoordinateSystem::new();
        system.add_coordinate(
            DirectionCoordinate::new(
                DirectionFrame::J2000,
                Projection::tan(),
                0.0,
                0.0,
                -1.0e-4,
                1.0e-4,
                Matrix2::identity(),
                256.0,
                256.0,
            )
            .unwrap(),
        );
        system.add_coordinate(SpectralCoordinate::new(1.4e9, 1.0e6, 0.0, 1.42e9));
        system
    }

    #[test]
    fn test_append_assigns_next_indices() {
        let system = sky_freq_system();
        assert_eq!(system.n_coordinates(), 2);
        assert_eq!(system.n_world_axes(), 3);
        assert_eq!(system.n_pixel_axes(), 3);
        assert_eq!(system.world_axes(0), vec![0, 1]);
        assert_eq!(system.world_axes(1), vec![2]);
        assert_eq!(system.find_world_axis(2), Some((1, 0)));
    }

    #[test]
    fn test_append_preserves_existing_axes() {
        let mut system = sky_freq_system();
        let names_before = system.world_axis_names();
        let refval_before = system.reference_value();

        let extra = LinearCoordinate::new(
            vec!["Time".into()],
            vec!["s".into()],
            vec![5.0],
            vec![0.1],
            DMatrix::identity(1, 1),
            vec![2.0],
        )
        .unwrap();
        system.add_coordinate(extra.clone());

        let names = system.world_axis_names();
        let refval = system.reference_value();
        assert_eq!(&names[..3], &names_before[..]);
        assert_eq!(&refval[..3], &refval_before[..]);
        assert_eq!(names[3], "Time");
        assert_eq!(refval[3], extra.reference_value()[0]);
    }

    #[test]
    fn test_forward_inverse_roundtrip() {
        let system = sky_freq_system();
        let pixel_in = [250.0, 266.0, 31.0];
        let mut world = vec![0.0; 3];
        system.to_world(&mut world, &pixel_in).unwrap();
        let mut pixel = vec![0.0; 3];
        system.to_pixel(&mut pixel, &world).unwrap();
        for i in 0..3 {
            assert_abs_diff_eq!(pixel[i], pixel_in[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_remove_pixel_axis_uses_replacement() {
        let mut system = CoordinateSystem::new();
        system.add_coordinate(linear2(["u", "v"], ["m", "m"]));
        system.remove_pixel_axis(1, 17.0).unwrap();

        assert_eq!(system.n_pixel_axes(), 1);
        assert_eq!(system.n_world_axes(), 2);

        let mut world = vec![0.0; 2];
        system.to_world(&mut world, &[5.0]).unwrap();
        assert_eq!(world, vec![5.0, 17.0]);
    }

    #[test]
    fn test_remove_world_axis_strict_bound() {
        let mut system = CoordinateSystem::new();
        system.add_coordinate(linear2(["u", "v"], ["m", "m"]));
        assert!(matches!(
            system.remove_world_axis(2, 0.0),
            Err(CoordError::InvalidAxis { .. })
        ));
        system.remove_world_axis(1, -3.0).unwrap();
        assert_eq!(system.n_world_axes(), 1);

        // The removed world axis takes its replacement in the inverse
        // direction.
        let mut pixel = vec![0.0; 2];
        system.to_pixel(&mut pixel, &[4.0]).unwrap();
        assert_eq!(pixel, vec![4.0, -3.0]);
    }

    #[test]
    fn test_remove_shifts_higher_indices() {
        let mut system = sky_freq_system();
        system.remove_world_axis(0, 0.0).unwrap();
        assert_eq!(system.world_axes(0), vec![-1, 0]);
        assert_eq!(system.world_axes(1), vec![1]);
        assert_eq!(system.world_axis_names()[1], "Frequency");
    }

    #[test]
    fn test_transpose_permutes_views() {
        let mut system = sky_freq_system();
        system.transpose(&[2, 0, 1], &[2, 0, 1]).unwrap();
        let names = system.world_axis_names();
        assert_eq!(names[0], "Frequency");
        assert_eq!(names[1], "Right Ascension");
        assert_eq!(names[2], "Declination");
        // Stored order is untouched.
        assert_eq!(system.coordinate_kind(0), CoordinateKind::Direction);
    }

    #[test]
    fn test_transpose_involution() {
        let mut system = sky_freq_system();
        let names = system.world_axis_names();
        let refval = system.reference_value();
        let refpix = system.reference_pixel();
        let inc = system.increment();
        let pc = system.linear_transform();

        system.transpose(&[2, 0, 1], &[1, 2, 0]).unwrap();
        // Inverse permutations.
        system.transpose(&[1, 2, 0], &[2, 0, 1]).unwrap();

        assert_eq!(system.world_axis_names(), names);
        assert_eq!(system.reference_value(), refval);
        assert_eq!(system.reference_pixel(), refpix);
        assert_eq!(system.increment(), inc);
        assert_eq!(system.linear_transform(), pc);
    }

    #[test]
    fn test_transpose_rejects_non_permutation() {
        let mut system = sky_freq_system();
        assert!(matches!(
            system.transpose(&[0, 0, 1], &[0, 1, 2]),
            Err(CoordError::InvalidPermutation { .. })
        ));
        assert!(matches!(
            system.transpose(&[0, 1], &[0, 1, 2]),
            Err(CoordError::InvalidPermutation { .. })
        ));
    }

    #[test]
    fn test_transposed_transform_consistency() {
        let mut system = sky_freq_system();
        let pixel_in = [260.0, 250.0, 3.0];
        let mut world_before = vec![0.0; 3];
        system.to_world(&mut world_before, &pixel_in).unwrap();

        system.transpose(&[2, 0, 1], &[2, 0, 1]).unwrap();
        let pixel_permuted = [pixel_in[2], pixel_in[0], pixel_in[1]];
        let mut world_after = vec![0.0; 3];
        system.to_world(&mut world_after, &pixel_permuted).unwrap();
        assert_abs_diff_eq!(world_after[0], world_before[2], epsilon = 1e-12);
        assert_abs_diff_eq!(world_after[1], world_before[0], epsilon = 1e-12);
        assert_abs_diff_eq!(world_after[2], world_before[1], epsilon = 1e-12);
    }

    #[test]
    fn test_mapping_invariant_through_operations() {
        let mut system = sky_freq_system();
        system.add_coordinate(StokesCoordinate::new(vec![Stokes::I, Stokes::Q]).unwrap());

        let check = |system: &CoordinateSystem| {
            let nw = system.n_world_axes();
            let mut seen = vec![false; nw];
            for i in 0..system.n_coordinates() {
                for &axis in &system.world_axes(i) {
                    if axis >= 0 {
                        assert!(!seen[axis as usize]);
                        seen[axis as usize] = true;
                    }
                }
            }
            assert!(seen.into_iter().all(|s| s));

            let np = system.n_pixel_axes();
            let mut seen = vec![false; np];
            for i in 0..system.n_coordinates() {
                for &axis in &system.pixel_axes(i) {
                    if axis >= 0 {
                        assert!(!seen[axis as usize]);
                        seen[axis as usize] = true;
                    }
                }
            }
            assert!(seen.into_iter().all(|s| s));
        };

        check(&system);
        system.remove_world_axis(1, 0.5).unwrap();
        check(&system);
        system.remove_pixel_axis(2, 8.0).unwrap();
        check(&system);
        system.transpose(&[2, 0, 1], &[1, 0, 2]).unwrap();
        check(&system);
        system.restore_original();
        check(&system);
        assert_eq!(system.n_world_axes(), 4);
    }

    #[test]
    fn test_replace_coordinate_keeps_axis_counts() {
        let mut system = CoordinateSystem::new();
        system.add_coordinate(linear2(["u", "v"], ["m", "m"]));

        let replacement = LinearCoordinate::new(
            vec!["a".into(), "b".into()],
            vec!["km".into(), "km".into()],
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            DMatrix::identity(2, 2),
            vec![5.0, 6.0],
        )
        .unwrap();
        system.replace_coordinate(0, replacement).unwrap();
        assert_eq!(system.reference_value(), vec![1.0, 2.0]);

        let wrong_size = LinearCoordinate::identity(3);
        assert!(system.replace_coordinate(0, wrong_size).is_err());
    }

    #[test]
    fn test_sub_image() {
        let mut system = CoordinateSystem::new();
        let coord = LinearCoordinate::new(
            vec!["u".into(), "v".into()],
            vec!["m".into(), "m".into()],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            DMatrix::identity(2, 2),
            vec![256.0, 256.0],
        )
        .unwrap();
        system.add_coordinate(coord);

        let cutout = system.sub_image(&[100.0, 200.0], &[2.0, 2.0]).unwrap();
        assert_eq!(cutout.reference_pixel(), vec![78.0, 28.0]);
        assert_eq!(cutout.increment(), vec![2.0, 2.0]);

        assert!(matches!(
            system.sub_image(&[0.0, 0.0], &[0.5, 1.0]),
            Err(CoordError::InvalidIncrement { axis: 0, .. })
        ));
    }

    #[test]
    fn test_composite_linear_transform_is_block_diagonal() {
        let mut system = sky_freq_system();
        let rotated = DMatrix::from_row_slice(2, 2, &[0.8, -0.6, 0.6, 0.8]);
        system.set_linear_transform(&{
            let mut xform = DMatrix::identity(3, 3);
            xform[(0, 0)] = rotated[(0, 0)];
            xform[(0, 1)] = rotated[(0, 1)];
            xform[(1, 0)] = rotated[(1, 0)];
            xform[(1, 1)] = rotated[(1, 1)];
            xform
        })
        .unwrap();

        let pc = system.linear_transform();
        assert_abs_diff_eq!(pc[(0, 1)], -0.6);
        assert_abs_diff_eq!(pc[(1, 0)], 0.6);
        // No coupling across sub-coordinates.
        assert_eq!(pc[(0, 2)], 0.0);
        assert_eq!(pc[(2, 0)], 0.0);
        assert_eq!(pc[(2, 2)], 1.0);
    }

    #[test]
    fn test_setters_scatter_through_maps() {
        let mut system = sky_freq_system();
        system.transpose(&[2, 0, 1], &[2, 0, 1]).unwrap();

        // After the transpose, axis 0 is frequency.
        let mut refval = system.reference_value();
        refval[0] = 1.5e9;
        system.set_reference_value(&refval).unwrap();
        assert_abs_diff_eq!(
            system.spectral_coordinate(1).unwrap().reference_value()[0],
            1.5e9
        );

        let mut units = system.world_axis_units();
        units[0] = "GHz".to_string();
        system.set_world_axis_units(&units).unwrap();
        assert_abs_diff_eq!(
            system.spectral_coordinate(1).unwrap().reference_value()[0],
            1.5
        );
    }

    #[test]
    fn test_setters_attempt_every_coordinate() {
        let mut system = CoordinateSystem::new();
        system.add_coordinate(
            TabularCoordinate::from_table("t", "s", vec![0.0, 1.0], vec![0.0, 2.0]).unwrap(),
        );
        system.add_coordinate(
            LinearCoordinate::new(
                vec!["x".into()],
                vec!["m".into()],
                vec![0.0],
                vec![1.0],
                DMatrix::identity(1, 1),
                vec![0.0],
            )
            .unwrap(),
        );

        // The tabular table axis refuses, the linear axis is still set.
        let result = system.set_reference_value(&[9.0, 9.0]);
        assert!(result.is_err());
        let refval = system.reference_value();
        assert_eq!(refval[1], 9.0);
    }

    #[test]
    fn test_bulk_matches_scalar_on_system() {
        let system = sky_freq_system();
        let columns: Vec<nalgebra::DVector<f64>> = vec![
            nalgebra::DVector::from_vec(vec![256.0, 256.0, 0.0]),
            nalgebra::DVector::from_vec(vec![256.0, 256.0, 0.0]),
            nalgebra::DVector::from_vec(vec![300.0, 212.0, 5.0]),
        ];
        let pixel = DMatrix::from_columns(&columns);
        let (world, report) = system.to_world_many(&pixel);
        assert!(report.all_ok());
        let mut expected = vec![0.0; 3];
        for l in 0..3 {
            let col: Vec<f64> = (0..3).map(|k| pixel[(k, l)]).collect();
            system.to_world(&mut expected, &col).unwrap();
            for k in 0..3 {
                assert_abs_diff_eq!(world[(k, l)], expected[k], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_integer_pixel_overload() {
        let system = sky_freq_system();
        let mut from_ints = vec![0.0; 3];
        system.to_world_indices(&mut from_ints, &[256, 256, 4]).unwrap();
        let mut from_floats = vec![0.0; 3];
        system
            .to_world(&mut from_floats, &[256.0, 256.0, 4.0])
            .unwrap();
        assert_eq!(from_ints, from_floats);
    }

    #[test]
    fn test_near_accepts_equal_and_rejects_shifted() {
        let system = sky_freq_system();
        let same = system.clone();
        assert!(system.near(&same, 1e-6).is_ok());

        let mut shifted = system.clone();
        let mut refval = shifted.reference_value();
        refval[2] += 1.0e6;
        shifted.set_reference_value(&refval).unwrap();
        assert!(system.near(&shifted, 1e-6).is_err());

        // Excluding the frequency pixel axis forgives the shift.
        assert!(system
            .near_with_exclusions(&shifted, &[2], 1e-6)
            .is_ok());
    }

    #[test]
    fn test_save_restore_roundtrip() {
        let mut system = sky_freq_system();
        system.add_coordinate(StokesCoordinate::new(vec![Stokes::I, Stokes::V]).unwrap());
        system.remove_pixel_axis(3, 1.0).unwrap();
        system.transpose(&[2, 0, 1, 3], &[2, 0, 1]).unwrap();

        let mut record = Record::new();
        system.save_record(&mut record, "coordsys").unwrap();
        let restored = CoordinateSystem::restore(&record, "coordsys").unwrap();
        assert_eq!(restored, system);

        // A second save into the same field must refuse.
        assert!(system.save_record(&mut record, "coordsys").is_err());
    }

    #[test]
    fn test_nested_system() {
        let mut inner = CoordinateSystem::new();
        inner.add_coordinate(linear2(["u", "v"], ["m", "m"]));

        let mut outer = CoordinateSystem::new();
        outer.add_coordinate(inner);
        outer.add_coordinate(SpectralCoordinate::new(1.0e9, 1.0e6, 0.0, 0.0));

        assert_eq!(outer.n_world_axes(), 3);
        let mut world = vec![0.0; 3];
        outer.to_world(&mut world, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(world[0], 1.0);
        assert_eq!(world[1], 2.0);
        assert_abs_diff_eq!(world[2], 1.003e9);
    }

    #[test]
    fn test_set_world_mix_ranges() {
        let mut system = CoordinateSystem::new();
        system.add_coordinate(linear2(["u", "v"], ["m", "m"]));
        system.set_world_mix_ranges(&[100, 0]).unwrap();
        let min = system.world_mix_min();
        let max = system.world_mix_max();
        // 25% off each edge of a 100-pixel axis.
        assert_abs_diff_eq!(min[0], -25.0);
        assert_abs_diff_eq!(max[0], 125.0);
        assert_eq!(min[1], -1.0e99);
        assert_eq!(max[1], 1.0e99);
    }

    #[test]
    fn test_format_dispatches_to_owner() {
        let mut system = sky_freq_system();
        system.transpose(&[2, 0, 1], &[2, 0, 1]).unwrap();
        let mut unit = String::new();
        let text = system
            .format(&mut unit, FormatMode::Fixed, 1.4e9, 0, true, true, 0)
            .unwrap();
        assert_eq!(text, "1400000000");
        assert_eq!(unit, "Hz");
    }
}
