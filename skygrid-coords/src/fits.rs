//! FITS header interchange for coordinate systems.
//!
//! Lossy, bidirectional translation between a
//! [`CoordinateSystem`] and the flat `crval`/`crpix`/`cdelt`/`ctype`/
//! `cunit` (+`pc`, `crota`, `projp`, `equinox`/`epoch`, `restfreq`)
//! keyword convention. Units are canonicalized on the way out (degrees on
//! the sky, Hz on the spectral axis); non-fatal oddities are logged and
//! do not abort either direction.

use nalgebra::{DMatrix, Matrix2};

use skygrid_core::constants::{DEG_TO_RAD, RAD_TO_DEG};
use skygrid_core::{near, NEAR_TOL};

use crate::coordinate::{Coordinate, CoordinateKind};
use crate::direction::{DirectionCoordinate, DirectionFrame};
use crate::error::{CoordError, CoordResult};
use crate::linear::LinearCoordinate;
use crate::projection::Projection;
use crate::record::Record;
use crate::spectral::SpectralCoordinate;
use crate::stokes::{Stokes, StokesCoordinate};
use crate::system::CoordinateSystem;

fn pad_to_eight(mut text: String) -> String {
    text.truncate(8);
    while text.len() < 8 {
        text.push(' ');
    }
    text
}

/// The trailing token of a ctype, after the final `-`.
fn projection_token(ctype: &str) -> &str {
    let trimmed = ctype.trim_end();
    match trimmed.rfind('-') {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    }
}

impl CoordinateSystem {
    /// Writes this system into `header` under the FITS keyword
    /// convention. `shape` is the image shape per pixel axis; when the
    /// system carries degenerate world axes it is padded in place with
    /// 1's. `prefix` is the keyword stem character (normally `c`).
    /// Refuses to touch a header that already carries axis keywords.
    pub fn to_fits_header(
        &self,
        header: &mut Record,
        shape: &mut Vec<i64>,
        one_relative: bool,
        prefix: char,
        write_wcs: bool,
    ) -> CoordResult<()> {
        for i in 0..self.n_coordinates() {
            if let Some(tabular) = self.tabular_coordinate(i) {
                if tabular.has_table() {
                    tracing::warn!(
                        "tabular axis lookup tables are lost in the conversion to FITS \
                         and replaced by linearized axes"
                    );
                    break;
                }
            }
        }

        let key = |suffix: &str| format!("{}{}", prefix, suffix);
        if header.is_defined(&key("rval"))
            || header.is_defined(&key("rpix"))
            || header.is_defined(&key("delt"))
            || header.is_defined(&key("type"))
            || header.is_defined(&key("unit"))
        {
            return Err(CoordError::FitsCollision);
        }

        let offset = if one_relative { 1.0 } else { 0.0 };
        let n = self.n_world_axes();

        // Work on a copy with canonical units so the numeric descriptors
        // come out in the conventional FITS units.
        let mut coordsys = self.clone();

        let sky_coord = coordsys.find_coordinate(CoordinateKind::Direction);
        let spec_coord = coordsys.find_coordinate(CoordinateKind::Spectral);
        let stokes_coord = coordsys.find_coordinate(CoordinateKind::Stokes);

        let mut long_axis = None;
        let mut lat_axis = None;
        let mut spec_axis = None;
        let mut stokes_axis = None;
        for i in 0..n {
            if let Some((coord, axis)) = coordsys.find_world_axis(i) {
                if Some(coord) == sky_coord {
                    if axis == 0 {
                        long_axis = Some(i);
                    } else if axis == 1 {
                        lat_axis = Some(i);
                    }
                } else if Some(coord) == spec_coord {
                    spec_axis = Some(i);
                } else if Some(coord) == stokes_coord {
                    stokes_axis = Some(i);
                }
            }
        }

        let mut units = coordsys.world_axis_units();
        if let Some(i) = long_axis {
            units[i] = "deg".to_string();
        }
        if let Some(i) = lat_axis {
            units[i] = "deg".to_string();
        }
        if let Some(i) = spec_axis {
            units[i] = "Hz".to_string();
        }
        if let Some(i) = stokes_axis {
            units[i] = String::new();
        }
        coordsys.set_world_axis_units(&units)?;

        let mut crval = coordsys.reference_value();
        let mut crpix: Vec<f64> = coordsys
            .reference_pixel()
            .iter()
            .map(|p| p + offset)
            .collect();
        let mut cdelt = coordsys.increment();

        let mut projp = match sky_coord.and_then(|c| coordsys.direction_coordinate(c)) {
            Some(dc) => dc.projection().parameters(),
            None => Vec::new(),
        };

        // ctype
        let mut ctype = coordsys.world_axis_names();
        for i in 0..n {
            if Some(i) == long_axis || Some(i) == lat_axis {
                let dc = match sky_coord.and_then(|c| coordsys.direction_coordinate(c)) {
                    Some(dc) => dc,
                    None => continue,
                };
                let (long_name, lat_name) = dc.frame().axis_names();
                let mut name = if Some(i) == lat_axis {
                    lat_name.to_string()
                } else {
                    long_name.to_string()
                };
                while name.len() < 4 {
                    name.push('-');
                }
                let projection = dc.projection();
                match projection {
                    Projection::Sin { .. } if !projection.is_plain_sin() => {
                        // SIN with slant parameters is NCP when they take
                        // the canonical form from Greisen & Calabretta.
                        let params = projection.parameters();
                        let expected_eta = 1.0 / dc.reference_latitude().tan();
                        if !(near(params[0], 0.0, NEAR_TOL)
                            && near(params[1], expected_eta, NEAR_TOL))
                        {
                            tracing::warn!(
                                "SIN projection with non-zero projp does not appear to \
                                 be NCP; assuming NCP anyway"
                            );
                        }
                        name.push_str("-NCP");
                        projp = vec![0.0; projp.len()];
                    }
                    other => {
                        let code = other.code();
                        if !matches!(code, "TAN" | "ARC" | "SIN") && Some(i) == long_axis {
                            tracing::warn!(
                                "{} is not known to standard FITS (it is known to WCS)",
                                code
                            );
                        }
                        name.push('-');
                        name.push_str(code);
                    }
                }
                ctype[i] = name;
            } else if Some(i) == spec_axis {
                // Rewritten below by the spectral coordinate.
            } else if Some(i) == stokes_axis {
                ctype[i] = "STOKES  ".to_string();
            } else {
                ctype[i] = pad_to_eight(ctype[i].to_uppercase());
            }
        }

        let cunit: Vec<String> = coordsys
            .world_axis_units()
            .into_iter()
            .map(|u| pad_to_eight(u.to_uppercase()))
            .collect();

        let pc = coordsys.linear_transform();

        // crota, from Greisen & Calabretta "Converting Previous Formats".
        let mut crota = vec![0.0; n];
        if let (Some(long), Some(lat)) = (long_axis, lat_axis) {
            let rho_long = pc[(lat, long)].atan2(pc[(long, long)]) * RAD_TO_DEG;
            let rho_lat = (-pc[(long, lat)]).atan2(pc[(lat, lat)]) * RAD_TO_DEG;
            crota[lat] = (rho_long + rho_lat) / 2.0;
            if !near(rho_long, rho_lat, NEAR_TOL) {
                tracing::warn!(
                    "{}rota is not very accurate: the PC matrix is not a pure rotation",
                    prefix
                );
            }
        }

        // Stokes axes encode their state list arithmetically when they
        // can; a first value pushed past 200 marks a non-arithmetic list.
        if let (Some(coord), Some(axis)) = (stokes_coord, stokes_axis) {
            if let Some(stokes) = coordsys.stokes_coordinate(coord) {
                let states = stokes.states();
                let mut increment = 1;
                let mut arithmetic = true;
                if states.len() > 1 {
                    increment = states[1].fits_value() - states[0].fits_value();
                    for k in 2..states.len() {
                        if states[k].fits_value() - states[k - 1].fits_value() != increment {
                            arithmetic = false;
                        }
                    }
                }
                if arithmetic {
                    crval[axis] = states[0].fits_value() as f64;
                    crpix[axis] = 1.0;
                    cdelt[axis] = increment as f64;
                } else {
                    crval[axis] = states[0].fits_value() as f64 + 200.0;
                    crpix[axis] = 1.0;
                    cdelt[axis] = 1.0;
                }
            }
        }

        // Degenerate world axes pad the shape with 1's.
        if coordsys.n_pixel_axes() < n {
            let shape_in = shape.clone();
            let crpix_in = crpix.clone();
            let mut new_shape = vec![0_i64; n];
            let mut new_crpix = vec![0.0; n];
            let mut count = 0;
            for world_axis in 0..n {
                let has_pixel = coordsys
                    .find_world_axis(world_axis)
                    .map(|(coord, axis)| coordsys.pixel_axes(coord)[axis] >= 0)
                    .unwrap_or(false);
                if has_pixel {
                    new_shape[world_axis] = shape_in.get(count).copied().unwrap_or(1);
                    new_crpix[world_axis] = crpix_in[count];
                    count += 1;
                } else {
                    new_shape[world_axis] = 1;
                    new_crpix[world_axis] = 1.0;
                }
            }
            *shape = new_shape;
            crpix = new_crpix;
        }

        if let Some(dc) = sky_coord.and_then(|c| coordsys.direction_coordinate(c)) {
            if let Some(equinox) = dc.frame().equinox() {
                if write_wcs {
                    header.define_float("equinox", equinox);
                } else {
                    header.define_float("epoch", equinox);
                }
            }
        }

        if write_wcs {
            if coordsys.n_pixel_axes() == n {
                header.define_matrix("pc", pc);
            } else {
                tracing::warn!(
                    "cannot write a pc matrix for a system with degenerate world axes"
                );
            }
        }

        header.define_str_vec(key("type"), ctype);
        header.define_float_vec(key("rval"), crval);
        header.define_float_vec(key("delt"), cdelt);
        header.define_float_vec(key("rota"), crota);
        header.define_float_vec(key("rpix"), crpix);
        header.define_str_vec(key("unit"), cunit);

        if !projp.is_empty() {
            if write_wcs {
                header.define_float_vec("projp", projp);
            } else if projp.iter().any(|&p| !near(p, 0.0, NEAR_TOL)) {
                tracing::info!(
                    "projp is not all zero; information is lost in the FITS conversion"
                );
            }
        }

        if let (Some(coord), Some(axis)) = (spec_coord, spec_axis) {
            if let Some(spectral) = coordsys.spectral_coordinate(coord) {
                spectral.to_fits(header, axis, prefix)?;
            }
        }

        Ok(())
    }

    /// Builds a coordinate system from a FITS keyword header. Sky,
    /// Stokes and spectral axes become their dedicated sub-coordinates;
    /// everything else lands in one linear sub-coordinate. The resulting
    /// axis order is longitude, latitude, Stokes, spectral, then the
    /// linear axes in header order.
    pub fn from_fits_header(
        header: &Record,
        one_relative: bool,
        prefix: char,
    ) -> CoordResult<CoordinateSystem> {
        let key = |suffix: &str| format!("{}{}", prefix, suffix);
        let offset = if one_relative { 1.0 } else { 0.0 };

        let crval = header.require_float_vec(&key("rval"))?.to_vec();
        let mut crpix = header.require_float_vec(&key("rpix"))?.to_vec();
        for p in &mut crpix {
            *p -= offset;
        }
        let cdelt = header.require_float_vec(&key("delt"))?.to_vec();
        let ctype = header.require_str_vec(&key("type"))?.to_vec();
        let cunit: Vec<String> = header
            .get_str_vec(&key("unit"))
            .map(|v| v.to_vec())
            .unwrap_or_default();

        let n = ctype.len();

        // PC and/or CROTA; PC wins when both are present.
        let mut rotation_axis: Option<usize> = None;
        let pc = if let Some(matrix) = header.get_matrix("pc") {
            if header.is_defined(&key("rota")) {
                tracing::info!(
                    "ignoring redundant {}rota in favour of the pc matrix",
                    prefix
                );
            }
            matrix.clone()
        } else if let Some(crota) = header.get_float_vec(&key("rota")) {
            let mut pc = DMatrix::identity(crota.len(), crota.len());
            for (i, &angle) in crota.iter().enumerate() {
                if !near(angle, 0.0, NEAR_TOL) {
                    if rotation_axis.is_some() {
                        tracing::warn!(
                            "can only convert one non-zero angle from {}rota; using the first",
                            prefix
                        );
                    } else {
                        rotation_axis = Some(i);
                    }
                }
            }
            if let Some(axis) = rotation_axis {
                if pc.nrows() > 1 {
                    let (sin_rot, cos_rot) = (crota[axis] * DEG_TO_RAD).sin_cos();
                    // Rotate in the plane of the neighbouring axis.
                    let partner = if axis > 0 {
                        axis - 1
                    } else {
                        tracing::info!("unusual to rotate about the first axis");
                        axis + 1
                    };
                    pc[(partner, partner)] = cos_rot;
                    pc[(axis, axis)] = cos_rot;
                    pc[(partner, axis)] = -sin_rot;
                    pc[(axis, partner)] = sin_rot;
                }
            }
            pc
        } else {
            DMatrix::identity(n, n)
        };

        if crval.len() != n
            || crpix.len() != n
            || cdelt.len() != n
            || pc.nrows() != n
            || pc.ncols() != n
            || (!cunit.is_empty() && cunit.len() != n)
        {
            return Err(CoordError::fits_inconsistent(
                "inconsistent number of axes in header",
            ));
        }

        // Classify the axes.
        let mut long_axis = None;
        let mut lat_axis = None;
        let mut stokes_axis = None;
        let mut spec_axis = None;
        for (i, name) in ctype.iter().enumerate() {
            if name.contains("RA") || name.contains("LON") {
                if long_axis.is_some() {
                    return Err(CoordError::fits_inconsistent(
                        "more than one longitude axis is present",
                    ));
                }
                long_axis = Some(i);
            } else if name.contains("DEC") || name.contains("LAT") {
                if lat_axis.is_some() {
                    return Err(CoordError::fits_inconsistent(
                        "more than one latitude axis is present",
                    ));
                }
                lat_axis = Some(i);
            } else if name.contains("STOKES") {
                stokes_axis = Some(i);
            } else if name.contains("FREQ") || name.contains("FELO") || name.contains("VELO") {
                spec_axis = Some(i);
            }
        }

        if long_axis.is_some() && lat_axis.is_none() {
            return Err(CoordError::fits_inconsistent(
                "there is a longitude axis but no latitude axis",
            ));
        }
        if lat_axis.is_some() && long_axis.is_none() {
            return Err(CoordError::fits_inconsistent(
                "there is a latitude axis but no longitude axis",
            ));
        }

        // Off-diagonal PC entries belong to the sky pair only.
        for j in 0..n {
            for i in 0..n {
                if i == j || near(pc[(i, j)], 0.0, NEAR_TOL) {
                    continue;
                }
                let sky_pair = (Some(i) == long_axis && Some(j) == lat_axis)
                    || (Some(i) == lat_axis && Some(j) == long_axis);
                if rotation_axis.is_some() && !sky_pair {
                    tracing::warn!(
                        "{}rota may only be set for longitude/latitude axes",
                        prefix
                    );
                }
            }
        }

        let mut system = CoordinateSystem::new();

        // DIRECTION
        if let (Some(long), Some(lat)) = (long_axis, lat_axis) {
            let is_galactic = ctype[long].contains("GLON");
            let proj = projection_token(&ctype[long]);
            let proj_lat = projection_token(&ctype[lat]);
            if proj != proj_lat {
                return Err(CoordError::fits_inconsistent(format!(
                    "longitude and latitude axes have different projections ({} != {})",
                    proj, proj_lat
                )));
            }

            let projection = if proj == "NCP" {
                tracing::info!(
                    "NCP projection is now SIN projection in WCS; \
                     old FITS readers will not handle this correctly"
                );
                Projection::sin_with_params(0.0, 1.0 / (crval[lat] * DEG_TO_RAD).tan())
            } else {
                let params = header.get_float_vec("projp").unwrap_or(&[]);
                Projection::from_code(proj, params)?
            };

            // FITS sky axes should be degrees; honor the units when set.
            let mut to_rad_long = DEG_TO_RAD;
            let mut to_rad_lat = DEG_TO_RAD;
            if !cunit.is_empty() {
                let angle = skygrid_core::Dimension {
                    angle: 1,
                    ..skygrid_core::Dimension::NONE
                };
                let long_unit = skygrid_core::units::parse(cunit[long].trim());
                let lat_unit = skygrid_core::units::parse(cunit[lat].trim());
                match (long_unit, lat_unit) {
                    (Ok(lu), Ok(bu)) if lu.dim == angle && bu.dim == angle => {
                        to_rad_long = lu.scale;
                        to_rad_lat = bu.scale;
                    }
                    _ => {
                        tracing::warn!(
                            "longitude or latitude units are unknown or incompatible \
                             with angle ({}, {})",
                            cunit[long].trim(),
                            cunit[lat].trim()
                        );
                    }
                }
            }

            let frame = if is_galactic {
                DirectionFrame::Galactic
            } else {
                let epoch = header
                    .get_float("epoch")
                    .or_else(|| header.get_float("equinox"));
                match epoch {
                    Some(value) if near(value, 1950.0, NEAR_TOL) => DirectionFrame::B1950,
                    Some(value) if near(value, 2000.0, NEAR_TOL) => DirectionFrame::J2000,
                    Some(_) => DirectionFrame::J2000,
                    None => {
                        tracing::info!(
                            "could not find or figure out the equinox from the FITS \
                             header, using J2000"
                        );
                        DirectionFrame::J2000
                    }
                }
            };

            let dirpc = Matrix2::new(
                pc[(long, long)],
                pc[(long, lat)],
                pc[(lat, long)],
                pc[(lat, lat)],
            );
            let direction = DirectionCoordinate::new(
                frame,
                projection,
                crval[long] * to_rad_long,
                crval[lat] * to_rad_lat,
                cdelt[long] * to_rad_long,
                cdelt[lat] * to_rad_lat,
                dirpc,
                crpix[long],
                crpix[lat],
            )?;
            system.add_coordinate(direction);
        }

        // STOKES: read up to four planes, truncating at the first value
        // the table does not know.
        if let Some(axis) = stokes_axis {
            let mut states = Vec::new();
            for k in 0..4 {
                let raw = crval[axis] + (k as f64 - crpix[axis]) * cdelt[axis];
                let value = if raw >= 0.0 {
                    (raw + 0.01).floor() as i64
                } else {
                    (raw - 0.01).floor() as i64
                };
                match Stokes::from_fits_value(value) {
                    Some(state) => states.push(state),
                    None => {
                        tracing::info!(
                            "there are at most {} known Stokes values on the Stokes axis",
                            k
                        );
                        break;
                    }
                }
            }
            system.add_coordinate(StokesCoordinate::new(states)?);
        }

        // SPECTRAL, with a linear fallback for the velocity-style axes.
        let mut spec_axis_used = spec_axis;
        if let Some(axis) = spec_axis {
            match SpectralCoordinate::from_fits(header, axis, offset, prefix) {
                Ok(spectral) => system.add_coordinate(spectral),
                Err(error) => {
                    tracing::warn!(
                        "cannot convert apparent spectral axis {} into a true spectral \
                         coordinate ({}); turning it into a linear axis",
                        ctype[axis].trim(),
                        error
                    );
                    spec_axis_used = None;
                }
            }
        }

        // Remaining axes form one linear coordinate with a diagonal PC.
        let special = [long_axis, lat_axis, stokes_axis, spec_axis_used];
        let linear_axes: Vec<usize> = (0..n).filter(|i| !special.contains(&Some(*i))).collect();
        if !linear_axes.is_empty() {
            tracing::info!("assuming no rotation or skew in the linear axes");
            let names: Vec<String> = linear_axes
                .iter()
                .map(|&i| ctype[i].trim_end().to_string())
                .collect();
            let units: Vec<String> = linear_axes
                .iter()
                .map(|&i| {
                    if !cunit.is_empty() {
                        cunit[i].trim_end().to_string()
                    } else if spec_axis_used.is_none()
                        && (ctype[i].contains("FELO") || ctype[i].contains("VELO"))
                    {
                        "m/s".to_string()
                    } else {
                        String::new()
                    }
                })
                .collect();
            let linear = LinearCoordinate::new(
                names,
                units,
                linear_axes.iter().map(|&i| crval[i]).collect(),
                linear_axes.iter().map(|&i| cdelt[i]).collect(),
                DMatrix::identity(linear_axes.len(), linear_axes.len()),
                linear_axes.iter().map(|&i| crpix[i]).collect(),
            )?;
            system.add_coordinate(linear);
        }

        // The append order above already realizes the required layout:
        // longitude first, then latitude, Stokes, spectral, and the
        // linear axes in header order.
        Ok(system)
    }
}
