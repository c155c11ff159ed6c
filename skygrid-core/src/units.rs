//! Unit algebra for world-axis units.
//!
//! Parses the unit strings carried on coordinate axes into a dimension
//! vector plus an SI scale, tests dimensional compatibility, and computes
//! the scale factors applied when an axis changes units.
//!
//! Supported forms: a base unit with an optional SI prefix (`km`, `GHz`,
//! `marcsec`), one-level quotients (`km/s`) and products (`m.s`), and the
//! empty string for dimensionless axes. FITS headers carry units in upper
//! case with trailing blanks (`DEG     `), so lookup falls back to a
//! case-insensitive match after the exact one fails.

use thiserror::Error;

use crate::constants::{ARCMIN_TO_RAD, ARCSEC_TO_RAD, DEG_TO_RAD};

pub type UnitResult<T> = Result<T, UnitError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("Unknown unit '{unit}' - cannot calculate scaling")]
    Unknown { unit: String },

    #[error("Units '{from}' and '{to}' are not compatible dimensionally")]
    Incompatible { from: String, to: String },
}

impl UnitError {
    pub fn unknown(unit: impl Into<String>) -> Self {
        Self::Unknown { unit: unit.into() }
    }

    pub fn incompatible(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Incompatible {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Integer powers of the base dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub angle: i8,
    pub temperature: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension {
        length: 0,
        mass: 0,
        time: 0,
        angle: 0,
        temperature: 0,
    };

    #[inline]
    pub fn is_dimensionless(&self) -> bool {
        *self == Self::NONE
    }

    fn mul(self, other: Dimension) -> Dimension {
        Dimension {
            length: self.length + other.length,
            mass: self.mass + other.mass,
            time: self.time + other.time,
            angle: self.angle + other.angle,
            temperature: self.temperature + other.temperature,
        }
    }

    fn div(self, other: Dimension) -> Dimension {
        Dimension {
            length: self.length - other.length,
            mass: self.mass - other.mass,
            time: self.time - other.time,
            angle: self.angle - other.angle,
            temperature: self.temperature - other.temperature,
        }
    }
}

/// A parsed unit: its dimension vector and its scale relative to the SI
/// base unit of that dimension (radians for angles).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitValue {
    pub dim: Dimension,
    pub scale: f64,
}

const fn powers(length: i8, mass: i8, time: i8, angle: i8, temperature: i8) -> Dimension {
    Dimension {
        length,
        mass,
        time,
        angle,
        temperature,
    }
}

const DIMLESS: Dimension = powers(0, 0, 0, 0, 0);
const LENGTH: Dimension = powers(1, 0, 0, 0, 0);
const MASS: Dimension = powers(0, 1, 0, 0, 0);
const TIME: Dimension = powers(0, 0, 1, 0, 0);
const FREQUENCY: Dimension = powers(0, 0, -1, 0, 0);
const ANGLE: Dimension = powers(0, 0, 0, 1, 0);
const TEMPERATURE: Dimension = powers(0, 0, 0, 0, 1);
// Spectral flux density, kg s^-2 in SI base units.
const FLUX: Dimension = powers(0, 1, -2, 0, 0);

const BASE_UNITS: &[(&str, Dimension, f64)] = &[
    ("m", LENGTH, 1.0),
    ("g", MASS, 1.0e-3),
    ("s", TIME, 1.0),
    ("Hz", FREQUENCY, 1.0),
    ("rad", ANGLE, 1.0),
    ("deg", ANGLE, DEG_TO_RAD),
    ("arcmin", ANGLE, ARCMIN_TO_RAD),
    ("'", ANGLE, ARCMIN_TO_RAD),
    ("arcsec", ANGLE, ARCSEC_TO_RAD),
    ("\"", ANGLE, ARCSEC_TO_RAD),
    ("K", TEMPERATURE, 1.0),
    ("Jy", FLUX, 1.0e-26),
    ("lambda", DIMLESS, 1.0),
    ("pixel", DIMLESS, 1.0),
    ("pix", DIMLESS, 1.0),
];

const PREFIXES: &[(char, f64)] = &[
    ('n', 1.0e-9),
    ('u', 1.0e-6),
    ('m', 1.0e-3),
    ('c', 1.0e-2),
    ('d', 1.0e-1),
    ('k', 1.0e3),
    ('M', 1.0e6),
    ('G', 1.0e9),
    ('T', 1.0e12),
];

fn lookup_base(token: &str) -> Option<(Dimension, f64)> {
    BASE_UNITS
        .iter()
        .find(|(name, _, _)| *name == token)
        .map(|(_, dim, scale)| (*dim, *scale))
        .or_else(|| {
            BASE_UNITS
                .iter()
                .find(|(name, _, _)| name.eq_ignore_ascii_case(token))
                .map(|(_, dim, scale)| (*dim, *scale))
        })
}

fn parse_token(token: &str) -> UnitResult<UnitValue> {
    if let Some((dim, scale)) = lookup_base(token) {
        return Ok(UnitValue { dim, scale });
    }
    let mut chars = token.chars();
    if let Some(first) = chars.next() {
        let rest = chars.as_str();
        if !rest.is_empty() {
            if let Some((_, factor)) = PREFIXES.iter().find(|(p, _)| *p == first) {
                if let Some((dim, scale)) = lookup_base(rest) {
                    return Ok(UnitValue {
                        dim,
                        scale: factor * scale,
                    });
                }
            }
        }
    }
    Err(UnitError::unknown(token))
}

fn parse_product(side: &str) -> UnitResult<UnitValue> {
    let mut value = UnitValue {
        dim: Dimension::NONE,
        scale: 1.0,
    };
    for token in side.split('.') {
        let part = parse_token(token.trim())?;
        value = UnitValue {
            dim: value.dim.mul(part.dim),
            scale: value.scale * part.scale,
        };
    }
    Ok(value)
}

/// Parses a unit string. The empty string is dimensionless with scale 1.
pub fn parse(unit: &str) -> UnitResult<UnitValue> {
    let unit = unit.trim();
    if unit.is_empty() {
        return Ok(UnitValue {
            dim: Dimension::NONE,
            scale: 1.0,
        });
    }
    match unit.split_once('/') {
        Some((num, den)) => {
            let num = parse_product(num)?;
            let den = parse_product(den)?;
            Ok(UnitValue {
                dim: num.dim.div(den.dim),
                scale: num.scale / den.scale,
            })
        }
        None => parse_product(unit),
    }
}

/// Whether the two unit strings share a dimension.
pub fn compatible(a: &str, b: &str) -> UnitResult<bool> {
    Ok(parse(a)?.dim == parse(b)?.dim)
}

/// Multiplicative factor carrying a quantity expressed in `old` over to
/// `new`: `value_new = factor * value_old`.
pub fn scale_factor(old: &str, new: &str) -> UnitResult<f64> {
    let before = parse(old)?;
    let after = parse(new)?;
    if before.dim != after.dim {
        return Err(UnitError::incompatible(old, new));
    }
    Ok(before.scale / after.scale)
}

/// Per-axis scale factors between two equally long unit lists.
pub fn scale_factors(old_units: &[String], new_units: &[String]) -> UnitResult<Vec<f64>> {
    debug_assert_eq!(old_units.len(), new_units.len());
    old_units
        .iter()
        .zip(new_units.iter())
        .map(|(old, new)| scale_factor(old, new))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_base_units() {
        assert_eq!(parse("m").unwrap().dim, LENGTH);
        assert_eq!(parse("Hz").unwrap().dim, FREQUENCY);
        assert_eq!(parse("rad").unwrap().scale, 1.0);
    }

    #[test]
    fn test_parse_empty_is_dimensionless() {
        let v = parse("").unwrap();
        assert!(v.dim.is_dimensionless());
        assert_eq!(v.scale, 1.0);
    }

    #[test]
    fn test_parse_prefixed() {
        assert_relative_eq!(parse("km").unwrap().scale, 1.0e3);
        assert_relative_eq!(parse("GHz").unwrap().scale, 1.0e9);
        assert_relative_eq!(parse("marcsec").unwrap().scale, 1.0e-3 * ARCSEC_TO_RAD);
    }

    #[test]
    fn test_meter_is_not_milli() {
        // A bare "m" must resolve to the metre, never to a dangling prefix.
        assert_eq!(parse("m").unwrap().dim, LENGTH);
    }

    #[test]
    fn test_parse_quotient() {
        let v = parse("km/s").unwrap();
        assert_eq!(v.dim.length, 1);
        assert_eq!(v.dim.time, -1);
        assert_relative_eq!(v.scale, 1.0e3);
    }

    #[test]
    fn test_parse_fits_case() {
        assert_eq!(parse("DEG     ").unwrap().dim, ANGLE);
        assert_eq!(parse("HZ").unwrap().dim, FREQUENCY);
    }

    #[test]
    fn test_unknown_unit() {
        assert!(matches!(parse("flurbs"), Err(UnitError::Unknown { .. })));
    }

    #[test]
    fn test_compatible() {
        assert!(compatible("deg", "rad").unwrap());
        assert!(!compatible("Hz", "s").unwrap());
    }

    #[test]
    fn test_scale_factor_rad_to_deg() {
        // One radian is 180/pi degrees.
        let f = scale_factor("rad", "deg").unwrap();
        assert_relative_eq!(f, 57.29577951308232, epsilon = 1e-9);
    }

    #[test]
    fn test_scale_factor_incompatible() {
        assert!(matches!(
            scale_factor("Hz", "m"),
            Err(UnitError::Incompatible { .. })
        ));
    }

    #[test]
    fn test_scale_factors_list() {
        let old = vec!["rad".to_string(), "Hz".to_string()];
        let new = vec!["deg".to_string(), "GHz".to_string()];
        let f = scale_factors(&old, &new).unwrap();
        assert_relative_eq!(f[0], 57.29577951308232, epsilon = 1e-9);
        assert_relative_eq!(f[1], 1.0e-9);
    }
}
