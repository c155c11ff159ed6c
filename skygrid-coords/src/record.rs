//! Keyed record container.
//!
//! The backing store for coordinate save/restore and the FITS header
//! bridge: a flat map from field names to typed values, nestable so a
//! coordinate system serializes as one sub-record per sub-coordinate.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{CoordError, CoordResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    IntVec(Vec<i64>),
    FloatVec(Vec<f64>),
    StrVec(Vec<String>),
    Matrix(DMatrix<f64>),
    Record(Record),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_defined(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn define(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn define_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.define(key, Value::Int(value))
    }

    pub fn define_float(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.define(key, Value::Float(value))
    }

    pub fn define_str(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.define(key, Value::Str(value.into()))
    }

    pub fn define_int_vec(&mut self, key: impl Into<String>, value: Vec<i64>) -> &mut Self {
        self.define(key, Value::IntVec(value))
    }

    pub fn define_float_vec(&mut self, key: impl Into<String>, value: Vec<f64>) -> &mut Self {
        self.define(key, Value::FloatVec(value))
    }

    pub fn define_str_vec(&mut self, key: impl Into<String>, value: Vec<String>) -> &mut Self {
        self.define(key, Value::StrVec(value))
    }

    pub fn define_matrix(&mut self, key: impl Into<String>, value: DMatrix<f64>) -> &mut Self {
        self.define(key, Value::Matrix(value))
    }

    pub fn define_record(&mut self, key: impl Into<String>, value: Record) -> &mut Self {
        self.define(key, Value::Record(value))
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Numeric fetch: integers widen to float, the way FITS keyword values
    /// arrive with either type.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.fields.get(key) {
            Some(Value::Float(v)) => Some(*v),
            Some(Value::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(Value::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_int_vec(&self, key: &str) -> Option<&[i64]> {
        match self.fields.get(key) {
            Some(Value::IntVec(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn get_float_vec(&self, key: &str) -> Option<&[f64]> {
        match self.fields.get(key) {
            Some(Value::FloatVec(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn get_str_vec(&self, key: &str) -> Option<&[String]> {
        match self.fields.get(key) {
            Some(Value::StrVec(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn get_matrix(&self, key: &str) -> Option<&DMatrix<f64>> {
        match self.fields.get(key) {
            Some(Value::Matrix(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_record(&self, key: &str) -> Option<&Record> {
        match self.fields.get(key) {
            Some(Value::Record(v)) => Some(v),
            _ => None,
        }
    }

    pub fn require_float(&self, key: &str) -> CoordResult<f64> {
        self.get_float(key)
            .ok_or_else(|| CoordError::missing_field(key))
    }

    pub fn require_str(&self, key: &str) -> CoordResult<&str> {
        self.get_str(key)
            .ok_or_else(|| CoordError::missing_field(key))
    }

    pub fn require_float_vec(&self, key: &str) -> CoordResult<&[f64]> {
        self.get_float_vec(key)
            .ok_or_else(|| CoordError::missing_field(key))
    }

    pub fn require_str_vec(&self, key: &str) -> CoordResult<&[String]> {
        self.get_str_vec(key)
            .ok_or_else(|| CoordError::missing_field(key))
    }

    pub fn require_int_vec(&self, key: &str) -> CoordResult<&[i64]> {
        self.get_int_vec(key)
            .ok_or_else(|| CoordError::missing_field(key))
    }

    pub fn require_matrix(&self, key: &str) -> CoordResult<&DMatrix<f64>> {
        self.get_matrix(key)
            .ok_or_else(|| CoordError::missing_field(key))
    }

    pub fn require_record(&self, key: &str) -> CoordResult<&Record> {
        self.get_record(key)
            .ok_or_else(|| CoordError::missing_field(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut rec = Record::new();
        rec.define_str("ctype1", "RA---TAN")
            .define_float("crpix1", 512.0)
            .define_int("naxis", 2);

        assert_eq!(rec.get_str("ctype1"), Some("RA---TAN"));
        assert_eq!(rec.get_float("crpix1"), Some(512.0));
        assert_eq!(rec.get_int("naxis"), Some(2));
        assert_eq!(rec.get_str("ctype2"), None);
    }

    #[test]
    fn test_int_widens_to_float() {
        let mut rec = Record::new();
        rec.define_int("equinox", 2000);
        assert_eq!(rec.get_float("equinox"), Some(2000.0));
    }

    #[test]
    fn test_type_mismatch_is_none() {
        let mut rec = Record::new();
        rec.define_float("crval1", 180.0);
        assert_eq!(rec.get_str("crval1"), None);
        assert_eq!(rec.get_int("crval1"), None);
    }

    #[test]
    fn test_nested_record() {
        let mut inner = Record::new();
        inner.define_float_vec("crval", vec![0.0, 0.0]);
        let mut outer = Record::new();
        outer.define_record("direction0", inner.clone());

        assert_eq!(outer.get_record("direction0"), Some(&inner));
        assert!(outer.is_defined("direction0"));
    }

    #[test]
    fn test_require_missing() {
        let rec = Record::new();
        let err = rec.require_float("crval1").unwrap_err();
        assert!(err.to_string().contains("crval1"));
    }

    #[test]
    fn test_overwrite_replaces() {
        let mut rec = Record::new();
        rec.define_float("epoch", 1950.0);
        rec.define_float("epoch", 2000.0);
        assert_eq!(rec.get_float("epoch"), Some(2000.0));
        assert_eq!(rec.len(), 1);
    }
}
