//! Shared foundation for the skygrid coordinate crates: angle constants,
//! the relative-equality predicate used throughout the transform engine,
//! and the unit algebra (dimensional analysis plus scale-factor lookup).

pub mod constants;
pub mod math;
pub mod units;

pub use math::{near, near_abs, NEAR_TOL};
pub use units::{Dimension, UnitError, UnitResult, UnitValue};
