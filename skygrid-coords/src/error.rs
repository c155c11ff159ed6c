use thiserror::Error;

pub type CoordResult<T> = Result<T, CoordError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Dimension mismatch: {context}")]
    DimensionMismatch { context: String },

    #[error("Axis {axis} out of range (have {count} axes)")]
    InvalidAxis { axis: usize, count: usize },

    #[error("Invalid permutation: {message}")]
    InvalidPermutation { message: String },

    #[error("Sub-image increment for pixel axis {axis} is {value}; must be >= 1")]
    InvalidIncrement { axis: usize, value: f64 },

    #[error("Axis {axis} must be selected as exactly one of world or pixel")]
    InvalidMixSelection { axis: usize },

    #[error("Incompatible unit: {message}")]
    IncompatibleUnit { message: String },

    #[error("Conversion failed: {message}")]
    ConversionFailure { message: String },

    #[error("Header already contains one or more of *rval, *rpix, *delt, *type, *unit")]
    FitsCollision,

    #[error("Inconsistent FITS header: {message}")]
    FitsInconsistent { message: String },

    #[error("Unknown projection: {code}")]
    FitsUnknownProjection { code: String },

    #[error("Coordinates of type {kind} cannot be Fourier transformed")]
    NoFourier { kind: String },

    #[error("Coordinates differ: {message}")]
    Mismatch { message: String },

    #[error("Record field '{field}' is missing or has the wrong type")]
    MissingField { field: String },

    #[error("Linear transform is singular (determinant = {determinant})")]
    SingularTransform { determinant: f64 },
}

impl CoordError {
    pub fn dimension_mismatch(context: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
        }
    }

    pub fn invalid_axis(axis: usize, count: usize) -> Self {
        Self::InvalidAxis { axis, count }
    }

    pub fn invalid_permutation(message: impl Into<String>) -> Self {
        Self::InvalidPermutation {
            message: message.into(),
        }
    }

    pub fn invalid_increment(axis: usize, value: f64) -> Self {
        Self::InvalidIncrement { axis, value }
    }

    pub fn invalid_mix_selection(axis: usize) -> Self {
        Self::InvalidMixSelection { axis }
    }

    pub fn incompatible_unit(message: impl Into<String>) -> Self {
        Self::IncompatibleUnit {
            message: message.into(),
        }
    }

    pub fn conversion_failure(message: impl Into<String>) -> Self {
        Self::ConversionFailure {
            message: message.into(),
        }
    }

    pub fn fits_inconsistent(message: impl Into<String>) -> Self {
        Self::FitsInconsistent {
            message: message.into(),
        }
    }

    pub fn fits_unknown_projection(code: impl Into<String>) -> Self {
        Self::FitsUnknownProjection { code: code.into() }
    }

    pub fn no_fourier(kind: impl Into<String>) -> Self {
        Self::NoFourier { kind: kind.into() }
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::Mismatch {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn singular_transform(determinant: f64) -> Self {
        Self::SingularTransform { determinant }
    }
}

impl From<skygrid_core::UnitError> for CoordError {
    fn from(err: skygrid_core::UnitError) -> Self {
        Self::IncompatibleUnit {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_axis_message() {
        let err = CoordError::invalid_axis(5, 3);
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_unit_error_conversion() {
        let err: CoordError = skygrid_core::UnitError::unknown("blob").into();
        assert!(matches!(err, CoordError::IncompatibleUnit { .. }));
        assert!(err.to_string().contains("blob"));
    }

    #[test]
    fn test_no_fourier_message() {
        let err = CoordError::no_fourier("Stokes");
        assert!(err.to_string().contains("Stokes"));
    }
}
