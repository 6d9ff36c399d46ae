//! Domain error types.

/// Top-level error type for meanrev.
#[derive(Debug, thiserror::Error)]
pub enum MeanrevError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("'{field}' column missing from data")]
    MissingField { field: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid price series: {reason}")]
    InvalidSeries { reason: String },

    #[error("insufficient data: have {points} points, need {minimum}")]
    InsufficientData { points: usize, minimum: usize },

    #[error("no years provided")]
    NoYears,

    #[error("{year} is not available, please select a year from {first}-{last}")]
    UnsupportedYear { year: i32, first: i32, last: i32 },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MeanrevError> for std::process::ExitCode {
    fn from(err: &MeanrevError) -> Self {
        let code: u8 = match err {
            MeanrevError::Io(_) | MeanrevError::Report { .. } => 1,
            MeanrevError::ConfigParse { .. }
            | MeanrevError::ConfigMissing { .. }
            | MeanrevError::ConfigInvalid { .. } => 2,
            MeanrevError::InvalidParameter { .. }
            | MeanrevError::InvalidSeries { .. }
            | MeanrevError::InsufficientData { .. }
            | MeanrevError::MissingField { .. } => 4,
            MeanrevError::NoYears
            | MeanrevError::UnsupportedYear { .. }
            | MeanrevError::Data { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_year_message() {
        let err = MeanrevError::UnsupportedYear {
            year: 2012,
            first: 2014,
            last: 2023,
        };
        assert_eq!(
            err.to_string(),
            "2012 is not available, please select a year from 2014-2023"
        );
    }

    #[test]
    fn missing_field_message() {
        let err = MeanrevError::MissingField {
            field: "price".into(),
        };
        assert_eq!(err.to_string(), "'price' column missing from data");
    }

    #[test]
    fn insufficient_data_message() {
        let err = MeanrevError::InsufficientData {
            points: 3,
            minimum: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: have 3 points, need 10"
        );
    }

    #[test]
    fn short_series_exits_with_validation_code() {
        let err = MeanrevError::InsufficientData {
            points: 3,
            minimum: 10,
        };
        let code: std::process::ExitCode = (&err).into();
        assert_eq!(
            format!("{:?}", code),
            format!("{:?}", std::process::ExitCode::from(4))
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MeanrevError = io.into();
        assert!(matches!(err, MeanrevError::Io(_)));
    }
}
