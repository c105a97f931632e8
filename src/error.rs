use thiserror::Error;

/// Errors raised while building filters or applying them to a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The submitted value cannot be used by the filter configured for this field.
    /// Raised when the filter is constructed, never from `apply`.
    #[error("invalid value for field `{field}`: {reason}")]
    Configuration { field: String, reason: String },

    /// The field name is not known to the query's schema.
    #[error("unknown field `{field}` on `{table}`")]
    Resolution { field: String, table: String },
}

impl FilterError {
    pub fn configuration(field: &str, reason: impl Into<String>) -> Self {
        FilterError::Configuration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
