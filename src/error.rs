use thiserror::Error;

// ---------------------------------------------------------------------------
// GeoCSV extraction / projection
// ---------------------------------------------------------------------------

/// Errors raised while reading a GeoCSV source or pulling values out of it.
#[derive(Debug, Error)]
pub enum GeoCsvError {
    #[error("{name}: source not found")]
    SourceNotFound { name: String },

    #[error("{name}: read failed: {cause}")]
    SourceRead {
        name: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("{name}: column '{column}' not found")]
    ColumnNotFound { name: String, column: String },

    #[error("{name}: data row {row}, column '{column}': '{value}' is not a number")]
    NonNumericValue {
        name: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("{name}: metadata key '{key}' not found")]
    MissingMetadataKey { name: String, key: String },
}

// ---------------------------------------------------------------------------
// Resampling
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("invalid resample rate '{0}' (expected e.g. 60min, 1H, 30s, 1D)")]
    InvalidRate(String),

    #[error("{name}: no time column found")]
    NoTimeColumn { name: String },
}

// ---------------------------------------------------------------------------
// R2R API responses
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum R2rError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("API returned status {status}: {message}")]
    ApiStatus { status: i64, message: String },

    #[error("failed to decode API response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no 'Navigation' product found (product types seen: {})", .seen.join(", "))]
    NavigationNotFound { seen: Vec<String> },

    #[error("'Navigation' product has no product_actual_url")]
    MissingProductUrl,

    #[error("no .geoCSV file among {0} candidate(s)")]
    NoGeoCsv(usize),

    #[error("cruise record {cruise}: missing field '{field}'")]
    MissingField { cruise: String, field: &'static str },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}
