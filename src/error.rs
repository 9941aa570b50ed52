use thiserror::Error;

/// Failures while reading the institution table.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("expected a top-level JSON array of row objects")]
    NotARowArray,

    #[error("row {row} is not a JSON object")]
    RowNotAnObject { row: usize },

    #[error("none of the expected columns were found")]
    NoKnownColumns,
}

/// Failures while reading the state boundary document.
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("malformed GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed TopoJSON: {0}")]
    Topology(String),

    #[error("expected a FeatureCollection, found {0}")]
    NotAFeatureCollection(String),

    #[error("no state polygons with a FIPS id were found")]
    NoStates,
}
