use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported geometry: expected {expected}, found {found}")]
    UnsupportedGeometry {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Feature {index} has no property '{name}'")]
    MissingProperty { index: usize, name: String },

    #[error("Feature {index} has a property '{name}' that is neither an integer nor a string")]
    InvalidProperty { index: usize, name: String },

    #[error("Document does not contain a geometry")]
    NotAGeometry,
}

pub type Result<T> = std::result::Result<T, Error>;
