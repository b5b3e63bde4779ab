use thiserror::Error;

/// Scene loading failures. The world is left in the cleared state when any
/// of these is returned.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("joint {joint} references missing body {body}")]
    MissingBody { joint: usize, body: usize },

    #[error("polygon shape needs at least 3 vertices, got {0}")]
    InvalidPolygon(usize),
}
