use thiserror::Error;

use crate::scene::SceneState;

#[derive(Debug, Error)]
pub enum GooeyError {
    #[error("control panel needs an owning widget")]
    PanelWithoutOwner,

    #[error("scene is {0:?}, expected an initialized scene")]
    SceneNotReady(SceneState),

    #[error("font could not be parsed: {0}")]
    FontParse(String),

    #[error("outline tessellation failed: {0}")]
    Tessellation(String),

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
