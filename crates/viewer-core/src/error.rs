use thiserror::Error;

/// Errors surfaced by the asset loader.
///
/// Effect application never returns these; malformed meshes are skipped with
/// a log line instead. Load failures propagate so the frontend can fall back
/// to its default asset.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Model contains no renderable geometry: {0}")]
    EmptyModel(String),
}
