use thiserror::Error;

#[derive(Debug, Error)]
pub enum FloorplanError {
    #[error("missing aspect-ratio bounds on the first line")]
    MissingAspectRatio,

    #[error("invalid aspect-ratio bounds {got:?}")]
    InvalidAspectRatio { got: String },

    #[error("invalid block record {got:?}: expected `<name> <width> <height>`")]
    InvalidBlock { got: String },

    #[error("a floorplan needs at least two blocks, got {got}")]
    TooFewBlocks { got: usize },
}
