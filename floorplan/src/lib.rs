pub mod annealing;
pub mod block;
pub mod error;
pub mod tree;

pub use annealing::{simulate_annealing, AnnealingParams, Placement};
pub use block::{parse, AspectRatio, Block, BlockId, Input};
pub use error::FloorplanError;
pub use tree::SlicingTree;
