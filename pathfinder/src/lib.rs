pub mod circuit;
pub mod error;
pub mod hpwl;
pub mod parser;
pub mod path;
pub mod path_finder;

pub use circuit::{Circuit, Mos, MosId, MosType, Net, NetId};
pub use error::PathfinderError;
pub use parser::parse;
pub use path::{Edge, Path, Vertex};
pub use path_finder::{find_path, PathOutcome};
