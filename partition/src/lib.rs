pub mod bucket;
pub mod error;
pub mod fm;
pub mod netlist;
pub mod parser;

pub use error::PartitionError;
pub use fm::FmPartitioner;
pub use netlist::{BlockTag, CellId, NetId, Netlist};
pub use parser::parse;
