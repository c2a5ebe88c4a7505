use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("missing balance factor")]
    MissingBalanceFactor,

    #[error("invalid balance factor {got:?}: must be a number in (0, 1)")]
    InvalidBalanceFactor { got: String },

    #[error("expected NET keyword, found {found:?}")]
    ExpectedNet { found: String },

    #[error("net record for {net:?} ended before its terminating ';'")]
    UnterminatedNet { net: String },

    #[error("netlist has no cells")]
    EmptyNetlist,
}
