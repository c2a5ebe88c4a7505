use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("unexpected token {found:?}")]
    UnexpectedToken { found: String },

    #[error("boundary {label:?} carries an odd number of interval endpoints")]
    DanglingEndpoint { label: String },

    #[error("boundary interval [{lo}, {hi}) is empty")]
    EmptyBoundaryInterval { lo: i64, hi: i64 },

    #[error("top row has {top} columns but bottom row has {bottom}")]
    MismatchedRows { top: usize, bottom: usize },

    #[error("net ids must be consecutive from 1; net {id} has no pin")]
    UndefinedNet { id: u32 },

    #[error("vertical constraints form a cycle; {unrouted} nets cannot be placed")]
    ConstraintCycle { unrouted: usize },
}
