use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathfinderError {
    #[error("line {line}: expected a MOS card, found {got:?}")]
    UnexpectedCard { line: usize, got: String },

    #[error("line {line}: MOS card is missing fields")]
    MissingField { line: usize },

    #[error("line {line}: cannot tell P from N for model {model:?}")]
    UnknownModel { line: usize, model: String },

    #[error("line {line}: bad number {got:?}")]
    BadNumber { line: usize, got: String },

    #[error("the netlist has no transistors")]
    EmptyCircuit,

    #[error("gate {gate:?} drives {p_count} PMOS but {n_count} NMOS")]
    UnpairedGate {
        gate: String,
        p_count: usize,
        n_count: usize,
    },

    #[error("path endpoint has no free diffusion left")]
    NoFreeNet,
}
