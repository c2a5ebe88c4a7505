use crate::circuit::{Circuit, MosType};
use crate::error::PathfinderError;

/// Parses the SPICE subset the cell netlists use: `*` comments and `.`
/// control cards are skipped, every other line is a MOS card
///
/// ```text
/// M<name> <drain> <gate> <source> <substrate> <model> [W=<v>] [L=<v>]
/// ```
///
/// The model name decides P against N; `W`/`L` values take an optional
/// `n`/`u` suffix and are kept in nanometers.
pub fn parse(input: &str) -> Result<Circuit, PathfinderError> {
    let mut circuit = Circuit::new();
    for (i, raw) in input.lines().enumerate() {
        let line = i + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('*') || text.starts_with('.') {
            continue;
        }
        let mut fields = text.split_whitespace();
        let name = fields.next().expect("non-empty line has a first field");
        if !name.starts_with('M') && !name.starts_with('m') {
            return Err(PathfinderError::UnexpectedCard {
                line,
                got: name.to_string(),
            });
        }

        let mut need = || fields.next().ok_or(PathfinderError::MissingField { line });
        let drain = need()?;
        let gate = need()?;
        let source = need()?;
        let substrate = need()?;
        let model = need()?;
        let ty = match model.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('p') => MosType::P,
            Some('n') => MosType::N,
            _ => {
                return Err(PathfinderError::UnknownModel {
                    line,
                    model: model.to_string(),
                })
            }
        };

        let mut width = 0.0;
        let mut length = 0.0;
        for param in fields {
            let upper = param.to_ascii_uppercase();
            if let Some(value) = upper.strip_prefix("W=") {
                width = parse_dimension(value, line)?;
            } else if let Some(value) = upper.strip_prefix("L=") {
                length = parse_dimension(value, line)?;
            }
        }

        let drain = circuit.add_net(drain);
        let gate = circuit.add_net(gate);
        let source = circuit.add_net(source);
        let substrate = circuit.add_net(substrate);
        circuit.add_mos(name, ty, drain, gate, source, substrate, width, length);
    }

    if circuit.mos.is_empty() {
        return Err(PathfinderError::EmptyCircuit);
    }
    Ok(circuit)
}

/// `81N` -> 81 nm, `0.5U` -> 500 nm, bare numbers pass through.
fn parse_dimension(value: &str, line: usize) -> Result<f64, PathfinderError> {
    let (digits, scale) = match value.chars().last() {
        Some('N') => (&value[..value.len() - 1], 1.0),
        Some('U') => (&value[..value.len() - 1], 1000.0),
        _ => (value, 1.0),
    };
    digits
        .parse::<f64>()
        .map(|v| v * scale)
        .map_err(|_| PathfinderError::BadNumber {
            line,
            got: value.to_string(),
        })
}
