use crate::error::PartitionError;
use crate::netlist::Netlist;
use std::collections::HashSet;

/// Parses a partition instance:
///
/// ```text
/// <balance factor>
/// NET <net name> <cell name>... ;
/// ```
///
/// The terminating `;` may abut the last cell name. A cell repeated inside
/// one record is connected once.
pub fn parse(input: &str) -> Result<(f64, Netlist), PartitionError> {
    let mut tokens = input.split_whitespace();

    let first = tokens.next().ok_or(PartitionError::MissingBalanceFactor)?;
    let balance_factor: f64 = first
        .parse()
        .map_err(|_| PartitionError::InvalidBalanceFactor {
            got: first.to_string(),
        })?;
    if !(balance_factor > 0.0 && balance_factor < 1.0) {
        return Err(PartitionError::InvalidBalanceFactor {
            got: first.to_string(),
        });
    }

    let mut netlist = Netlist::new();
    while let Some(keyword) = tokens.next() {
        if keyword != "NET" {
            return Err(PartitionError::ExpectedNet {
                found: keyword.to_string(),
            });
        }
        let net_name = tokens.next().ok_or_else(|| PartitionError::UnterminatedNet {
            net: String::new(),
        })?;
        let net = netlist.add_net(net_name.to_string());

        let mut seen = HashSet::new();
        let mut terminated = false;
        for token in tokens.by_ref() {
            let (cell_name, last) = if token == ";" {
                (None, true)
            } else if let Some(stripped) = token.strip_suffix(';') {
                (Some(stripped), true)
            } else {
                (Some(token), false)
            };
            if let Some(name) = cell_name {
                let cell = netlist.get_or_add_cell(name);
                if seen.insert(cell) {
                    netlist.connect(net, cell);
                }
            }
            if last {
                terminated = true;
                break;
            }
        }
        if !terminated {
            return Err(PartitionError::UnterminatedNet {
                net: net_name.to_string(),
            });
        }
    }

    if netlist.num_cells() == 0 {
        return Err(PartitionError::EmptyNetlist);
    }
    Ok((balance_factor, netlist))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nets_and_deduplicates_cells() {
        let (bf, nl) = parse("0.4\nNET n1 a b b c ;\nNET n2 b d;\n").unwrap();
        assert!((bf - 0.4).abs() < 1e-12);
        assert_eq!(nl.num_nets(), 2);
        assert_eq!(nl.num_cells(), 4);
        // "b" appears twice in n1 but connects once.
        assert_eq!(nl.nets[0].cells.len(), 3);
        // The abutting ';' still terminates n2.
        assert_eq!(nl.nets[1].cells.len(), 2);
        let b = &nl.cells[1];
        assert_eq!(b.name, "b");
        assert_eq!(b.num_pins(), 2);
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(
            parse(""),
            Err(PartitionError::MissingBalanceFactor)
        ));
        assert!(matches!(
            parse("nope NET n a ;"),
            Err(PartitionError::InvalidBalanceFactor { .. })
        ));
        assert!(matches!(
            parse("1.5 NET n a ;"),
            Err(PartitionError::InvalidBalanceFactor { .. })
        ));
        assert!(matches!(
            parse("0.5 WIRE n a ;"),
            Err(PartitionError::ExpectedNet { .. })
        ));
        assert!(matches!(
            parse("0.5 NET n a b"),
            Err(PartitionError::UnterminatedNet { .. })
        ));
    }
}
