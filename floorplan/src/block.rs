use crate::error::FloorplanError;
use pd_common::define_index;

define_index!(BlockId);

/// A rectangular macro to place.
#[derive(Clone, Debug)]
pub struct Block {
    pub name: String,
    pub width: u64,
    pub height: u64,
}

/// Open bounds on the chip aspect ratio `W / H`.
#[derive(Clone, Copy, Debug)]
pub struct AspectRatio {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug)]
pub struct Input {
    pub aspect_ratio: AspectRatio,
    pub blocks: Vec<Block>,
}

/// Parses a floorplan instance: the first line carries the aspect-ratio
/// bounds, each following non-empty line one `<name> <width> <height>`.
pub fn parse(input: &str) -> Result<Input, FloorplanError> {
    let mut lines = input.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or(FloorplanError::MissingAspectRatio)?;
    let mut bounds = header.split_whitespace();
    let aspect_ratio = match (bounds.next(), bounds.next()) {
        (Some(lo), Some(hi)) => {
            let lower: f64 = lo
                .parse()
                .map_err(|_| FloorplanError::InvalidAspectRatio {
                    got: header.to_string(),
                })?;
            let upper: f64 = hi
                .parse()
                .map_err(|_| FloorplanError::InvalidAspectRatio {
                    got: header.to_string(),
                })?;
            AspectRatio { lower, upper }
        }
        _ => {
            return Err(FloorplanError::InvalidAspectRatio {
                got: header.to_string(),
            })
        }
    };

    let mut blocks = Vec::new();
    for line in lines {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(name), Some(w), Some(h)) => {
                let width = w.parse().map_err(|_| FloorplanError::InvalidBlock {
                    got: line.to_string(),
                })?;
                let height = h.parse().map_err(|_| FloorplanError::InvalidBlock {
                    got: line.to_string(),
                })?;
                blocks.push(Block {
                    name: name.to_string(),
                    width,
                    height,
                });
            }
            _ => {
                return Err(FloorplanError::InvalidBlock {
                    got: line.to_string(),
                })
            }
        }
    }

    if blocks.len() < 2 {
        return Err(FloorplanError::TooFewBlocks { got: blocks.len() });
    }
    Ok(Input {
        aspect_ratio,
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bounds_and_blocks() {
        let input = parse("0.5 2.0\nb1 10 20\n\nb2 20 10\n").unwrap();
        assert!((input.aspect_ratio.lower - 0.5).abs() < 1e-12);
        assert!((input.aspect_ratio.upper - 2.0).abs() < 1e-12);
        assert_eq!(input.blocks.len(), 2);
        assert_eq!(input.blocks[1].name, "b2");
        assert_eq!(input.blocks[1].width, 20);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse(""), Err(FloorplanError::MissingAspectRatio)));
        assert!(matches!(
            parse("0.5\nb1 1 1\nb2 1 1"),
            Err(FloorplanError::InvalidAspectRatio { .. })
        ));
        assert!(matches!(
            parse("0.5 2.0\nb1 1\nb2 1 1"),
            Err(FloorplanError::InvalidBlock { .. })
        ));
        assert!(matches!(
            parse("0.5 2.0\nb1 1 1"),
            Err(FloorplanError::TooFewBlocks { got: 1 })
        ));
    }
}
