use crate::block::AspectRatio;
use crate::tree::SlicingTree;
use pd_common::geom::point::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct AnnealingParams {
    pub cooling_factor: f64,
    pub initial_temp_per_block: f64,
    pub freezing_temp: f64,
    pub reject_threshold: f64,
    pub moves_per_block: usize,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            cooling_factor: 0.85,
            initial_temp_per_block: 100_000.0,
            freezing_temp: 10.0,
            reject_threshold: 0.95,
            moves_per_block: 1,
        }
    }
}

pub struct Placement {
    pub area: u64,
    pub width: u64,
    pub height: u64,
    /// Bottom-left corner per block, indexed like the input blocks.
    pub coords: Vec<Point>,
}

/// Anneals the slicing tree under the aspect-ratio constraint and places
/// the best floorplan seen.
///
/// The cost of a move is the area delta against the best area so far;
/// uphill moves pass a Metropolis draw at the current temperature, rejected
/// moves are undone through the tree's O(1) restore.
pub fn simulate_annealing(
    tree: &mut SlicingTree,
    constraint: &AspectRatio,
    params: &AnnealingParams,
    seed: Option<u64>,
) -> Placement {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let n = tree.num_blocks();
    let moves_per_temp = (params.moves_per_block * n).max(1);
    let mut temp = params.initial_temp_per_block * n as f64;

    // The initial floorplan may violate the constraint; keep perturbing
    // until it holds.
    let mut warmup = 0u64;
    while !tree.satisfies(constraint) {
        tree.perturb();
        warmup += 1;
    }
    log::debug!("{} warmup moves to reach the aspect-ratio window", warmup);

    let mut best_area = tree.area();
    let mut snapshot = tree.snapshot();
    let mut total_moves = 0u64;
    loop {
        let mut moves = 0usize;
        let mut rejected = 0usize;
        let mut uphills = 0usize;
        while moves < moves_per_temp && (moves - uphills) < moves_per_temp / 2 {
            tree.perturb();
            moves += 1;
            total_moves += 1;
            let area = tree.area();
            let cost = area as f64 - best_area as f64;
            let accept = tree.satisfies(constraint)
                && (cost <= 0.0 || rng.gen::<f64>() < (-cost / temp).exp());
            if accept {
                if cost > 0.0 {
                    uphills += 1;
                }
                if area <= best_area {
                    // Equal areas still replace the snapshot.
                    best_area = area;
                    snapshot = tree.snapshot();
                }
            } else {
                tree.restore();
                rejected += 1;
            }
        }
        temp *= params.cooling_factor;
        if rejected as f64 / moves as f64 > params.reject_threshold
            || temp < params.freezing_temp
        {
            break;
        }
    }
    log::debug!("annealed for {} moves, best area {}", total_moves, best_area);

    tree.rebuild_from(&snapshot);
    debug_assert_eq!(tree.area(), best_area);
    let coords = tree.place();
    Placement {
        area: best_area,
        width: tree.width(),
        height: tree.height(),
        coords,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn blocks(dims: &[(u64, u64)]) -> Vec<Block> {
        dims.iter()
            .enumerate()
            .map(|(i, &(w, h))| Block {
                name: format!("b{}", i),
                width: w,
                height: h,
            })
            .collect()
    }

    #[test]
    fn two_blocks_anneal_to_the_known_minimum() {
        let constraint = AspectRatio {
            lower: 0.5,
            upper: 2.0,
        };
        // b1 b2 V is 30x20, b1 b2 H is 20x30; both are legal and area 600.
        let mut tree = SlicingTree::new(blocks(&[(10, 20), (20, 10)]), Some(5)).unwrap();
        let placement =
            simulate_annealing(&mut tree, &constraint, &AnnealingParams::default(), Some(5));
        assert_eq!(placement.area, 600);
        assert!(tree.satisfies(&constraint));
        assert_eq!(placement.width * placement.height, placement.area);
    }

    #[test]
    fn result_respects_the_constraint_and_tiles_cleanly() {
        let dims = [(4, 6), (6, 4), (2, 2), (4, 4), (6, 6)];
        let constraint = AspectRatio {
            lower: 0.4,
            upper: 2.5,
        };
        let mut tree = SlicingTree::new(blocks(&dims), Some(17)).unwrap();
        let placement =
            simulate_annealing(&mut tree, &constraint, &AnnealingParams::default(), Some(17));

        assert!(tree.satisfies(&constraint));
        assert_eq!(placement.area, placement.width * placement.height);
        // The placed rectangles stay inside the outline and never overlap.
        for (i, c) in placement.coords.iter().enumerate() {
            assert!(c.x + dims[i].0 <= placement.width);
            assert!(c.y + dims[i].1 <= placement.height);
            for (j, d) in placement.coords.iter().enumerate().skip(i + 1) {
                let disjoint_x = c.x + dims[i].0 <= d.x || d.x + dims[j].0 <= c.x;
                let disjoint_y = c.y + dims[i].1 <= d.y || d.y + dims[j].1 <= c.y;
                assert!(disjoint_x || disjoint_y, "blocks {} and {} overlap", i, j);
            }
        }
        // The best area can never exceed the worst stacked arrangement.
        let area_sum: u64 = dims.iter().map(|&(w, h)| w * h).sum();
        assert!(placement.area >= area_sum);
    }
}
