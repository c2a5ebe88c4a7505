use crate::error::RouterError;
use crate::instance::{Instance, EMPTY_SLOT};
use pd_common::geom::interval::Interval;

/// Interval-to-net assignments of one horizontal track, left to right.
pub type Track = Vec<(Interval, u32)>;

#[derive(Debug)]
pub struct RoutingResult {
    /// One track per top boundary level, innermost first.
    pub top_tracks: Vec<Track>,
    /// Extra in-channel tracks, in allocation order from the top down.
    pub tracks: Vec<Track>,
    /// One track per bottom boundary level, innermost first.
    pub bottom_tracks: Vec<Track>,
}

impl RoutingResult {
    /// The number of extra in-channel tracks.
    pub fn channel_density(&self) -> usize {
        self.tracks.len()
    }
}

#[derive(Clone, Copy)]
enum BoundarySide {
    Top,
    Bottom,
}

/// Left-edge channel router against stacked rectilinear boundaries.
///
/// Every net takes exactly one track. The horizontal constraint is the
/// watermark sweep (no two overlapping intervals share a track); the
/// vertical constraint graph orders nets that share a pin column.
pub struct Router {
    instance: Instance,
    /// Net intervals sorted by left endpoint; ties stay in id order.
    hcg: Vec<(Interval, u32)>,
    /// `vcg[n]` lists the nets that must sit strictly above net n.
    vcg: Vec<Vec<u32>>,
    /// The same scan with the roles exchanged, for the bottom-boundary pass.
    inverted_vcg: Vec<Vec<u32>>,
    num_nets: u32,
    routed: Vec<bool>,
    routed_count: usize,
}

impl Router {
    pub fn new(instance: Instance) -> Result<Self, RouterError> {
        if instance.top_net_ids.len() != instance.bottom_net_ids.len() {
            return Err(RouterError::MismatchedRows {
                top: instance.top_net_ids.len(),
                bottom: instance.bottom_net_ids.len(),
            });
        }
        let num_nets = instance.num_nets();
        let hcg = build_hcg(&instance, num_nets)?;
        let (vcg, inverted_vcg) = build_vcg(&instance, num_nets);
        Ok(Self {
            instance,
            hcg,
            vcg,
            inverted_vcg,
            num_nets,
            routed: vec![false; num_nets as usize + 1],
            routed_count: 0,
        })
    }

    /// Safe to call repeatedly; every call starts from a clean slate.
    pub fn route(&mut self) -> Result<RoutingResult, RouterError> {
        self.routed = vec![false; self.num_nets as usize + 1];
        self.routed_count = 0;

        let top_tracks = self.route_boundary_tracks(BoundarySide::Top);
        let bottom_tracks = self.route_boundary_tracks(BoundarySide::Bottom);
        let tracks = self.route_channel_tracks()?;

        log::debug!(
            "routed {} nets: {} top, {} channel, {} bottom tracks",
            self.routed_count,
            top_tracks.len(),
            tracks.len(),
            bottom_tracks.len()
        );
        Ok(RoutingResult {
            top_tracks,
            tracks,
            bottom_tracks,
        })
    }

    /// One left-edge sweep per boundary level, innermost outward, against a
    /// running union of the boundary intervals seen so far. The bottom pass
    /// is the same walk with the inverted constraint graph: a net may hug
    /// the bottom only once everything below it is in place.
    fn route_boundary_tracks(&mut self, side: BoundarySide) -> Vec<Track> {
        let levels = match side {
            BoundarySide::Top => self.instance.top_boundaries.clone(),
            BoundarySide::Bottom => self.instance.bottom_boundaries.clone(),
        };
        let mut merged: Vec<Interval> = Vec::new();
        let mut tracks = Vec::new();
        for level in levels {
            for interval in level {
                merge_into(&mut merged, interval);
            }
            let mut track: Track = Vec::new();
            let mut watermark = -1i64;
            for k in 0..self.hcg.len() {
                let (interval, net) = self.hcg[k];
                if self.routed[net as usize]
                    || interval.lo <= watermark
                    || !merged.iter().any(|m| interval.is_inside(m))
                    || !self.constraints_routed(net, side)
                {
                    continue;
                }
                self.routed[net as usize] = true;
                self.routed_count += 1;
                watermark = interval.hi;
                track.push((interval, net));
            }
            tracks.push(track);
        }
        tracks
    }

    /// Greedy left-edge into fresh in-channel tracks, top down. A fresh
    /// track that places nothing while nets remain means the vertical
    /// constraints are cyclic.
    fn route_channel_tracks(&mut self) -> Result<Vec<Track>, RouterError> {
        let mut tracks = Vec::new();
        while self.routed_count < self.num_nets as usize {
            let mut track: Track = Vec::new();
            let mut watermark = -1i64;
            for k in 0..self.hcg.len() {
                let (interval, net) = self.hcg[k];
                if self.routed[net as usize]
                    || interval.lo <= watermark
                    || !self.constraints_routed(net, BoundarySide::Top)
                {
                    continue;
                }
                self.routed[net as usize] = true;
                self.routed_count += 1;
                watermark = interval.hi;
                track.push((interval, net));
            }
            if track.is_empty() {
                return Err(RouterError::ConstraintCycle {
                    unrouted: self.num_nets as usize - self.routed_count,
                });
            }
            tracks.push(track);
        }
        Ok(tracks)
    }

    fn constraints_routed(&self, net: u32, side: BoundarySide) -> bool {
        let graph = match side {
            BoundarySide::Top => &self.vcg,
            BoundarySide::Bottom => &self.inverted_vcg,
        };
        graph[net as usize]
            .iter()
            .all(|&other| self.routed[other as usize])
    }
}

/// Per net, the column interval spanning all of its pins.
fn build_hcg(instance: &Instance, num_nets: u32) -> Result<Vec<(Interval, u32)>, RouterError> {
    let mut span: Vec<Option<Interval>> = vec![None; num_nets as usize + 1];
    for col in 0..instance.num_columns() {
        for id in [instance.top_net_ids[col], instance.bottom_net_ids[col]] {
            if id == EMPTY_SLOT {
                continue;
            }
            let c = col as i64;
            span[id as usize] = Some(match span[id as usize] {
                None => Interval::new(c, c),
                Some(s) => Interval::new(s.lo.min(c), s.hi.max(c)),
            });
        }
    }

    let mut hcg = Vec::with_capacity(num_nets as usize);
    for id in 1..=num_nets {
        let interval = span[id as usize].ok_or(RouterError::UndefinedNet { id })?;
        hcg.push((interval, id));
    }
    hcg.sort_by_key(|(interval, _)| interval.lo);
    Ok(hcg)
}

/// Per column, the top net must sit above the bottom net. The inverted
/// graph records the exchanged relation for the bottom-boundary pass.
fn build_vcg(instance: &Instance, num_nets: u32) -> (Vec<Vec<u32>>, Vec<Vec<u32>>) {
    let mut vcg: Vec<Vec<u32>> = vec![Vec::new(); num_nets as usize + 1];
    let mut inverted: Vec<Vec<u32>> = vec![Vec::new(); num_nets as usize + 1];
    for col in 0..instance.num_columns() {
        let top = instance.top_net_ids[col];
        let bottom = instance.bottom_net_ids[col];
        if top == EMPTY_SLOT || bottom == EMPTY_SLOT || top == bottom {
            continue;
        }
        if !vcg[bottom as usize].contains(&top) {
            vcg[bottom as usize].push(top);
        }
        if !inverted[top as usize].contains(&bottom) {
            inverted[top as usize].push(bottom);
        }
    }
    (vcg, inverted)
}

/// Folds the interval into a sorted list of disjoint intervals, coalescing
/// everything it overlaps or abuts.
fn merge_into(merged: &mut Vec<Interval>, interval: Interval) {
    let mut out = Vec::with_capacity(merged.len() + 1);
    let mut grown = interval;
    let mut placed = false;
    for &m in merged.iter() {
        if m.touches(&grown) {
            grown = grown.union(&m);
        } else if m.hi < grown.lo {
            out.push(m);
        } else {
            if !placed {
                out.push(grown);
                placed = true;
            }
            out.push(m);
        }
    }
    if !placed {
        out.push(grown);
    }
    *merged = out;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(top: &[u32], bottom: &[u32]) -> Instance {
        Instance {
            top_boundaries: Vec::new(),
            bottom_boundaries: Vec::new(),
            top_net_ids: top.to_vec(),
            bottom_net_ids: bottom.to_vec(),
        }
    }

    /// Flattens a result into net -> (height rank, interval), higher rank =
    /// physically higher, for invariant checks.
    fn heights(result: &RoutingResult) -> Vec<Option<(i64, Interval)>> {
        let mut out: Vec<Option<(i64, Interval)>> = Vec::new();
        let mut level = 0i64;
        let record = |track: &Track, level: i64, out: &mut Vec<Option<(i64, Interval)>>| {
            for &(interval, net) in track {
                if out.len() <= net as usize {
                    out.resize(net as usize + 1, None);
                }
                out[net as usize] = Some((level, interval));
            }
        };
        // Boundary passes place constraint-free nets first, so allocation
        // order is height order.
        for track in &result.top_tracks {
            record(track, level, &mut out);
            level -= 1;
        }
        for track in &result.tracks {
            record(track, level, &mut out);
            level -= 1;
        }
        // The bottom pass fills child-first, so its first track is lowest.
        for track in result.bottom_tracks.iter().rev() {
            record(track, level, &mut out);
            level -= 1;
        }
        out
    }

    fn assert_no_track_overlap(result: &RoutingResult) {
        for track in result
            .top_tracks
            .iter()
            .chain(result.tracks.iter())
            .chain(result.bottom_tracks.iter())
        {
            for pair in track.windows(2) {
                assert!(pair[0].0.hi < pair[1].0.lo, "track intervals overlap");
            }
        }
    }

    #[test]
    fn left_edge_packs_disjoint_intervals_onto_one_track() {
        // Net 3 hangs below nets 1 and 2 and has to wait for both.
        let mut router = Router::new(instance(&[1, 1, 0, 2, 2], &[0, 3, 0, 3, 0])).unwrap();
        let result = router.route().unwrap();
        assert_eq!(result.channel_density(), 2);
        assert_eq!(result.tracks[0], vec![
            (Interval::new(0, 1), 1),
            (Interval::new(3, 4), 2),
        ]);
        assert_eq!(result.tracks[1], vec![(Interval::new(1, 3), 3)]);
        assert_no_track_overlap(&result);

        let h = heights(&result);
        // Both parents sit strictly above their child.
        assert!(h[1].unwrap().0 > h[3].unwrap().0);
        assert!(h[2].unwrap().0 > h[3].unwrap().0);
    }

    #[test]
    fn routing_twice_gives_the_same_answer() {
        let mut router = Router::new(instance(&[1, 1, 0, 2, 2], &[0, 3, 0, 3, 0])).unwrap();
        let first = router.route().unwrap();
        let second = router.route().unwrap();
        assert_eq!(first.tracks, second.tracks);
    }

    #[test]
    fn detects_a_vertical_constraint_cycle() {
        let mut router = Router::new(instance(&[1, 2], &[2, 1])).unwrap();
        assert!(matches!(
            router.route(),
            Err(RouterError::ConstraintCycle { unrouted: 2 })
        ));
    }

    #[test]
    fn boundary_tracks_absorb_nets_before_the_channel() {
        let mut inst = instance(&[0, 1, 1, 0], &[0, 2, 2, 0]);
        inst.top_boundaries = vec![vec![Interval::new(0, 4)]];
        inst.bottom_boundaries = vec![vec![Interval::new(0, 4)]];
        let mut router = Router::new(inst).unwrap();
        let result = router.route().unwrap();

        // Net 1 fits under the top notch right away; net 2 may only hug the
        // bottom because nothing has to go below it.
        assert_eq!(result.top_tracks[0], vec![(Interval::new(1, 2), 1)]);
        assert_eq!(result.bottom_tracks[0], vec![(Interval::new(1, 2), 2)]);
        assert_eq!(result.channel_density(), 0);
    }

    #[test]
    fn a_net_with_unplaced_children_stays_out_of_the_bottom_tracks() {
        let mut inst = instance(&[0, 1, 1, 0], &[0, 2, 2, 0]);
        inst.bottom_boundaries = vec![vec![Interval::new(0, 4)]];
        let mut router = Router::new(inst).unwrap();
        let result = router.route().unwrap();

        // Net 1 is net 2's parent, so it cannot take the bottom track even
        // though its interval fits; it lands in the channel instead.
        assert_eq!(result.bottom_tracks[0], vec![(Interval::new(1, 2), 2)]);
        assert_eq!(result.tracks, vec![vec![(Interval::new(1, 2), 1)]]);
        let h = heights(&result);
        assert!(h[1].unwrap().0 > h[2].unwrap().0);
    }

    #[test]
    fn strict_containment_keeps_wide_nets_out_of_narrow_notches() {
        let mut inst = instance(&[1, 0, 0, 1], &[0, 0, 0, 0]);
        inst.top_boundaries = vec![vec![Interval::new(0, 4)]];
        let mut router = Router::new(inst).unwrap();
        let result = router.route().unwrap();

        // [0, 3] is not strictly inside [0, 4), so the net falls through to
        // an in-channel track.
        assert!(result.top_tracks[0].is_empty());
        assert_eq!(result.channel_density(), 1);
    }

    #[test]
    fn outer_boundary_levels_extend_the_merged_union() {
        // The two outer half-notches only join up at the second level.
        let mut inst = instance(&[0, 1, 1, 0, 0], &[0, 0, 0, 0, 0]);
        inst.top_boundaries = vec![vec![Interval::new(0, 2)], vec![Interval::new(2, 5)]];
        let mut router = Router::new(inst).unwrap();
        let result = router.route().unwrap();

        assert!(result.top_tracks[0].is_empty());
        assert_eq!(result.top_tracks[1], vec![(Interval::new(1, 2), 1)]);
        assert_eq!(result.channel_density(), 0);
    }

    #[test]
    fn rejects_gapped_net_ids_and_mismatched_rows() {
        assert!(matches!(
            Router::new(instance(&[1, 3], &[0, 0])),
            Err(RouterError::UndefinedNet { id: 2 })
        ));
        assert!(matches!(
            Router::new(instance(&[1], &[1, 1])),
            Err(RouterError::MismatchedRows { top: 1, bottom: 2 })
        ));
    }

    #[test]
    fn merge_into_coalesces_touching_intervals() {
        let mut merged = Vec::new();
        merge_into(&mut merged, Interval::new(5, 7));
        merge_into(&mut merged, Interval::new(0, 2));
        assert_eq!(merged, vec![Interval::new(0, 2), Interval::new(5, 7)]);
        merge_into(&mut merged, Interval::new(2, 5));
        assert_eq!(merged, vec![Interval::new(0, 7)]);
        merge_into(&mut merged, Interval::new(9, 10));
        assert_eq!(merged, vec![Interval::new(0, 7), Interval::new(9, 10)]);
    }
}
