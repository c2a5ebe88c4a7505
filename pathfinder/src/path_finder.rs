use crate::circuit::{Circuit, MosId, MosType, NetId};
use crate::error::PathfinderError;
use crate::hpwl::calculate_hpwl;
use crate::path::{Edge, Fragment, Path, Vertex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};

pub struct PathOutcome {
    pub hpwl: f64,
    pub p_mos_names: Vec<String>,
    pub p_net_names: Vec<String>,
    pub n_mos_names: Vec<String>,
    pub n_net_names: Vec<String>,
    pub path: Path,
    pub circuit: Circuit,
}

/// Pairs the transistors, walks a Hamiltonian path over the pairs with the
/// extend/rotate heuristic, splices disjoint subpaths with dummies, and
/// prices the result.
pub fn find_path(circuit: Circuit, seed: Option<u64>) -> Result<PathOutcome, PathfinderError> {
    PathFinder::new(circuit, seed).run()
}

struct PathFinder {
    circuit: Circuit,
    vertices: Vec<Vertex>,
    adjacency: Vec<Vec<usize>>,
    vertex_index: HashMap<Vertex, usize>,
    rng: StdRng,
}

impl PathFinder {
    fn new(circuit: Circuit, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            circuit,
            vertices: Vec::new(),
            adjacency: Vec::new(),
            vertex_index: HashMap::new(),
            rng,
        }
    }

    fn run(mut self) -> Result<PathOutcome, PathfinderError> {
        self.pair_vertices()?;
        self.build_graph();
        log::debug!(
            "{} vertices, {} directed edges",
            self.vertices.len(),
            self.adjacency.iter().map(|a| a.len()).sum::<usize>()
        );

        let subpaths = self.find_subpaths();
        log::debug!("{} disjoint subpaths", subpaths.len());
        let path = self.join_with_dummies(subpaths)?;

        let gate_walk = self.net_walk(&path, true)?;
        let net_order = self.net_walk(&path, false)?;
        let head = path.head().vertex;
        let hpwl = calculate_hpwl(
            &net_order,
            &self.circuit,
            self.circuit.mos(head.p).width,
            self.circuit.mos(head.n).width,
        );

        let p_mos_names = collapse_dummies(
            path.frags
                .iter()
                .map(|f| self.circuit.mos(f.vertex.p).name.clone())
                .collect(),
        );
        let n_mos_names = collapse_dummies(
            path.frags
                .iter()
                .map(|f| self.circuit.mos(f.vertex.n).name.clone())
                .collect(),
        );
        let p_net_names = collapse_dummies(
            gate_walk
                .iter()
                .map(|e| self.circuit.net(e.p).name.clone())
                .collect(),
        );
        let n_net_names = collapse_dummies(
            gate_walk
                .iter()
                .map(|e| self.circuit.net(e.n).name.clone())
                .collect(),
        );

        Ok(PathOutcome {
            hpwl,
            p_mos_names,
            p_net_names,
            n_mos_names,
            n_net_names,
            path,
            circuit: self.circuit,
        })
    }

    /// Groups both types by gate net, then pairs: a lone PMOS with the lone
    /// NMOS, otherwise greedily by an additionally shared diffusion, and
    /// whatever remains in sequence order. Counts must match per gate.
    fn pair_vertices(&mut self) -> Result<(), PathfinderError> {
        let mut p_by_gate: BTreeMap<NetId, Vec<MosId>> = BTreeMap::new();
        let mut n_by_gate: BTreeMap<NetId, Vec<MosId>> = BTreeMap::new();
        for i in 0..self.circuit.mos.len() {
            let id = MosId::new(i);
            match self.circuit.mos(id).ty {
                MosType::P => p_by_gate
                    .entry(self.circuit.mos(id).gate)
                    .or_default()
                    .push(id),
                MosType::N => n_by_gate
                    .entry(self.circuit.mos(id).gate)
                    .or_default()
                    .push(id),
            }
        }

        for (gate, p_list) in p_by_gate {
            let n_list = n_by_gate.remove(&gate).unwrap_or_default();
            if p_list.len() != n_list.len() {
                return Err(PathfinderError::UnpairedGate {
                    gate: self.circuit.net(gate).name.clone(),
                    p_count: p_list.len(),
                    n_count: n_list.len(),
                });
            }
            if p_list.len() == 1 {
                self.vertices.push(Vertex {
                    p: p_list[0],
                    n: n_list[0],
                });
                continue;
            }

            let mut rem_p = p_list;
            let mut rem_n = n_list;
            let mut i = 0;
            while i < rem_n.len() {
                let n = rem_n[i];
                match rem_p
                    .iter()
                    .position(|&p| self.mirrored_diffusion(p, n))
                {
                    Some(k) => {
                        self.vertices.push(Vertex {
                            p: rem_p.remove(k),
                            n,
                        });
                        rem_n.remove(i);
                    }
                    None => i += 1,
                }
            }
            for (p, n) in rem_p.into_iter().zip(rem_n) {
                self.vertices.push(Vertex { p, n });
            }
        }

        if let Some((&gate, n_list)) = n_by_gate.iter().next() {
            return Err(PathfinderError::UnpairedGate {
                gate: self.circuit.net(gate).name.clone(),
                p_count: 0,
                n_count: n_list.len(),
            });
        }
        Ok(())
    }

    /// Drain over drain or source over source, the way a P row mirrors the
    /// N row in the cell.
    fn mirrored_diffusion(&self, p: MosId, n: MosId) -> bool {
        let (p, n) = (self.circuit.mos(p), self.circuit.mos(n));
        p.drain == n.drain || p.source == n.source
    }

    /// Quadratic scan: two pairs are adjacent iff both their P halves and
    /// their N halves share a diffusion.
    fn build_graph(&mut self) {
        let n = self.vertices.len();
        self.adjacency = vec![Vec::new(); n];
        self.vertex_index = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i))
            .collect();
        for i in 0..n {
            for j in 0..n {
                if i != j && self.vertices_connected(self.vertices[i], self.vertices[j]) {
                    self.adjacency[i].push(j);
                }
            }
        }
    }

    fn vertices_connected(&self, a: Vertex, b: Vertex) -> bool {
        self.circuit.diffusion_connected(a.p, b.p) && self.circuit.diffusion_connected(a.n, b.n)
    }

    /// Grows one path per connected region: extend at either end while
    /// possible, otherwise try every Pósa rotation and extend that. A path
    /// that survives both is finished.
    fn find_subpaths(&mut self) -> Vec<Path> {
        let mut unvisited: Vec<usize> = (0..self.vertices.len()).collect();
        let mut paths = Vec::new();
        while !unvisited.is_empty() {
            let pick = self.rng.gen_range(0..unvisited.len());
            let start = unvisited.swap_remove(pick);
            let mut path = Path::single(self.vertices[start]);
            loop {
                if self.try_extend(&mut path, &mut unvisited) {
                    continue;
                }
                let mut grew = false;
                for mut candidate in
                    path.rotations(|a, b| self.vertices_connected(a, b), &self.circuit)
                {
                    if self.try_extend(&mut candidate, &mut unvisited) {
                        path = candidate;
                        grew = true;
                        break;
                    }
                }
                if grew {
                    continue;
                }
                paths.push(path);
                break;
            }
        }
        paths
    }

    /// The tail first: pushing at the back is the cheap direction.
    fn try_extend(&self, path: &mut Path, unvisited: &mut Vec<usize>) -> bool {
        let tail = self.vertex_index[&path.tail().vertex];
        for &nb in &self.adjacency[tail] {
            if let Some(pos) = unvisited.iter().position(|&u| u == nb) {
                if path.try_attach_tail(self.vertices[nb], &self.circuit) {
                    unvisited.swap_remove(pos);
                    return true;
                }
            }
        }
        let head = self.vertex_index[&path.head().vertex];
        for &nb in &self.adjacency[head] {
            if let Some(pos) = unvisited.iter().position(|&u| u == nb) {
                if path.try_attach_head(self.vertices[nb], &self.circuit) {
                    unvisited.swap_remove(pos);
                    return true;
                }
            }
        }
        false
    }

    /// Splices the subpaths into one output row. Each junction synthesises
    /// a fresh `Dummy` net and a dummy P/N pair that terminate in the free
    /// diffusions of the real vertices on either side.
    fn join_with_dummies(&mut self, mut paths: Vec<Path>) -> Result<Path, PathfinderError> {
        let mut joined = paths.remove(0);
        for next in paths {
            let dummy_net = self.circuit.add_dummy_net();

            let last = joined.len() - 1;
            let (tail_free_p, tail_free_n) = joined.free_nets(last, &self.circuit);
            let end_p = *tail_free_p.first().ok_or(PathfinderError::NoFreeNet)?;
            let end_n = *tail_free_n.first().ok_or(PathfinderError::NoFreeNet)?;
            let end_v = joined.tail().vertex;
            let end_dummy = Vertex {
                p: self.add_dummy_mos(MosType::P, end_p, dummy_net, end_v.p),
                n: self.add_dummy_mos(MosType::N, end_n, dummy_net, end_v.n),
            };

            let (head_free_p, head_free_n) = next.free_nets(0, &self.circuit);
            let start_p = *head_free_p.first().ok_or(PathfinderError::NoFreeNet)?;
            let start_n = *head_free_n.first().ok_or(PathfinderError::NoFreeNet)?;
            let head_v = next.head().vertex;
            let start_dummy = Vertex {
                p: self.add_dummy_mos(MosType::P, start_p, dummy_net, head_v.p),
                n: self.add_dummy_mos(MosType::N, start_n, dummy_net, head_v.n),
            };

            joined.frags[last].edge_to_next = Some(Edge { p: end_p, n: end_n });
            joined.frags.push(Fragment {
                vertex: end_dummy,
                edge_to_next: Some(Edge {
                    p: dummy_net,
                    n: dummy_net,
                }),
            });
            joined.frags.push(Fragment {
                vertex: start_dummy,
                edge_to_next: Some(Edge {
                    p: start_p,
                    n: start_n,
                }),
            });
            joined.frags.extend(next.frags);
        }
        Ok(joined)
    }

    /// The dummy matches the size of the real transistor next to it.
    fn add_dummy_mos(&mut self, ty: MosType, drain: NetId, dummy_net: NetId, like: MosId) -> MosId {
        let width = self.circuit.mos(like).width;
        let length = self.circuit.mos(like).length;
        self.circuit
            .add_mos("Dummy", ty, drain, dummy_net, dummy_net, dummy_net, width, length)
    }

    /// The diffusion walk of the path: outer free net, then the recorded
    /// edges (interleaved with gate nets when asked), then the outer free
    /// net of the tail. A single-vertex path spends one diffusion per side.
    fn net_walk(&self, path: &Path, include_gates: bool) -> Result<Vec<Edge>, PathfinderError> {
        let (head_p, head_n) = path.free_nets(0, &self.circuit);
        let start = Edge {
            p: *head_p.first().ok_or(PathfinderError::NoFreeNet)?,
            n: *head_n.first().ok_or(PathfinderError::NoFreeNet)?,
        };

        let mut walk = vec![start];
        for frag in &path.frags {
            if include_gates {
                walk.push(Edge {
                    p: self.circuit.mos(frag.vertex.p).gate,
                    n: self.circuit.mos(frag.vertex.n).gate,
                });
            }
            if let Some(edge) = frag.edge_to_next {
                walk.push(edge);
            }
        }

        let end = if path.len() == 1 {
            let (mut tail_p, mut tail_n) = path.free_nets(0, &self.circuit);
            remove_one(&mut tail_p, start.p);
            remove_one(&mut tail_n, start.n);
            Edge {
                p: *tail_p.first().ok_or(PathfinderError::NoFreeNet)?,
                n: *tail_n.first().ok_or(PathfinderError::NoFreeNet)?,
            }
        } else {
            let (tail_p, tail_n) = path.free_nets(path.len() - 1, &self.circuit);
            Edge {
                p: *tail_p.first().ok_or(PathfinderError::NoFreeNet)?,
                n: *tail_n.first().ok_or(PathfinderError::NoFreeNet)?,
            }
        };
        walk.push(end);
        Ok(walk)
    }
}

fn remove_one(list: &mut Vec<NetId>, net: NetId) {
    if let Some(k) = list.iter().position(|&x| x == net) {
        list.remove(k);
    }
}

/// Consecutive dummies surface at most once.
fn collapse_dummies(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if name == "Dummy" && out.last().is_some_and(|prev| prev == "Dummy") {
            continue;
        }
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const INVERTER: &str = "\
MP1 OUT IN VDD VDD pmos W=2 L=1
MN1 OUT IN GND GND nmos W=2 L=1
";

    const TWO_STAGE: &str = "\
MP1 OUT1 IN1 VDD VDD pmos W=2 L=1
MN1 OUT1 IN1 GND GND nmos W=2 L=1
MP2 OUT2 IN2 OUT1 VDD pmos W=2 L=1
MN2 OUT2 IN2 OUT1 GND nmos W=2 L=1
";

    const NAND2: &str = "\
MP1 OUT A VDD VDD pmos W=2 L=1
MN1 OUT A MID GND nmos W=2 L=1
MP2 OUT B VDD VDD pmos W=2 L=1
MN2 MID B GND GND nmos W=2 L=1
";

    const TWO_ISLANDS: &str = "\
MP1 O1 I1 V1 V1 pmos W=2 L=1
MN1 O1 I1 G1 G1 nmos W=2 L=1
MP2 O2 I2 V2 V2 pmos W=2 L=1
MN2 O2 I2 G2 G2 nmos W=2 L=1
";

    /// The consumption invariant: every fragment's funded edges fit inside
    /// its diffusion multiset, per side.
    fn assert_consumption_valid(outcome: &PathOutcome) {
        let path = &outcome.path;
        let circuit = &outcome.circuit;
        for idx in 0..path.len() {
            let v = path.frags[idx].vertex;
            let mut p: Vec<NetId> = circuit.mos(v.p).diffusions().to_vec();
            let mut n: Vec<NetId> = circuit.mos(v.n).diffusions().to_vec();
            let mut edges = Vec::new();
            if idx > 0 {
                edges.extend(path.frags[idx - 1].edge_to_next);
            }
            edges.extend(path.frags[idx].edge_to_next);
            for edge in edges {
                let kp = p.iter().position(|&x| x == edge.p);
                assert!(kp.is_some(), "fragment {} over-consumes its P track", idx);
                p.remove(kp.unwrap());
                let kn = n.iter().position(|&x| x == edge.n);
                assert!(kn.is_some(), "fragment {} over-consumes its N track", idx);
                n.remove(kn.unwrap());
            }
        }
    }

    #[test]
    fn a_single_inverter_is_a_free_path() {
        let outcome = find_path(parse(INVERTER).unwrap(), Some(1)).unwrap();
        assert_eq!(outcome.path.len(), 1);
        assert_eq!(outcome.hpwl, 0.0);
        assert_eq!(outcome.p_mos_names, vec!["MP1"]);
        assert_eq!(outcome.n_mos_names, vec!["MN1"]);
        // One diffusion flank each side of the gate.
        assert_eq!(outcome.p_net_names, vec!["OUT", "IN", "VDD"]);
        assert_eq!(outcome.n_net_names, vec!["OUT", "IN", "GND"]);
        assert_consumption_valid(&outcome);
    }

    #[test]
    fn a_two_stage_chain_shares_its_middle_diffusion() {
        for seed in 0..4 {
            let outcome = find_path(parse(TWO_STAGE).unwrap(), Some(seed)).unwrap();
            assert_eq!(outcome.path.len(), 2);
            assert_eq!(outcome.hpwl, 0.0);
            let forward = vec!["VDD", "IN1", "OUT1", "IN2", "OUT2"];
            let backward: Vec<&str> = forward.iter().rev().copied().collect();
            assert!(
                outcome.p_net_names == forward || outcome.p_net_names == backward,
                "unexpected walk {:?}",
                outcome.p_net_names
            );
            let edge = outcome.path.frags[0].edge_to_next.unwrap();
            assert_eq!(outcome.circuit.net(edge.p).name, "OUT1");
            assert_eq!(outcome.circuit.net(edge.n).name, "OUT1");
            assert_consumption_valid(&outcome);
        }
    }

    #[test]
    fn nand_cost_is_seed_independent() {
        for seed in 0..4 {
            let outcome = find_path(parse(NAND2).unwrap(), Some(seed)).unwrap();
            assert_eq!(outcome.path.len(), 2);
            // VDD spans the row one-sided (108 - 9), OUT crosses the
            // tracks over one slot (54 + 29 - 4.5).
            assert!((outcome.hpwl - 177.5).abs() < 1e-9, "hpwl {}", outcome.hpwl);
            assert_consumption_valid(&outcome);
        }
    }

    #[test]
    fn disjoint_subcircuits_are_spliced_with_one_dummy_pair() {
        let outcome = find_path(parse(TWO_ISLANDS).unwrap(), Some(2)).unwrap();
        // Two real vertices plus the two splice dummies.
        assert_eq!(outcome.path.len(), 4);
        assert_eq!(outcome.hpwl, 0.0);
        assert_eq!(outcome.p_mos_names.len(), 3);
        assert_eq!(outcome.p_mos_names[1], "Dummy");
        assert!(outcome.p_mos_names[0].starts_with("MP"));
        assert!(outcome.p_mos_names[2].starts_with("MP"));
        // The dummy run collapses to a single entry in the net walk too.
        assert_eq!(
            outcome
                .p_net_names
                .iter()
                .filter(|n| n.as_str() == "Dummy")
                .count(),
            1
        );
        assert_eq!(outcome.p_net_names.len(), 7);
        assert_consumption_valid(&outcome);
    }

    #[test]
    fn gate_groups_must_pair_up() {
        let lone = "MP1 OUT IN VDD VDD pmos W=2 L=1\n";
        assert!(matches!(
            find_path(parse(lone).unwrap(), Some(0)),
            Err(PathfinderError::UnpairedGate { p_count: 1, n_count: 0, .. })
        ));
    }

    #[test]
    fn every_vertex_appears_exactly_once() {
        let outcome = find_path(parse(NAND2).unwrap(), Some(9)).unwrap();
        let mut names: Vec<&str> = outcome
            .path
            .frags
            .iter()
            .map(|f| outcome.circuit.mos(f.vertex.p).name.as_str())
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["MP1", "MP2"]);
    }
}
