use crate::circuit::{Circuit, MosId, NetId};

/// A paired PMOS/NMOS; one vertex of the pairing graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vertex {
    pub p: MosId,
    pub n: MosId,
}

/// The diffusion nets shared between two adjacent vertices, one per side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub p: NetId,
    pub n: NetId,
}

/// One path element: a vertex plus the edge consumed toward its successor.
/// The edge toward the predecessor lives on the previous fragment.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    pub vertex: Vertex,
    pub edge_to_next: Option<Edge>,
}

/// A sequence of fragments. Along the path no net is consumed more times
/// than it appears on a transistor's diffusion pins; the free-net
/// accounting below enforces that.
#[derive(Clone, Debug, Default)]
pub struct Path {
    pub frags: Vec<Fragment>,
}

impl Path {
    pub fn single(vertex: Vertex) -> Self {
        Self {
            frags: vec![Fragment {
                vertex,
                edge_to_next: None,
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.frags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frags.is_empty()
    }

    pub fn head(&self) -> &Fragment {
        &self.frags[0]
    }

    pub fn tail(&self) -> &Fragment {
        &self.frags[self.frags.len() - 1]
    }

    /// The unconsumed diffusion multisets of fragment `idx`, per side. The
    /// pin multiset is drain + source (the gate is spoken for by the poly
    /// column); each funded edge removes one instance.
    pub fn free_nets(&self, idx: usize, circuit: &Circuit) -> (Vec<NetId>, Vec<NetId>) {
        let v = self.frags[idx].vertex;
        let mut p: Vec<NetId> = circuit.mos(v.p).diffusions().to_vec();
        let mut n: Vec<NetId> = circuit.mos(v.n).diffusions().to_vec();
        if idx > 0 {
            if let Some(edge) = self.frags[idx - 1].edge_to_next {
                consume(&mut p, edge.p);
                consume(&mut n, edge.n);
            }
        }
        if let Some(edge) = self.frags[idx].edge_to_next {
            consume(&mut p, edge.p);
            consume(&mut n, edge.n);
        }
        (p, n)
    }

    /// Appends `v` after the tail if a free diffusion shared with `v`
    /// remains on both sides; that net funds the new edge.
    pub fn try_attach_tail(&mut self, v: Vertex, circuit: &Circuit) -> bool {
        if self.frags.is_empty() {
            self.frags.push(Fragment {
                vertex: v,
                edge_to_next: None,
            });
            return true;
        }
        let last = self.frags.len() - 1;
        let (free_p, free_n) = self.free_nets(last, circuit);
        let edge_p = shared_net(&free_p, circuit.mos(v.p).diffusions());
        let edge_n = shared_net(&free_n, circuit.mos(v.n).diffusions());
        match (edge_p, edge_n) {
            (Some(p), Some(n)) => {
                self.frags[last].edge_to_next = Some(Edge { p, n });
                self.frags.push(Fragment {
                    vertex: v,
                    edge_to_next: None,
                });
                true
            }
            _ => false,
        }
    }

    /// The head-side counterpart of `try_attach_tail`.
    pub fn try_attach_head(&mut self, v: Vertex, circuit: &Circuit) -> bool {
        if self.frags.is_empty() {
            self.frags.push(Fragment {
                vertex: v,
                edge_to_next: None,
            });
            return true;
        }
        let (free_p, free_n) = self.free_nets(0, circuit);
        let edge_p = shared_net(&free_p, circuit.mos(v.p).diffusions());
        let edge_n = shared_net(&free_n, circuit.mos(v.n).diffusions());
        match (edge_p, edge_n) {
            (Some(p), Some(n)) => {
                self.frags.insert(
                    0,
                    Fragment {
                        vertex: v,
                        edge_to_next: Some(Edge { p, n }),
                    },
                );
                true
            }
            _ => false,
        }
    }

    /// The family of Pósa transformations: for each interior vertex
    /// adjacent to the head, the prefix up to it reverses so its
    /// predecessor becomes the new head; symmetrically for the tail. A
    /// candidate that cannot fund its junction edge is dropped.
    pub fn rotations<F>(&self, is_neighbor: F, circuit: &Circuit) -> Vec<Path>
    where
        F: Fn(Vertex, Vertex) -> bool,
    {
        let len = self.frags.len();
        if len <= 2 {
            return Vec::new();
        }
        let mut rotated = Vec::new();
        let head = self.frags[0].vertex;
        for i in 2..len {
            if is_neighbor(head, self.frags[i].vertex) {
                if let Some(path) = self.rotate_at_head(i, circuit) {
                    rotated.push(path);
                }
            }
        }
        let tail = self.frags[len - 1].vertex;
        for i in 0..len - 2 {
            if is_neighbor(tail, self.frags[i].vertex) {
                if let Some(path) = self.rotate_at_tail(i, circuit) {
                    rotated.push(path);
                }
            }
        }
        rotated
    }

    /// Reverses `[0, i)`; the old head then funds a fresh edge to `frags[i]`.
    fn rotate_at_head(&self, i: usize, circuit: &Circuit) -> Option<Path> {
        let mut frags = Vec::with_capacity(self.frags.len());
        for j in (0..i).rev() {
            let edge_to_next = if j > 0 {
                self.frags[j - 1].edge_to_next
            } else {
                None
            };
            frags.push(Fragment {
                vertex: self.frags[j].vertex,
                edge_to_next,
            });
        }
        frags.extend_from_slice(&self.frags[i..]);
        let mut path = Path { frags };
        path.fund_edge(i - 1, circuit)?;
        Some(path)
    }

    /// Reverses `(i, len)`; the old tail then hangs right after `frags[i]`.
    fn rotate_at_tail(&self, i: usize, circuit: &Circuit) -> Option<Path> {
        let len = self.frags.len();
        let mut frags = self.frags[..=i].to_vec();
        frags[i].edge_to_next = None;
        for j in (i + 1..len).rev() {
            let edge_to_next = if j > i + 1 {
                self.frags[j - 1].edge_to_next
            } else {
                None
            };
            frags.push(Fragment {
                vertex: self.frags[j].vertex,
                edge_to_next,
            });
        }
        let mut path = Path { frags };
        path.fund_edge(i, circuit)?;
        Some(path)
    }

    /// Picks the first diffusion net free on both fragments around the gap
    /// at `idx` and records it as their edge.
    fn fund_edge(&mut self, idx: usize, circuit: &Circuit) -> Option<()> {
        debug_assert!(self.frags[idx].edge_to_next.is_none());
        let (left_p, left_n) = self.free_nets(idx, circuit);
        let (right_p, right_n) = self.free_nets(idx + 1, circuit);
        let p = left_p.iter().copied().find(|x| right_p.contains(x))?;
        let n = left_n.iter().copied().find(|x| right_n.contains(x))?;
        self.frags[idx].edge_to_next = Some(Edge { p, n });
        Some(())
    }
}

fn consume(list: &mut Vec<NetId>, net: NetId) {
    if let Some(k) = list.iter().position(|&x| x == net) {
        list.remove(k);
    }
}

fn shared_net(free: &[NetId], candidates: [NetId; 2]) -> Option<NetId> {
    free.iter().copied().find(|x| candidates.contains(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, MosType};

    /// Three stages sharing their output diffusions: stage k's source is
    /// stage k-1's drain on both tracks. The pairing graph is the path
    /// v0 - v1 - v2.
    fn chain() -> (Circuit, Vec<Vertex>) {
        let mut c = Circuit::new();
        let vdd = c.add_net("VDD");
        let gnd = c.add_net("GND");
        let mut vertices = Vec::new();
        let mut p_prev = vdd;
        let mut n_prev = gnd;
        for stage in 1..=3 {
            let gate = c.add_net(&format!("IN{}", stage));
            let out = c.add_net(&format!("OUT{}", stage));
            let p = c.add_mos(
                &format!("MP{}", stage),
                MosType::P,
                out,
                gate,
                p_prev,
                vdd,
                2.0,
                1.0,
            );
            let n = c.add_mos(
                &format!("MN{}", stage),
                MosType::N,
                out,
                gate,
                n_prev,
                gnd,
                2.0,
                1.0,
            );
            vertices.push(Vertex { p, n });
            p_prev = out;
            n_prev = out;
        }
        (c, vertices)
    }

    /// Three vertices whose diffusions form a triangle on both tracks:
    /// vertex k spans nets k and k+1 (mod 3).
    fn triangle() -> (Circuit, Vec<Vertex>) {
        let mut c = Circuit::new();
        let p_nets = [c.add_net("P0"), c.add_net("P1"), c.add_net("P2")];
        let n_nets = [c.add_net("N0"), c.add_net("N1"), c.add_net("N2")];
        let vdd = c.add_net("VDD");
        let gnd = c.add_net("GND");
        let mut vertices = Vec::new();
        for k in 0..3 {
            let gate = c.add_net(&format!("G{}", k));
            let p = c.add_mos(
                &format!("MP{}", k),
                MosType::P,
                p_nets[k],
                gate,
                p_nets[(k + 1) % 3],
                vdd,
                2.0,
                1.0,
            );
            let n = c.add_mos(
                &format!("MN{}", k),
                MosType::N,
                n_nets[k],
                gate,
                n_nets[(k + 1) % 3],
                gnd,
                2.0,
                1.0,
            );
            vertices.push(Vertex { p, n });
        }
        (c, vertices)
    }

    #[test]
    fn attachment_consumes_the_shared_diffusion() {
        let (c, v) = chain();
        let mut path = Path::single(v[0]);
        assert!(path.try_attach_tail(v[1], &c));
        let edge = path.frags[0].edge_to_next.unwrap();
        // Stages 1 and 2 share OUT1 on both tracks.
        assert_eq!(c.net(edge.p).name, "OUT1");
        assert_eq!(c.net(edge.n).name, "OUT1");

        // OUT1 is spent on both fragments now.
        let (free_p, _) = path.free_nets(0, &c);
        assert_eq!(free_p, vec![c.mos(v[0].p).source]);
        let (free_p, free_n) = path.free_nets(1, &c);
        assert!(!free_p.contains(&edge.p));
        assert!(!free_n.contains(&edge.n));
    }

    #[test]
    fn attachment_fails_once_the_shared_diffusion_is_spent() {
        let (c, v) = chain();
        let mut path = Path::single(v[0]);
        assert!(path.try_attach_tail(v[1], &c));
        // v0 and v1 share only OUT1 and it already funds the interior
        // edge, so attaching v1 a second time over it is refused.
        let mut again = path.clone();
        assert!(!again.try_attach_head(v[1], &c));
    }

    #[test]
    fn rotations_reverse_a_segment_and_fund_the_junction() {
        let (c, v) = triangle();
        let mut path = Path::single(v[0]);
        assert!(path.try_attach_tail(v[1], &c));
        assert!(path.try_attach_tail(v[2], &c));

        let neighbor = |a: Vertex, b: Vertex| c.diffusion_connected(a.p, b.p);
        let rotated = path.rotations(neighbor, &c);
        // One head-side and one tail-side transformation.
        assert_eq!(rotated.len(), 2);

        let r = &rotated[0];
        let order: Vec<Vertex> = r.frags.iter().map(|f| f.vertex).collect();
        assert_eq!(order, vec![v[1], v[0], v[2]]);
        // The old interior edge survives reversed; the junction is fresh
        // and drawn from the one diffusion v0 still has free.
        assert_eq!(r.frags[0].edge_to_next, path.frags[0].edge_to_next);
        let junction = r.frags[1].edge_to_next.unwrap();
        assert_eq!(c.net(junction.p).name, "P0");
        assert_eq!(c.net(junction.n).name, "N0");
    }

    #[test]
    fn rotations_skip_immediate_neighbours_and_short_paths() {
        let (c, v) = chain();
        let mut path = Path::single(v[0]);
        assert!(path.try_attach_tail(v[1], &c));
        assert!(path.rotations(|_, _| true, &c).is_empty());
    }
}
