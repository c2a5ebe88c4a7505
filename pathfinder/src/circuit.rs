use pd_common::define_index;
use std::collections::HashMap;

define_index!(NetId);
define_index!(MosId);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MosType {
    P,
    N,
}

#[derive(Debug)]
pub struct Net {
    pub name: String,
    /// Back-references to the transistors on this net; the arena owns.
    pub mos: Vec<MosId>,
    /// Synthesised splice nets are excluded from the wire-length cost.
    pub is_dummy: bool,
}

#[derive(Debug)]
pub struct Mos {
    pub name: String,
    pub ty: MosType,
    pub drain: NetId,
    pub gate: NetId,
    pub source: NetId,
    pub substrate: NetId,
    pub width: f64,
    pub length: f64,
}

impl Mos {
    /// The nets that matter for sharing. Substrate is excluded: it is
    /// globally tied per type and plays no role in diffusion sharing.
    pub fn pins(&self) -> [NetId; 3] {
        [self.drain, self.gate, self.source]
    }

    pub fn diffusions(&self) -> [NetId; 2] {
        [self.drain, self.source]
    }
}

#[derive(Debug, Default)]
pub struct Circuit {
    pub nets: Vec<Net>,
    pub mos: Vec<Mos>,
    net_name_map: HashMap<String, NetId>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    pub fn mos(&self, id: MosId) -> &Mos {
        &self.mos[id.index()]
    }

    pub fn add_net(&mut self, name: &str) -> NetId {
        if let Some(&id) = self.net_name_map.get(name) {
            return id;
        }
        let id = NetId::new(self.nets.len());
        self.nets.push(Net {
            name: name.to_string(),
            mos: Vec::new(),
            is_dummy: false,
        });
        self.net_name_map.insert(name.to_string(), id);
        id
    }

    /// A fresh net gluing two path fragments. Never shared by name.
    pub fn add_dummy_net(&mut self) -> NetId {
        let id = NetId::new(self.nets.len());
        self.nets.push(Net {
            name: "Dummy".to_string(),
            mos: Vec::new(),
            is_dummy: true,
        });
        id
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_mos(
        &mut self,
        name: &str,
        ty: MosType,
        drain: NetId,
        gate: NetId,
        source: NetId,
        substrate: NetId,
        width: f64,
        length: f64,
    ) -> MosId {
        let id = MosId::new(self.mos.len());
        self.mos.push(Mos {
            name: name.to_string(),
            ty,
            drain,
            gate,
            source,
            substrate,
            width,
            length,
        });
        for net in [drain, gate, source, substrate] {
            let back = &mut self.nets[net.index()].mos;
            if !back.contains(&id) {
                back.push(id);
            }
        }
        id
    }

    /// Two MOS of the same type are neighbours iff they share a drain or
    /// source net, in any combination.
    pub fn diffusion_connected(&self, a: MosId, b: MosId) -> bool {
        let b_diff = self.mos(b).diffusions();
        self.mos(a)
            .diffusions()
            .iter()
            .any(|net| b_diff.contains(net))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nets_are_interned_and_back_referenced() {
        let mut c = Circuit::new();
        let out = c.add_net("OUT");
        let gnd = c.add_net("GND");
        assert_eq!(c.add_net("OUT"), out);

        let m = c.add_mos("MN1", MosType::N, out, gnd, gnd, gnd, 1.0, 1.0);
        // The MOS registers once per net even when pins repeat.
        assert_eq!(c.net(out).mos, vec![m]);
        assert_eq!(c.net(gnd).mos, vec![m]);
    }

    #[test]
    fn diffusion_sharing_ignores_gates() {
        let mut c = Circuit::new();
        let a = c.add_net("A");
        let mid = c.add_net("MID");
        let z = c.add_net("Z");
        let q = c.add_net("Q");
        let m1 = c.add_mos("M1", MosType::N, mid, a, z, z, 1.0, 1.0);
        // Shares only the gate net with m1.
        let m2 = c.add_mos("M2", MosType::N, q, mid, q, q, 1.0, 1.0);
        // Shares the MID diffusion with m1.
        let m3 = c.add_mos("M3", MosType::N, mid, z, q, q, 1.0, 1.0);
        assert!(!c.diffusion_connected(m1, m2));
        assert!(c.diffusion_connected(m1, m3));
    }
}
