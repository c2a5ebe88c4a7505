use pd_common::define_index;
use std::collections::HashMap;

define_index!(CellId);
define_index!(NetId);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockTag {
    A,
    B,
}

impl BlockTag {
    pub fn opposite(self) -> BlockTag {
        match self {
            BlockTag::A => BlockTag::B,
            BlockTag::B => BlockTag::A,
        }
    }
}

/// All cells have size 1.
#[derive(Debug)]
pub struct Cell {
    pub name: String,
    pub nets: Vec<NetId>,
    pub tag: BlockTag,
    pub locked: bool,
    pub gain: i32,
    // Intrusive links threading the cell through one gain-bucket list.
    pub prev: Option<CellId>,
    pub next: Option<CellId>,
}

impl Cell {
    /// Equivalent to the number of nets the cell touches.
    pub fn num_pins(&self) -> usize {
        self.nets.len()
    }

    pub fn is_free(&self) -> bool {
        !self.locked
    }
}

#[derive(Debug)]
pub struct Net {
    pub name: String,
    pub cells: Vec<CellId>,
    /// Distribution counters. Invariant: `in_a + in_b == cells.len()`.
    pub in_a: usize,
    pub in_b: usize,
}

impl Net {
    /// A net is cut iff it has at least one cell in each block.
    pub fn is_cut(&self) -> bool {
        self.in_a > 0 && self.in_b > 0
    }

    pub fn count_in(&self, tag: BlockTag) -> usize {
        match tag {
            BlockTag::A => self.in_a,
            BlockTag::B => self.in_b,
        }
    }
}

#[derive(Debug, Default)]
pub struct Netlist {
    pub cells: Vec<Cell>,
    pub nets: Vec<Net>,
    cell_name_map: HashMap<String, CellId>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    pub fn add_net(&mut self, name: String) -> NetId {
        let id = NetId::new(self.nets.len());
        self.nets.push(Net {
            name,
            cells: Vec::new(),
            in_a: 0,
            in_b: 0,
        });
        id
    }

    pub fn get_or_add_cell(&mut self, name: &str) -> CellId {
        if let Some(&id) = self.cell_name_map.get(name) {
            return id;
        }
        let id = CellId::new(self.cells.len());
        self.cells.push(Cell {
            name: name.to_string(),
            nets: Vec::new(),
            tag: BlockTag::A,
            locked: false,
            gain: 0,
            prev: None,
            next: None,
        });
        self.cell_name_map.insert(name.to_string(), id);
        id
    }

    /// Cross-links the cell and the net. The caller is responsible for not
    /// connecting the same pair twice.
    pub fn connect(&mut self, net: NetId, cell: CellId) {
        self.nets[net.index()].cells.push(cell);
        self.cells[cell.index()].nets.push(net);
    }

    /// Assigns the initial block of a cell and charges its nets'
    /// distribution counters. Intended to be called once per cell.
    pub fn set_block(&mut self, cell: CellId, tag: BlockTag) {
        self.cells[cell.index()].tag = tag;
        for k in 0..self.cells[cell.index()].nets.len() {
            let nid = self.cells[cell.index()].nets[k];
            let net = &mut self.nets[nid.index()];
            match tag {
                BlockTag::A => net.in_a += 1,
                BlockTag::B => net.in_b += 1,
            }
        }
    }

    /// Moves the cell to `tag`, updating the distribution of every net it
    /// touches. Does nothing when the cell is already there.
    pub fn move_to(&mut self, cell: CellId, tag: BlockTag) {
        let old = self.cells[cell.index()].tag;
        if old == tag {
            return;
        }
        for k in 0..self.cells[cell.index()].nets.len() {
            let nid = self.cells[cell.index()].nets[k];
            let net = &mut self.nets[nid.index()];
            match old {
                BlockTag::A => {
                    net.in_a -= 1;
                    net.in_b += 1;
                }
                BlockTag::B => {
                    net.in_b -= 1;
                    net.in_a += 1;
                }
            }
        }
        self.cells[cell.index()].tag = tag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_net_list() -> Netlist {
        let mut nl = Netlist::new();
        let n1 = nl.add_net("N1".to_string());
        let n2 = nl.add_net("N2".to_string());
        for name in ["c1", "c2", "c3"] {
            let c = nl.get_or_add_cell(name);
            nl.connect(n1, c);
        }
        for name in ["c2", "c4"] {
            let c = nl.get_or_add_cell(name);
            nl.connect(n2, c);
        }
        nl
    }

    #[test]
    fn distribution_tracks_moves() {
        let mut nl = two_net_list();
        for i in 0..nl.num_cells() {
            nl.set_block(CellId::new(i), BlockTag::A);
        }
        assert_eq!(nl.nets[0].in_a, 3);
        assert!(!nl.nets[0].is_cut());

        let c2 = nl.get_or_add_cell("c2");
        nl.move_to(c2, BlockTag::B);
        assert_eq!(nl.nets[0].in_a, 2);
        assert_eq!(nl.nets[0].in_b, 1);
        assert!(nl.nets[0].is_cut());
        assert!(nl.nets[1].is_cut());

        // Moving to the block the cell is in already is a no-op.
        nl.move_to(c2, BlockTag::B);
        assert_eq!(nl.nets[1].in_b, 1);

        for net in &nl.nets {
            assert_eq!(net.in_a + net.in_b, net.cells.len());
        }
    }
}
