use crate::bucket::Bucket;
use crate::netlist::{BlockTag, CellId, Netlist};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Record {
    gain: i32,
    cell: CellId,
    /// Whether the partition is balanced after this move.
    balanced: bool,
}

/// Two-way min-cut partitioner in the iterative-improvement style: per pass,
/// every cell moves exactly once in best-gain order, then the pass rolls
/// back to its best balanced prefix. Passes repeat until none improves.
pub struct FmPartitioner {
    balance_factor: f64,
    netlist: Netlist,
    size_a: usize,
    size_b: usize,
    bucket_a: Bucket,
    bucket_b: Bucket,
    pmax: usize,
    history: Vec<Record>,
    rng: StdRng,
}

impl FmPartitioner {
    pub fn new(balance_factor: f64, netlist: Netlist, seed: Option<u64>) -> Self {
        let pmax = netlist.cells.iter().map(|c| c.num_pins()).max().unwrap_or(0);
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            balance_factor,
            netlist,
            size_a: 0,
            size_b: 0,
            bucket_a: Bucket::new(pmax),
            bucket_b: Bucket::new(pmax),
            pmax,
            history: Vec::new(),
            rng,
        }
    }

    pub fn partition(&mut self) {
        self.init_partition();
        let mut pass = 0usize;
        loop {
            pass += 1;
            let cut_before = self.cut_size();
            self.calculate_gains();
            debug_assert_eq!(
                self.bucket_a.size() + self.bucket_b.size(),
                self.netlist.num_cells()
            );
            debug_assert_eq!(self.bucket_a.size(), self.size_a);

            self.run_pass();
            debug_assert_eq!(self.history.len(), self.netlist.num_cells());

            let best = self.best_balanced_prefix();
            let prefix_gain: i64 = match best {
                Some(i) => self.history[..=i].iter().map(|r| r.gain as i64).sum(),
                None => 0,
            };
            self.revert_moves_after(best);
            debug_assert_eq!(self.cut_size() as i64, cut_before as i64 - prefix_gain);

            self.history.clear();
            for cell in &mut self.netlist.cells {
                cell.locked = false;
            }

            log::debug!(
                "pass {}: gain {}, cut size {}, |A| = {}, |B| = {}",
                pass,
                prefix_gain,
                self.cut_size(),
                self.size_a,
                self.size_b
            );
            if best.is_none() {
                break;
            }
        }
    }

    /// Number of nets with cells in both blocks.
    pub fn cut_size(&self) -> usize {
        self.netlist.nets.iter().filter(|n| n.is_cut()).count()
    }

    pub fn cells_in(&self, tag: BlockTag) -> Vec<CellId> {
        (0..self.netlist.num_cells())
            .map(CellId::new)
            .filter(|c| self.netlist.cells[c.index()].tag == tag)
            .collect()
    }

    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Each cell lands in A or B by a fair coin. The result may violate
    /// balance; base-cell selection later steers it back.
    fn init_partition(&mut self) {
        for i in 0..self.netlist.num_cells() {
            let tag = if self.rng.gen::<bool>() {
                BlockTag::A
            } else {
                BlockTag::B
            };
            self.netlist.set_block(CellId::new(i), tag);
            match tag {
                BlockTag::A => self.size_a += 1,
                BlockTag::B => self.size_b += 1,
            }
        }
        log::debug!("initial |A| = {}, |B| = {}", self.size_a, self.size_b);
    }

    /// Rebuilds both buckets with fresh gains. O(total pin count).
    fn calculate_gains(&mut self) {
        self.bucket_a = Bucket::new(self.pmax);
        self.bucket_b = Bucket::new(self.pmax);
        for i in 0..self.netlist.num_cells() {
            let id = CellId::new(i);
            let tag = self.netlist.cells[i].tag;
            let mut gain = 0;
            for k in 0..self.netlist.cells[i].nets.len() {
                let nid = self.netlist.cells[i].nets[k];
                let net = &self.netlist.nets[nid.index()];
                if net.count_in(tag) == 1 {
                    gain += 1;
                }
                if net.count_in(tag.opposite()) == 0 {
                    gain -= 1;
                }
            }
            self.netlist.cells[i].gain = gain;
            match tag {
                BlockTag::A => self.bucket_a.add(id, &mut self.netlist.cells),
                BlockTag::B => self.bucket_b.add(id, &mut self.netlist.cells),
            }
        }
    }

    fn run_pass(&mut self) {
        while let Some(base) = self.choose_base_cell() {
            self.apply_move(base);
        }
    }

    /// The first cells at the max gain of each bucket, arbitrated by
    /// balance, then gain, then by which move evens the blocks out.
    fn choose_base_cell(&self) -> Option<CellId> {
        let high_a = self.bucket_a.first_max_gain_cell();
        let high_b = self.bucket_b.first_max_gain_cell();
        let (a, b) = match (high_a, high_b) {
            (None, None) => return None,
            (some, None) => return some,
            (None, some) => return some,
            (Some(a), Some(b)) => (a, b),
        };

        // A non-empty bucket implies at least one free cell in the block.
        let a_ok = self.is_balanced(self.size_a - 1);
        let b_ok = self.is_balanced(self.size_b - 1);
        // The initial partition may start outside the balance bounds; moving
        // out of the bigger block is the recovery direction.
        if !a_ok && !b_ok {
            return Some(if self.size_a > self.size_b { a } else { b });
        }
        if !a_ok {
            return Some(b);
        }
        if !b_ok {
            return Some(a);
        }

        let gain_a = self.netlist.cells[a.index()].gain;
        let gain_b = self.netlist.cells[b.index()].gain;
        if gain_a == gain_b {
            return Some(if self.size_a > self.size_b { a } else { b });
        }
        Some(if gain_a > gain_b { a } else { b })
    }

    /// Moves the base cell to the other block, with the critical-net gain
    /// sweeps before and after. O(pins of the cell's nets).
    fn apply_move(&mut self, base: CellId) {
        let from = self.netlist.cells[base.index()].tag;
        let to = from.opposite();
        let from_size = match from {
            BlockTag::A => self.size_a,
            BlockTag::B => self.size_b,
        };
        self.history.push(Record {
            gain: self.netlist.cells[base.index()].gain,
            cell: base,
            balanced: self.is_balanced(from_size - 1),
        });

        // Critical nets before the move.
        for k in 0..self.netlist.cells[base.index()].nets.len() {
            let nid = self.netlist.cells[base.index()].nets[k];
            let t = self.netlist.nets[nid.index()].count_in(to);
            if t == 0 {
                for j in 0..self.netlist.nets[nid.index()].cells.len() {
                    let nb = self.netlist.nets[nid.index()].cells[j];
                    if self.netlist.cells[nb.index()].is_free() {
                        self.nudge_gain(nb, 1);
                    }
                }
            } else if t == 1 {
                for j in 0..self.netlist.nets[nid.index()].cells.len() {
                    let nb = self.netlist.nets[nid.index()].cells[j];
                    if self.netlist.cells[nb.index()].tag == to
                        && self.netlist.cells[nb.index()].is_free()
                    {
                        self.nudge_gain(nb, -1);
                        // There is only one cell on the To side.
                        break;
                    }
                }
            }
        }

        match from {
            BlockTag::A => {
                self.bucket_a.remove(base, &mut self.netlist.cells);
                self.size_a -= 1;
                self.size_b += 1;
            }
            BlockTag::B => {
                self.bucket_b.remove(base, &mut self.netlist.cells);
                self.size_b -= 1;
                self.size_a += 1;
            }
        }
        self.netlist.move_to(base, to);
        self.netlist.cells[base.index()].locked = true;

        // Critical nets after the move. The old From side is now the
        // opposite of the cell's new block.
        for k in 0..self.netlist.cells[base.index()].nets.len() {
            let nid = self.netlist.cells[base.index()].nets[k];
            let f = self.netlist.nets[nid.index()].count_in(from);
            if f == 0 {
                for j in 0..self.netlist.nets[nid.index()].cells.len() {
                    let nb = self.netlist.nets[nid.index()].cells[j];
                    if self.netlist.cells[nb.index()].is_free() {
                        self.nudge_gain(nb, -1);
                    }
                }
            } else if f == 1 {
                for j in 0..self.netlist.nets[nid.index()].cells.len() {
                    let nb = self.netlist.nets[nid.index()].cells[j];
                    if self.netlist.cells[nb.index()].tag == from
                        && self.netlist.cells[nb.index()].is_free()
                    {
                        self.nudge_gain(nb, 1);
                        break;
                    }
                }
            }
        }
    }

    /// Re-slots the cell in its bucket at `gain + delta`.
    fn nudge_gain(&mut self, id: CellId, delta: i32) {
        let gain = self.netlist.cells[id.index()].gain + delta;
        match self.netlist.cells[id.index()].tag {
            BlockTag::A => {
                self.bucket_a.remove(id, &mut self.netlist.cells);
                self.netlist.cells[id.index()].gain = gain;
                self.bucket_a.add(id, &mut self.netlist.cells);
            }
            BlockTag::B => {
                self.bucket_b.remove(id, &mut self.netlist.cells);
                self.netlist.cells[id.index()].gain = gain;
                self.bucket_b.add(id, &mut self.netlist.cells);
            }
        }
    }

    /// Index of the last move of the best positive balanced prefix, if any.
    fn best_balanced_prefix(&self) -> Option<usize> {
        let mut curr = 0;
        let mut best = 0;
        let mut best_idx = None;
        for (i, rec) in self.history.iter().enumerate() {
            curr += rec.gain;
            if curr > best && rec.balanced {
                best = curr;
                best_idx = Some(i);
            }
        }
        best_idx
    }

    /// Flips back every move after the chosen prefix. Buckets are rebuilt at
    /// the start of the next pass, so only tags, block sizes and net
    /// distributions are restored here.
    fn revert_moves_after(&mut self, best: Option<usize>) {
        let start = best.map_or(0, |i| i + 1);
        for i in start..self.history.len() {
            let cell = self.history[i].cell;
            let back = self.netlist.cells[cell.index()].tag.opposite();
            self.netlist.move_to(cell, back);
            match back {
                BlockTag::A => {
                    self.size_a += 1;
                    self.size_b -= 1;
                }
                BlockTag::B => {
                    self.size_b += 1;
                    self.size_a -= 1;
                }
            }
        }
    }

    /// Ceil/floor closed bounds. Checking one block is enough because
    /// `n - floor((0.5 + r/2) n) == ceil((0.5 - r/2) n)`.
    fn is_balanced(&self, block_size: usize) -> bool {
        let n = self.netlist.num_cells() as f64;
        let lb = ((0.5 - self.balance_factor / 2.0) * n).ceil();
        let ub = ((0.5 + self.balance_factor / 2.0) * n).floor();
        lb <= block_size as f64 && block_size as f64 <= ub
    }
}
