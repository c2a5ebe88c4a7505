use crate::block::{AspectRatio, Block, BlockId};
use crate::error::FloorplanError;
use pd_common::define_index;
use pd_common::geom::point::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

define_index!(NodeId);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cut {
    H,
    V,
}

impl Cut {
    pub fn invert(self) -> Cut {
        match self {
            Cut::H => Cut::V,
            Cut::V => Cut::H,
        }
    }
}

/// One slot of the polish expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entry {
    Block(BlockId),
    Cut(Cut),
}

impl Entry {
    fn is_block(&self) -> bool {
        matches!(self, Entry::Block(_))
    }

    fn is_cut(&self) -> bool {
        matches!(self, Entry::Cut(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeKind {
    Leaf(BlockId),
    Cut(Cut),
}

/// Tree node in the arena. `parent` is a back-reference; the arena owns.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    width: u64,
    height: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// What it takes to invert the last perturbation.
#[derive(Debug)]
enum MoveRecord {
    /// Adjacent block entries at `at`/`at + 1`; the same swap undoes it.
    SwapBlocks { at: usize },
    /// Maximal cut chain `[lo, hi)` inverted; inverting again undoes it.
    InvertChain { lo: usize, hi: usize },
    /// The cut at `at` moved rightward past the block at `at + 1`.
    SwapCutBlock {
        at: usize,
        cut: NodeId,
        block: NodeId,
        /// The cut's former left child, promoted into the cut's old slot.
        left: NodeId,
        cut_parent: NodeId,
        cut_side: Side,
        block_parent: NodeId,
        block_side: Side,
    },
}

/// Uniform-samplable set of expression positions where a cut is immediately
/// followed by a block. Membership only changes under the cut/block swap.
#[derive(Debug, Default)]
struct AdjacencyIndex {
    positions: Vec<usize>,
    slot: Vec<Option<usize>>,
}

impl AdjacencyIndex {
    fn build(expr: &[Entry]) -> Self {
        let mut index = Self {
            positions: Vec::new(),
            slot: vec![None; expr.len()],
        };
        for p in 0..expr.len() {
            index.recheck(p, expr);
        }
        index
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    fn sample(&self, rng: &mut StdRng) -> usize {
        self.positions[rng.gen_range(0..self.positions.len())]
    }

    fn recheck(&mut self, p: usize, expr: &[Entry]) {
        let belongs = p + 1 < expr.len() && expr[p].is_cut() && expr[p + 1].is_block();
        match (belongs, self.slot[p]) {
            (true, None) => {
                self.slot[p] = Some(self.positions.len());
                self.positions.push(p);
            }
            (false, Some(k)) => {
                self.positions.swap_remove(k);
                self.slot[p] = None;
                if let Some(&moved) = self.positions.get(k) {
                    self.slot[moved] = Some(k);
                }
            }
            _ => {}
        }
    }

    fn refresh_around(&mut self, at: usize, expr: &[Entry]) {
        for p in at.saturating_sub(1)..=at + 1 {
            if p < expr.len() {
                self.recheck(p, expr);
            }
        }
    }
}

/// The floorplan state: a polish expression and its slicing tree kept in
/// lock-step. Every expression slot points at its tree node, so each of the
/// three perturbations patches the tree locally instead of rebuilding it.
pub struct SlicingTree {
    blocks: Vec<Block>,
    expr: Vec<Entry>,
    expr_node: Vec<NodeId>,
    nodes: Vec<Node>,
    root: NodeId,
    adjacency: AdjacencyIndex,
    last_move: Option<MoveRecord>,
    rng: StdRng,
}

impl SlicingTree {
    pub fn new(blocks: Vec<Block>, seed: Option<u64>) -> Result<Self, FloorplanError> {
        if blocks.len() < 2 {
            return Err(FloorplanError::TooFewBlocks { got: blocks.len() });
        }
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        // b0 b1 C1 b2 C2 ... b_{n-1} C_{n-1}, cuts drawn uniformly. This
        // shape trivially satisfies the balloting property.
        let n = blocks.len();
        let mut expr = Vec::with_capacity(2 * n - 1);
        expr.push(Entry::Block(BlockId::new(0)));
        for i in 1..n {
            expr.push(Entry::Block(BlockId::new(i)));
            let cut = if rng.gen::<bool>() { Cut::H } else { Cut::V };
            expr.push(Entry::Cut(cut));
        }

        let mut tree = Self {
            blocks,
            expr,
            expr_node: Vec::new(),
            nodes: Vec::new(),
            root: NodeId::new(0),
            adjacency: AdjacencyIndex::default(),
            last_move: None,
            rng,
        };
        tree.rebuild_tree();
        tree.adjacency = AdjacencyIndex::build(&tree.expr);
        Ok(tree)
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn width(&self) -> u64 {
        self.nodes[self.root.index()].width
    }

    pub fn height(&self) -> u64 {
        self.nodes[self.root.index()].height
    }

    pub fn area(&self) -> u64 {
        self.width() * self.height()
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width() as f64 / self.height() as f64
    }

    pub fn satisfies(&self, constraint: &AspectRatio) -> bool {
        let r = self.aspect_ratio();
        constraint.lower < r && r < constraint.upper
    }

    /// Applies one random move; `restore` undoes exactly this move.
    pub fn perturb(&mut self) {
        loop {
            match self.rng.gen_range(1..=3) {
                1 => {
                    self.swap_adjacent_blocks();
                    break;
                }
                2 => {
                    self.invert_random_chain();
                    break;
                }
                3 => {
                    if self.swap_random_cut_block() {
                        break;
                    }
                }
                _ => unreachable!(),
            }
        }
    }

    /// Undoes the latest perturbation. Must not be called twice in a row.
    pub fn restore(&mut self) {
        let record = self
            .last_move
            .take()
            .expect("no perturbation left to restore");
        match record {
            MoveRecord::SwapBlocks { at } => self.apply_swap_blocks(at),
            MoveRecord::InvertChain { lo, hi } => self.apply_invert_chain(lo, hi),
            MoveRecord::SwapCutBlock {
                at,
                cut,
                block,
                left,
                cut_parent,
                cut_side,
                block_parent,
                block_side,
            } => {
                let right = self.nodes[cut.index()].left.expect("cut lost its child");
                self.set_child(cut_parent, cut_side, cut);
                self.set_child(block_parent, block_side, block);
                self.nodes[cut.index()].left = Some(left);
                self.nodes[left.index()].parent = Some(cut);
                self.nodes[cut.index()].right = Some(right);
                self.nodes[right.index()].parent = Some(cut);
                self.expr.swap(at, at + 1);
                self.expr_node.swap(at, at + 1);
                // The block's side first: the cut's chain passes through the
                // re-hung subtree's root and must see fresh sizes there.
                self.refresh_up(block);
                self.refresh_up(cut);
                self.adjacency.refresh_around(at, &self.expr);
            }
        }
    }

    /// A copy of the expression, sufficient to rebuild the whole tree.
    pub fn snapshot(&self) -> Vec<Entry> {
        self.expr.clone()
    }

    pub fn rebuild_from(&mut self, snapshot: &[Entry]) {
        self.expr = snapshot.to_vec();
        self.rebuild_tree();
        self.adjacency = AdjacencyIndex::build(&self.expr);
        self.last_move = None;
    }

    /// Bottom-left coordinates per block: the left subtree sits at the
    /// origin, the right subtree above it (H) or to its right (V).
    pub fn place(&self) -> Vec<Point> {
        let mut coords = vec![Point::default(); self.blocks.len()];
        self.assign(self.root, 0, 0, &mut coords);
        coords
    }

    fn assign(&self, n: NodeId, x: u64, y: u64, out: &mut [Point]) {
        let node = &self.nodes[n.index()];
        match node.kind {
            NodeKind::Leaf(b) => out[b.index()] = Point::new(x, y),
            NodeKind::Cut(cut) => {
                let left = node.left.expect("cut without left child");
                let right = node.right.expect("cut without right child");
                self.assign(left, x, y, out);
                match cut {
                    Cut::H => self.assign(right, x, y + self.nodes[left.index()].height, out),
                    Cut::V => self.assign(right, x + self.nodes[left.index()].width, y, out),
                }
            }
        }
    }

    /// Stack-parses the expression into a fresh node arena.
    fn rebuild_tree(&mut self) {
        self.nodes.clear();
        self.expr_node = Vec::with_capacity(self.expr.len());
        let mut stack: Vec<NodeId> = Vec::new();
        for i in 0..self.expr.len() {
            let entry = self.expr[i];
            let id = NodeId::new(self.nodes.len());
            match entry {
                Entry::Block(b) => {
                    self.nodes.push(Node {
                        kind: NodeKind::Leaf(b),
                        parent: None,
                        left: None,
                        right: None,
                        width: self.blocks[b.index()].width,
                        height: self.blocks[b.index()].height,
                    });
                }
                Entry::Cut(cut) => {
                    let right = stack.pop().expect("expression violates balloting");
                    let left = stack.pop().expect("expression violates balloting");
                    self.nodes.push(Node {
                        kind: NodeKind::Cut(cut),
                        parent: None,
                        left: Some(left),
                        right: Some(right),
                        width: 0,
                        height: 0,
                    });
                    self.nodes[left.index()].parent = Some(id);
                    self.nodes[right.index()].parent = Some(id);
                    self.recompute_size(id);
                }
            }
            self.expr_node.push(id);
            stack.push(id);
        }
        self.root = stack.pop().expect("empty expression");
        debug_assert!(stack.is_empty(), "expression is not a full tree");
    }

    // -- moves ------------------------------------------------------------

    fn swap_adjacent_blocks(&mut self) {
        // Positions 0 and 1 are always blocks, so the draw terminates.
        let at = loop {
            let i = self.random_block_position();
            if i + 1 < self.expr.len() && self.expr[i + 1].is_block() {
                break i;
            }
        };
        self.apply_swap_blocks(at);
        self.last_move = Some(MoveRecord::SwapBlocks { at });
    }

    fn apply_swap_blocks(&mut self, at: usize) {
        let x = self.expr_node[at];
        let y = self.expr_node[at + 1];
        let px = self.nodes[x.index()].parent.expect("leaf without parent");
        let py = self.nodes[y.index()].parent.expect("leaf without parent");
        let sx = self.side_of(px, x);
        let sy = self.side_of(py, y);
        // The two leaves trade tree slots along with expression slots.
        self.set_child(px, sx, y);
        self.set_child(py, sy, x);
        self.expr.swap(at, at + 1);
        self.expr_node.swap(at, at + 1);
        self.refresh_up(px);
        self.refresh_up(py);
    }

    fn invert_random_chain(&mut self) {
        let at = self.random_cut_position();
        let mut lo = at;
        while lo > 0 && self.expr[lo - 1].is_cut() {
            lo -= 1;
        }
        let mut hi = at + 1;
        while hi < self.expr.len() && self.expr[hi].is_cut() {
            hi += 1;
        }
        self.apply_invert_chain(lo, hi);
        self.last_move = Some(MoveRecord::InvertChain { lo, hi });
    }

    fn apply_invert_chain(&mut self, lo: usize, hi: usize) {
        for i in lo..hi {
            let Entry::Cut(cut) = self.expr[i] else {
                unreachable!("chain contains a block entry");
            };
            self.expr[i] = Entry::Cut(cut.invert());
            let node = self.expr_node[i];
            self.nodes[node.index()].kind = NodeKind::Cut(cut.invert());
        }
        for i in lo..hi {
            self.refresh_up(self.expr_node[i]);
        }
    }

    fn swap_random_cut_block(&mut self) -> bool {
        if self.adjacency.len() == 0 {
            return false;
        }
        // A few uniform draws from the index; the full scan is the fallback
        // when every draw would put two identical cuts side by side.
        let mut at = None;
        for _ in 0..8 {
            let p = self.adjacency.sample(&mut self.rng);
            if self.swap_keeps_cuts_alternating(p) {
                at = Some(p);
                break;
            }
        }
        let at = match at {
            Some(p) => p,
            None => {
                let candidates: Vec<usize> = self
                    .adjacency
                    .positions
                    .iter()
                    .copied()
                    .filter(|&p| self.swap_keeps_cuts_alternating(p))
                    .collect();
                if candidates.is_empty() {
                    return false;
                }
                candidates[self.rng.gen_range(0..candidates.len())]
            }
        };
        self.apply_swap_cut_block(at);
        true
    }

    /// After the swap the cut lands in front of `expr[at + 2]`; refuse the
    /// move when that is the identical cut symbol.
    fn swap_keeps_cuts_alternating(&self, at: usize) -> bool {
        let Entry::Cut(cut) = self.expr[at] else {
            return false;
        };
        !matches!(self.expr.get(at + 2), Some(Entry::Cut(next)) if *next == cut)
    }

    /// Moving a cut rightward past a block keeps the balloting property:
    /// every prefix only gains block weight. In the tree the cut's left
    /// child promotes into the cut's slot, the cut re-hangs where the block
    /// was, and the block becomes the cut's right child.
    fn apply_swap_cut_block(&mut self, at: usize) {
        let cut = self.expr_node[at];
        let block = self.expr_node[at + 1];
        let left = self.nodes[cut.index()].left.expect("cut without left child");
        let right = self.nodes[cut.index()]
            .right
            .expect("cut without right child");
        let cut_parent = self.nodes[cut.index()].parent.expect("cut is the root");
        let cut_side = self.side_of(cut_parent, cut);
        let block_parent = self.nodes[block.index()].parent.expect("block is the root");
        let block_side = self.side_of(block_parent, block);

        self.set_child(cut_parent, cut_side, left);
        self.set_child(block_parent, block_side, cut);
        self.nodes[cut.index()].left = Some(right);
        self.nodes[right.index()].parent = Some(cut);
        self.nodes[cut.index()].right = Some(block);
        self.nodes[block.index()].parent = Some(cut);

        self.expr.swap(at, at + 1);
        self.expr_node.swap(at, at + 1);
        self.refresh_up(cut);
        self.adjacency.refresh_around(at, &self.expr);

        self.last_move = Some(MoveRecord::SwapCutBlock {
            at,
            cut,
            block,
            left,
            cut_parent,
            cut_side,
            block_parent,
            block_side,
        });
    }

    // -- plumbing ---------------------------------------------------------

    fn random_block_position(&mut self) -> usize {
        loop {
            let i = self.rng.gen_range(0..self.expr.len());
            if self.expr[i].is_block() {
                return i;
            }
        }
    }

    fn random_cut_position(&mut self) -> usize {
        loop {
            let i = self.rng.gen_range(0..self.expr.len());
            if self.expr[i].is_cut() {
                return i;
            }
        }
    }

    fn side_of(&self, parent: NodeId, child: NodeId) -> Side {
        if self.nodes[parent.index()].left == Some(child) {
            Side::Left
        } else {
            debug_assert_eq!(self.nodes[parent.index()].right, Some(child));
            Side::Right
        }
    }

    fn set_child(&mut self, parent: NodeId, side: Side, child: NodeId) {
        match side {
            Side::Left => self.nodes[parent.index()].left = Some(child),
            Side::Right => self.nodes[parent.index()].right = Some(child),
        }
        self.nodes[child.index()].parent = Some(parent);
    }

    fn recompute_size(&mut self, id: NodeId) {
        let node = &self.nodes[id.index()];
        let (width, height) = match node.kind {
            NodeKind::Leaf(b) => (self.blocks[b.index()].width, self.blocks[b.index()].height),
            NodeKind::Cut(cut) => {
                let l = &self.nodes[node.left.expect("cut without left child").index()];
                let r = &self.nodes[node.right.expect("cut without right child").index()];
                match cut {
                    Cut::H => (l.width.max(r.width), l.height + r.height),
                    Cut::V => (l.width + r.width, l.height.max(r.height)),
                }
            }
        };
        self.nodes[id.index()].width = width;
        self.nodes[id.index()].height = height;
    }

    /// Recomputes a node and every ancestor up to the root.
    fn refresh_up(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(n) = current {
            self.recompute_size(n);
            current = self.nodes[n.index()].parent;
        }
    }
}
