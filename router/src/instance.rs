use pd_common::geom::interval::Interval;

/// Net id 0 marks an empty pin slot.
pub const EMPTY_SLOT: u32 = 0;

/// A channel routing problem: one net id per column on each side, plus the
/// stacked rectilinear boundaries. Boundary index is the distance from the
/// channel, innermost first:
///
/// ```text
/// T2 -----------
/// T1 -----------
/// T0 -----------
///   (the channel)
/// B0 -----------
/// B1 -----------
/// ```
#[derive(Clone, Debug, Default)]
pub struct Instance {
    pub top_boundaries: Vec<Vec<Interval>>,
    pub bottom_boundaries: Vec<Vec<Interval>>,
    pub top_net_ids: Vec<u32>,
    pub bottom_net_ids: Vec<u32>,
}

impl Instance {
    pub fn num_columns(&self) -> usize {
        self.top_net_ids.len()
    }

    /// Ids are positive and consecutive, so the largest id is the count.
    pub fn num_nets(&self) -> u32 {
        self.top_net_ids
            .iter()
            .chain(self.bottom_net_ids.iter())
            .copied()
            .max()
            .unwrap_or(EMPTY_SLOT)
    }
}
