//! Basic blocks: predecessor/successor edges plus the two intrusive
//! instruction segments (phis, then everything else) merged into one
//! conceptual stream.

use crate::entity::{BlockId, InstId};

#[derive(Clone, Debug)]
pub struct BasicBlock {
    pub id: BlockId,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
    first_phi: Option<InstId>,
    last_phi: Option<InstId>,
    first_inst: Option<InstId>,
    last_inst: Option<InstId>,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        BasicBlock {
            id,
            preds: Vec::new(),
            succs: Vec::new(),
            first_phi: None,
            last_phi: None,
            first_inst: None,
            last_inst: None,
        }
    }

    pub fn first_phi(&self) -> Option<InstId> {
        self.first_phi
    }

    pub fn last_phi(&self) -> Option<InstId> {
        self.last_phi
    }

    pub fn first_inst(&self) -> Option<InstId> {
        self.first_inst
    }

    pub fn last_inst(&self) -> Option<InstId> {
        self.last_inst
    }

    /// The first instruction of the merged phi+non-phi stream, i.e. the
    /// head of the block.
    pub fn head(&self) -> Option<InstId> {
        self.first_phi.or(self.first_inst)
    }

    /// The last instruction of the merged stream, i.e. the tail.
    pub fn tail(&self) -> Option<InstId> {
        self.last_inst.or(self.last_phi)
    }

    pub(crate) fn set_phi_bounds(&mut self, first: Option<InstId>, last: Option<InstId>) {
        self.first_phi = first;
        self.last_phi = last;
    }

    pub(crate) fn set_inst_bounds(&mut self, first: Option<InstId>, last: Option<InstId>) {
        self.first_inst = first;
        self.last_inst = last;
    }
}
