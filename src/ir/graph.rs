//! The graph: owns all blocks and instructions of one function-shaped
//! unit, in arenas keyed by the typed indices in `entity`.

use crate::entity::{BlockId, EntityRef, InstId, PrimaryMap};
use crate::ir::block::BasicBlock;
use crate::ir::instruction::{Instruction, InstructionData};
use crate::ir::types::Type;

pub struct Graph {
    blocks: PrimaryMap<BlockId, BasicBlock>,
    insts: PrimaryMap<InstId, Instruction>,
    entry: Option<BlockId>,
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            blocks: PrimaryMap::new(),
            insts: PrimaryMap::new(),
            entry: None,
        }
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        let pushed = self.blocks.push(BasicBlock::new(id));
        debug_assert_eq!(id, pushed);
        if self.entry.is_none() {
            self.entry = Some(id);
        }
        id
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.entry
    }

    pub fn set_entry(&mut self, block: BlockId) {
        debug_assert!(self.blocks.get(block).is_some());
        self.entry = Some(block);
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id]
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[id]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Instruction {
        &mut self.insts[id]
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys()
    }

    /// Wires a CFG edge: appends `to` to `from`'s successors and `from`
    /// to `to`'s predecessors, keeping the lists mutually consistent
    /// (invariant v).
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from].succs.push(to);
        self.blocks[to].preds.push(from);
    }

    /// Allocates a new instruction in `block` and links it into the
    /// merged phi/non-phi stream: phis at the end of the phi segment,
    /// everything else at the end of the tail segment. Always sets the
    /// instruction's owning-block back-reference.
    pub fn append_inst(&mut self, block: BlockId, ty: Type, data: InstructionData) -> InstId {
        let is_phi = data.is_phi();
        let id = InstId::new(self.insts.len());
        let inst = Instruction {
            id,
            block,
            ty,
            data,
            prev: None,
            next: None,
            life_pos: -1,
        };
        let pushed = self.insts.push(inst);
        debug_assert_eq!(id, pushed);

        if is_phi {
            self.link_phi(block, id);
        } else {
            self.link_non_phi(block, id);
        }
        id
    }

    fn link_phi(&mut self, block: BlockId, id: InstId) {
        let last_phi = self.blocks[block].last_phi();
        let first_inst = self.blocks[block].first_inst();
        if let Some(lp) = last_phi {
            self.insts[lp].next = Some(id);
        }
        if let Some(fi) = first_inst {
            self.insts[fi].prev = Some(id);
        }
        self.insts[id].prev = last_phi;
        self.insts[id].next = first_inst;
        let new_first = self.blocks[block].first_phi().or(Some(id));
        self.blocks[block].set_phi_bounds(new_first, Some(id));
    }

    fn link_non_phi(&mut self, block: BlockId, id: InstId) {
        let tail = self.blocks[block].tail();
        if let Some(t) = tail {
            self.insts[t].next = Some(id);
        }
        self.insts[id].prev = tail;
        self.insts[id].next = None;
        let new_first = self.blocks[block].first_inst().or(Some(id));
        self.blocks[block].set_inst_bounds(new_first, Some(id));
    }

    /// Structurally removes `id` from its block's instruction stream.
    /// The instruction itself stays in the arena (indices are stable
    /// for the graph's lifetime) but is no longer reachable by walking
    /// the block.
    pub fn remove_inst(&mut self, id: InstId) {
        let (block, prev, next, is_phi) = {
            let inst = &self.insts[id];
            (inst.block, inst.prev, inst.next, inst.is_phi())
        };
        if let Some(p) = prev {
            self.insts[p].next = next;
        }
        if let Some(n) = next {
            self.insts[n].prev = prev;
        }
        let (bb_first_phi, bb_last_phi, bb_first_inst, bb_last_inst) = {
            let bb = &self.blocks[block];
            (bb.first_phi(), bb.last_phi(), bb.first_inst(), bb.last_inst())
        };
        if is_phi {
            let new_first = if bb_first_phi == Some(id) {
                next.filter(|&n| self.insts[n].is_phi())
            } else {
                bb_first_phi
            };
            let new_last = if bb_last_phi == Some(id) {
                prev.filter(|&p| self.insts[p].is_phi())
            } else {
                bb_last_phi
            };
            self.blocks[block].set_phi_bounds(new_first, new_last);
        } else {
            let new_first = if bb_first_inst == Some(id) {
                next
            } else {
                bb_first_inst
            };
            let new_last = if bb_last_inst == Some(id) {
                prev.filter(|&p| !self.insts[p].is_phi())
            } else {
                bb_last_inst
            };
            self.blocks[block].set_inst_bounds(new_first, new_last);
        }
    }

    /// All instructions of `block` in merged stream order (phis, then
    /// the rest), as a plain `Vec` for callers that want to walk
    /// without borrowing the graph.
    pub fn block_insts(&self, block: BlockId) -> Vec<InstId> {
        let mut out = Vec::new();
        let mut cur = self.blocks[block].head();
        while let Some(id) = cur {
            out.push(id);
            cur = self.insts[id].next;
        }
        out
    }

    pub fn add_phi_input(&mut self, phi: InstId, from: BlockId, value: InstId) {
        match &mut self.insts[phi].data {
            InstructionData::Phi { preds, values } => {
                preds.push(from);
                values.push(value);
            }
            _ => panic!("add_phi_input called on a non-phi instruction"),
        }
    }

    /// Scans every instruction in every block and rewrites any operand
    /// equal to `old` to `new`, including phi value slots. Returns
    /// whether anything changed.
    pub fn replace_all_uses(&mut self, old: InstId, new: InstId) -> bool {
        let mut changed = false;
        for key in self.insts.keys() {
            if self.insts[key].data.replace_uses(old, new) {
                changed = true;
            }
        }
        changed
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instruction::BinaryOp;
    use crate::ir::types::ConstValue;

    #[test]
    fn append_keeps_phis_before_non_phis() {
        let mut g = Graph::new();
        let bb = g.create_block();
        let c = g.append_inst(bb, Type::Int32, InstructionData::Const(ConstValue::Int32(1)));
        let phi = g.append_inst(bb, Type::Int32, InstructionData::Phi { preds: vec![], values: vec![] });
        let insts = g.block_insts(bb);
        assert_eq!(insts, vec![phi, c]);
    }

    #[test]
    fn edges_are_symmetric() {
        let mut g = Graph::new();
        let a = g.create_block();
        let b = g.create_block();
        g.add_edge(a, b);
        assert_eq!(g.block(a).succs, vec![b]);
        assert_eq!(g.block(b).preds, vec![a]);
    }

    #[test]
    fn replace_all_uses_rewrites_binary_and_phi() {
        let mut g = Graph::new();
        let bb = g.create_block();
        let a = g.append_inst(bb, Type::Int32, InstructionData::Param);
        let b = g.append_inst(bb, Type::Int32, InstructionData::Param);
        let add = g.append_inst(
            bb,
            Type::Int32,
            InstructionData::Binary { op: BinaryOp::Add, lhs: a, rhs: b },
        );
        let new_const = g.append_inst(bb, Type::Int32, InstructionData::Const(ConstValue::Int32(7)));
        assert!(g.replace_all_uses(a, new_const));
        match &g.inst(add).data {
            InstructionData::Binary { lhs, .. } => assert_eq!(*lhs, new_const),
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn remove_inst_unlinks_and_keeps_bounds_consistent() {
        let mut g = Graph::new();
        let bb = g.create_block();
        let x = g.append_inst(bb, Type::Int32, InstructionData::Param);
        let y = g.append_inst(bb, Type::Int32, InstructionData::Param);
        g.remove_inst(x);
        assert_eq!(g.block_insts(bb), vec![y]);
    }
}
