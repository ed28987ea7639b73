//! Thin construction API bound to a graph and a mutable insertion
//! point. This is the only way instructions get added to a graph; it
//! also wires CFG edges for the control-flow instructions.

use log::trace;

use crate::entity::{BlockId, InstId};
use crate::ir::graph::Graph;
use crate::ir::instruction::{BinaryOp, InstructionData};
use crate::ir::types::{ConstValue, Type};

pub struct Builder<'a> {
    graph: &'a mut Graph,
    insert_block: Option<BlockId>,
}

impl<'a> Builder<'a> {
    pub fn new(graph: &'a mut Graph) -> Self {
        Builder {
            graph,
            insert_block: None,
        }
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.insert_block = Some(block);
    }

    fn current_block(&self) -> BlockId {
        self.insert_block
            .expect("builder operation requires an insertion point set via set_insert_point")
    }

    fn append(&mut self, ty: Type, data: InstructionData) -> InstId {
        let block = self.current_block();
        let id = self.graph.append_inst(block, ty, data);
        trace!("{}: appended {} ({:?})", block, id, ty);
        id
    }

    pub fn create_constant(&mut self, value: ConstValue) -> InstId {
        let ty = value.ty();
        self.append(ty, InstructionData::Const(value))
    }

    pub fn create_parameter(&mut self, ty: Type) -> InstId {
        self.append(ty, InstructionData::Param)
    }

    fn create_binary(&mut self, op: BinaryOp, lhs: InstId, rhs: InstId) -> InstId {
        let ty = match op {
            BinaryOp::Cmp => Type::Int32,
            _ => self.graph.inst(lhs).ty,
        };
        self.append(ty, InstructionData::Binary { op, lhs, rhs })
    }

    pub fn create_add(&mut self, lhs: InstId, rhs: InstId) -> InstId {
        self.create_binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn create_mul(&mut self, lhs: InstId, rhs: InstId) -> InstId {
        self.create_binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn create_or(&mut self, lhs: InstId, rhs: InstId) -> InstId {
        self.create_binary(BinaryOp::Or, lhs, rhs)
    }

    pub fn create_ashr(&mut self, lhs: InstId, rhs: InstId) -> InstId {
        self.create_binary(BinaryOp::AShr, lhs, rhs)
    }

    pub fn create_cmp(&mut self, lhs: InstId, rhs: InstId) -> InstId {
        self.create_binary(BinaryOp::Cmp, lhs, rhs)
    }

    pub fn create_jump(&mut self, target: BlockId) -> InstId {
        let from = self.current_block();
        let id = self.append(Type::Unknown, InstructionData::Jump { target });
        self.graph.add_edge(from, target);
        id
    }

    pub fn create_if(&mut self, cond: InstId, then_block: BlockId, else_block: BlockId) -> InstId {
        let from = self.current_block();
        let id = self.append(
            Type::Unknown,
            InstructionData::If {
                cond,
                then_block,
                else_block,
            },
        );
        self.graph.add_edge(from, then_block);
        self.graph.add_edge(from, else_block);
        id
    }

    pub fn create_phi(&mut self, ty: Type) -> InstId {
        self.append(
            ty,
            InstructionData::Phi {
                preds: Vec::new(),
                values: Vec::new(),
            },
        )
    }

    /// Populates one incoming edge of a phi previously created with
    /// `create_phi`. Deferred from construction because the
    /// predecessor blocks are usually built after the join point.
    pub fn add_phi_input(&mut self, phi: InstId, from: BlockId, value: InstId) {
        assert!(
            self.graph.inst(phi).is_phi(),
            "add_phi_input called on instruction {} which is not a phi",
            phi
        );
        self.graph.add_phi_input(phi, from, value);
    }

    pub fn create_return(&mut self, value: Option<InstId>) -> InstId {
        self.append(Type::Unknown, InstructionData::Ret { value })
    }
}
