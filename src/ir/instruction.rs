//! The instruction data model: a closed tagged-variant enum rather than
//! an inheritance hierarchy, per the IR's "avoid open class hierarchies"
//! design note.

use smallvec::SmallVec;

use crate::entity::{BlockId, InstId};
use crate::ir::types::{ConstValue, Type};

/// The operation an instruction performs. Kept separate from
/// `InstructionData` so callers can match on "what kind is this" (for
/// the optimizer, the verifier, the dump) without destructuring the
/// payload.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Opcode {
    Param,
    Const,
    Add,
    Mul,
    Cmp,
    Or,
    AShr,
    Jump,
    If,
    Phi,
    Ret,
}

impl Opcode {
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Param => "Param",
            Opcode::Const => "Const",
            Opcode::Add => "Add",
            Opcode::Mul => "Mul",
            Opcode::Cmp => "Cmp",
            Opcode::Or => "Or",
            Opcode::AShr => "AShr",
            Opcode::Jump => "Jump",
            Opcode::If => "If",
            Opcode::Phi => "Phi",
            Opcode::Ret => "Ret",
        }
    }
}

/// The binary arithmetic/comparison opcodes share a shape: exactly two
/// instruction operands.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    Add,
    Mul,
    Cmp,
    Or,
    AShr,
}

impl BinaryOp {
    pub fn opcode(self) -> Opcode {
        match self {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Cmp => Opcode::Cmp,
            BinaryOp::Or => Opcode::Or,
            BinaryOp::AShr => Opcode::AShr,
        }
    }
}

/// The kind-specific payload of an instruction. This is the tagged
/// union the design notes call for: shared header fields (id, type,
/// owning block, list links, life position) live on `Instruction`
/// itself, and everything variant-specific lives here.
#[derive(Clone, Debug)]
pub enum InstructionData {
    Param,
    Const(ConstValue),
    Binary { op: BinaryOp, lhs: InstId, rhs: InstId },
    Jump { target: BlockId },
    If { cond: InstId, then_block: BlockId, else_block: BlockId },
    /// Operand lists mirror each other: `preds[i]` is the predecessor
    /// block `values[i]` is selected from. Populated incrementally via
    /// `Instruction::add_phi_input` after the phi itself is created.
    Phi { preds: Vec<BlockId>, values: Vec<InstId> },
    Ret { value: Option<InstId> },
}

impl InstructionData {
    pub fn opcode(&self) -> Opcode {
        match self {
            InstructionData::Param => Opcode::Param,
            InstructionData::Const(_) => Opcode::Const,
            InstructionData::Binary { op, .. } => op.opcode(),
            InstructionData::Jump { .. } => Opcode::Jump,
            InstructionData::If { .. } => Opcode::If,
            InstructionData::Phi { .. } => Opcode::Phi,
            InstructionData::Ret { .. } => Opcode::Ret,
        }
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, InstructionData::Phi { .. })
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstructionData::Jump { .. } | InstructionData::If { .. } | InstructionData::Ret { .. }
        )
    }

    /// The ordered SSA operands: for `If` the condition is first; for
    /// `Phi` this is the value side of the (pred, value) pairs, in
    /// order, mirroring the spec's "inputs mirror the value side".
    pub fn inputs(&self) -> SmallVec<[InstId; 2]> {
        match self {
            InstructionData::Param | InstructionData::Const(_) | InstructionData::Jump { .. } => {
                SmallVec::new()
            }
            InstructionData::Binary { lhs, rhs, .. } => {
                let mut v = SmallVec::new();
                v.push(*lhs);
                v.push(*rhs);
                v
            }
            InstructionData::If { cond, .. } => {
                let mut v = SmallVec::new();
                v.push(*cond);
                v
            }
            InstructionData::Phi { values, .. } => values.iter().cloned().collect(),
            InstructionData::Ret { value } => value.iter().cloned().collect(),
        }
    }

    /// Rewrites every operand equal to `old` to `new`. Returns whether
    /// anything changed. Phi's paired predecessor/value slots are
    /// rewritten in lockstep: only the value side ever refers to an
    /// instruction, so only it is touched.
    pub fn replace_uses(&mut self, old: InstId, new: InstId) -> bool {
        let mut changed = false;
        let mut maybe_replace = |slot: &mut InstId| {
            if *slot == old {
                *slot = new;
                changed = true;
            }
        };
        match self {
            InstructionData::Param | InstructionData::Const(_) | InstructionData::Jump { .. } => {}
            InstructionData::Binary { lhs, rhs, .. } => {
                maybe_replace(lhs);
                maybe_replace(rhs);
            }
            InstructionData::If { cond, .. } => maybe_replace(cond),
            InstructionData::Phi { values, .. } => {
                for v in values.iter_mut() {
                    maybe_replace(v);
                }
            }
            InstructionData::Ret { value } => {
                if let Some(v) = value.as_mut() {
                    maybe_replace(v);
                }
            }
        }
        changed
    }
}

/// One arena-allocated instruction. Owned by exactly its `block`; every
/// other reference to it (inputs, phi operands, prev/next links) is a
/// non-owning `InstId`.
#[derive(Clone, Debug)]
pub struct Instruction {
    pub id: InstId,
    pub block: BlockId,
    pub ty: Type,
    pub data: InstructionData,
    pub prev: Option<InstId>,
    pub next: Option<InstId>,
    /// Assigned by liveness; -1 until then.
    pub life_pos: i64,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        self.data.opcode()
    }

    pub fn is_phi(&self) -> bool {
        self.data.is_phi()
    }

    pub fn is_terminator(&self) -> bool {
        self.data.is_terminator()
    }

    pub fn inputs(&self) -> SmallVec<[InstId; 2]> {
        self.data.inputs()
    }

    /// A trackable value is one that participates in liveness/register
    /// allocation: it has a real (non-`Unknown`) result and is not a
    /// `Const` (constants are rematerialized, never tracked).
    pub fn is_trackable(&self) -> bool {
        self.ty != Type::Unknown && self.opcode() != Opcode::Const
    }
}
