//! Fixed-point constant folding and peephole rewriting.
//!
//! Both rewrite kinds only ever inspect a binary instruction's
//! existing inputs; neither canonicalizes operand order, so only the
//! right-hand side is checked for the commutative peepholes.

use crate::entity::{BlockId, InstId};
use crate::ir::{BinaryOp, Builder, ConstValue, Graph, InstructionData, Type};

pub struct Optimizer;

impl Optimizer {
    /// Runs folding and peephole rewrites to a fixed point. Returns
    /// whether anything changed. Terminates because each successful
    /// rewrite removes one instruction and the instruction count is
    /// bounded below by zero.
    pub fn run(graph: &mut Graph) -> bool {
        let mut any_change = false;
        loop {
            if !Self::pass(graph) {
                break;
            }
            any_change = true;
        }
        any_change
    }

    fn pass(graph: &mut Graph) -> bool {
        let mut changed = false;
        let blocks: Vec<BlockId> = graph.blocks().collect();
        for block in blocks {
            for id in graph.block_insts(block) {
                if graph.inst(id).is_phi() {
                    continue;
                }
                let optimized = Self::try_constant_folding(graph, id) || Self::try_peephole(graph, id);
                if optimized {
                    graph.remove_inst(id);
                    changed = true;
                }
            }
        }
        changed
    }

    fn try_constant_folding(graph: &mut Graph, id: InstId) -> bool {
        let (op, lhs, rhs, ty, block) = match binary_operands(graph, id) {
            Some(v) => v,
            None => return false,
        };
        if !matches!(op, BinaryOp::Mul | BinaryOp::Or | BinaryOp::AShr) {
            return false;
        }
        let (v1, v2) = match (as_const(graph, lhs), as_const(graph, rhs)) {
            (Some(a), Some(b)) => (a.as_i64(), b.as_i64()),
            _ => return false,
        };
        let result = match op {
            BinaryOp::Mul => v1.wrapping_mul(v2),
            BinaryOp::Or => v1 | v2,
            BinaryOp::AShr => v1.wrapping_shr((v2 & 63) as u32),
            _ => unreachable!(),
        };
        let new_const = materialize_const(graph, block, ty, result);
        graph.replace_all_uses(id, new_const);
        true
    }

    fn try_peephole(graph: &mut Graph, id: InstId) -> bool {
        let (op, lhs, rhs, ty, block) = match binary_operands(graph, id) {
            Some(v) => v,
            None => return false,
        };

        match op {
            BinaryOp::Mul => {
                if let Some(c) = as_const(graph, rhs) {
                    if c.as_i64() == 1 {
                        graph.replace_all_uses(id, lhs);
                        return true;
                    }
                    if c.as_i64() == 0 {
                        let zero = materialize_const(graph, block, ty, 0);
                        graph.replace_all_uses(id, zero);
                        return true;
                    }
                }
            }
            BinaryOp::Or => {
                if lhs == rhs {
                    graph.replace_all_uses(id, lhs);
                    return true;
                }
                if let Some(c) = as_const(graph, rhs) {
                    if c.as_i64() == 0 {
                        graph.replace_all_uses(id, lhs);
                        return true;
                    }
                    if c.as_i64() == -1 {
                        graph.replace_all_uses(id, rhs);
                        return true;
                    }
                }
            }
            BinaryOp::AShr => {
                // non-commutative: x >> 0 = x; 0 >> x = 0.
                if let Some(c) = as_const(graph, rhs) {
                    if c.as_i64() == 0 {
                        graph.replace_all_uses(id, lhs);
                        return true;
                    }
                }
                if let Some(c) = as_const(graph, lhs) {
                    if c.as_i64() == 0 {
                        graph.replace_all_uses(id, lhs);
                        return true;
                    }
                }
            }
            _ => {}
        }
        false
    }
}

fn binary_operands(graph: &Graph, id: InstId) -> Option<(BinaryOp, InstId, InstId, Type, BlockId)> {
    match &graph.inst(id).data {
        InstructionData::Binary { op, lhs, rhs } => {
            let inst = graph.inst(id);
            Some((*op, *lhs, *rhs, inst.ty, inst.block))
        }
        _ => None,
    }
}

fn as_const(graph: &Graph, id: InstId) -> Option<ConstValue> {
    match &graph.inst(id).data {
        InstructionData::Const(c) => Some(*c),
        _ => None,
    }
}

fn materialize_const(graph: &mut Graph, block: BlockId, ty: Type, value: i64) -> InstId {
    let mut builder = Builder::new(graph);
    builder.set_insert_point(block);
    builder.create_constant(ConstValue::wrap(ty, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::InstructionData as Data;

    #[test]
    fn folds_constant_multiply() {
        let mut g = Graph::new();
        let bb = g.create_block();
        let (c, d, m);
        {
            let mut b = Builder::new(&mut g);
            b.set_insert_point(bb);
            c = b.create_constant(ConstValue::Int32(10));
            d = b.create_constant(ConstValue::Int32(2));
            m = b.create_mul(c, d);
            b.create_return(Some(m));
        }
        assert!(Optimizer::run(&mut g));
        let ret = g.block_insts(bb).into_iter().find(|&i| matches!(g.inst(i).data, Data::Ret { .. })).unwrap();
        match &g.inst(ret).data {
            Data::Ret { value: Some(v) } => {
                assert_ne!(*v, m);
                match &g.inst(*v).data {
                    Data::Const(cv) => assert_eq!(cv.as_i64(), 20),
                    other => panic!("expected const, got {:?}", other),
                }
            }
            other => panic!("expected ret with operand, got {:?}", other),
        }
    }

    #[test]
    fn peephole_simplifies_identity_and_annihilator() {
        let mut g = Graph::new();
        let entry = g.create_block();
        let first = g.create_block();
        let second = g.create_block();
        let (p, ret_a, ret_b);
        {
            let mut b = Builder::new(&mut g);
            b.set_insert_point(entry);
            p = b.create_parameter(Type::Int32);
            let one = b.create_constant(ConstValue::Int32(1));
            let zero = b.create_constant(ConstValue::Int32(0));
            let a = b.create_mul(p, one);
            let b_inst = b.create_mul(p, zero);
            b.create_jump(first);

            b.set_insert_point(first);
            ret_a = b.create_return(Some(a));

            b.set_insert_point(second);
            ret_b = b.create_return(Some(b_inst));
        }
        assert!(Optimizer::run(&mut g));
        match &g.inst(ret_a).data {
            Data::Ret { value: Some(v) } => assert_eq!(*v, p),
            other => panic!("unexpected {:?}", other),
        }
        match &g.inst(ret_b).data {
            Data::Ret { value: Some(v) } => match &g.inst(*v).data {
                Data::Const(cv) => assert_eq!(cv.as_i64(), 0),
                other => panic!("expected const, got {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut g = Graph::new();
        let bb = g.create_block();
        {
            let mut b = Builder::new(&mut g);
            b.set_insert_point(bb);
            let c = b.create_constant(ConstValue::Int32(3));
            let d = b.create_constant(ConstValue::Int32(4));
            let m = b.create_mul(c, d);
            b.create_return(Some(m));
        }
        assert!(Optimizer::run(&mut g));
        assert!(!Optimizer::run(&mut g));
    }
}
