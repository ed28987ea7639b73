//! Lengauer-Tarjan dominator analysis.
//!
//! Implements the semidominator algorithm with path compression (not
//! the iterative dataflow form), since callers depend on its behavior
//! on irreducible control flow. DFS and the `Eval`/`Compress` step are
//! both written with an explicit stack/worklist rather than recursion,
//! per the crate's "no recursive graph walks" convention for analyses
//! that must handle arbitrarily large graphs.

use log::{debug, trace};

use crate::entity::{BlockId, EntityRef, SecondaryMap};
use crate::ir::Graph;

#[derive(Clone)]
struct NodeInfo {
    dfs_number: usize,
    parent: Option<BlockId>,
    semidom: BlockId,
    ancestor: Option<BlockId>,
    label: BlockId,
    idom: Option<BlockId>,
    bucket: Vec<BlockId>,
}

impl NodeInfo {
    fn unvisited(sentinel: BlockId) -> Self {
        NodeInfo {
            dfs_number: 0,
            parent: None,
            semidom: sentinel,
            ancestor: None,
            label: sentinel,
            idom: None,
            bucket: Vec::new(),
        }
    }
}

/// The computed immediate-dominator relation for one graph.
pub struct DominatorTree {
    info: SecondaryMap<BlockId, Option<NodeInfo>>,
    vertex: Vec<BlockId>,
    entry: Option<BlockId>,
}

impl DominatorTree {
    /// Computes dominators relative to `graph`'s entry block. Yields an
    /// empty (but valid) tree if the graph has no entry.
    pub fn compute(graph: &Graph) -> DominatorTree {
        let mut tree = DominatorTree {
            info: SecondaryMap::with_default(None),
            vertex: Vec::new(),
            entry: graph.entry(),
        };

        let entry = match graph.entry() {
            Some(e) => e,
            None => return tree,
        };

        tree.dfs(graph, entry);
        let n = tree.vertex.len();
        debug!("dominator_tree: {} reachable blocks from {}", n, entry);

        for i in (1..n).rev() {
            let w = tree.vertex[i];
            let preds = graph.block(w).preds.clone();
            for v in preds {
                if tree.info.get(v).is_none() {
                    continue;
                }
                let u = tree.eval(v);
                if tree.dfs_num(tree.semidom(u)) < tree.dfs_num(tree.semidom(w)) {
                    let new_semi = tree.semidom(u);
                    tree.info[w].as_mut().unwrap().semidom = new_semi;
                }
            }
            let semi_w = tree.semidom(w);
            tree.info[semi_w].as_mut().unwrap().bucket.push(w);
            let parent = tree.info[w].as_ref().unwrap().parent;
            tree.link(parent, w);

            if let Some(p) = parent {
                let bucket = std::mem::take(&mut tree.info[p].as_mut().unwrap().bucket);
                for v in bucket {
                    let u = tree.eval(v);
                    let semidom_v = tree.semidom(v);
                    if tree.semidom(tree.semidom(u)) == semidom_v {
                        tree.info[v].as_mut().unwrap().idom = Some(semidom_v);
                    } else {
                        tree.info[v].as_mut().unwrap().idom = Some(u);
                    }
                }
            }
        }

        for i in 1..n {
            let w = tree.vertex[i];
            let semi_w = tree.semidom(w);
            let idom_w = tree.info[w].as_ref().unwrap().idom.unwrap();
            if idom_w != semi_w {
                let new_idom = tree.info[idom_w].as_ref().unwrap().idom;
                tree.info[w].as_mut().unwrap().idom = new_idom;
            }
        }

        tree.info[entry].as_mut().unwrap().idom = None;
        tree
    }

    fn dfs(&mut self, graph: &Graph, entry: BlockId) {
        struct Frame {
            block: BlockId,
            succ_idx: usize,
        }

        self.info.set(entry, Some(NodeInfo::unvisited(entry)));
        {
            let info = self.info[entry].as_mut().unwrap();
            info.dfs_number = 0;
            info.parent = None;
            info.semidom = entry;
            info.label = entry;
        }
        self.vertex.push(entry);

        let mut stack = vec![Frame { block: entry, succ_idx: 0 }];
        while let Some(frame) = stack.last_mut() {
            let block = frame.block;
            let succs = graph.block(block).succs.clone();
            if frame.succ_idx < succs.len() {
                let s = succs[frame.succ_idx];
                frame.succ_idx += 1;
                if self.info.get(s).is_none() {
                    let number = self.vertex.len();
                    let mut node = NodeInfo::unvisited(s);
                    node.dfs_number = number;
                    node.parent = Some(block);
                    node.semidom = s;
                    node.label = s;
                    self.info.set(s, Some(node));
                    self.vertex.push(s);
                    trace!("dominator_tree: dfs visits {} (parent {})", s, block);
                    stack.push(Frame { block: s, succ_idx: 0 });
                }
            } else {
                stack.pop();
            }
        }
    }

    fn dfs_num(&self, b: BlockId) -> usize {
        self.info[b].as_ref().unwrap().dfs_number
    }

    fn semidom(&self, b: BlockId) -> BlockId {
        self.info[b].as_ref().unwrap().semidom
    }

    fn link(&mut self, parent: Option<BlockId>, w: BlockId) {
        self.info[w].as_mut().unwrap().ancestor = parent;
    }

    /// Returns the block with the minimal-semidominator label on `v`'s
    /// ancestor path, compressing the path as a side effect. Mirrors
    /// the reference implementation's fully-recursive `Eval`, rewritten
    /// with an explicit worklist: the whole chain up to the first
    /// unlinked ancestor collapses in one call, not just one hop.
    fn eval(&mut self, v: BlockId) -> BlockId {
        if self.info[v].as_ref().unwrap().ancestor.is_none() {
            return self.info[v].as_ref().unwrap().label;
        }

        let mut chain = Vec::new();
        let mut cur = v;
        while let Some(a) = self.info[cur].as_ref().unwrap().ancestor {
            chain.push(cur);
            cur = a;
        }

        let mut anc_label = self.info[cur].as_ref().unwrap().label;
        for &node in chain.iter().rev() {
            let self_label = self.info[node].as_ref().unwrap().label;
            if self.dfs_num(self.semidom(anc_label)) < self.dfs_num(self.semidom(self_label)) {
                self.info[node].as_mut().unwrap().label = anc_label;
            }
            self.info[node].as_mut().unwrap().ancestor = None;
            anc_label = self.info[node].as_ref().unwrap().label;
        }

        self.info[v].as_ref().unwrap().label
    }

    /// The immediate dominator of `bb`, or `None` for the entry block
    /// or a block unreachable from it.
    pub fn idom(&self, bb: BlockId) -> Option<BlockId> {
        self.info.get(bb).as_ref().and_then(|i| i.idom)
    }

    /// `true` iff `a` dominates `b`: walking `b`'s idom chain reaches
    /// `a` before reaching `None`. Every block dominates itself.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let mut cur = self.idom(b);
        while let Some(c) = cur {
            if c == a {
                return true;
            }
            cur = self.idom(c);
        }
        false
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.entry
    }

    /// Blocks in DFS preorder, entry first. Unreachable blocks are
    /// excluded.
    pub fn reachable_blocks(&self) -> &[BlockId] {
        &self.vertex
    }

    pub fn is_reachable(&self, bb: BlockId) -> bool {
        self.info.get(bb).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::Type;
    use crate::ir::{Builder, InstructionData};

    fn jump(g: &mut Graph, from: BlockId, to: BlockId) {
        let mut b = Builder::new(g);
        b.set_insert_point(from);
        b.create_jump(to);
    }

    fn branch(g: &mut Graph, from: BlockId, t: BlockId, f: BlockId) {
        let mut b = Builder::new(g);
        b.set_insert_point(from);
        let c = b.create_parameter(Type::Int32);
        b.create_if(c, t, f);
    }

    #[test]
    fn diamond_idoms() {
        let mut g = Graph::new();
        let a = g.create_block();
        let b = g.create_block();
        let c = g.create_block();
        let d = g.create_block();
        branch(&mut g, a, b, c);
        jump(&mut g, b, d);
        jump(&mut g, c, d);
        {
            let mut bb = Builder::new(&mut g);
            bb.set_insert_point(d);
            bb.create_return(None);
        }

        let tree = DominatorTree::compute(&g);
        assert_eq!(tree.idom(a), None);
        assert_eq!(tree.idom(b), Some(a));
        assert_eq!(tree.idom(c), Some(a));
        assert_eq!(tree.idom(d), Some(a));
        assert!(tree.dominates(a, d));
        assert!(!tree.dominates(b, d));
    }

    #[test]
    fn unreachable_block_is_excluded() {
        let mut g = Graph::new();
        let a = g.create_block();
        let unreachable = g.create_block();
        {
            let mut bb = Builder::new(&mut g);
            bb.set_insert_point(a);
            bb.create_return(None);
            bb.set_insert_point(unreachable);
            bb.create_return(None);
        }
        let tree = DominatorTree::compute(&g);
        assert!(tree.is_reachable(a));
        assert!(!tree.is_reachable(unreachable));
        assert_eq!(tree.idom(unreachable), None);
    }

    #[test]
    fn scenario_one_from_spec() {
        // A->B; B->{C,F}; F->{E,G}; C->D; G->D; E->D
        let mut g = Graph::new();
        let blocks: Vec<BlockId> = (0..7).map(|_| g.create_block()).collect();
        let (a, b, c, d, e, f, gg) = (
            blocks[0], blocks[1], blocks[2], blocks[3], blocks[4], blocks[5], blocks[6],
        );
        jump(&mut g, a, b);
        branch(&mut g, b, c, f);
        branch(&mut g, f, e, gg);
        jump(&mut g, c, d);
        jump(&mut g, gg, d);
        jump(&mut g, e, d);
        {
            let mut bb = Builder::new(&mut g);
            bb.set_insert_point(d);
            bb.create_return(None);
        }

        let tree = DominatorTree::compute(&g);
        assert_eq!(tree.idom(a), None);
        assert_eq!(tree.idom(b), Some(a));
        assert_eq!(tree.idom(f), Some(b));
        assert_eq!(tree.idom(e), Some(f));
        assert_eq!(tree.idom(gg), Some(f));
        assert_eq!(tree.idom(d), Some(b));
        assert_eq!(tree.idom(c), Some(b));
        assert!(tree.dominates(a, a));
        assert!(tree.dominates(b, d));
        assert!(!tree.dominates(c, d));
    }
}
