// Copyright (c) 2017-2020 Fabian Schuiki

//! Range-guided Branch Elimination
//!
//! Folds comparison instructions whose outcome is fully determined by the
//! value ranges of their operands, then removes the instructions and basic
//! blocks that become dead as a consequence.

use crate::{
    analysis::{Range, ValueRanges},
    ir::prelude::*,
    pass::dce,
    value::IntValue,
};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fold comparisons that are statically decided by their operand ranges.
///
/// For each comparison instruction, consults the operand ranges and replaces
/// all uses of the comparison with a constant if its outcome is fully
/// determined. Rewritten comparisons and the instructions that lose their last
/// use as a result are removed, conditional branches on a now-constant
/// condition become unconditional, and blocks that are no longer reachable
/// from the entry are pruned. Returns `true` if the block or instruction
/// count of the function changed.
pub fn run_on_function(func: &mut Function, ranges: &ValueRanges) -> bool {
    info!("RBE [{}]", func.name);
    let before = measure(func);

    // Work on a snapshot of the instructions; rewrites do not disturb it.
    let insts: Vec<Inst> = func
        .layout
        .blocks()
        .flat_map(|bb| func.layout.insts(bb))
        .collect();

    // Replace each decided comparison with a constant and queue it for
    // removal. Later comparisons immediately observe the rewrite through
    // their operands.
    let mut builder = FunctionBuilder::new(func);
    let mut queue = vec![];
    for inst in insts {
        let op = builder.func.dfg[inst].opcode();
        if !op.is_compare() {
            continue;
        }
        let (lhs, rhs) = {
            let args = builder.func.dfg[inst].args();
            (args[0], args[1])
        };
        let r1 = ranges.get(builder.func, lhs);
        let r2 = ranges.get(builder.func, rhs);
        trace!(
            "Considering {} with {}, {}",
            inst.dump(&builder.func.dfg, Some(&builder.func.cfg)),
            r1,
            r2
        );
        if let Some(konst) = resolve(op, &r1, &r2) {
            debug!(
                "Resolved {} to {}",
                inst.dump(&builder.func.dfg, Some(&builder.func.cfg)),
                konst as usize
            );
            let value = builder.func.dfg.inst_result(inst);
            let width = builder.func.dfg.value_type(value).unwrap_int();
            builder.insert_before(inst);
            let c = builder
                .ins()
                .suffix(value, "rbe")
                .const_int(IntValue::from_usize(width, konst as usize));
            builder.replace_use(value, c);
            queue.push(inst);
        }
    }

    // Reap the rewritten comparisons and their unused operands.
    for inst in queue {
        builder.prune_if_unused(inst);
    }

    // Clean up the control flow.
    fold_constant_branches(&mut builder);
    dce::prune_unreachable(&mut builder);

    let after = measure(func);
    before != after
}

/// Run the pass on all functions of a module in parallel.
///
/// The `ranges` map carries the value ranges of each function, keyed by
/// function name. Functions without an entry see no range information beyond
/// constants.
pub fn run_on_module(module: &mut Module, ranges: &HashMap<UnitName, ValueRanges>) -> bool {
    let empty = ValueRanges::new();
    module
        .par_functions_mut()
        .map(|func| {
            let ranges = ranges.get(&func.name).unwrap_or(&empty);
            run_on_function(func, ranges)
        })
        .reduce(|| false, |a, b| a || b)
}

/// The amount of code eliminated by a pass invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElimStats {
    /// Number of basic blocks eliminated.
    pub blocks: u64,
    /// Number of instructions eliminated.
    pub insts: u64,
}

impl ElimStats {
    /// Check whether anything was eliminated.
    pub fn changed(&self) -> bool {
        self.blocks > 0 || self.insts > 0
    }
}

/// Run the pass on a function and measure how much it eliminated.
///
/// Wraps `run_on_function`, reporting the number of basic blocks and
/// instructions removed and adding them to the [`BLOCKS_ELIMINATED`] and
/// [`INSTS_ELIMINATED`] counters.
pub fn run_with_stats(func: &mut Function, ranges: &ValueRanges) -> ElimStats {
    let before = measure(func);
    run_on_function(func, ranges);
    let after = measure(func);
    debug_assert!(
        after.0 <= before.0 && after.1 <= before.1,
        "pass must not add code"
    );
    let stats = ElimStats {
        blocks: (before.0 - after.0) as u64,
        insts: (before.1 - after.1) as u64,
    };
    BLOCKS_ELIMINATED.fetch_add(stats.blocks, Ordering::Relaxed);
    INSTS_ELIMINATED.fetch_add(stats.insts, Ordering::Relaxed);
    stats
}

/// Count the basic blocks and instructions of a function.
pub fn measure(func: &Function) -> (usize, usize) {
    let bbs = func.layout.blocks().count();
    let insts = func
        .layout
        .blocks()
        .map(|bb| func.layout.insts(bb).count())
        .sum();
    (bbs, insts)
}

/// Determine the outcome of a comparison, if it is statically known.
///
/// Checks whether the operand ranges `r1` and `r2` are disjoint in a way that
/// decides the comparison `op` for every combination of operand values.
/// Returns the constant outcome, or `None` if the ranges overlap
/// indeterminately. Equality and inequality resolve only through the strict
/// signed relations, never through unsigned disjointness or singleton ranges.
pub fn resolve(op: Opcode, r1: &Range, r2: &Range) -> Option<bool> {
    let (t, f) = match op {
        Opcode::Eq => (false, r1.slt(r2) || r1.sgt(r2)),
        Opcode::Neq => (r1.slt(r2) || r1.sgt(r2), false),
        Opcode::Ugt => (r1.ugt(r2), r1.ult(r2)),
        Opcode::Uge => (r1.uge(r2), r1.ult(r2)),
        Opcode::Ult => (r1.ult(r2), r1.ugt(r2)),
        Opcode::Ule => (r1.ule(r2), r1.ugt(r2)),
        Opcode::Sgt => (r1.sgt(r2), r1.slt(r2)),
        Opcode::Sge => (r1.sge(r2), r1.slt(r2)),
        Opcode::Slt => (r1.slt(r2), r1.sgt(r2)),
        Opcode::Sle => (r1.sle(r2), r1.sgt(r2)),
        _ => return None,
    };
    debug_assert!(!(t && f), "comparison cannot be both true and false");
    if t || f {
        Some(!f)
    } else {
        None
    }
}

/// Rewrite conditional branches with a constant condition into unconditional
/// branches.
///
/// The target not taken loses an incoming edge; phi nodes in that block drop
/// the corresponding entry. The condition is pruned if the folded branch was
/// its last use.
fn fold_constant_branches(builder: &mut FunctionBuilder) {
    let mut folds = vec![];
    for bb in builder.func.layout.blocks() {
        let term = builder.func.layout.terminator(bb);
        if builder.func.dfg[term].opcode() != Opcode::BrCond {
            continue;
        }
        let cond = builder.func.dfg[term].args()[0];
        if let Some(imm) = builder.func.dfg.get_const_int(cond) {
            folds.push((bb, term, !imm.is_zero()));
        }
    }
    for (from, inst, cond) in folds {
        let (bbs, arg) = {
            let data = &builder.func.dfg[inst];
            ([data.blocks()[0], data.blocks()[1]], data.args()[0])
        };
        let taken = bbs[cond as usize];
        let dropped = bbs[!cond as usize];
        debug!(
            "Fold {} to br {}",
            inst.dump(&builder.func.dfg, Some(&builder.func.cfg)),
            taken.dump(&builder.func.cfg)
        );
        builder.insert_before(inst);
        builder.ins().br(taken);
        builder.remove_inst(inst);

        // The edge to the dropped target is gone; patch up its phi nodes.
        if dropped != taken {
            let phis: Vec<Inst> = builder
                .func
                .layout
                .insts(dropped)
                .filter(|&inst| builder.func.dfg[inst].opcode().is_phi())
                .collect();
            for phi in phis {
                builder.func.dfg.remove_block_from_inst(from, phi);
            }
        }

        // The folded branch may have been the last use of its condition.
        if let Some(cond_inst) = builder.func.dfg.get_value_inst(arg) {
            builder.prune_if_unused(cond_inst);
        }
    }
}

/// Total number of instructions eliminated by the pass.
pub static INSTS_ELIMINATED: AtomicU64 = AtomicU64::new(0);

/// Total number of basic blocks eliminated by the pass.
pub static BLOCKS_ELIMINATED: AtomicU64 = AtomicU64::new(0);

#[cfg(test)]
mod tests {
    use super::*;

    fn range(width: usize, lower: isize, upper: isize) -> Range {
        Range::new(
            IntValue::from_isize(width, lower),
            IntValue::from_isize(width, upper),
        )
    }

    #[test]
    fn signed_disjoint_below() {
        let r1 = range(32, 0, 5);
        let r2 = range(32, 10, 20);
        assert_eq!(resolve(Opcode::Slt, &r1, &r2), Some(true));
        assert_eq!(resolve(Opcode::Sle, &r1, &r2), Some(true));
        assert_eq!(resolve(Opcode::Sgt, &r1, &r2), Some(false));
        assert_eq!(resolve(Opcode::Sge, &r1, &r2), Some(false));
        assert_eq!(resolve(Opcode::Eq, &r1, &r2), Some(false));
        assert_eq!(resolve(Opcode::Neq, &r1, &r2), Some(true));
    }

    #[test]
    fn overlapping_ranges_unresolved() {
        let r1 = range(32, 0, 5);
        let r2 = range(32, 3, 8);
        for op in [
            Opcode::Eq,
            Opcode::Neq,
            Opcode::Slt,
            Opcode::Sgt,
            Opcode::Sle,
            Opcode::Sge,
            Opcode::Ult,
            Opcode::Ugt,
            Opcode::Ule,
            Opcode::Uge,
        ]
        .iter()
        {
            assert_eq!(resolve(*op, &r1, &r2), None);
        }
    }

    #[test]
    fn unsigned_reverse_symmetry() {
        let r1 = range(32, 0, 5);
        let r2 = range(32, 10, 20);
        assert_eq!(resolve(Opcode::Ult, &r1, &r2), Some(true));
        assert_eq!(resolve(Opcode::Ugt, &r1, &r2), Some(false));
        assert_eq!(resolve(Opcode::Ule, &r1, &r2), Some(true));
        assert_eq!(resolve(Opcode::Uge, &r1, &r2), Some(false));
        assert_eq!(resolve(Opcode::Ult, &r2, &r1), Some(false));
        assert_eq!(resolve(Opcode::Ugt, &r2, &r1), Some(true));
        assert_eq!(resolve(Opcode::Ule, &r2, &r1), Some(false));
        assert_eq!(resolve(Opcode::Uge, &r2, &r1), Some(true));
    }

    #[test]
    fn equality_ignores_singleton_ranges() {
        // Two identical singleton ranges compare equal for every combination
        // of operand values, but equality only resolves through signed
        // disjointness.
        let r1 = range(8, 4, 4);
        assert_eq!(resolve(Opcode::Eq, &r1, &r1), None);
        assert_eq!(resolve(Opcode::Neq, &r1, &r1), None);
    }

    #[test]
    fn equality_ignores_unsigned_disjointness() {
        // Disjoint under the unsigned relations but overlapping under the
        // signed ones. Ordered unsigned predicates resolve; equality must
        // not.
        let r1 = range(8, -10, 5);
        let r2 = Range::new(IntValue::from_usize(8, 130), IntValue::from_usize(8, 250));
        assert_eq!(resolve(Opcode::Ult, &r1, &r2), Some(true));
        assert_eq!(resolve(Opcode::Eq, &r1, &r2), None);
        assert_eq!(resolve(Opcode::Neq, &r1, &r2), None);
    }

    #[test]
    fn touching_bounds() {
        let r1 = range(32, 0, 5);
        let r2 = range(32, 5, 10);
        assert_eq!(resolve(Opcode::Sle, &r1, &r2), Some(true));
        assert_eq!(resolve(Opcode::Sge, &r2, &r1), Some(true));
        assert_eq!(resolve(Opcode::Slt, &r1, &r2), None);
        assert_eq!(resolve(Opcode::Sgt, &r2, &r1), None);
        assert_eq!(resolve(Opcode::Eq, &r1, &r2), None);
        assert_eq!(resolve(Opcode::Neq, &r1, &r2), None);
    }

    #[test]
    fn full_ranges_unresolved() {
        let full = Range::full(32);
        let r2 = range(32, 10, 20);
        for op in [Opcode::Eq, Opcode::Neq, Opcode::Slt, Opcode::Uge].iter() {
            assert_eq!(resolve(*op, &full, &r2), None);
            assert_eq!(resolve(*op, &r2, &full), None);
            assert_eq!(resolve(*op, &full, &full), None);
        }
    }

    #[test]
    fn non_comparison_unresolved() {
        let r1 = range(32, 0, 5);
        let r2 = range(32, 10, 20);
        assert_eq!(resolve(Opcode::Add, &r1, &r2), None);
    }
}
