// Copyright (c) 2017-2020 Fabian Schuiki

//! Instruction and basic block ordering.

use crate::{
    ir::{Block, Inst},
    table::SecondaryTable,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Determines the order of instructions and basic blocks in a `Function`.
///
/// Blocks form a doubly-linked list, and each block carries a doubly-linked
/// list of the instructions it contains. The first block in the layout is the
/// function's entry block.
#[derive(Default, Serialize, Deserialize)]
pub struct FunctionLayout {
    /// A linked list of blocks in layout order.
    bbs: SecondaryTable<Block, BlockNode>,
    /// The first block in the layout.
    first_bb: Option<Block>,
    /// The last block in the layout.
    last_bb: Option<Block>,
    /// Lookup table to find the block that contains an instruction.
    inst_map: HashMap<Inst, Block>,
}

/// A node in the layout's doubly-linked list of blocks.
#[derive(Default, Serialize, Deserialize)]
struct BlockNode {
    prev: Option<Block>,
    next: Option<Block>,
    layout: InstLayout,
}

/// Determines the order of instructions within one block.
#[derive(Default, Serialize, Deserialize)]
struct InstLayout {
    /// A linked list of instructions in layout order.
    insts: SecondaryTable<Inst, InstNode>,
    /// The first instruction in the layout.
    first_inst: Option<Inst>,
    /// The last instruction in the layout.
    last_inst: Option<Inst>,
}

/// A node in the layout's doubly-linked list of instructions.
#[derive(Default, Serialize, Deserialize)]
struct InstNode {
    prev: Option<Inst>,
    next: Option<Inst>,
}

/// Basic block arrangement.
impl FunctionLayout {
    /// Create a new function layout.
    pub fn new() -> Self {
        Default::default()
    }

    /// Append a block to the end of the function.
    pub fn append_block(&mut self, bb: Block) {
        self.bbs.add(
            bb,
            BlockNode {
                prev: self.last_bb,
                next: None,
                layout: Default::default(),
            },
        );
        if let Some(prev) = self.last_bb {
            self.bbs[prev].next = Some(bb);
        }
        if self.first_bb.is_none() {
            self.first_bb = Some(bb);
        }
        self.last_bb = Some(bb);
    }

    /// Prepend a block to the beginning of the function.
    ///
    /// This effectively makes `bb` the new entry block.
    pub fn prepend_block(&mut self, bb: Block) {
        self.bbs.add(
            bb,
            BlockNode {
                prev: None,
                next: self.first_bb,
                layout: Default::default(),
            },
        );
        if let Some(next) = self.first_bb {
            self.bbs[next].prev = Some(bb);
        }
        if self.last_bb.is_none() {
            self.last_bb = Some(bb);
        }
        self.first_bb = Some(bb);
    }

    /// Remove a block from the function.
    ///
    /// The block's instructions are dropped from the layout as well, but they
    /// remain in the data flow graph; remove them separately.
    pub fn remove_block(&mut self, bb: Block) {
        let insts: Vec<_> = self.insts(bb).collect();
        for inst in insts {
            self.inst_map.remove(&inst);
        }
        let node = self.bbs.remove(bb).unwrap();
        if let Some(next) = node.next {
            self.bbs[next].prev = node.prev;
        }
        if let Some(prev) = node.prev {
            self.bbs[prev].next = node.next;
        }
        if self.first_bb == Some(bb) {
            self.first_bb = node.next;
        }
        if self.last_bb == Some(bb) {
            self.last_bb = node.prev;
        }
    }

    /// Check if a block has been inserted into the layout.
    pub fn is_block_inserted(&self, bb: Block) -> bool {
        self.bbs.contains(bb)
    }

    /// Return an iterator over all blocks in layout order.
    pub fn blocks<'a>(&'a self) -> impl Iterator<Item = Block> + 'a {
        std::iter::successors(self.first_bb, move |&bb| self.next_block(bb))
    }

    /// Get the entry block of the layout.
    ///
    /// The entry block is the first block in the layout.
    pub fn entry(&self) -> Block {
        self.first_bb.expect("layout has no entry block")
    }

    /// Get the first block in the layout.
    pub fn first_block(&self) -> Option<Block> {
        self.first_bb
    }

    /// Get the last block in the layout.
    pub fn last_block(&self) -> Option<Block> {
        self.last_bb
    }

    /// Get the block preceding `bb` in the layout.
    pub fn prev_block(&self, bb: Block) -> Option<Block> {
        self.bbs[bb].prev
    }

    /// Get the block following `bb` in the layout.
    pub fn next_block(&self, bb: Block) -> Option<Block> {
        self.bbs[bb].next
    }
}

/// Instruction arrangement.
impl FunctionLayout {
    /// Append an instruction to the end of a block.
    pub fn append_inst(&mut self, inst: Inst, bb: Block) {
        self.map_inst(inst, bb);
        self.bbs[bb].layout.append_inst(inst);
    }

    /// Prepend an instruction to the beginning of a block.
    pub fn prepend_inst(&mut self, inst: Inst, bb: Block) {
        self.map_inst(inst, bb);
        self.bbs[bb].layout.prepend_inst(inst);
    }

    /// Insert an instruction after another instruction.
    pub fn insert_inst_after(&mut self, inst: Inst, after: Inst) {
        let bb = self.inst_block(after).expect("inst not in layout");
        self.map_inst(inst, bb);
        self.bbs[bb].layout.insert_inst_after(inst, after);
    }

    /// Insert an instruction before another instruction.
    pub fn insert_inst_before(&mut self, inst: Inst, before: Inst) {
        let bb = self.inst_block(before).expect("inst not in layout");
        self.map_inst(inst, bb);
        self.bbs[bb].layout.insert_inst_before(inst, before);
    }

    /// Remove an instruction from the layout.
    pub fn remove_inst(&mut self, inst: Inst) {
        let bb = self.inst_block(inst).expect("inst not in layout");
        self.unmap_inst(inst);
        self.bbs[bb].layout.remove_inst(inst);
    }

    /// Check if an instruction has been inserted into the layout.
    pub fn is_inst_inserted(&self, inst: Inst) -> bool {
        self.inst_map.contains_key(&inst)
    }

    /// Get the block that contains an instruction.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.inst_map.get(&inst).cloned()
    }

    /// Return an iterator over all instructions in a block in layout order.
    pub fn insts<'a>(&'a self, bb: Block) -> impl Iterator<Item = Inst> + 'a {
        let layout = &self.bbs[bb].layout;
        std::iter::successors(layout.first_inst, move |&inst| layout.insts[inst].next)
    }

    /// Get the first instruction in a block.
    pub fn first_inst(&self, bb: Block) -> Option<Inst> {
        self.bbs[bb].layout.first_inst
    }

    /// Get the last instruction in a block.
    pub fn last_inst(&self, bb: Block) -> Option<Inst> {
        self.bbs[bb].layout.last_inst
    }

    /// Get the terminator of a block.
    ///
    /// The terminator is the last instruction in the block. Panics if the
    /// block is empty.
    pub fn terminator(&self, bb: Block) -> Inst {
        match self.last_inst(bb) {
            Some(term) => term,
            None => panic!("block {} has no terminator", bb),
        }
    }

    /// Get the instruction preceding `inst` in the layout.
    pub fn prev_inst(&self, inst: Inst) -> Option<Inst> {
        let bb = self.inst_block(inst).expect("inst not in layout");
        self.bbs[bb].layout.insts[inst].prev
    }

    /// Get the instruction following `inst` in the layout.
    pub fn next_inst(&self, inst: Inst) -> Option<Inst> {
        let bb = self.inst_block(inst).expect("inst not in layout");
        self.bbs[bb].layout.insts[inst].next
    }

    /// Add a mapping from an instruction to the block that contains it.
    fn map_inst(&mut self, inst: Inst, bb: Block) {
        match self.inst_map.insert(inst, bb) {
            Some(old_bb) => panic!(
                "inst {} already inserted in {}, now being inserted into {}",
                inst, old_bb, bb
            ),
            None => (),
        }
    }

    /// Remove a mapping from an instruction to the block that contains it.
    fn unmap_inst(&mut self, inst: Inst) {
        match self.inst_map.remove(&inst) {
            Some(_) => (),
            None => panic!("inst {} was not inserted", inst),
        }
    }
}

/// The position where a builder inserts new instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionInsertPos {
    /// No insertion position selected. Building an instruction panics.
    None,
    /// Insert at the end of a block.
    Append(Block),
    /// Insert at the beginning of a block.
    Prepend(Block),
    /// Insert after an instruction.
    After(Inst),
    /// Insert before an instruction.
    Before(Inst),
}

impl FunctionInsertPos {
    /// Add an instruction to the layout at this position.
    ///
    /// An `After` position advances to the added instruction, such that
    /// consecutive insertions are laid out in program order.
    pub(super) fn add_inst(&mut self, inst: Inst, layout: &mut FunctionLayout) {
        match *self {
            FunctionInsertPos::None => panic!("no block selected to insert instruction"),
            FunctionInsertPos::Append(bb) => layout.append_inst(inst, bb),
            FunctionInsertPos::Prepend(bb) => layout.prepend_inst(inst, bb),
            FunctionInsertPos::After(other) => {
                layout.insert_inst_after(inst, other);
                *self = FunctionInsertPos::After(inst);
            }
            FunctionInsertPos::Before(other) => layout.insert_inst_before(inst, other),
        }
    }

    /// Adjust this position to no longer refer to a removed instruction.
    ///
    /// Must be called before the instruction is removed from the layout.
    pub(super) fn remove_inst(&mut self, inst: Inst, layout: &FunctionLayout) {
        match *self {
            FunctionInsertPos::After(other) if other == inst => {
                *self = match layout.prev_inst(inst) {
                    Some(prev) => FunctionInsertPos::After(prev),
                    None => match layout.inst_block(inst) {
                        Some(bb) => FunctionInsertPos::Prepend(bb),
                        None => FunctionInsertPos::None,
                    },
                };
            }
            FunctionInsertPos::Before(other) if other == inst => {
                *self = match layout.next_inst(inst) {
                    Some(next) => FunctionInsertPos::Before(next),
                    None => match layout.inst_block(inst) {
                        Some(bb) => FunctionInsertPos::Append(bb),
                        None => FunctionInsertPos::None,
                    },
                };
            }
            _ => (),
        }
    }
}

impl InstLayout {
    /// Append an instruction to the end of the block.
    fn append_inst(&mut self, inst: Inst) {
        self.insts.add(
            inst,
            InstNode {
                prev: self.last_inst,
                next: None,
            },
        );
        if let Some(prev) = self.last_inst {
            self.insts[prev].next = Some(inst);
        }
        if self.first_inst.is_none() {
            self.first_inst = Some(inst);
        }
        self.last_inst = Some(inst);
    }

    /// Prepend an instruction to the beginning of the block.
    fn prepend_inst(&mut self, inst: Inst) {
        self.insts.add(
            inst,
            InstNode {
                prev: None,
                next: self.first_inst,
            },
        );
        if let Some(next) = self.first_inst {
            self.insts[next].prev = Some(inst);
        }
        if self.last_inst.is_none() {
            self.last_inst = Some(inst);
        }
        self.first_inst = Some(inst);
    }

    /// Insert an instruction after another instruction.
    fn insert_inst_after(&mut self, inst: Inst, after: Inst) {
        self.insts.add(
            inst,
            InstNode {
                prev: Some(after),
                next: self.insts[after].next,
            },
        );
        if let Some(next) = self.insts[after].next {
            self.insts[next].prev = Some(inst);
        }
        self.insts[after].next = Some(inst);
        if self.last_inst == Some(after) {
            self.last_inst = Some(inst);
        }
    }

    /// Insert an instruction before another instruction.
    fn insert_inst_before(&mut self, inst: Inst, before: Inst) {
        self.insts.add(
            inst,
            InstNode {
                prev: self.insts[before].prev,
                next: Some(before),
            },
        );
        if let Some(prev) = self.insts[before].prev {
            self.insts[prev].next = Some(inst);
        }
        self.insts[before].prev = Some(inst);
        if self.first_inst == Some(before) {
            self.first_inst = Some(inst);
        }
    }

    /// Remove an instruction from the block.
    fn remove_inst(&mut self, inst: Inst) {
        let node = self.insts.remove(inst).unwrap();
        if let Some(next) = node.next {
            self.insts[next].prev = node.prev;
        }
        if let Some(prev) = node.prev {
            self.insts[prev].next = node.next;
        }
        if self.first_inst == Some(inst) {
            self.first_inst = node.next;
        }
        if self.last_inst == Some(inst) {
            self.last_inst = node.prev;
        }
    }
}
