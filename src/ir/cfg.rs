// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of the control flow in a `Function`.
//!
//! Each `Function` has an associated `ControlFlowGraph` which contains the
//! basic blocks and the names assigned to them.

use crate::{
    impl_table_indexing,
    ir::Block,
    table::PrimaryTable,
};
use serde::{Deserialize, Serialize};

/// A control flow graph.
///
/// This is the main container for basic blocks and control flow related
/// information. Every `Function` has an associated control flow graph.
#[derive(Default, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    /// The basic blocks in the graph.
    pub(crate) blocks: PrimaryTable<Block, BlockData>,
}

impl_table_indexing!(ControlFlowGraph, blocks, Block, BlockData);

/// Internal table storage for basic blocks.
#[derive(Debug, Serialize, Deserialize)]
pub struct BlockData {
    /// The name of the basic block.
    pub name: Option<String>,
}

impl ControlFlowGraph {
    /// Create a new control flow graph.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a block to the graph.
    pub(super) fn add_block(&mut self) -> Block {
        self.blocks.add(BlockData { name: None })
    }

    /// Remove a block from the graph.
    pub(super) fn remove_block(&mut self, bb: Block) {
        self.blocks.remove(bb);
    }

    /// Return the name of a block.
    pub fn get_block_name(&self, bb: Block) -> Option<&str> {
        self[bb].name.as_ref().map(AsRef::as_ref)
    }

    /// Set the name of a block.
    pub fn set_block_name(&mut self, bb: Block, name: String) {
        self[bb].name = Some(name);
    }

    /// Clear the name of a block.
    pub fn clear_block_name(&mut self, bb: Block) -> Option<String> {
        std::mem::replace(&mut self[bb].name, None)
    }
}

impl Block {
    /// Dump the block in human-readable form.
    pub fn dump<'a>(self, cfg: &'a ControlFlowGraph) -> BlockDumper<'a> {
        BlockDumper(self, cfg)
    }
}

/// Temporary object to dump a `Block` in human-readable form for debugging.
pub struct BlockDumper<'a>(Block, &'a ControlFlowGraph);

impl std::fmt::Display for BlockDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.0.is_invalid() {
            write!(f, "<invalid>")
        } else if let Some(name) = self.1.get_block_name(self.0) {
            write!(f, "{}", name)
        } else {
            write!(f, "{}", self.0)
        }
    }
}
