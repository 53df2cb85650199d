// Copyright (c) 2017-2020 Fabian Schuiki

//! Re-exports of commonly used IR items.

pub use crate::ir::{
    Arg, Block, Function, FunctionBuilder, Inst, ModUnit, Module, Opcode, Signature, UnitName,
    Value,
};
