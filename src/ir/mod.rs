// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of functions in SSA form.
//!
//! This module implements the intermediate representation around which the
//! rest of the crate is built: functions made up of basic blocks, which in
//! turn hold the instructions that define the values in flight.

use crate::{impl_table_key, ty::Type};
use serde::{Deserialize, Serialize};

mod cfg;
mod dfg;
mod function;
mod inst;
mod layout;
mod module;
pub mod prelude;
mod sig;

pub use self::cfg::*;
pub use self::dfg::*;
pub use self::function::*;
pub use self::inst::*;
pub use self::layout::*;
pub use self::module::*;
pub use self::sig::*;

impl_table_key! {
    /// An instruction.
    struct Inst(u32) as "i";

    /// A value.
    struct Value(u32) as "v";

    /// A basic block.
    struct Block(u32) as "bb";

    /// An argument of a `Function`.
    struct Arg(u32) as "arg";

    /// An external `Function`.
    struct ExtUnit(u32) as "ext";
}

impl Value {
    /// A placeholder for invalid values.
    ///
    /// This is used for unused instruction arguments.
    pub(crate) fn invalid() -> Self {
        Value(std::u32::MAX)
    }

    /// Check whether this is the invalid value placeholder.
    pub(crate) fn is_invalid(&self) -> bool {
        self.0 == std::u32::MAX
    }
}

impl Block {
    /// A placeholder for invalid blocks.
    ///
    /// This is used for unused instruction arguments.
    pub(crate) fn invalid() -> Self {
        Block(std::u32::MAX)
    }

    /// Check whether this is the invalid block placeholder.
    pub(crate) fn is_invalid(&self) -> bool {
        self.0 == std::u32::MAX
    }
}

/// Internal table storage for values.
#[derive(Debug, Serialize, Deserialize)]
pub enum ValueData {
    /// The value is the result of an instruction.
    Inst {
        /// The type of the value.
        ty: Type,
        /// The instruction which produces the value.
        inst: Inst,
    },
    /// The value is an argument of the `Function`.
    Arg {
        /// The type of the value.
        ty: Type,
        /// The argument which produces the value.
        arg: Arg,
    },
}

/// An external `Function` referenced from within another function.
///
/// Calls name one of these declarations rather than the callee directly, such
/// that functions can be compiled in isolation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtUnitData {
    /// The name of the referenced unit.
    pub name: UnitName,
    /// The signature of the referenced unit.
    pub sig: Signature,
}

/// A name of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitName {
    /// An anonymous name, like `%42`.
    Anonymous(u32),
    /// A local name, like `%foo`.
    Local(String),
    /// A global name, like `@foo`.
    Global(String),
}

impl UnitName {
    /// Create a new global name.
    pub fn global(name: impl Into<String>) -> Self {
        UnitName::Global(name.into())
    }

    /// Create a new local name.
    pub fn local(name: impl Into<String>) -> Self {
        UnitName::Local(name.into())
    }
}

impl std::fmt::Display for UnitName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            UnitName::Anonymous(id) => write!(f, "%{}", id),
            UnitName::Local(n) => write!(f, "%{}", n),
            UnitName::Global(n) => write!(f, "@{}", n),
        }
    }
}
