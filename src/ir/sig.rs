// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of the arguments and return type of a function.

use crate::{
    ir::Arg,
    table::PrimaryTable,
    ty::{void_ty, Type},
};
use serde::{Deserialize, Serialize};

/// A description of the arguments and return type of a `Function`.
#[derive(Default, Clone, Serialize, Deserialize)]
pub struct Signature {
    args: PrimaryTable<Arg, ArgData>,
    inp: Vec<Arg>,
    retty: Option<Type>,
}

/// A single argument of a `Function`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ArgData {
    ty: Type,
    num: u16,
}

impl Signature {
    /// Create a new signature.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add an input argument.
    pub fn add_input(&mut self, ty: Type) -> Arg {
        let arg = self.args.add(ArgData {
            ty,
            num: self.inp.len() as u16,
        });
        self.inp.push(arg);
        arg
    }

    /// Set the return type of the signature.
    pub fn set_return_type(&mut self, ty: Type) {
        self.retty = Some(ty);
    }

    /// Get the return type of the signature.
    ///
    /// Signatures without an explicit return type return `void`.
    pub fn return_type(&self) -> Type {
        self.retty.clone().unwrap_or_else(void_ty)
    }

    /// Check whether the signature has any inputs.
    pub fn has_inputs(&self) -> bool {
        !self.inp.is_empty()
    }

    /// Check whether the signature has a non-void return type.
    pub fn has_return_type(&self) -> bool {
        self.retty.as_ref().map(|ty| !ty.is_void()).unwrap_or(false)
    }

    /// Return an iterator over the arguments of the signature.
    pub fn args<'a>(&'a self) -> impl Iterator<Item = Arg> + 'a {
        self.inp.iter().cloned()
    }

    /// Return the type of argument `arg`.
    pub fn arg_type(&self, arg: Arg) -> Type {
        self.args[arg].ty.clone()
    }
}

impl Eq for Signature {}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.retty == other.retty
            && self.args().count() == other.args().count()
            && self
                .args()
                .zip(other.args())
                .all(|(a, b)| self.args[a] == other.args[b])
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use itertools::Itertools;
        write!(
            f,
            "({}) {}",
            self.args().map(|arg| self.arg_type(arg)).format(", "),
            self.return_type()
        )
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
