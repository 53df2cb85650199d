// Copyright (c) 2017-2020 Fabian Schuiki

//! A library to build and optimize code in a small SSA intermediate
//! representation. Provides range-guided branch elimination together with the
//! dead code removal it cascades into.

#[macro_use]
extern crate log;

pub mod analysis;
pub mod ir;
pub mod pass;
pub mod table;
mod ty;
mod util;
pub mod value;
pub mod verifier;
pub mod write;

pub use crate::{ty::*, value::*};
