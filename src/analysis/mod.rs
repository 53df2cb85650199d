// Copyright (c) 2017-2020 Fabian Schuiki

//! Analysis passes on the IR
//!
//! This module implements various analysis passes on the IR.

mod preds;
mod ranges;

pub use self::preds::*;
pub use self::ranges::*;
