// Copyright (c) 2017-2020 Fabian Schuiki

//! Types of values.

pub use self::TypeKind::*;
use crate::util::write_implode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A type.
pub type Type = Arc<TypeKind>;

/// The different kinds of types.
#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// The `void` type.
    VoidType,
    /// Integer types like `i32`.
    IntType(usize),
    /// Pointer types like `i32*`.
    PointerType(Type),
    /// Function types like `(i32, i32) i32`.
    FuncType(Vec<Type>, Type),
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            VoidType => write!(f, "void"),
            IntType(l) => write!(f, "i{}", l),
            PointerType(ref ty) => write!(f, "{}*", ty),
            FuncType(ref args, ref ret) => {
                write!(f, "(")?;
                write_implode(f, ", ", args.iter())?;
                write!(f, ") {}", ret)
            }
        }
    }
}

impl TypeKind {
    /// Check if this is a void type.
    pub fn is_void(&self) -> bool {
        *self == VoidType
    }

    /// Check if this is an integer type.
    pub fn is_int(&self) -> bool {
        match *self {
            IntType(..) => true,
            _ => false,
        }
    }

    /// Check if this is a pointer type.
    pub fn is_pointer(&self) -> bool {
        match *self {
            PointerType(..) => true,
            _ => false,
        }
    }

    /// Unwrap the type to its integer bit width, or panic if the type is not
    /// an integer.
    pub fn unwrap_int(&self) -> usize {
        match *self {
            IntType(w) => w,
            _ => panic!("unwrap_int called on {}", self),
        }
    }

    /// Unwrap the type to its pointee type, or panic if the type is not a
    /// pointer.
    pub fn unwrap_pointer(&self) -> &Type {
        match *self {
            PointerType(ref ty) => ty,
            _ => panic!("unwrap_pointer called on {}", self),
        }
    }

    /// Unwrap the type into arguments and return type, or panic if the type is
    /// not a function.
    pub fn unwrap_func(&self) -> (&[Type], &Type) {
        match *self {
            FuncType(ref args, ref ret) => (args, ret),
            _ => panic!("unwrap_func called on {}", self),
        }
    }
}

/// Create a void type.
pub fn void_ty() -> Type {
    Type::new(VoidType)
}

/// Create an integer type of the requested bit width.
pub fn int_ty(width: usize) -> Type {
    Type::new(IntType(width))
}

/// Create a pointer type with the requested pointee.
pub fn pointer_ty(ty: Type) -> Type {
    Type::new(PointerType(ty))
}

/// Create a function type with the given arguments and return type.
pub fn func_ty(args: Vec<Type>, ret: Type) -> Type {
    Type::new(FuncType(args, ret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(format!("{}", void_ty()), "void");
        assert_eq!(format!("{}", int_ty(1)), "i1");
        assert_eq!(format!("{}", int_ty(32)), "i32");
        assert_eq!(format!("{}", pointer_ty(int_ty(8))), "i8*");
        assert_eq!(
            format!("{}", func_ty(vec![int_ty(32), int_ty(32)], int_ty(1))),
            "(i32, i32) i1"
        );
    }

    #[test]
    fn accessors() {
        assert!(void_ty().is_void());
        assert!(int_ty(42).is_int());
        assert_eq!(int_ty(42).unwrap_int(), 42);
        assert_eq!(pointer_ty(int_ty(8)).unwrap_pointer(), &int_ty(8));
    }
}
