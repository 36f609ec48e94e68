//! Error types for the fallible lookup surface.

use thiserror::Error;

use crate::ops::{BinaryOp, UnaryOp};
use crate::type_id::TypeId;

/// Failures reported by the `try_*` lookup twins.
///
/// The panicking accessors wrap these; invariant violations inside the core
/// itself abort the operation directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("type id {} is not registered", .0.index())]
    InvalidType(TypeId),

    #[error("type id {} has no constructor for signature {sig}", .ty.index())]
    MissingConstructor { ty: TypeId, sig: String },

    #[error("type id {} has no destructor", .0.index())]
    MissingDestructor(TypeId),

    #[error("type id {} has no assigner for signature {sig}", .ty.index())]
    MissingAssigner { ty: TypeId, sig: String },

    #[error("type id {} has no {op:?} handler for signature {sig}", .ty.index())]
    MissingUnaryOp {
        ty: TypeId,
        op: UnaryOp,
        sig: String,
    },

    #[error("type id {} has no {op:?} handler for signature {sig}", .ty.index())]
    MissingBinaryOp {
        ty: TypeId,
        op: BinaryOp,
        sig: String,
    },

    #[error("no cast from type id {} to {}", .from.index(), .to.index())]
    NotCastable { from: TypeId, to: TypeId },

    #[error("no conversion from type id {} to {}", .from.index(), .to.index())]
    NotConvertible { from: TypeId, to: TypeId },

    #[error("no coercion path from type id {} to {}", .from.index(), .to.index())]
    NoCoercion { from: TypeId, to: TypeId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_ids() {
        let err = MetaError::NoCoercion {
            from: TypeId::new(3),
            to: TypeId::new(9),
        };
        assert_eq!(err.to_string(), "no coercion path from type id 3 to 9");

        let err = MetaError::MissingDestructor(TypeId::new(7));
        assert_eq!(err.to_string(), "type id 7 has no destructor");
    }
}
