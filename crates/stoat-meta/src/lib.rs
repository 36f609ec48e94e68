//! Stoat's dynamic-value core: a runtime reflection layer for registered
//! types.
//!
//! The registry assigns every type a dense id, stores its metadata and base
//! set, and keeps signature-keyed tables of constructors, destructors,
//! assigners, operators, casters, and converters. Values cross the erasure
//! boundary as [`View`]s (non-owning, primitives inline), [`Handle`]s
//! (refcounted owners of per-type pool slots), and [`Span`]s of handles
//! (heap-backed parameter lists).
//!
//! All state is thread-local: the default registry, the pools, and the heaps
//! are created on first touch and live for the thread. See [`with`] for the
//! borrow discipline.

pub mod errors;
pub mod memory;

mod bind;
mod handle;
mod info;
mod ops;
mod qualifier;
mod reflect;
mod registry;
mod signature;
mod span;
mod type_id;
mod view;

pub use bind::{
    FromArg, Function, IntoHandle, Member, Method, assign, binary, clone_assign, clone_ctor,
    default_ctor, drop_dtor, from_converter, map_to, move_assign, move_ctor, reinterpret_caster,
    unary,
};
pub use errors::MetaError;
pub use handle::Handle;
pub use info::TypeInfo;
pub use ops::{
    AssignerFn, BinaryFn, BinaryOp, CasterFn, ConstructorFn, ConverterFn, DestructorFn, UnaryFn,
    UnaryOp,
};
pub use qualifier::Qualifiers;
pub use reflect::{
    Reflected, add_pod, add_primitive_float, add_primitive_integral, find_of, info_of, param_of,
    register_in,
};
pub use registry::{DEFAULT_ALIGN, Registry, dump_to_string, with};
pub use signature::{MAX_PARAMETERS, Parameter, Signature};
pub use span::Span;
pub use type_id::{InlinePrimitive, Primitive, PrimitiveValue, TypeId};
pub use view::View;

/// Register a type by name in the thread's default registry, with the
/// default alignment. Idempotent by name.
pub fn register_type(name: &str, size: usize) -> TypeId {
    with(|r| r.register_named(name, size))
}

/// Look up a type by name; `TypeId::INVALID` when unknown.
pub fn find(name: &str) -> TypeId {
    with(|r| r.find(name))
}

/// Whether an id is registered in the thread's default registry.
pub fn valid(ty: TypeId) -> bool {
    with(|r| r.valid(ty))
}
