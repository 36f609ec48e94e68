//! Typed registration entry points and the builtin operation bundles.
//!
//! `Reflected` ties a Rust type to its registered name; `reflect_type!`
//! implements it at a user registration site. The `add_*` bundles install
//! whole operation sets the way the bootstrap does for the primitives.

use crate::bind::{
    clone_assign, clone_ctor, default_ctor, drop_dtor, move_assign, move_ctor, write_back,
};
use crate::handle::Handle;
use crate::ops::{AssignerFn, BinaryFn, BinaryOp, ConstructorFn, UnaryFn, UnaryOp};
use crate::qualifier::Qualifiers;
use crate::registry::Registry;
use crate::signature::{Parameter, Signature};
use crate::type_id::{InlinePrimitive, Primitive, TypeId};
use crate::view::View;

/// A Rust type known to the reflection layer by a stable name.
///
/// The registry registers a `Reflected` type on first use; repeated lookups
/// return the same id. Use [`reflect_type!`] to implement this for user
/// types.
///
/// [`reflect_type!`]: crate::reflect_type
pub trait Reflected: Sized + 'static {
    const NAME: &'static str;
}

macro_rules! reflected_primitive {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Reflected for $ty {
                const NAME: &'static str = stringify!($ty);
            }
        )+
    };
}

reflected_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, bool);

impl Reflected for View {
    const NAME: &'static str = "View";
}

impl Reflected for Handle {
    const NAME: &'static str = "Handle";
}

/// Implement [`Reflected`] (and handle injection) for a user type.
#[macro_export]
macro_rules! reflect_type {
    ($ty:ty) => {
        $crate::reflect_type!($ty, stringify!($ty));
    };
    ($ty:ty, $name:expr) => {
        impl $crate::Reflected for $ty {
            const NAME: &'static str = $name;
        }

        impl $crate::IntoHandle for $ty {
            fn into_handle(self) -> $crate::Handle {
                $crate::Handle::emplace(self)
            }
        }
    };
}

/// Record base types for a derived type in the thread's default registry:
/// `add_inheritance!(Bar: Foo)`. Returns false if a base is not registered.
#[macro_export]
macro_rules! add_inheritance {
    ($derived:ty : $($base:ty),+ $(,)?) => {{
        let derived = $crate::info_of::<$derived>();
        let bases = [$($crate::info_of::<$base>()),+];
        $crate::with(|r| r.add_inheritance(derived, &bases))
    }};
}

/// Register `T` in an explicit registry, idempotently.
pub fn register_in<T: Reflected>(registry: &mut Registry) -> TypeId {
    registry.register(T::NAME, std::mem::size_of::<T>(), std::mem::align_of::<T>())
}

/// The id of `T` in the thread's default registry, registering it on first
/// use.
pub fn info_of<T: Reflected>() -> TypeId {
    crate::registry::with(register_in::<T>)
}

/// Non-registering lookup of `T` in the thread's default registry.
pub fn find_of<T: Reflected>() -> TypeId {
    crate::registry::with(|r| r.find(T::NAME))
}

/// A signature parameter for `T` with the given qualifiers.
pub fn param_of<T: Reflected>(quals: Qualifiers) -> Parameter {
    Parameter::new(info_of::<T>(), quals)
}

fn sig1_of(id: TypeId, quals: Qualifiers) -> Signature {
    [Parameter::new(id, quals)].into_iter().collect()
}

fn operand_sig1(id: TypeId) -> Signature {
    sig1_of(id, Qualifiers::CONST_REF)
}

fn operand_sig2(id: TypeId) -> Signature {
    [
        Parameter::new(id, Qualifiers::CONST_REF),
        Parameter::new(id, Qualifiers::CONST_REF),
    ]
    .into_iter()
    .collect()
}

// ---- POD bundles ---------------------------------------------------------

/// Install default, copy, and move construction, destruction, and copy and
/// move assignment for `T`. Returns false if any piece was already present.
pub fn add_pod<T: Reflected + Default + Clone>(registry: &mut Registry) -> bool {
    let id = register_in::<T>(registry);
    registry.add_constructor(id, default_ctor::<T>(), Signature::empty())
        && registry.add_constructor(id, clone_ctor::<T>(), sig1_of(id, Qualifiers::CONST_REF))
        && registry.add_constructor(id, move_ctor::<T>(), sig1_of(id, Qualifiers::TEMPORARY))
        && registry.add_destructor(id, drop_dtor::<T>())
        && registry.add_assigner(id, clone_assign::<T>(), sig1_of(id, Qualifiers::CONST_REF))
        && registry.add_assigner(id, move_assign::<T>(), sig1_of(id, Qualifiers::TEMPORARY))
}

fn prim_value_ctor<T: InlinePrimitive + Reflected>() -> ConstructorFn {
    |out, args| {
        assert_eq!(args.len(), 1, "value constructor takes one parameter");
        let value = unsafe { args.get(0).peek().scalar::<T>() };
        unsafe { out.as_ptr::<T>().write(value) };
    }
}

fn prim_assign<T: InlinePrimitive + Reflected>() -> AssignerFn {
    |target, args| {
        assert_eq!(args.len(), 1, "assignment takes one parameter");
        let value = unsafe { args.get(0).peek().scalar::<T>() };
        unsafe { *target.as_mut::<T>() = value };
        target
    }
}

/// The POD bundle for a primitive: the copy and move paths read the operand
/// by value, so inline-primitive arguments construct without an address.
fn add_primitive_pod<T: InlinePrimitive + Reflected + Default>(registry: &mut Registry) -> bool {
    let id = register_in::<T>(registry);
    registry.add_constructor(id, default_ctor::<T>(), Signature::empty())
        && registry.add_constructor(id, prim_value_ctor::<T>(), sig1_of(id, Qualifiers::CONST_REF))
        && registry.add_constructor(id, prim_value_ctor::<T>(), sig1_of(id, Qualifiers::TEMPORARY))
        && registry.add_destructor(id, drop_dtor::<T>())
        && registry.add_assigner(id, prim_assign::<T>(), sig1_of(id, Qualifiers::CONST_REF))
        && registry.add_assigner(id, prim_assign::<T>(), sig1_of(id, Qualifiers::TEMPORARY))
}

// ---- operator closures ---------------------------------------------------

macro_rules! bin_method {
    ($t:ty, $m:ident) => {
        (|a: View, b: View| {
            let (x, y) = unsafe { (a.scalar::<$t>(), b.scalar::<$t>()) };
            Handle::of_value(x.$m(y))
        }) as BinaryFn
    };
}

macro_rules! bin_method_assign {
    ($t:ty, $m:ident) => {
        (|a: View, b: View| {
            let (x, y) = unsafe { (a.scalar::<$t>(), b.scalar::<$t>()) };
            write_back::<$t>(a, x.$m(y))
        }) as BinaryFn
    };
}

macro_rules! bin_op {
    ($t:ty, $op:tt) => {
        (|a: View, b: View| {
            let (x, y) = unsafe { (a.scalar::<$t>(), b.scalar::<$t>()) };
            Handle::of_value(x $op y)
        }) as BinaryFn
    };
}

macro_rules! bin_op_assign {
    ($t:ty, $op:tt) => {
        (|a: View, b: View| {
            let (x, y) = unsafe { (a.scalar::<$t>(), b.scalar::<$t>()) };
            write_back::<$t>(a, x $op y)
        }) as BinaryFn
    };
}

macro_rules! bin_shift {
    ($t:ty, $m:ident) => {
        (|a: View, b: View| {
            let (x, y) = unsafe { (a.scalar::<$t>(), b.scalar::<$t>()) };
            Handle::of_value(x.$m(y as u32))
        }) as BinaryFn
    };
}

macro_rules! bin_shift_assign {
    ($t:ty, $m:ident) => {
        (|a: View, b: View| {
            let (x, y) = unsafe { (a.scalar::<$t>(), b.scalar::<$t>()) };
            write_back::<$t>(a, x.$m(y as u32))
        }) as BinaryFn
    };
}

macro_rules! bin_cmp {
    ($t:ty, $op:tt) => {
        (|a: View, b: View| {
            let (x, y) = unsafe { (a.scalar::<$t>(), b.scalar::<$t>()) };
            Handle::of_value(x $op y)
        }) as BinaryFn
    };
}

macro_rules! bin_logical_and {
    ($t:ty, $zero:expr) => {
        (|a: View, b: View| {
            let (x, y) = unsafe { (a.scalar::<$t>(), b.scalar::<$t>()) };
            Handle::of_value(x != $zero && y != $zero)
        }) as BinaryFn
    };
}

macro_rules! bin_logical_or {
    ($t:ty, $zero:expr) => {
        (|a: View, b: View| {
            let (x, y) = unsafe { (a.scalar::<$t>(), b.scalar::<$t>()) };
            Handle::of_value(x != $zero || y != $zero)
        }) as BinaryFn
    };
}

macro_rules! un_pre_method {
    ($t:ty, $m:ident, $one:expr) => {
        (|a: View| {
            let x = unsafe { a.scalar::<$t>() };
            write_back::<$t>(a, x.$m($one))
        }) as UnaryFn
    };
}

macro_rules! un_post_method {
    ($t:ty, $m:ident, $one:expr) => {
        (|a: View| {
            let x = unsafe { a.scalar::<$t>() };
            write_back::<$t>(a, x.$m($one));
            Handle::of_value(x)
        }) as UnaryFn
    };
}

macro_rules! un_pre_op {
    ($t:ty, $op:tt, $one:expr) => {
        (|a: View| {
            let x = unsafe { a.scalar::<$t>() };
            write_back::<$t>(a, x $op $one)
        }) as UnaryFn
    };
}

macro_rules! un_post_op {
    ($t:ty, $op:tt, $one:expr) => {
        (|a: View| {
            let x = unsafe { a.scalar::<$t>() };
            write_back::<$t>(a, x $op $one);
            Handle::of_value(x)
        }) as UnaryFn
    };
}

macro_rules! un_pos {
    ($t:ty) => {
        (|a: View| Handle::of_value(unsafe { a.scalar::<$t>() })) as UnaryFn
    };
}

macro_rules! un_method {
    ($t:ty, $m:ident) => {
        (|a: View| {
            let x = unsafe { a.scalar::<$t>() };
            Handle::of_value(x.$m())
        }) as UnaryFn
    };
}

macro_rules! un_op {
    ($t:ty, $op:tt) => {
        (|a: View| {
            let x = unsafe { a.scalar::<$t>() };
            Handle::of_value($op x)
        }) as UnaryFn
    };
}

macro_rules! un_not {
    ($t:ty, $zero:expr) => {
        (|a: View| {
            let x = unsafe { a.scalar::<$t>() };
            Handle::of_value(x == $zero)
        }) as UnaryFn
    };
}

// ---- primitive operator sets ---------------------------------------------

macro_rules! install_integral_ops {
    ($r:expr, $t:ty) => {{
        let r: &mut Registry = $r;
        let id = register_in::<$t>(r);
        let mut ok = true;

        ok &= r.add_binary_op(id, bin_method!($t, wrapping_add), BinaryOp::Add, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_method_assign!($t, wrapping_add), BinaryOp::AddAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_method!($t, wrapping_sub), BinaryOp::Sub, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_method_assign!($t, wrapping_sub), BinaryOp::SubAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_method!($t, wrapping_mul), BinaryOp::Mul, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_method_assign!($t, wrapping_mul), BinaryOp::MulAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_method!($t, wrapping_div), BinaryOp::Div, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_method_assign!($t, wrapping_div), BinaryOp::DivAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_method!($t, wrapping_rem), BinaryOp::Rem, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_method_assign!($t, wrapping_rem), BinaryOp::RemAssign, operand_sig2(id));

        ok &= r.add_binary_op(id, bin_op!($t, &), BinaryOp::BitAnd, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op_assign!($t, &), BinaryOp::BitAndAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op!($t, |), BinaryOp::BitOr, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op_assign!($t, |), BinaryOp::BitOrAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op!($t, ^), BinaryOp::BitXor, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op_assign!($t, ^), BinaryOp::BitXorAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_shift!($t, wrapping_shl), BinaryOp::Shl, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_shift_assign!($t, wrapping_shl), BinaryOp::ShlAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_shift!($t, wrapping_shr), BinaryOp::Shr, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_shift_assign!($t, wrapping_shr), BinaryOp::ShrAssign, operand_sig2(id));

        ok &= r.add_binary_op(id, bin_logical_and!($t, 0), BinaryOp::And, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_logical_or!($t, 0), BinaryOp::Or, operand_sig2(id));

        ok &= r.add_binary_op(id, bin_cmp!($t, ==), BinaryOp::Eq, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, !=), BinaryOp::Ne, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, <), BinaryOp::Lt, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, <=), BinaryOp::Le, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, >), BinaryOp::Gt, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, >=), BinaryOp::Ge, operand_sig2(id));

        ok &= r.add_unary_op(id, un_pre_method!($t, wrapping_add, 1), UnaryOp::PreInc, operand_sig1(id));
        ok &= r.add_unary_op(id, un_pre_method!($t, wrapping_sub, 1), UnaryOp::PreDec, operand_sig1(id));
        ok &= r.add_unary_op(id, un_post_method!($t, wrapping_add, 1), UnaryOp::PostInc, operand_sig1(id));
        ok &= r.add_unary_op(id, un_post_method!($t, wrapping_sub, 1), UnaryOp::PostDec, operand_sig1(id));
        ok &= r.add_unary_op(id, un_pos!($t), UnaryOp::Pos, operand_sig1(id));
        ok &= r.add_unary_op(id, un_method!($t, wrapping_neg), UnaryOp::Neg, operand_sig1(id));
        ok &= r.add_unary_op(id, un_op!($t, !), UnaryOp::BitNot, operand_sig1(id));
        ok &= r.add_unary_op(id, un_not!($t, 0), UnaryOp::Not, operand_sig1(id));

        ok
    }};
}

macro_rules! install_float_ops {
    ($r:expr, $t:ty) => {{
        let r: &mut Registry = $r;
        let id = register_in::<$t>(r);
        let mut ok = true;

        ok &= r.add_binary_op(id, bin_op!($t, +), BinaryOp::Add, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op_assign!($t, +), BinaryOp::AddAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op!($t, -), BinaryOp::Sub, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op_assign!($t, -), BinaryOp::SubAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op!($t, *), BinaryOp::Mul, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op_assign!($t, *), BinaryOp::MulAssign, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op!($t, /), BinaryOp::Div, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_op_assign!($t, /), BinaryOp::DivAssign, operand_sig2(id));

        ok &= r.add_binary_op(id, bin_logical_and!($t, 0.0), BinaryOp::And, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_logical_or!($t, 0.0), BinaryOp::Or, operand_sig2(id));

        ok &= r.add_binary_op(id, bin_cmp!($t, ==), BinaryOp::Eq, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, !=), BinaryOp::Ne, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, <), BinaryOp::Lt, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, <=), BinaryOp::Le, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, >), BinaryOp::Gt, operand_sig2(id));
        ok &= r.add_binary_op(id, bin_cmp!($t, >=), BinaryOp::Ge, operand_sig2(id));

        ok &= r.add_unary_op(id, un_pre_op!($t, +, 1.0), UnaryOp::PreInc, operand_sig1(id));
        ok &= r.add_unary_op(id, un_pre_op!($t, -, 1.0), UnaryOp::PreDec, operand_sig1(id));
        ok &= r.add_unary_op(id, un_post_op!($t, +, 1.0), UnaryOp::PostInc, operand_sig1(id));
        ok &= r.add_unary_op(id, un_post_op!($t, -, 1.0), UnaryOp::PostDec, operand_sig1(id));
        ok &= r.add_unary_op(id, un_pos!($t), UnaryOp::Pos, operand_sig1(id));
        ok &= r.add_unary_op(id, un_op!($t, -), UnaryOp::Neg, operand_sig1(id));
        ok &= r.add_unary_op(id, un_not!($t, 0.0), UnaryOp::Not, operand_sig1(id));

        ok
    }};
}

/// POD plus the full arithmetic, bitwise, shift, comparison, and logical
/// operator sets against the same type.
pub fn add_primitive_integral<T: InlinePrimitive + Reflected + Default>(
    registry: &mut Registry,
) -> bool {
    if !add_primitive_pod::<T>(registry) {
        return false;
    }
    match T::KIND {
        Primitive::U8 => install_integral_ops!(registry, u8),
        Primitive::U16 => install_integral_ops!(registry, u16),
        Primitive::U32 => install_integral_ops!(registry, u32),
        Primitive::U64 => install_integral_ops!(registry, u64),
        Primitive::I8 => install_integral_ops!(registry, i8),
        Primitive::I16 => install_integral_ops!(registry, i16),
        Primitive::I32 => install_integral_ops!(registry, i32),
        Primitive::I64 => install_integral_ops!(registry, i64),
        _ => false,
    }
}

/// POD plus the float-safe operator subset: no modulo, bitwise, shift, or
/// bitwise-not. Logical operators use zero-truthiness.
pub fn add_primitive_float<T: InlinePrimitive + Reflected + Default>(
    registry: &mut Registry,
) -> bool {
    if !add_primitive_pod::<T>(registry) {
        return false;
    }
    match T::KIND {
        Primitive::F32 => install_float_ops!(registry, f32),
        Primitive::F64 => install_float_ops!(registry, f64),
        _ => false,
    }
}

/// POD plus logical and/or/not and equality for `bool`.
pub(crate) fn install_bool_ops(registry: &mut Registry) -> bool {
    if !add_primitive_pod::<bool>(registry) {
        return false;
    }
    let id = register_in::<bool>(registry);
    let mut ok = true;

    let and: BinaryFn = |a, b| {
        let (x, y) = unsafe { (a.scalar::<bool>(), b.scalar::<bool>()) };
        Handle::of_value(x && y)
    };
    let or: BinaryFn = |a, b| {
        let (x, y) = unsafe { (a.scalar::<bool>(), b.scalar::<bool>()) };
        Handle::of_value(x || y)
    };

    ok &= registry.add_binary_op(id, and, BinaryOp::And, operand_sig2(id));
    ok &= registry.add_binary_op(id, or, BinaryOp::Or, operand_sig2(id));
    ok &= registry.add_binary_op(id, bin_cmp!(bool, ==), BinaryOp::Eq, operand_sig2(id));
    ok &= registry.add_binary_op(id, bin_cmp!(bool, !=), BinaryOp::Ne, operand_sig2(id));
    ok &= registry.add_unary_op(id, un_not!(bool, false), UnaryOp::Not, operand_sig1(id));
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::{binary, unary};
    use crate::span;

    #[test]
    fn info_of_registers_on_first_use() {
        #[derive(Default, Clone)]
        struct Gadget {
            _weight: u32,
        }
        crate::reflect_type!(Gadget);

        assert!(!find_of::<Gadget>().is_valid());
        let id = info_of::<Gadget>();
        assert!(id.is_valid());
        assert_eq!(find_of::<Gadget>(), id);
        assert_eq!(info_of::<Gadget>(), id);
    }

    #[test]
    fn add_pod_registers_every_piece_once() {
        crate::registry::with(|r| {
            #[derive(Default, Clone)]
            struct Widget {
                _value: i64,
            }
            impl Reflected for Widget {
                const NAME: &'static str = "Widget";
            }

            assert!(add_pod::<Widget>(r));
            // second bundle collides with the first on every table
            assert!(!add_pod::<Widget>(r));
        });
    }

    #[test]
    fn integral_ops_cover_the_full_tag_set() {
        crate::registry::with(|r| {
            let id = Primitive::I32.type_id();
            for op in BinaryOp::ALL {
                assert!(
                    r.try_binary_op(id, op, &operand_sig2(id)).is_ok(),
                    "i32 is missing {op:?}"
                );
            }
            for op in UnaryOp::ALL {
                assert!(
                    r.try_unary_op(id, op, &operand_sig1(id)).is_ok(),
                    "i32 is missing {op:?}"
                );
            }
        });
    }

    #[test]
    fn float_ops_exclude_modulo_and_bitwise() {
        crate::registry::with(|r| {
            let id = Primitive::F64.type_id();
            assert!(r.try_binary_op(id, BinaryOp::Add, &operand_sig2(id)).is_ok());
            assert!(r.try_binary_op(id, BinaryOp::Rem, &operand_sig2(id)).is_err());
            assert!(r.try_binary_op(id, BinaryOp::BitAnd, &operand_sig2(id)).is_err());
            assert!(r.try_binary_op(id, BinaryOp::Shl, &operand_sig2(id)).is_err());
            assert!(r.try_unary_op(id, UnaryOp::BitNot, &operand_sig1(id)).is_err());
            assert!(r.try_unary_op(id, UnaryOp::Not, &operand_sig1(id)).is_ok());
        });
    }

    #[test]
    fn wrapping_arithmetic_does_not_abort() {
        let max = Handle::from(i32::MAX);
        let one = Handle::from(1i32);
        let wrapped = binary(BinaryOp::Add, &max, &one);
        assert_eq!(wrapped.primitive::<i32>(), i32::MIN);
    }

    #[test]
    fn float_arithmetic_dispatches() {
        let a = Handle::from(1.5f64);
        let b = Handle::from(2.25f64);
        let sum = binary(BinaryOp::Add, &a, &b);
        assert_eq!(sum.primitive::<f64>(), 3.75);
        assert_eq!(binary(BinaryOp::Lt, &a, &b).primitive::<bool>(), true);
    }

    #[test]
    fn bool_logical_ops_dispatch() {
        let t = Handle::from(true);
        let f = Handle::from(false);
        assert_eq!(binary(BinaryOp::And, &t, &f).primitive::<bool>(), false);
        assert_eq!(binary(BinaryOp::Or, &t, &f).primitive::<bool>(), true);
        assert_eq!(unary(UnaryOp::Not, &f).primitive::<bool>(), true);
    }

    #[test]
    fn increment_mutates_through_writable_views() {
        let h = Handle::of::<i32>(&span![41i32]);
        let pre = unary(UnaryOp::PreInc, &h);
        assert_eq!(pre.primitive::<i32>(), 42);
        assert_eq!(unsafe { *h.as_ref::<i32>() }, 42);

        let post = unary(UnaryOp::PostInc, &h);
        assert_eq!(post.primitive::<i32>(), 42);
        assert_eq!(unsafe { *h.as_ref::<i32>() }, 43);
    }

    #[test]
    fn increment_on_inline_operand_returns_fresh_value() {
        let h = Handle::from(7i32);
        let pre = unary(UnaryOp::PreInc, &h);
        assert_eq!(pre.primitive::<i32>(), 8);
        // the inline payload itself is unchanged
        assert_eq!(h.primitive::<i32>(), 7);
    }
}
